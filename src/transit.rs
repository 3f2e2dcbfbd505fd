//! # Transit Collaborator
//!
//! Departures from one station via the Realtime Trains pull API
//! (`GET /api/v1/json/search/{station}`, HTTP basic auth).
//!
//! Upstream times arrive as 4-digit `HHMM` strings and are stored as `HH:MM`.
//! A `displayAs` of `"CANCELLED_CALL"` marks a cancelled departure.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use crate::http::{FetchError, HttpClient};
use crate::snapshot::{refresh_or_stale, SnapshotStore};
use crate::{Departure, TransitSnapshot};

const SEARCH_URL: &str = "https://api.rtt.io/api/v1/json/search";
const CANCELLED_CALL: &str = "CANCELLED_CALL";

/// Source of departures for a station.
pub trait TransitSource {
    fn departures(&self, station: &str) -> Result<Vec<Departure>, FetchError>;
}

/// Turn `"1210"` into `"12:10"`. Anything that is not a run of at least three
/// ASCII digits is returned unchanged.
pub fn hhmm_to_display(time: &str) -> String {
    if time.len() >= 3 && time.bytes().all(|b| b.is_ascii_digit()) {
        let split = time.len() - 2;
        format!("{}:{}", &time[..split], &time[split..])
    } else {
        time.to_string()
    }
}

/// Shorter names for stations that would not fit a departure line.
pub fn shorten_station_name(name: &str) -> &str {
    match name {
        "London Charing Cross" => "London Charing X",
        "London Cannon Street" => "London Cannon St",
        other => other,
    }
}

/// Departures worth drawing: the first `max` services, then only those whose
/// destination contains `filter` (when set).
pub fn select_departures<'a>(
    departures: &'a [Departure],
    max: usize,
    filter: Option<&str>,
) -> Vec<&'a Departure> {
    departures
        .iter()
        .take(max)
        .filter(|d| filter.map_or(true, |f| d.destination.contains(f)))
        .collect()
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    services: Option<Vec<Service>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Service {
    location_detail: Option<LocationDetail>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocationDetail {
    gbtt_booked_departure: Option<String>,
    realtime_departure: Option<String>,
    #[serde(default)]
    display_as: String,
    #[serde(default)]
    origin: Vec<Stop>,
    #[serde(default)]
    destination: Vec<Stop>,
}

#[derive(Deserialize)]
struct Stop {
    description: String,
}

fn first_stop(stops: &[Stop]) -> String {
    stops
        .first()
        .map(|s| shorten_station_name(&s.description).to_string())
        .unwrap_or_default()
}

/// Parse a search response into departures, in upstream order.
///
/// Services without location detail are skipped. A missing realtime departure
/// falls back to the booked time.
pub fn parse_search(body: &str) -> Result<Vec<Departure>, FetchError> {
    let response: SearchResponse =
        serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))?;
    Ok(response
        .services
        .unwrap_or_default()
        .into_iter()
        .filter_map(|service| service.location_detail)
        .map(|detail| {
            let booked = detail.gbtt_booked_departure.as_deref().map(hhmm_to_display);
            let realtime = detail.realtime_departure.as_deref().map(hhmm_to_display);
            Departure {
                booked_departure: booked.clone().unwrap_or_default(),
                realtime_departure: realtime.or(booked).unwrap_or_default(),
                origin: first_stop(&detail.origin),
                destination: first_stop(&detail.destination),
                cancelled: detail.display_as == CANCELLED_CALL,
            }
        })
        .collect())
}

/// Realtime Trains API client.
#[derive(Clone)]
pub struct RealtimeTrains {
    http: HttpClient,
    username: String,
    password: String,
}

impl RealtimeTrains {
    pub fn new(http: HttpClient, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            http,
            username: username.into(),
            password: password.into(),
        }
    }
}

impl TransitSource for RealtimeTrains {
    fn departures(&self, station: &str) -> Result<Vec<Departure>, FetchError> {
        let request = self
            .http
            .get(&format!("{SEARCH_URL}/{station}"))
            .basic_auth(&self.username, Some(&self.password));
        parse_search(&self.http.fetch_text(request)?)
    }
}

/// Scheduled transit refresh backed by a persisted snapshot.
pub struct TransitFeed {
    source: Box<dyn TransitSource>,
    store: SnapshotStore,
    station: String,
    max_age: Duration,
}

impl TransitFeed {
    pub fn new(
        source: Box<dyn TransitSource>,
        store: SnapshotStore,
        station: impl Into<String>,
        max_age: Duration,
    ) -> Self {
        let station = station.into();
        Self {
            source,
            store: store.keyed(&station),
            station,
            max_age,
        }
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> Option<TransitSnapshot> {
        refresh_or_stale(&self.store, now, self.max_age, || {
            Ok(TransitSnapshot {
                last_updated: now,
                departures: self.source.departures(&self.station)?,
            })
        })
    }
}
