//! # Weather and Sun Collaborators
//!
//! Forecasts come from the tomorrow.io v4 timelines API (1-minute steps over a
//! 3-hour horizon); sunrise and sunset from sunrise-sunset.org. Both sit behind
//! traits so dashboards and tests can swap in other sources.
//!
//! ## Condition Codes
//! tomorrow.io reports an enumerated `weatherCode`. [`Condition::from_code`]
//! maps the known values; anything else yields `None` and the icon annotation
//! is skipped with a warning, since upstream adds codes over time.

use chrono::{DateTime, Duration, FixedOffset, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::glyphs::Glyph;
use crate::http::{FetchError, HttpClient};
use crate::snapshot::{refresh_or_stale, SnapshotStore};
use crate::{PointForecast, WeatherSnapshot};

const TIMELINES_URL: &str = "https://api.tomorrow.io/v4/timelines";
const SUN_URL: &str = "https://api.sunrise-sunset.org/json";
/// How far ahead each forecast request looks.
const FORECAST_HORIZON_HOURS: i64 = 3;

/// Source of point forecasts.
pub trait WeatherSource {
    fn forecast(&self, latitude: f64, longitude: f64) -> Result<Vec<PointForecast>, FetchError>;
}

/// Source of today's sunrise and sunset.
pub trait SunSource {
    fn sun_times(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<(DateTime<FixedOffset>, DateTime<FixedOffset>), FetchError>;
}

/// Enumerated weather conditions reported by tomorrow.io.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Condition {
    Clear,
    MostlyClear,
    PartlyCloudy,
    MostlyCloudy,
    Cloudy,
    Fog,
    LightFog,
    LightWind,
    Wind,
    StrongWind,
    Drizzle,
    Rain,
    LightRain,
    HeavyRain,
    Snow,
    Flurries,
    LightSnow,
    HeavySnow,
    FreezingDrizzle,
    FreezingRain,
    LightFreezingRain,
    HeavyFreezingRain,
    IcePellets,
    HeavyIcePellets,
    LightIcePellets,
    Thunderstorm,
}

impl Condition {
    pub fn from_code(code: u32) -> Option<Self> {
        use Condition::*;
        let condition = match code {
            1000 => Clear,
            1001 => Cloudy,
            1100 => MostlyClear,
            1101 => PartlyCloudy,
            1102 => MostlyCloudy,
            2000 => Fog,
            2100 => LightFog,
            3000 => LightWind,
            3001 => Wind,
            3002 => StrongWind,
            4000 => Drizzle,
            4001 => Rain,
            4200 => LightRain,
            4201 => HeavyRain,
            5000 => Snow,
            5001 => Flurries,
            5100 => LightSnow,
            5101 => HeavySnow,
            6000 => FreezingDrizzle,
            6001 => FreezingRain,
            6200 => LightFreezingRain,
            6201 => HeavyFreezingRain,
            7000 => IcePellets,
            7101 => HeavyIcePellets,
            7102 => LightIcePellets,
            8000 => Thunderstorm,
            _ => return None,
        };
        Some(condition)
    }

    pub fn glyph(self) -> Glyph {
        use Condition::*;
        match self {
            Clear | MostlyClear => Glyph::Clear,
            PartlyCloudy | MostlyCloudy | Cloudy => Glyph::Cloudy,
            Fog | LightFog => Glyph::Fog,
            LightWind | Wind => Glyph::Wind,
            StrongWind => Glyph::StrongWind,
            Drizzle | LightRain => Glyph::Rain,
            Rain | HeavyRain | FreezingDrizzle | FreezingRain | LightFreezingRain
            | HeavyFreezingRain => Glyph::Showers,
            Snow | LightSnow | HeavySnow => Glyph::Snow,
            Flurries => Glyph::Flurries,
            IcePellets | HeavyIcePellets | LightIcePellets => Glyph::Hail,
            Thunderstorm => Glyph::Thunderstorm,
        }
    }
}

/// Glyph for a raw condition code.
///
/// Code 0 means "no data" and quietly yields `None`; any other unknown code is
/// logged.
pub fn condition_glyph(code: u32) -> Option<Glyph> {
    if code == 0 {
        return None;
    }
    match Condition::from_code(code) {
        Some(condition) => Some(condition.glyph()),
        None => {
            tracing::warn!(code, "unknown weather code, skipping icon");
            None
        }
    }
}

#[derive(Deserialize)]
struct TimelinesResponse {
    data: TimelinesData,
}

#[derive(Deserialize)]
struct TimelinesData {
    timelines: Vec<Timeline>,
}

#[derive(Deserialize)]
struct Timeline {
    intervals: Vec<Interval>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Interval {
    start_time: DateTime<FixedOffset>,
    values: IntervalValues,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IntervalValues {
    temperature: f64,
    #[serde(default)]
    precipitation_intensity: Option<f64>,
    #[serde(default)]
    precipitation_probability: Option<f64>,
    weather_code: u32,
}

/// Parse a timelines response body into forecast points, in upstream order.
pub fn parse_timelines(body: &str) -> Result<Vec<PointForecast>, FetchError> {
    let response: TimelinesResponse =
        serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))?;
    let timeline = response
        .data
        .timelines
        .into_iter()
        .next()
        .ok_or_else(|| FetchError::Decode("no timelines in response".into()))?;
    Ok(timeline
        .intervals
        .into_iter()
        .map(|interval| PointForecast {
            start_time: interval.start_time,
            temperature: interval.values.temperature,
            precipitation_intensity: interval.values.precipitation_intensity.unwrap_or(0.0),
            precipitation_probability: interval.values.precipitation_probability.unwrap_or(0.0),
            weather_code: interval.values.weather_code,
        })
        .collect())
}

/// tomorrow.io timelines client.
#[derive(Clone)]
pub struct TomorrowIo {
    http: HttpClient,
    api_key: String,
}

impl TomorrowIo {
    pub fn new(http: HttpClient, api_key: impl Into<String>) -> Self {
        Self {
            http,
            api_key: api_key.into(),
        }
    }
}

impl WeatherSource for TomorrowIo {
    fn forecast(&self, latitude: f64, longitude: f64) -> Result<Vec<PointForecast>, FetchError> {
        let end_time = Utc::now() + Duration::hours(FORECAST_HORIZON_HOURS);
        let body = json!({
            "location": [latitude, longitude],
            "units": "metric",
            "timesteps": ["1m"],
            "endTime": end_time.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            "fields": ["temperature", "precipitationIntensity", "precipitationProbability", "weatherCode"],
        });
        let request = self
            .http
            .client()
            .post(TIMELINES_URL)
            .query(&[("apikey", self.api_key.as_str())])
            .header("Accept", "application/json")
            .json(&body);
        let text = self.http.fetch_text(request)?;
        parse_timelines(&text)
    }
}

#[derive(Deserialize)]
struct SunResponse {
    results: SunResults,
    status: String,
}

#[derive(Deserialize)]
struct SunResults {
    sunrise: DateTime<FixedOffset>,
    sunset: DateTime<FixedOffset>,
}

/// Parse a sunrise-sunset.org response (`formatted=0`).
pub fn parse_sun_times(
    body: &str,
) -> Result<(DateTime<FixedOffset>, DateTime<FixedOffset>), FetchError> {
    let response: SunResponse =
        serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))?;
    if response.status != "OK" {
        return Err(FetchError::Decode(format!("sun API status {}", response.status)));
    }
    Ok((response.results.sunrise, response.results.sunset))
}

/// sunrise-sunset.org client.
#[derive(Clone)]
pub struct SunriseSunset {
    http: HttpClient,
}

impl SunriseSunset {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

impl SunSource for SunriseSunset {
    fn sun_times(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<(DateTime<FixedOffset>, DateTime<FixedOffset>), FetchError> {
        let request = self
            .http
            .get(SUN_URL)
            .query(&[
                ("date", "today".to_string()),
                ("formatted", "0".to_string()),
                ("lat", latitude.to_string()),
                ("lng", longitude.to_string()),
            ])
            .header("Accept", "application/json");
        parse_sun_times(&self.http.fetch_text(request)?)
    }
}

/// Scheduled weather refresh backed by a persisted snapshot.
pub struct WeatherFeed {
    forecasts: Box<dyn WeatherSource>,
    sun: Box<dyn SunSource>,
    store: SnapshotStore,
    latitude: f64,
    longitude: f64,
    max_age: Duration,
}

impl WeatherFeed {
    pub fn new(
        forecasts: Box<dyn WeatherSource>,
        sun: Box<dyn SunSource>,
        store: SnapshotStore,
        latitude: f64,
        longitude: f64,
        max_age: Duration,
    ) -> Self {
        Self {
            forecasts,
            sun,
            store: store.keyed(&format!("{latitude:.3}_{longitude:.3}")),
            latitude,
            longitude,
            max_age,
        }
    }

    /// Current snapshot: refreshed when stale, otherwise the stored one.
    ///
    /// A sun lookup failure does not fail the refresh; the snapshot simply has
    /// no sunrise/sunset.
    pub fn snapshot(&self, now: DateTime<Utc>) -> Option<WeatherSnapshot> {
        refresh_or_stale(&self.store, now, self.max_age, || {
            let forecasts = self.forecasts.forecast(self.latitude, self.longitude)?;
            let (sunrise, sunset) = match self.sun.sun_times(self.latitude, self.longitude) {
                Ok((rise, set)) => (Some(rise), Some(set)),
                Err(e) => {
                    tracing::warn!(error = %e, "sunrise/sunset lookup failed");
                    (None, None)
                }
            };
            Ok(WeatherSnapshot {
                last_updated: now,
                sunrise,
                sunset,
                forecasts,
            })
        })
    }
}
