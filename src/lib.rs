//! # Inkboard Core Library
//!
//! Builds the two bitmap planes driven onto a two-colour (black/red) e-ink panel.
//! Everything a dashboard draws ends up in one of two [`raster::RasterLayer`]s:
//!
//! - **primary**: black ink on white
//! - **accent**: red ink on white
//!
//! The panel cannot show a pixel that is inked in both planes, so every dashboard
//! finishes by masking the primary plane against the accent plane
//! ([`layers::mask`]), letting red win every conflict.
//!
//! ## Pipeline
//! 1. **Fetch**: map tiles, forecasts, departures and photos come from collaborator
//!    traits ([`tiles::TileSource`], [`weather::WeatherSource`], ...)
//! 2. **Stitch**: tiles are resized and assembled into one raster ([`tiles::stitch`])
//! 3. **Threshold**: translucent overlays become strict black/white ([`layers::threshold`])
//! 4. **Annotate**: text, icons and boxes are drawn in a fixed order ([`overlay`])
//! 5. **Mask**: primary loses every pixel the accent plane inks
//! 6. **Halftone**: the accent plane is optionally dithered ([`layers::halftone`])
//!
//! ## Data Model
//! Fetched data lives in immutable snapshots that are persisted as JSON and
//! replaced wholesale on every refresh:
//! - [`WeatherSnapshot`]: ordered [`PointForecast`]s plus optional sunrise/sunset
//! - [`TransitSnapshot`]: ordered [`Departure`]s

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

pub mod config;
pub mod dashboard;
pub mod display;
pub mod glyphs;
pub mod http;
pub mod jitter;
pub mod jokes;
pub mod layers;
pub mod overlay;
pub mod preview;
pub mod raster;
pub mod runner;
pub mod snapshot;
pub mod tiles;
pub mod transit;
pub mod weather;

/// A single point in a weather forecast series.
///
/// `weather_code` is the upstream numeric condition code; see
/// [`weather::Condition::from_code`] for the known values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointForecast {
    /// Start of the interval this point describes
    pub start_time: DateTime<FixedOffset>,
    /// Air temperature in °C
    pub temperature: f64,
    /// Precipitation intensity in mm/hr (upstream nulls are stored as 0)
    pub precipitation_intensity: f64,
    /// Chance of precipitation in percent, 0 to 100
    #[serde(default)]
    pub precipitation_probability: f64,
    /// Enumerated weather condition code
    pub weather_code: u32,
}

/// Forecast series fetched on a schedule and replaced wholesale.
///
/// # Example
/// ```
/// use chrono::{DateTime, Utc};
/// use inkboard::{PointForecast, WeatherSnapshot};
///
/// let start = DateTime::parse_from_rfc3339("2021-09-11T19:29:00Z").unwrap();
/// let snapshot = WeatherSnapshot {
///     last_updated: Utc::now(),
///     sunrise: None,
///     sunset: None,
///     forecasts: vec![PointForecast {
///         start_time: start,
///         temperature: 18.69,
///         precipitation_intensity: 0.0,
///         precipitation_probability: 5.0,
///         weather_code: 1101,
///     }],
/// };
///
/// assert_eq!(snapshot.current_temperature(), Some(18.69));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub sunrise: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub sunset: Option<DateTime<FixedOffset>>,
    pub forecasts: Vec<PointForecast>,
}

impl WeatherSnapshot {
    /// Temperature of the earliest forecast point.
    pub fn current_temperature(&self) -> Option<f64> {
        self.forecasts.first().map(|f| f.temperature)
    }

    /// Chance of precipitation (percent) at the earliest forecast point.
    pub fn current_precipitation_probability(&self) -> Option<f64> {
        self.forecasts.first().map(|f| f.precipitation_probability)
    }

    /// Condition code of the earliest forecast point.
    pub fn current_condition(&self) -> Option<u32> {
        self.forecasts.first().map(|f| f.weather_code)
    }
}

/// One departure from the configured station. Times are already `HH:MM`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Departure {
    pub booked_departure: String,
    pub realtime_departure: String,
    pub origin: String,
    pub destination: String,
    pub cancelled: bool,
}

/// Departure board fetched on a schedule and replaced wholesale.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitSnapshot {
    pub last_updated: DateTime<Utc>,
    pub departures: Vec<Departure>,
}
