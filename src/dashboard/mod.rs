//! # Dashboards
//!
//! A dashboard is anything that can produce the two planes for one refresh:
//! [`Dashboard::build_images`]. The display side never needs to know which
//! dashboard is active.
//!
//! ## Variants
//! - [`MapDashboard`]: portrait map with rainfall radar, weather and trains
//! - [`JokeDashboard`]: landscape cowsay dad joke
//! - [`PhotoDashboard`]: portrait dithered photo with a weather box
//!
//! Every variant finishes the same way: primary is masked against accent so
//! no pixel is inked in both planes.

use chrono::{DateTime, Duration, FixedOffset, Local, Utc};
use embedded_graphics::{mono_font::MonoFont, prelude::Point};
use thiserror::Error;

use crate::config::{Config, DisplayConfig};
use crate::http::HttpClient;
use crate::jitter::Jitter;
use crate::layers::{halftone, halftone_jittered, mask};
use crate::overlay::add_departures;
use crate::raster::{LayerError, RasterLayer};
use crate::snapshot::SnapshotStore;
use crate::transit::{select_departures, RealtimeTrains, TransitFeed};
use crate::weather::{SunriseSunset, TomorrowIo, WeatherFeed};

mod joke;
mod map;
mod photo;

pub use joke::JokeDashboard;
pub use map::MapDashboard;
pub use photo::PhotoDashboard;

/// Errors that abort a build. Upstream fetch failures never do.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Layer(#[from] LayerError),
}

/// The two planes of one frame, always the same size.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerPair {
    pub primary: RasterLayer,
    pub accent: RasterLayer,
}

impl LayerPair {
    /// Mask primary against accent, then pair them up.
    pub fn masked(primary: RasterLayer, accent: RasterLayer) -> Result<Self, LayerError> {
        let primary = mask(primary, &accent)?;
        Ok(LayerPair { primary, accent })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.primary.dimensions()
    }
}

/// Produces the two planes for one refresh.
pub trait Dashboard {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn build_images(&mut self) -> Result<LayerPair, BuildError>;
}

/// Source of "now" in the panel's local timezone.
pub type Clock = Box<dyn Fn() -> DateTime<FixedOffset>>;

pub fn system_clock() -> Clock {
    Box::new(|| Local::now().fixed_offset())
}

/// Jitter for a dashboard, honouring `[display] jitter`.
pub fn jitter_for(display: &DisplayConfig) -> Jitter {
    if display.jitter {
        Jitter::from_entropy()
    } else {
        Jitter::Off
    }
}

/// Dither the accent plane if enabled.
pub(crate) fn finish_accent(accent: &RasterLayer, display: &DisplayConfig, jitter: &mut Jitter) -> RasterLayer {
    match (display.halftone_accent, display.jitter) {
        (false, _) => accent.clone(),
        (true, true) => halftone_jittered(accent, jitter),
        (true, false) => halftone(accent),
    }
}

/// Weather feed from config, or `None` when no API key is set.
pub fn weather_feed(config: &Config, http: &HttpClient) -> Option<WeatherFeed> {
    if config.weather.api_key.is_empty() {
        tracing::info!("no weather API key configured, weather disabled");
        return None;
    }
    Some(WeatherFeed::new(
        Box::new(TomorrowIo::new(http.clone(), config.weather.api_key.clone())),
        Box::new(SunriseSunset::new(http.clone())),
        SnapshotStore::new(&config.storage.data_dir),
        config.location.latitude,
        config.location.longitude,
        Duration::minutes(config.weather.refresh_minutes),
    ))
}

/// Departure board: feed plus display options.
pub struct TransitBoard {
    feed: TransitFeed,
    max_departures: usize,
    destination_filter: Option<String>,
}

impl TransitBoard {
    pub fn new(feed: TransitFeed, max_departures: usize, destination_filter: Option<String>) -> Self {
        Self {
            feed,
            max_departures,
            destination_filter,
        }
    }

    /// Board from config, or `None` when no station is set.
    pub fn from_config(config: &Config, http: &HttpClient) -> Option<Self> {
        let transit = &config.transit;
        if transit.station.is_empty() {
            tracing::info!("no station configured, departures disabled");
            return None;
        }
        let source = RealtimeTrains::new(http.clone(), &transit.username, &transit.password);
        let feed = TransitFeed::new(
            Box::new(source),
            SnapshotStore::new(&config.storage.data_dir),
            &transit.station,
            Duration::minutes(transit.refresh_minutes),
        );
        Some(Self::new(feed, transit.max_departures, transit.destination_filter.clone()))
    }

    /// Fetch (or reuse) departures and draw them. No data draws nothing.
    pub fn draw(
        &self,
        primary: &mut RasterLayer,
        accent: &mut RasterLayer,
        now: DateTime<Utc>,
        top_left: Point,
        font: &MonoFont<'_>,
    ) -> Result<(), LayerError> {
        let Some(snapshot) = self.feed.snapshot(now) else {
            tracing::warn!("no departures available");
            return Ok(());
        };
        let departures = select_departures(
            &snapshot.departures,
            self.max_departures,
            self.destination_filter.as_deref(),
        );
        add_departures(primary, accent, &departures, top_left, font)
    }
}

/// White canvas of the display size with `layer` pasted at the origin.
pub(crate) fn fit_to_display(layer: &RasterLayer, display: &DisplayConfig) -> RasterLayer {
    if layer.dimensions() == (display.width, display.height) {
        return layer.clone();
    }
    let mut canvas = RasterLayer::new(display.width, display.height);
    canvas.alpha_composite(layer, 0, 0);
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::overlap_count;
    use crate::raster::{BLACK, WHITE};

    #[test]
    fn masked_pair_has_no_overlap() {
        let primary = RasterLayer::filled(4, 4, BLACK);
        let mut accent = RasterLayer::new(4, 4);
        accent.set_pixel(1, 1, BLACK);
        let pair = LayerPair::masked(primary, accent).unwrap();
        assert_eq!(overlap_count(&pair.primary, &pair.accent).unwrap(), 0);
        assert_eq!(pair.primary.get(1, 1), Some(WHITE));
        assert_eq!(pair.primary.get(0, 0), Some(BLACK));
    }

    #[test]
    fn masked_pair_rejects_size_mismatch() {
        let err = LayerPair::masked(RasterLayer::new(2, 2), RasterLayer::new(2, 3)).unwrap_err();
        assert!(matches!(err, LayerError::DimensionMismatch { .. }));
    }

    #[test]
    fn accent_dither_follows_config() {
        let accent = RasterLayer::filled(6, 2, BLACK);
        let mut display = DisplayConfig {
            halftone_accent: false,
            jitter: false,
            ..DisplayConfig::default()
        };
        assert_eq!(finish_accent(&accent, &display, &mut Jitter::Off), accent);
        display.halftone_accent = true;
        assert_eq!(finish_accent(&accent, &display, &mut Jitter::Off), halftone(&accent));
    }

    #[test]
    fn fit_to_display_pads_with_white() {
        let small = RasterLayer::filled(2, 2, BLACK);
        let display = DisplayConfig::default().with_size(4, 3);
        let fitted = fit_to_display(&small, &display);
        assert_eq!(fitted.dimensions(), (4, 3));
        assert_eq!(fitted.get(1, 1), Some(BLACK));
        assert_eq!(fitted.get(3, 2), Some(WHITE));
    }

    #[test]
    fn feeds_are_disabled_without_credentials() {
        let config = Config::default();
        let http = HttpClient::new().unwrap();
        assert!(weather_feed(&config, &http).is_none());
        assert!(TransitBoard::from_config(&config, &http).is_none());
    }
}
