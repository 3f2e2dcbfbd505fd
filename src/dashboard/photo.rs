//! Portrait photo dashboard: the latest photo, dithered to black and white,
//! with a weather box in the bottom-left corner and trains across the top.

use std::path::PathBuf;

use chrono::Utc;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use image::imageops::FilterType;

use super::{finish_accent, jitter_for, system_clock, weather_feed};
use super::{BuildError, Clock, Dashboard, LayerPair, TransitBoard};
use crate::config::{Config, DisplayConfig};
use crate::http::HttpClient;
use crate::jitter::Jitter;
use crate::layers::{halftone, threshold_luma};
use crate::overlay::{
    add_sun_event, add_temperature, add_unknown_temperature, add_weather_icon, clear_rect, Fonts,
};
use crate::raster::{LayerError, RasterLayer};
use crate::weather::WeatherFeed;

/// Luma below which a photo pixel is inked.
const PHOTO_LUMA_CUTOFF: u8 = 128;
const WEATHER_BOX: Size = Size::new(280, 120);

pub struct PhotoDashboard {
    display: DisplayConfig,
    fonts: Fonts,
    photo_path: PathBuf,
    weather: Option<WeatherFeed>,
    transit: Option<TransitBoard>,
    jitter: Jitter,
    clock: Clock,
}

impl PhotoDashboard {
    pub fn new(display: DisplayConfig, photo_path: impl Into<PathBuf>) -> Self {
        PhotoDashboard {
            fonts: Fonts::from_config(&display.fonts),
            jitter: jitter_for(&display),
            display,
            photo_path: photo_path.into(),
            weather: None,
            transit: None,
            clock: system_clock(),
        }
    }

    pub fn from_config(config: &Config, http: &HttpClient) -> Self {
        PhotoDashboard::new(config.display.with_size(448, 600), &config.storage.photo_path)
            .with_weather(weather_feed(config, http))
            .with_transit(TransitBoard::from_config(config, http))
    }

    pub fn with_weather(mut self, weather: Option<WeatherFeed>) -> Self {
        self.weather = weather;
        self
    }

    pub fn with_transit(mut self, transit: Option<TransitBoard>) -> Self {
        self.transit = transit;
        self
    }

    pub fn with_jitter(mut self, jitter: Jitter) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Photo scaled to cover the panel and reduced to dithered black/white.
    /// A missing or unreadable photo gives a blank plane.
    fn photo_plane(&self) -> Result<RasterLayer, LayerError> {
        let (w, h) = (self.display.width, self.display.height);
        let photo = match image::open(&self.photo_path) {
            Ok(photo) => photo,
            Err(e) => {
                tracing::warn!(path = %self.photo_path.display(), error = %e, "no photo to show");
                return Ok(RasterLayer::new(w, h));
            }
        };
        let filled = photo.resize_to_fill(w, h, FilterType::CatmullRom).to_rgba8();
        let bitmap = threshold_luma(&RasterLayer::from_image(filled), PHOTO_LUMA_CUTOFF)?;
        Ok(halftone(&bitmap))
    }
}

impl Dashboard for PhotoDashboard {
    fn name(&self) -> &'static str {
        "photo"
    }

    fn build_images(&mut self) -> Result<LayerPair, BuildError> {
        let (w, h) = (self.display.width, self.display.height);
        let mut primary = self.photo_plane()?;
        let mut accent = RasterLayer::new(w, h);

        let weather_box = Rectangle::new(
            Point::new(0, h as i32 - WEATHER_BOX.height as i32),
            WEATHER_BOX,
        );
        clear_rect(&mut primary, weather_box);
        clear_rect(&mut accent, weather_box);
        let origin = weather_box.top_left;

        let now = (self.clock)();
        let snapshot = self
            .weather
            .as_ref()
            .and_then(|feed| feed.snapshot(now.with_timezone(&Utc)));

        let temperature_at = origin + Point::new(10, 10);
        match snapshot.as_ref().and_then(|s| s.current_temperature()) {
            Some(t) => add_temperature(&mut primary, Some(t), temperature_at, self.fonts.large, 3),
            None => add_unknown_temperature(&mut primary, temperature_at, self.fonts.large, 3),
        }
        add_sun_event(
            &mut primary,
            now,
            snapshot.as_ref().and_then(|s| s.sunrise),
            snapshot.as_ref().and_then(|s| s.sunset),
            origin + Point::new(10, 85),
            self.fonts.medium,
        );
        add_weather_icon(
            &mut accent,
            snapshot.as_ref().and_then(|s| s.current_condition()),
            origin + Point::new(WEATHER_BOX.width as i32 - 10, 10),
            60,
            &mut self.jitter,
        );
        let mut accent = finish_accent(&accent, &self.display, &mut self.jitter);

        if let Some(transit) = &self.transit {
            transit.draw(
                &mut primary,
                &mut accent,
                now.with_timezone(&Utc),
                Point::new(5, 10),
                self.fonts.medium,
            )?;
        }

        Ok(LayerPair::masked(primary, accent)?)
    }
}
