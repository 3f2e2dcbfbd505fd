//! Portrait map dashboard: toner base map in black, rainfall radar in red,
//! with a weather panel in the top-right corner, trains down the left and a
//! birthday banner along the bottom.

use chrono::Utc;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;

use super::{finish_accent, fit_to_display, jitter_for, system_clock, weather_feed};
use super::{BuildError, Clock, Dashboard, LayerPair, TransitBoard};
use crate::config::{BirthdayConfig, Config, DisplayConfig};
use crate::http::HttpClient;
use crate::jitter::Jitter;
use crate::layers::{mask, threshold};
use crate::overlay::{
    add_birthdays, add_precipitation_graph, add_rain_chance, add_sun_event, add_temperature,
    add_unknown_temperature, add_weather_icon, clear_rect, Fonts,
};
use crate::tiles::{deg_to_tile, stitch, CacheKey, GridSpec, HttpTiles, TileCache, TileCoord, TileLayer, TileSource};
use crate::weather::WeatherFeed;

/// Alpha at or below which a radar pixel counts as "no rain".
const RADAR_ALPHA_CUTOFF: u8 = 20;
const BASE_CACHE_NAME: &str = "base_weather";
/// Width of the weather panel on the right.
const PANEL_WIDTH: i32 = 250;
const PANEL_HEIGHT: i32 = 350;
const TEMPERATURE_SCALE: u32 = 4;
const ICON_SIZE: u32 = 50;

pub struct MapDashboard {
    display: DisplayConfig,
    fonts: Fonts,
    centre: TileCoord,
    base: Box<dyn TileSource>,
    radar: Box<dyn TileSource>,
    tile_cache: Option<TileCache>,
    weather: Option<WeatherFeed>,
    transit: Option<TransitBoard>,
    birthdays: BirthdayConfig,
    jitter: Jitter,
    clock: Clock,
}

impl MapDashboard {
    pub fn new(
        display: DisplayConfig,
        centre: TileCoord,
        base: Box<dyn TileSource>,
        radar: Box<dyn TileSource>,
    ) -> Self {
        MapDashboard {
            fonts: Fonts::from_config(&display.fonts),
            jitter: jitter_for(&display),
            display,
            centre,
            base,
            radar,
            tile_cache: None,
            weather: None,
            transit: None,
            birthdays: BirthdayConfig::default(),
            clock: system_clock(),
        }
    }

    /// Dashboard wired to the real tile servers and feeds.
    pub fn from_config(config: &Config, http: &HttpClient) -> Self {
        let location = &config.location;
        let centre = deg_to_tile(location.latitude, location.longitude, location.zoom);
        let display = config.display.with_size(528, 880);
        MapDashboard::new(
            display,
            centre,
            Box::new(HttpTiles::new(http.clone(), TileLayer::Toner)),
            Box::new(HttpTiles::new(http.clone(), TileLayer::MetOfficeRadar)),
        )
        .with_tile_cache(TileCache::new(&config.storage.tile_cache_dir))
        .with_weather(weather_feed(config, http))
        .with_transit(TransitBoard::from_config(config, http))
        .with_birthdays(config.birthdays.clone())
    }

    pub fn with_tile_cache(mut self, cache: TileCache) -> Self {
        self.tile_cache = Some(cache);
        self
    }

    pub fn with_weather(mut self, weather: Option<WeatherFeed>) -> Self {
        self.weather = weather;
        self
    }

    pub fn with_transit(mut self, transit: Option<TransitBoard>) -> Self {
        self.transit = transit;
        self
    }

    pub fn with_birthdays(mut self, birthdays: BirthdayConfig) -> Self {
        self.birthdays = birthdays;
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
}

impl Dashboard for MapDashboard {
    fn name(&self) -> &'static str {
        "map"
    }

    fn build_images(&mut self) -> Result<LayerPair, BuildError> {
        let (w, h) = (self.display.width as i32, self.display.height as i32);
        let grid = GridSpec::default();

        tracing::info!(x = self.centre.x, y = self.centre.y, zoom = self.centre.zoom, "stitching base map");
        let cache = self.tile_cache.as_ref().map(|cache| CacheKey {
            cache,
            name: BASE_CACHE_NAME,
        });
        let base = stitch(self.centre, grid, self.base.as_ref(), cache);
        let mut primary = fit_to_display(&base, &self.display);

        tracing::info!("stitching radar overlay");
        let radar = stitch(self.centre, grid, self.radar.as_ref(), None);
        let mut accent = fit_to_display(&threshold(&radar, RADAR_ALPHA_CUTOFF)?, &self.display);

        let panel = Rectangle::with_corners(Point::new(w - PANEL_WIDTH, 0), Point::new(w, PANEL_HEIGHT));
        clear_rect(&mut primary, panel);
        clear_rect(&mut accent, panel);
        // Bottom-right corner stays free of radar
        clear_rect(&mut accent, Rectangle::with_corners(Point::new(w - 100, h - 55), Point::new(w, h)));

        let now = (self.clock)();
        let snapshot = self
            .weather
            .as_ref()
            .and_then(|feed| feed.snapshot(now.with_timezone(&Utc)));
        let forecasts = snapshot.as_ref().map(|s| s.forecasts.as_slice()).unwrap_or(&[]);

        add_precipitation_graph(
            &mut primary,
            forecasts,
            Rectangle::new(Point::new(w - PANEL_WIDTH, 200), Size::new(250, 150)),
            self.fonts.small,
            *now.offset(),
        );

        let temperature_at = Point::new(w - PANEL_WIDTH + 10, 10);
        match snapshot.as_ref().and_then(|s| s.current_temperature()) {
            Some(t) => add_temperature(&mut primary, Some(t), temperature_at, self.fonts.large, TEMPERATURE_SCALE),
            None => add_unknown_temperature(&mut primary, temperature_at, self.fonts.large, TEMPERATURE_SCALE),
        }

        add_sun_event(
            &mut primary,
            now,
            snapshot.as_ref().and_then(|s| s.sunrise),
            snapshot.as_ref().and_then(|s| s.sunset),
            Point::new(w - PANEL_WIDTH + 10, 140),
            self.fonts.medium,
        );

        add_rain_chance(
            &mut primary,
            snapshot.as_ref().and_then(|s| s.current_precipitation_probability()),
            Point::new(w - PANEL_WIDTH + 10, 165),
            self.fonts.medium,
        );

        add_birthdays(
            &mut primary,
            self.birthdays.names_on(now.date_naive()),
            Rectangle::with_corners(Point::new(0, h - 100), Point::new(w, h)),
            self.fonts.medium,
            self.fonts.large,
        );

        add_weather_icon(
            &mut accent,
            snapshot.as_ref().and_then(|s| s.current_condition()),
            Point::new(w - 25, 115),
            ICON_SIZE,
            &mut self.jitter,
        );

        let mut primary = mask(primary, &accent)?;
        let mut accent = finish_accent(&accent, &self.display, &mut self.jitter);

        // Drawn after dithering so the text stays solid
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::overlap_count;
    use crate::snapshot::SnapshotStore;
    use crate::tiles::tests::FakeTiles;
    use crate::weather::tests::{FakeSun, FakeWeather};
    use crate::PointForecast;
    use chrono::{DateTime, Duration, FixedOffset};
    use tempfile::TempDir;

    fn fixed_now() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2024-06-05T12:00:00+01:00").unwrap()
    }

    const CENTRE: TileCoord = TileCoord { x: 63, y: 41, zoom: 7 };

    fn whole_grid() -> Vec<TileCoord> {
        (-2..=2)
            .flat_map(|dy| (-1..=1).map(move |dx| CENTRE.offset(dx, dy)))
            .collect()
    }

    fn dashboard(base_failures: Vec<TileCoord>) -> MapDashboard {
        dashboard_with_radar(base_failures, vec![CENTRE])
    }

    fn dashboard_with_radar(base_failures: Vec<TileCoord>, radar_failures: Vec<TileCoord>) -> MapDashboard {
        let centre = CENTRE;
        let display = DisplayConfig {
            jitter: false,
            ..DisplayConfig::default()
        };
        MapDashboard::new(
            display,
            centre,
            Box::new(FakeTiles::new(base_failures)),
            Box::new(FakeTiles::new(radar_failures)),
        )
        .with_clock(Box::new(fixed_now))
        .with_jitter(Jitter::Off)
    }

    #[test]
    fn builds_full_size_planes_without_any_data() {
        let mut dashboard = dashboard(vec![]);
        let pair = dashboard.build_images().unwrap();
        assert_eq!(pair.dimensions(), (528, 880));
        assert_eq!(pair.accent.dimensions(), (528, 880));
        assert_eq!(overlap_count(&pair.primary, &pair.accent).unwrap(), 0);

        // "?" placeholder lands in the cleared panel
        let panel_ink = (278..528)
            .flat_map(|x| (0..120).map(move |y| (x, y)))
            .filter(|&(x, y)| pair.primary.get(x, y) != Some(crate::raster::WHITE))
            .count();
        assert!(panel_ink > 0);
    }

    #[test]
    fn failed_tiles_do_not_abort_the_build() {
        let mut dashboard = dashboard(vec![CENTRE, CENTRE.offset(1, 1)]);
        let pair = dashboard.build_images().unwrap();
        assert_eq!(pair.dimensions(), (528, 880));
    }

    #[test]
    fn weather_icon_goes_to_accent_and_wins() {
        let dir = TempDir::new().unwrap();
        let now = fixed_now();
        let feed = WeatherFeed::new(
            Box::new(FakeWeather(Ok(vec![PointForecast {
                start_time: now,
                temperature: 21.4,
                precipitation_intensity: 3.0,
                precipitation_probability: 80.0,
                weather_code: 1000,
            }]))),
            Box::new(FakeSun(None)),
            SnapshotStore::new(dir.path()),
            0.0,
            0.0,
            Duration::minutes(15),
        );
        let mut dashboard = dashboard(vec![]).with_weather(Some(feed));
        let pair = dashboard.build_images().unwrap();

        let icon_ink = (453..503)
            .flat_map(|x| (115..165).map(move |y| (x, y)))
            .filter(|&(x, y)| pair.accent.get(x, y) != Some(crate::raster::WHITE))
            .count();
        assert!(icon_ink > 0, "sun icon drawn on accent");

        let rain_label_ink = (288..400)
            .flat_map(|x| (165..180).map(move |y| (x, y)))
            .filter(|&(x, y)| pair.primary.get(x, y) != Some(crate::raster::WHITE))
            .count();
        assert!(rain_label_ink > 0, "rain chance drawn under the sun event");
        assert_eq!(overlap_count(&pair.primary, &pair.accent).unwrap(), 0);
    }

    #[test]
    fn birthday_banner_is_drawn_on_matching_day() {
        let mut birthdays = BirthdayConfig::default();
        birthdays.0.insert("06-05".into(), vec!["Sam".into()]);
        // No radar, so nothing on the accent plane masks the banner
        let mut with = dashboard_with_radar(vec![], whole_grid()).with_birthdays(birthdays);
        let mut without = dashboard_with_radar(vec![], whole_grid());
        assert_ne!(
            with.build_images().unwrap().primary,
            without.build_images().unwrap().primary
        );
    }
}
