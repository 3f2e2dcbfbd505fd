//! # End-to-End Pipeline Tests
//!
//! Each test builds a real dashboard with fake upstreams, pushes the frame
//! through a real sink and checks what lands on disk. No network is touched.

use std::io::Cursor;

use chrono::{DateTime, Duration, Utc};
use clap::Parser;
use image::{ImageFormat, RgbaImage};
use tempfile::TempDir;

use inkboard::config::{Config, DisplayConfig, ScheduleConfig};
use inkboard::dashboard::{Dashboard, JokeDashboard, MapDashboard, TransitBoard};
use inkboard::display::{LogIndicator, PackedPlanes, PngSink, Status};
use inkboard::http::{FetchError, HttpClient};
use inkboard::jitter::Jitter;
use inkboard::jokes::JokeSource;
use inkboard::layers::overlap_count;
use inkboard::runner::Runner;
use inkboard::snapshot::SnapshotStore;
use inkboard::tiles::{TileCoord, TileSource};
use inkboard::transit::{TransitFeed, TransitSource};
use inkboard::Departure;

use crate::{build_dashboard, load_config, Args, DashboardKind};

/// Serves the same tile for every coordinate.
struct SolidTiles {
    png: Vec<u8>,
}

impl SolidTiles {
    fn new(rgba: [u8; 4]) -> Self {
        let mut png = Vec::new();
        RgbaImage::from_pixel(256, 256, image::Rgba(rgba))
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .unwrap();
        Self { png }
    }
}

impl TileSource for SolidTiles {
    fn fetch_tile(&self, _coord: TileCoord) -> Result<Vec<u8>, FetchError> {
        Ok(self.png.clone())
    }
}

struct OfflineTiles;

impl TileSource for OfflineTiles {
    fn fetch_tile(&self, coord: TileCoord) -> Result<Vec<u8>, FetchError> {
        Err(FetchError::Status {
            url: format!("tile {}/{}", coord.x, coord.y),
            status: 503,
        })
    }
}

struct FixedDepartures(Vec<Departure>);

impl TransitSource for FixedDepartures {
    fn departures(&self, _station: &str) -> Result<Vec<Departure>, FetchError> {
        Ok(self.0.clone())
    }
}

struct Knock;

impl JokeSource for Knock {
    fn joke(&self) -> Result<String, FetchError> {
        Ok("Knock knock. Who's there? Cow says. Cow says who? No, cow says moo!".into())
    }
}

fn departure(time: &str, destination: &str, cancelled: bool) -> Departure {
    Departure {
        booked_departure: time.into(),
        realtime_departure: time.into(),
        origin: "Hastings".into(),
        destination: destination.into(),
        cancelled,
    }
}

fn clock() -> DateTime<chrono::FixedOffset> {
    DateTime::parse_from_rfc3339("2024-06-05T07:40:00+01:00").unwrap()
}

fn plain_display() -> DisplayConfig {
    DisplayConfig {
        jitter: false,
        ..DisplayConfig::default()
    }
}

const CENTRE: TileCoord = TileCoord { x: 63, y: 41, zoom: 7 };

#[test]
fn args_default_to_map_dashboard() {
    let args = Args::try_parse_from(["inkboard"]).unwrap();
    assert_eq!(args.dashboard, DashboardKind::Map);
    assert!(!args.once);
    assert!(!args.ascii);

    let args = Args::try_parse_from(["inkboard", "--dashboard", "photo", "--once", "--ascii"]).unwrap();
    assert_eq!(args.dashboard, DashboardKind::Photo);
    assert!(args.once && args.ascii);

    assert!(Args::try_parse_from(["inkboard", "--dashboard", "clock"]).is_err());
}

#[test]
fn config_comes_from_the_path_given_on_the_command_line() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("custom.toml");
    let mut saved = Config::default();
    saved.location.zoom = 11;
    saved.schedule.clear_before_display = false;
    saved.save(&path).unwrap();

    let args = Args::parse_from(["inkboard", "--config", path.to_str().unwrap()]);
    let config = load_config(&args);
    assert_eq!(config.location.zoom, 11);
    assert!(!config.schedule.clear_before_display);
}

#[test]
fn dashboards_are_selected_by_kind() {
    let config = Config::default();
    let http = HttpClient::new().unwrap();
    assert_eq!(build_dashboard(DashboardKind::Map, &config, &http).name(), "map");
    assert_eq!(build_dashboard(DashboardKind::Joke, &config, &http).name(), "joke");
    assert_eq!(build_dashboard(DashboardKind::Photo, &config, &http).name(), "photo");
}

#[test]
fn rain_everywhere_turns_the_map_red() {
    let mut dashboard = MapDashboard::new(
        plain_display(),
        CENTRE,
        Box::new(SolidTiles::new([0, 0, 0, 255])),
        Box::new(SolidTiles::new([0, 0, 255, 200])),
    )
    .with_clock(Box::new(clock))
    .with_jitter(Jitter::Off);

    let frame = dashboard.build_images().unwrap();
    assert_eq!(overlap_count(&frame.primary, &frame.accent).unwrap(), 0);

    let planes = PackedPlanes::from_layers(&frame.primary, &frame.accent).unwrap();
    // Dithered radar covers most of the map outside the weather panel
    assert!(planes.red_pixels() > 528 * 880 / 4);
    assert!(planes.black_pixels() > 0);
}

#[test]
fn offline_map_still_produces_a_frame() {
    let mut dashboard = MapDashboard::new(plain_display(), CENTRE, Box::new(OfflineTiles), Box::new(OfflineTiles))
        .with_clock(Box::new(clock))
        .with_jitter(Jitter::Off);

    let frame = dashboard.build_images().unwrap();
    assert_eq!(frame.dimensions(), (528, 880));
    assert_eq!(frame.accent.ink_count(), 0);
}

#[test]
fn cancelled_trains_show_in_red() {
    let dir = TempDir::new().unwrap();
    let feed = TransitFeed::new(
        Box::new(FixedDepartures(vec![
            departure("07:45", "London Charing Cross", false),
            departure("07:52", "London Cannon Street", true),
        ])),
        SnapshotStore::new(dir.path()),
        "SEV",
        Duration::minutes(5),
    );
    let board = TransitBoard::new(feed, 8, None);

    let mut dashboard = MapDashboard::new(plain_display(), CENTRE, Box::new(OfflineTiles), Box::new(OfflineTiles))
        .with_transit(Some(board))
        .with_clock(Box::new(clock))
        .with_jitter(Jitter::Off);

    let frame = dashboard.build_images().unwrap();
    assert!(frame.accent.ink_count() > 0, "cancelled departure drawn in red");
    assert!(frame.primary.ink_count() > 0);
    assert!(dir.path().join("transit_SEV.json").exists());
}

#[test]
fn runner_writes_joke_frame_to_disk() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("output");
    let dashboard = JokeDashboard::new(plain_display().with_size(880, 528), Box::new(Knock))
        .with_clock(Box::new(clock));

    let mut runner = Runner::new(
        Box::new(dashboard),
        Box::new(PngSink::new(&out)),
        Box::new(LogIndicator::default()),
        &ScheduleConfig::default(),
    );
    runner.run_cycle(Utc::now()).unwrap();

    let preview = image::open(out.join("preview.png")).unwrap().to_rgb8();
    assert_eq!(preview.dimensions(), (880, 528));
    assert!(preview.pixels().any(|p| p.0 == [255, 0, 0]));
    assert!(preview.pixels().any(|p| p.0 == [0, 0, 0]));

    let raw = std::fs::read(out.join("frame.bin")).unwrap();
    assert_eq!(raw.len(), 2 * 110 * 528);
    assert!(runner.schedule().last_drawn().is_some());
}

#[test]
fn indicator_starts_idle() {
    assert_eq!(LogIndicator::default().current(), Status::Idle);
}
