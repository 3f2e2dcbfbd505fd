//! # Configuration Management
//!
//! This module handles loading and parsing configuration from `inkboard.toml`.
//! The resulting [`Config`] is passed explicitly into every component at
//! construction; nothing reads global state.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "inkboard.toml";

/// Application configuration loaded from inkboard.toml
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub display: DisplayConfig,
    pub location: LocationConfig,
    pub weather: WeatherConfig,
    pub transit: TransitConfig,
    pub schedule: ScheduleConfig,
    pub storage: StorageConfig,
    pub birthdays: BirthdayConfig,
}

/// Panel geometry and rendering options shared by every dashboard.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Layer width in pixels
    pub width: u32,
    /// Layer height in pixels
    pub height: u32,
    /// Bitmap fonts used for annotations
    pub fonts: FontConfig,
    /// Dither the accent plane after masking
    pub halftone_accent: bool,
    /// Randomise icon position and dither phase to reduce burn-in
    pub jitter: bool,
}

/// Named bitmap fonts, e.g. `"6x10"`, `"9x15_bold"`, `"10x20"`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FontConfig {
    pub small: String,
    pub medium: String,
    pub large: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LocationConfig {
    pub latitude: f64,
    pub longitude: f64,
    /// Slippy-map zoom level for the map dashboard
    pub zoom: u8,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WeatherConfig {
    /// tomorrow.io API key; the weather feed is disabled when empty
    pub api_key: String,
    pub refresh_minutes: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransitConfig {
    pub username: String,
    pub password: String,
    /// Station CRS code, e.g. "SEV"; the transit feed is disabled when empty
    pub station: String,
    /// Only show departures whose destination contains this text
    pub destination_filter: Option<String>,
    pub max_departures: usize,
    pub refresh_minutes: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Minimum time between redraws
    pub update_interval_minutes: i64,
    /// How long the run loop sleeps between checks
    pub poll_seconds: u64,
    /// Blank the panel before each frame to limit ghosting
    pub clear_before_display: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding persisted snapshots
    pub data_dir: PathBuf,
    /// Directory holding stitched tile grids
    pub tile_cache_dir: PathBuf,
    /// Latest photo shown by the photo dashboard
    pub photo_path: PathBuf,
}

/// Birthdays keyed by `"MM-DD"`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(transparent)]
pub struct BirthdayConfig(pub BTreeMap<String, Vec<String>>);

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            width: 528,  // 3 tiles of 176px
            height: 880, // 5 tiles of 176px
            fonts: FontConfig::default(),
            halftone_accent: true,
            jitter: true,
        }
    }
}

impl DisplayConfig {
    /// Same options with different panel dimensions.
    pub fn with_size(&self, width: u32, height: u32) -> Self {
        DisplayConfig {
            width,
            height,
            ..self.clone()
        }
    }
}

impl Default for FontConfig {
    fn default() -> Self {
        FontConfig {
            small: "6x10".to_string(),
            medium: "9x15".to_string(),
            large: "10x20".to_string(),
        }
    }
}

impl Default for LocationConfig {
    fn default() -> Self {
        LocationConfig {
            latitude: 52.98,
            longitude: -2.28,
            zoom: 7,
        }
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        WeatherConfig {
            api_key: String::new(),
            refresh_minutes: 15,
        }
    }
}

impl Default for TransitConfig {
    fn default() -> Self {
        TransitConfig {
            username: String::new(),
            password: String::new(),
            station: String::new(),
            destination_filter: None,
            max_departures: 8,
            refresh_minutes: 5,
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        ScheduleConfig {
            update_interval_minutes: 10,
            poll_seconds: 30,
            clear_before_display: true,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            data_dir: PathBuf::from("data"),
            tile_cache_dir: PathBuf::from("temp"),
            photo_path: PathBuf::from("data/latest.jpg"),
        }
    }
}

impl BirthdayConfig {
    /// Names whose birthday falls on `date`.
    pub fn names_on(&self, date: NaiveDate) -> &[String] {
        let key = format!("{:02}-{:02}", date.month(), date.day());
        self.0.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl Config {
    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<Config>(&contents) {
                Ok(config) => {
                    tracing::info!(path = %path.display(), "loaded configuration");
                    config
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "invalid config file, using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                tracing::info!(path = %path.display(), "no config file found, using defaults");
                Self::default()
            }
        }
    }

    /// Save current configuration as pretty TOML
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path.as_ref(), contents)?;
        tracing::info!(path = %path.as_ref().display(), "configuration saved");
        Ok(())
    }
}
