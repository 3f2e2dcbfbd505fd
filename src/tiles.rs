//! # Map Tiles and Grid Stitching
//!
//! Fetches a rectangular grid of slippy-map tiles around a centre tile and
//! stitches them into one contiguous raster.
//!
//! ## Grid Layout
//! For offsets `dx ∈ [-radius_cols, radius_cols]`, `dy ∈ [-radius_rows, radius_rows]`
//! the tile at `(centre.x + dx, centre.y + dy)` is resized to a square of
//! [`TILE_SIZE`] pixels (bicubic) and placed at column `dx + radius_cols`, row
//! `dy + radius_rows`. The default 3×5 grid yields a 528×880 raster.
//!
//! ## Failure Handling
//! A tile that fails to download or decode is logged and skipped; its cell keeps
//! the transparent white canvas. A partial grid is a valid result.
//!
//! ## Caching
//! A stitched grid can be cached on disk keyed by `(cache_name, x, y, zoom)` of
//! the centre tile. Only complete grids are written, so a transient failure is
//! not preserved across runs.

use std::f64::consts::PI;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, DurationRound, Timelike, Utc};
use image::imageops::{self, FilterType};

use crate::http::{FetchError, HttpClient};
use crate::raster::{RasterLayer, CLEAR};

/// Edge length of each tile after resizing.
pub const TILE_SIZE: u32 = 176;

/// Address of one slippy-map tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TileCoord {
    pub x: i64,
    pub y: i64,
    pub zoom: u8,
}

impl TileCoord {
    pub fn offset(self, dx: i64, dy: i64) -> Self {
        TileCoord {
            x: self.x + dx,
            y: self.y + dy,
            zoom: self.zoom,
        }
    }
}

/// Web-Mercator tile containing `(lat, lon)` at `zoom`.
pub fn deg_to_tile(lat_deg: f64, lon_deg: f64, zoom: u8) -> TileCoord {
    let lat_rad = lat_deg.to_radians();
    let n = 2f64.powi(zoom as i32);
    let x = ((lon_deg + 180.0) / 360.0 * n).floor() as i64;
    let y = ((1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n).floor() as i64;
    TileCoord { x, y, zoom }
}

/// Most recent radar frame expected to be published at `now`.
///
/// Truncates to the minute, steps back 10 minutes for publication lag, then
/// rounds down to a 10-minute boundary.
pub fn radar_update_time(now: DateTime<Utc>) -> DateTime<Utc> {
    let lagged = now
        .duration_trunc(Duration::minutes(1))
        .unwrap_or(now)
        - Duration::minutes(10);
    lagged - Duration::minutes(i64::from(lagged.minute() % 10))
}

/// Tile servers the dashboards know how to address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TileLayer {
    /// High-contrast black/white base map
    Toner,
    /// Met Office UK rainfall radar composite for the latest frame
    MetOfficeRadar,
    /// OpenWeatherMap precipitation overlay
    OpenWeatherPrecipitation { api_key: String },
}

impl TileLayer {
    pub fn url(&self, coord: TileCoord, now: DateTime<Utc>) -> String {
        let TileCoord { x, y, zoom } = coord;
        match self {
            TileLayer::Toner => format!("http://a.tile.stamen.com/toner/{zoom}/{x}/{y}.png"),
            TileLayer::MetOfficeRadar => format!(
                "https://www.metoffice.gov.uk/public/data/LayerCache/OBSERVATIONS/ItemBbox/RADAR_UK_Composite_Highres/{x}/{y}/{zoom}/png?TIME={}Z",
                radar_update_time(now).format("%Y-%m-%dT%H:%M:%S")
            ),
            TileLayer::OpenWeatherPrecipitation { api_key } => format!(
                "https://tile.openweathermap.org/map/precipitation_new/{zoom}/{x}/{y}.png?appid={api_key}"
            ),
        }
    }
}

/// Anything that can hand back the encoded image bytes of a tile.
pub trait TileSource {
    fn fetch_tile(&self, coord: TileCoord) -> Result<Vec<u8>, FetchError>;
}

/// [`TileSource`] backed by HTTP.
#[derive(Clone)]
pub struct HttpTiles {
    http: HttpClient,
    layer: TileLayer,
}

impl HttpTiles {
    pub fn new(http: HttpClient, layer: TileLayer) -> Self {
        Self { http, layer }
    }
}

impl TileSource for HttpTiles {
    fn fetch_tile(&self, coord: TileCoord) -> Result<Vec<u8>, FetchError> {
        let url = self.layer.url(coord, Utc::now());
        tracing::debug!(%url, "fetching tile");
        self.http.fetch_bytes(self.http.get(&url))
    }
}

/// Shape of a stitched grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridSpec {
    pub radius_cols: u32,
    pub radius_rows: u32,
    pub tile_size: u32,
}

impl Default for GridSpec {
    fn default() -> Self {
        GridSpec {
            radius_cols: 1,
            radius_rows: 2,
            tile_size: TILE_SIZE,
        }
    }
}

impl GridSpec {
    pub fn columns(&self) -> u32 {
        2 * self.radius_cols + 1
    }

    pub fn rows(&self) -> u32 {
        2 * self.radius_rows + 1
    }

    /// Output raster size in pixels.
    pub fn pixel_size(&self) -> (u32, u32) {
        (
            self.columns() * self.tile_size,
            self.rows() * self.tile_size,
        )
    }
}

/// On-disk cache of stitched grids.
#[derive(Clone, Debug)]
pub struct TileCache {
    dir: PathBuf,
}

impl TileCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self, name: &str, centre: TileCoord) -> PathBuf {
        self.dir
            .join(format!("{name}_{}_{}_{}.png", centre.x, centre.y, centre.zoom))
    }

    pub fn load(&self, name: &str, centre: TileCoord) -> Option<RasterLayer> {
        let path = self.path(name, centre);
        if !path.is_file() {
            return None;
        }
        match image::open(&path) {
            Ok(image) => Some(RasterLayer::from_image(image.to_rgba8())),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "unreadable tile cache entry");
                None
            }
        }
    }

    /// Write a stitched grid, creating the cache directory first if needed.
    pub fn store(&self, name: &str, centre: TileCoord, layer: &RasterLayer) -> Result<(), FetchError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path(name, centre);
        layer
            .as_image()
            .save(&path)
            .map_err(|e| FetchError::Io(io::Error::other(e)))?;
        tracing::debug!(path = %path.display(), "cached stitched grid");
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Cache lookup key for [`stitch`].
pub struct CacheKey<'a> {
    pub cache: &'a TileCache,
    pub name: &'a str,
}

/// Fetch and stitch the grid around `centre`.
///
/// Always returns a raster of exactly [`GridSpec::pixel_size`], whatever
/// number of tiles failed.
pub fn stitch(
    centre: TileCoord,
    spec: GridSpec,
    source: &dyn TileSource,
    cache: Option<CacheKey<'_>>,
) -> RasterLayer {
    if let Some(key) = &cache {
        if let Some(layer) = key.cache.load(key.name, centre) {
            if layer.dimensions() == spec.pixel_size() {
                tracing::debug!(name = key.name, "using cached tile grid");
                return layer;
            }
        }
    }

    let (width, height) = spec.pixel_size();
    let mut grid = RasterLayer::filled(width, height, CLEAR);
    let mut failures = 0usize;

    let (rc, rr) = (spec.radius_cols as i64, spec.radius_rows as i64);
    for dy in -rr..=rr {
        for dx in -rc..=rc {
            let coord = centre.offset(dx, dy);
            match fetch_resized(source, coord, spec.tile_size) {
                Ok(tile) => {
                    let col = (dx + rc) * spec.tile_size as i64;
                    let row = (dy + rr) * spec.tile_size as i64;
                    grid.paste(&tile, col, row);
                }
                Err(e) => {
                    failures += 1;
                    tracing::warn!(x = coord.x, y = coord.y, zoom = coord.zoom, error = %e, "tile download failed");
                }
            }
        }
    }

    if failures > 0 {
        tracing::info!(failures, "stitched partial tile grid");
    } else if let Some(key) = cache {
        if let Err(e) = key.cache.store(key.name, centre, &grid) {
            tracing::warn!(error = %e, "could not cache tile grid");
        }
    }

    grid
}

fn fetch_resized(source: &dyn TileSource, coord: TileCoord, size: u32) -> Result<RasterLayer, FetchError> {
    let bytes = source.fetch_tile(coord)?;
    let tile = image::load_from_memory(&bytes)?.to_rgba8();
    // Catmull-Rom is the bicubic kernel
    let resized = imageops::resize(&tile, size, size, FilterType::CatmullRom);
    Ok(RasterLayer::from_image(resized))
}
