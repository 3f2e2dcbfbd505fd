//! # Display Sinks
//!
//! Where finished frames go. A [`DisplaySink`] receives the primary (black) and
//! accent (red) planes of one refresh; the dashboards never see it.
//!
//! ## Panel Buffers
//! Two-colour Waveshare panels take one bit per pixel per plane, most
//! significant bit first, each row padded to a whole byte:
//! - black plane: `0` = black ink, `1` = white
//! - red plane: `1` = red ink, `0` = white
//!
//! [`PackedPlanes`] converts a pair of [`RasterLayer`]s into that layout.
//!
//! ## Sinks
//! - [`PngSink`]: writes the planes as PNG files plus a packed `frame.bin`
//! - [`crate::preview::AsciiSink`]: prints a terminal preview
//!
//! ## Status
//! A [`StatusIndicator`] mirrors the run state (idle, busy, error), in the
//! spirit of a status LED next to the panel.

use std::fs;
use std::path::{Path, PathBuf};

use image::RgbImage;
use thiserror::Error;

use crate::raster::{is_inked, RasterLayer};

/// Errors raised while pushing a frame to a sink.
#[derive(Error, Debug)]
pub enum DisplayError {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("image encode failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("plane dimensions differ: primary {primary:?}, accent {accent:?}")]
    Dimension {
        primary: (u32, u32),
        accent: (u32, u32),
    },

    /// The output device rejected the frame
    #[error("display device error: {0}")]
    Device(String),
}

/// Something that can show a two-plane frame.
pub trait DisplaySink {
    /// Prepare the device. Called before every frame.
    fn init(&mut self) -> Result<(), DisplayError>;

    /// Blank the device to white.
    fn clear(&mut self) -> Result<(), DisplayError>;

    fn display(&mut self, primary: &RasterLayer, accent: &RasterLayer) -> Result<(), DisplayError>;

    /// Park the device until the next frame.
    fn sleep(&mut self) -> Result<(), DisplayError>;
}

/// Display buffer for a black/white/red panel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackedPlanes {
    width: u32,
    height: u32,
    black: Vec<u8>,
    red: Vec<u8>,
}

impl PackedPlanes {
    /// All-white buffers of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        let buffer_size = (width.div_ceil(8) * height) as usize;
        Self {
            width,
            height,
            black: vec![0xFF; buffer_size],
            red: vec![0x00; buffer_size],
        }
    }

    /// Pack both planes. A pixel inked in both shows red.
    pub fn from_layers(primary: &RasterLayer, accent: &RasterLayer) -> Result<Self, DisplayError> {
        if primary.dimensions() != accent.dimensions() {
            return Err(DisplayError::Dimension {
                primary: primary.dimensions(),
                accent: accent.dimensions(),
            });
        }
        let (width, height) = primary.dimensions();
        let mut planes = Self::new(width, height);
        let cells = primary.pixels().zip(accent.pixels());
        for (i, (black, red)) in cells.enumerate() {
            let (x, y) = (i as u32 % width, i as u32 / width);
            if is_inked(red) {
                planes.set_red(x, y);
            } else if is_inked(black) {
                planes.set_black(x, y);
            }
        }
        Ok(planes)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn black_buffer(&self) -> &[u8] {
        &self.black
    }

    pub fn red_buffer(&self) -> &[u8] {
        &self.red
    }

    /// Black ink pixels (zero bits in the black plane, ignoring row padding).
    pub fn black_pixels(&self) -> usize {
        self.count_bits(&self.black, false)
    }

    /// Red ink pixels (one bits in the red plane).
    pub fn red_pixels(&self) -> usize {
        self.count_bits(&self.red, true)
    }

    fn index(&self, x: u32, y: u32) -> (usize, u8) {
        let bytes_per_row = self.width.div_ceil(8);
        ((y * bytes_per_row + x / 8) as usize, 0x80 >> (x % 8))
    }

    fn set_black(&mut self, x: u32, y: u32) {
        let (byte, mask) = self.index(x, y);
        self.black[byte] &= !mask;
        self.red[byte] &= !mask;
    }

    fn set_red(&mut self, x: u32, y: u32) {
        let (byte, mask) = self.index(x, y);
        self.black[byte] |= mask;
        self.red[byte] |= mask;
    }

    fn count_bits(&self, plane: &[u8], ink: bool) -> usize {
        (0..self.height)
            .flat_map(|y| (0..self.width).map(move |x| (x, y)))
            .filter(|&(x, y)| {
                let (byte, mask) = self.index(x, y);
                (plane[byte] & mask != 0) == ink
            })
            .count()
    }
}

/// Composite of both planes as the panel would show it: black, red or white.
pub fn preview_image(primary: &RasterLayer, accent: &RasterLayer) -> Result<RgbImage, DisplayError> {
    let planes = PackedPlanes::from_layers(primary, accent)?;
    Ok(RgbImage::from_fn(planes.width, planes.height, |x, y| {
        let (byte, mask) = planes.index(x, y);
        if planes.red[byte] & mask != 0 {
            image::Rgb([255, 0, 0])
        } else if planes.black[byte] & mask == 0 {
            image::Rgb([0, 0, 0])
        } else {
            image::Rgb([255, 255, 255])
        }
    }))
}

/// Writes every frame into a directory, replacing the previous one:
/// `primary.png`, `accent.png`, `preview.png` and the packed `frame.bin`
/// (black buffer followed by red buffer).
pub struct PngSink {
    dir: PathBuf,
    last_size: Option<(u32, u32)>,
}

impl PngSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            last_size: None,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn write_frame(&self, primary: &RasterLayer, accent: &RasterLayer) -> Result<(), DisplayError> {
        let planes = PackedPlanes::from_layers(primary, accent)?;
        primary.as_image().save(self.dir.join("primary.png"))?;
        accent.as_image().save(self.dir.join("accent.png"))?;
        preview_image(primary, accent)?.save(self.dir.join("preview.png"))?;

        let mut raw = Vec::with_capacity(planes.black.len() * 2);
        raw.extend_from_slice(planes.black_buffer());
        raw.extend_from_slice(planes.red_buffer());
        fs::write(self.dir.join("frame.bin"), raw)?;

        tracing::info!(
            dir = %self.dir.display(),
            black = planes.black_pixels(),
            red = planes.red_pixels(),
            "frame written"
        );
        Ok(())
    }
}

impl DisplaySink for PngSink {
    fn init(&mut self) -> Result<(), DisplayError> {
        fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        let Some((width, height)) = self.last_size else {
            return Ok(());
        };
        let blank = RasterLayer::new(width, height);
        self.write_frame(&blank, &blank)
    }

    fn display(&mut self, primary: &RasterLayer, accent: &RasterLayer) -> Result<(), DisplayError> {
        self.write_frame(primary, accent)?;
        self.last_size = Some(primary.dimensions());
        Ok(())
    }

    fn sleep(&mut self) -> Result<(), DisplayError> {
        Ok(())
    }
}

/// Run state shown next to the panel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Idle,
    Busy,
    Error,
}

pub trait StatusIndicator {
    fn set(&mut self, status: Status);
}

/// Indicator that only logs state changes.
#[derive(Debug)]
pub struct LogIndicator {
    current: Status,
}

impl Default for LogIndicator {
    fn default() -> Self {
        Self {
            current: Status::Idle,
        }
    }
}

impl LogIndicator {
    pub fn current(&self) -> Status {
        self.current
    }
}

impl StatusIndicator for LogIndicator {
    fn set(&mut self, status: Status) {
        if status != self.current {
            match status {
                Status::Error => tracing::warn!(from = ?self.current, to = ?status, "status changed"),
                _ => tracing::debug!(from = ?self.current, to = ?status, "status changed"),
            }
        }
        self.current = status;
    }
}
