//! # Raster Layers
//!
//! A [`RasterLayer`] is a fixed-size grid of RGBA pixels backed by an
//! [`image::RgbaImage`]. Each build cycle owns two of them (primary and accent)
//! with identical dimensions.
//!
//! Layers implement [`embedded_graphics::draw_target::DrawTarget`] so text,
//! primitives and glyphs are drawn with the regular `embedded-graphics` API.
//! Pixels outside the layer are silently clipped.

use std::convert::Infallible;

use embedded_graphics::{
    pixelcolor::{Rgb888, RgbColor},
    prelude::*,
    primitives::Rectangle,
};
use image::{imageops, RgbaImage};
use thiserror::Error;

/// One RGBA pixel.
pub type Rgba = image::Rgba<u8>;

/// Opaque white: the "no ink" value in both planes.
pub const WHITE: Rgba = image::Rgba([255, 255, 255, 255]);
/// Opaque black: the "ink" value in both planes.
pub const BLACK: Rgba = image::Rgba([0, 0, 0, 255]);
/// Fully transparent white, used as the canvas behind stitched tiles.
pub const CLEAR: Rgba = image::Rgba([255, 255, 255, 0]);

/// Errors raised when layers do not fit together.
///
/// Layer sizes are fixed per dashboard, so these are programmer errors rather
/// than runtime conditions to recover from.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayerError {
    #[error("layer dimensions differ: {left:?} vs {right:?}")]
    DimensionMismatch { left: (u32, u32), right: (u32, u32) },

    #[error("cannot allocate a {width}x{height} layer")]
    Allocation { width: u32, height: u32 },
}

/// Fixed-size RGBA pixel grid.
#[derive(Clone, Debug, PartialEq)]
pub struct RasterLayer {
    image: RgbaImage,
}

impl RasterLayer {
    /// Create an opaque white layer.
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, WHITE)
    }

    pub fn filled(width: u32, height: u32, color: Rgba) -> Self {
        Self {
            image: RgbaImage::from_pixel(width, height, color),
        }
    }

    /// Build a layer from raw pixels in row-major order.
    pub fn from_pixels(width: u32, height: u32, pixels: &[Rgba]) -> Result<Self, LayerError> {
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(LayerError::DimensionMismatch {
                left: (width, height),
                right: (pixels.len() as u32, 1),
            });
        }
        let raw: Vec<u8> = pixels.iter().flat_map(|p| p.0).collect();
        RgbaImage::from_raw(width, height, raw)
            .map(Self::from_image)
            .ok_or(LayerError::Allocation { width, height })
    }

    pub fn from_image(image: RgbaImage) -> Self {
        Self { image }
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Pixel at `(x, y)`, or `None` outside the layer.
    pub fn get(&self, x: u32, y: u32) -> Option<Rgba> {
        self.image.get_pixel_checked(x, y).copied()
    }

    /// Set a pixel; out-of-range coordinates are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, color: Rgba) {
        if let Some(pixel) = self.image.get_pixel_mut_checked(x, y) {
            *pixel = color;
        }
    }

    /// Pixels in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = &Rgba> {
        self.image.pixels()
    }

    pub fn pixels_mut(&mut self) -> impl Iterator<Item = &mut Rgba> {
        self.image.pixels_mut()
    }

    /// Fail with [`LayerError::DimensionMismatch`] unless both layers are the same size.
    pub fn ensure_same_size(&self, other: &RasterLayer) -> Result<(), LayerError> {
        if self.dimensions() != other.dimensions() {
            return Err(LayerError::DimensionMismatch {
                left: self.dimensions(),
                right: other.dimensions(),
            });
        }
        Ok(())
    }

    /// Paint every pixel of `area` (clipped to the layer) with `color`.
    pub fn fill_rect(&mut self, area: Rectangle, color: Rgba) {
        let clipped = area.intersection(&self.bounding_box());
        for point in clipped.points() {
            self.set_pixel(point.x as u32, point.y as u32, color);
        }
    }

    /// Copy `src` over this layer with its top-left at `(x, y)`, replacing pixels.
    pub fn paste(&mut self, src: &RasterLayer, x: i64, y: i64) {
        imageops::replace(&mut self.image, &src.image, x, y);
    }

    /// Blend `src` over this layer with its top-left at `(x, y)` using src alpha.
    pub fn alpha_composite(&mut self, src: &RasterLayer, x: i64, y: i64) {
        imageops::overlay(&mut self.image, &src.image, x, y);
    }

    /// Number of pixels that would put ink on the panel.
    pub fn ink_count(&self) -> usize {
        self.pixels().filter(|p| is_inked(p)).count()
    }
}

/// True for pure white, ignoring alpha.
pub fn is_white(pixel: &Rgba) -> bool {
    pixel[0] == 255 && pixel[1] == 255 && pixel[2] == 255
}

/// ITU-R 601 luma, the same weighting PIL uses for `L` conversion.
pub fn luma(pixel: &Rgba) -> u8 {
    let [r, g, b, _] = pixel.0;
    ((r as u32 * 299 + g as u32 * 587 + b as u32 * 114) / 1000) as u8
}

/// True if the pixel puts ink on the panel: visible and darker than mid-grey.
pub fn is_inked(pixel: &Rgba) -> bool {
    pixel[3] != 0 && luma(pixel) < 128
}

fn to_rgba(color: Rgb888) -> Rgba {
    image::Rgba([color.r(), color.g(), color.b(), 255])
}

impl OriginDimensions for RasterLayer {
    fn size(&self) -> Size {
        Size::new(self.width(), self.height())
    }
}

impl DrawTarget for RasterLayer {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if let (Ok(x), Ok(y)) = (u32::try_from(point.x), u32::try_from(point.y)) {
                self.set_pixel(x, y, to_rgba(color));
            }
        }
        Ok(())
    }
}

/// Draw target adapter that magnifies everything drawn through it.
///
/// Each pixel becomes a `factor`×`factor` block at `origin + point * factor`.
/// Used to render bitmap fonts far larger than their native size.
pub struct Scaled<'a, T> {
    target: &'a mut T,
    factor: u32,
    origin: Point,
}

impl<'a, T> Scaled<'a, T> {
    pub fn new(target: &'a mut T, factor: u32, origin: Point) -> Self {
        Self {
            target,
            factor: factor.max(1),
            origin,
        }
    }
}

impl<T: Dimensions> OriginDimensions for Scaled<'_, T> {
    fn size(&self) -> Size {
        self.target.bounding_box().size / self.factor
    }
}

impl<T: DrawTarget> DrawTarget for Scaled<'_, T> {
    type Color = T::Color;
    type Error = T::Error;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let block = Size::new_equal(self.factor);
        for Pixel(point, color) in pixels {
            let top_left = self.origin + point * self.factor as i32;
            self.target
                .fill_solid(&Rectangle::new(top_left, block), color)?;
        }
        Ok(())
    }
}
