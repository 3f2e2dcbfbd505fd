//! # Layer Operations
//!
//! The pixel-level rules that turn arbitrary rasters into the two planes a
//! black/red e-ink panel can show:
//!
//! - [`threshold`]: alpha → strict black/white
//! - [`threshold_luma`]: brightness → strict black/white (photos)
//! - [`mask`]: remove from the bottom plane every pixel the top plane inks
//! - [`halftone`] / [`halftone_jittered`]: fixed diagonal dither
//!
//! All operations are pure over pixel buffers except [`mask`], which consumes
//! and returns the bottom layer.

use crate::jitter::Jitter;
use crate::raster::{is_white, luma, LayerError, RasterLayer, Rgba, BLACK, WHITE};

/// Convert an alpha raster into a bi-level bitmap.
///
/// Pixels with `alpha <= cutoff` become white, all others black. A cutoff of 0
/// whitens only fully transparent pixels. Output pixels are opaque.
pub fn threshold(image: &RasterLayer, cutoff: u8) -> Result<RasterLayer, LayerError> {
    map_pixels(image, |pixel| if pixel[3] <= cutoff { WHITE } else { BLACK })
}

/// Convert an opaque image into a bi-level bitmap by brightness.
///
/// Pixels with luma `>= cutoff` (or fully transparent) become white.
pub fn threshold_luma(image: &RasterLayer, cutoff: u8) -> Result<RasterLayer, LayerError> {
    map_pixels(image, |pixel| {
        if pixel[3] == 0 || luma(pixel) >= cutoff {
            WHITE
        } else {
            BLACK
        }
    })
}

/// Subtract `top` from `bottom`: wherever `top` is not pure white, `bottom` is
/// forced to white. Untouched elsewhere.
///
/// Callers use this to guarantee no pixel is inked in both planes, with the
/// top (accent) plane winning every conflict.
pub fn mask(mut bottom: RasterLayer, top: &RasterLayer) -> Result<RasterLayer, LayerError> {
    bottom.ensure_same_size(top)?;
    for (pixel, over) in bottom.pixels_mut().zip(top.pixels()) {
        if !is_white(over) {
            *pixel = WHITE;
        }
    }
    Ok(bottom)
}

/// Count positions where both layers carry a non-white pixel.
pub fn overlap_count(a: &RasterLayer, b: &RasterLayer) -> Result<usize, LayerError> {
    a.ensure_same_size(b)?;
    Ok(a.pixels()
        .zip(b.pixels())
        .filter(|(p, q)| !is_white(p) && !is_white(q))
        .count())
}

/// Diagonal dither: every other pixel forced white.
///
/// Walks pixels in row-major order with a flag starting `false`. The flag is
/// toggled after every pixel except the first of each row, so each row
/// continues from the previous row's final state. Pixels visited while the flag
/// is set become white; the rest pass through.
pub fn halftone(image: &RasterLayer) -> RasterLayer {
    halftone_from(image, false)
}

/// [`halftone`] with the starting flag drawn from `jitter`, shifting the
/// pattern by one pixel between refreshes.
pub fn halftone_jittered(image: &RasterLayer, jitter: &mut Jitter) -> RasterLayer {
    halftone_from(image, jitter.coin())
}

fn halftone_from(image: &RasterLayer, start: bool) -> RasterLayer {
    let width = image.width().max(1) as usize;
    let mut out = image.clone();
    let mut flip = start;
    for (i, pixel) in out.pixels_mut().enumerate() {
        if flip {
            *pixel = WHITE;
        }
        if i % width != 0 {
            flip = !flip;
        }
    }
    out
}

fn map_pixels(
    image: &RasterLayer,
    f: impl Fn(&Rgba) -> Rgba,
) -> Result<RasterLayer, LayerError> {
    let (width, height) = image.dimensions();
    let len = width as usize * height as usize;
    let mut pixels = Vec::new();
    pixels
        .try_reserve_exact(len)
        .map_err(|_| LayerError::Allocation { width, height })?;
    pixels.extend(image.pixels().map(f));
    RasterLayer::from_pixels(width, height, &pixels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba as Px;

    fn layer(width: u32, rows: &[&[Rgba]]) -> RasterLayer {
        let pixels: Vec<Rgba> = rows.iter().flat_map(|r| r.iter().copied()).collect();
        RasterLayer::from_pixels(width, rows.len() as u32, &pixels).unwrap()
    }

    #[test]
    fn threshold_scenario_single_pixel() {
        let image = layer(1, &[&[Px([10, 20, 30, 10])]]);
        assert_eq!(threshold(&image, 20).unwrap().get(0, 0), Some(WHITE));
        assert_eq!(threshold(&image, 5).unwrap().get(0, 0), Some(BLACK));
    }

    #[test]
    fn threshold_zero_only_whitens_transparent() {
        let image = layer(2, &[&[Px([0, 0, 0, 0]), Px([255, 255, 255, 1])]]);
        let out = threshold(&image, 0).unwrap();
        assert_eq!(out.get(0, 0), Some(WHITE));
        assert_eq!(out.get(1, 0), Some(BLACK));
    }

    #[test]
    fn threshold_luma_splits_on_brightness() {
        let image = layer(
            3,
            &[&[Px([200, 200, 200, 255]), Px([40, 40, 40, 255]), Px([0, 0, 0, 0])]],
        );
        let out = threshold_luma(&image, 128).unwrap();
        assert_eq!(out.get(0, 0), Some(WHITE));
        assert_eq!(out.get(1, 0), Some(BLACK));
        assert_eq!(out.get(2, 0), Some(WHITE));
    }

    #[test]
    fn mask_scenario_two_by_two() {
        let top = layer(2, &[&[WHITE, WHITE], &[BLACK, WHITE]]);
        let bottom = layer(2, &[&[BLACK, BLACK], &[BLACK, BLACK]]);
        let out = mask(bottom, &top).unwrap();
        assert_eq!(out, layer(2, &[&[BLACK, BLACK], &[WHITE, BLACK]]));
    }

    #[test]
    fn mask_whitens_under_any_non_white_top() {
        // Pure red and cyan both count as ink; only pure white lets bottom through
        let top = layer(3, &[&[Px([255, 0, 0, 255]), Px([0, 255, 255, 255]), WHITE]]);
        let bottom = layer(3, &[&[BLACK, BLACK, BLACK]]);
        let out = mask(bottom, &top).unwrap();
        assert_eq!(out.get(0, 0), Some(WHITE));
        assert_eq!(out.get(1, 0), Some(WHITE));
        assert_eq!(out.get(2, 0), Some(BLACK));
        assert_eq!(overlap_count(&out, &top).unwrap(), 0);
    }

    #[test]
    fn mask_rejects_mismatched_layers() {
        let err = mask(RasterLayer::new(2, 2), &RasterLayer::new(3, 2)).unwrap_err();
        assert_eq!(
            err,
            LayerError::DimensionMismatch {
                left: (2, 2),
                right: (3, 2)
            }
        );
    }

    #[test]
    fn overlap_count_finds_shared_ink() {
        let a = layer(3, &[&[BLACK, BLACK, WHITE]]);
        let b = layer(3, &[&[BLACK, WHITE, BLACK]]);
        assert_eq!(overlap_count(&a, &b).unwrap(), 1);
        let masked = mask(a, &b).unwrap();
        assert_eq!(overlap_count(&masked, &b).unwrap(), 0);
    }

    #[test]
    fn halftone_carries_flag_across_rows() {
        // 3x3 all black. Flag sequence per pixel index:
        // i=0 f=F (no toggle) | i=1 F->T | i=2 T->F
        // i=3 F (no toggle)   | i=4 F->T | i=5 T->F
        // ...so column 0 and 1 stay black, column 2 turns white
        let image = RasterLayer::filled(3, 3, BLACK);
        let out = halftone(&image);
        for y in 0..3 {
            assert_eq!(out.get(0, y), Some(BLACK), "row {y} col 0");
            assert_eq!(out.get(1, y), Some(BLACK), "row {y} col 1");
            assert_eq!(out.get(2, y), Some(WHITE), "row {y} col 2");
        }
    }

    #[test]
    fn halftone_even_width_shifts_each_row() {
        let image = RasterLayer::filled(4, 2, BLACK);
        let out = halftone(&image);
        let row = |y| (0..4).map(|x| out.get(x, y) == Some(WHITE)).collect::<Vec<_>>();
        // i=0 F, i=1 F, i=2 T, i=3 F, then flag is T entering row 1 (no toggle at i=4)
        assert_eq!(row(0), vec![false, false, true, false]);
        assert_eq!(row(1), vec![true, true, false, true]);
    }

    #[test]
    fn halftone_never_adds_ink() {
        let image = layer(2, &[&[WHITE, WHITE], &[WHITE, WHITE]]);
        assert_eq!(halftone(&image), image);
    }

    #[test]
    fn jittered_halftone_is_either_pattern() {
        let image = RasterLayer::filled(5, 4, BLACK);
        let plain = halftone(&image);
        let inverted = halftone_from(&image, true);
        let mut jitter = Jitter::seeded(7);
        for _ in 0..8 {
            let out = halftone_jittered(&image, &mut jitter);
            assert!(out == plain || out == inverted);
        }
        assert_eq!(halftone_jittered(&image, &mut Jitter::Off), plain);
    }
}
