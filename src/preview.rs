//! ASCII preview of a frame, for developing dashboards without a panel.
//!
//! Each character covers a block of pixels twice as tall as it is wide. A
//! block shows `r` if any pixel in it is red, `#` if any is black, and a space
//! otherwise.

use crate::display::{DisplayError, DisplaySink};
use crate::raster::{is_inked, RasterLayer};

/// Default preview width in characters.
pub const DEFAULT_COLUMNS: u32 = 88;

/// Render both planes as text, `columns` characters wide.
pub fn render_ascii(primary: &RasterLayer, accent: &RasterLayer, columns: u32) -> Result<String, DisplayError> {
    if primary.dimensions() != accent.dimensions() {
        return Err(DisplayError::Dimension {
            primary: primary.dimensions(),
            accent: accent.dimensions(),
        });
    }
    let (width, height) = primary.dimensions();
    let block_w = width.div_ceil(columns.max(1)).max(1);
    let block_h = block_w * 2;

    let mut out = String::new();
    for top in (0..height).step_by(block_h as usize) {
        for left in (0..width).step_by(block_w as usize) {
            let block = (top..(top + block_h).min(height))
                .flat_map(|y| (left..(left + block_w).min(width)).map(move |x| (x, y)));
            let mut cell = ' ';
            for (x, y) in block {
                if accent.get(x, y).is_some_and(|p| is_inked(&p)) {
                    cell = 'r';
                    break;
                }
                if primary.get(x, y).is_some_and(|p| is_inked(&p)) {
                    cell = '#';
                }
            }
            out.push(cell);
        }
        out.push('\n');
    }
    Ok(out)
}

/// Sink that prints every frame to stdout.
pub struct AsciiSink {
    columns: u32,
}

impl AsciiSink {
    pub fn new(columns: u32) -> Self {
        Self { columns }
    }
}

impl Default for AsciiSink {
    fn default() -> Self {
        Self::new(DEFAULT_COLUMNS)
    }
}

impl DisplaySink for AsciiSink {
    fn init(&mut self) -> Result<(), DisplayError> {
        Ok(())
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        Ok(())
    }

    fn display(&mut self, primary: &RasterLayer, accent: &RasterLayer) -> Result<(), DisplayError> {
        let text = render_ascii(primary, accent, self.columns)?;
        let (width, height) = primary.dimensions();
        println!("┌ {width}x{height} ┐");
        print!("{text}");
        Ok(())
    }

    fn sleep(&mut self) -> Result<(), DisplayError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::BLACK;

    #[test]
    fn blocks_are_downsampled() {
        let mut primary = RasterLayer::new(8, 4);
        primary.set_pixel(0, 0, BLACK);
        let mut accent = RasterLayer::new(8, 4);
        accent.set_pixel(7, 3, BLACK);

        // 4 columns → 2px wide, 4px tall blocks → one row of text
        let text = render_ascii(&primary, &accent, 4).unwrap();
        assert_eq!(text, "#  r\n");
    }

    #[test]
    fn red_takes_priority_within_a_block() {
        let primary = RasterLayer::filled(2, 4, BLACK);
        let mut accent = RasterLayer::new(2, 4);
        accent.set_pixel(1, 3, BLACK);
        assert_eq!(render_ascii(&primary, &accent, 1).unwrap(), "r\n");
    }

    #[test]
    fn blank_frame_is_all_spaces() {
        let blank = RasterLayer::new(10, 10);
        let text = render_ascii(&blank, &blank, 5).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert!(text.chars().all(|c| c == ' ' || c == '\n'));
    }
}
