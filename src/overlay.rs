//! # Overlay Annotations
//!
//! Each function here draws one kind of annotation onto a layer: text, a
//! glyph, a cleared box, a graph. Dashboards call them in a fixed order, and a
//! later annotation may overwrite pixels of an earlier one.
//!
//! ## Conventions
//! - Ink is always black on a white plane; which physical colour it becomes
//!   depends only on the layer it is drawn into.
//! - Absent data (`None`, empty lists) leaves the layer untouched.
//! - Output is deterministic except for [`add_weather_icon`], whose position
//!   is nudged by the caller's [`Jitter`].
//! - Text positions are the top-left corner of the text box.

use chrono::{DateTime, FixedOffset};
use embedded_graphics::{
    mono_font::{ascii, MonoFont, MonoTextStyle},
    pixelcolor::{Rgb888, RgbColor},
    prelude::*,
    primitives::{Line, PrimitiveStyle, Rectangle},
    text::{Baseline, Text},
};

use crate::config::FontConfig;
use crate::glyphs::{draw_glyph, Glyph};
use crate::jitter::Jitter;
use crate::raster::{LayerError, RasterLayer, Scaled, WHITE};
use crate::weather::condition_glyph;
use crate::{Departure, PointForecast};

/// Ink colour for annotations.
pub const INK: Rgb888 = Rgb888::BLACK;
/// Maximum random nudge, in pixels, applied to the weather icon on each axis.
pub const ICON_JITTER: u32 = 10;
/// Precipitation intensity (mm/h) that fills the graph to the top.
pub const PRECIPITATION_CAP: f64 = 25.0;
/// Suffix appended to cancelled departures.
pub const CANCELLED_SUFFIX: &str = " CANCL";

/// Bitmap fonts resolved from [`FontConfig`] names.
#[derive(Clone, Copy)]
pub struct Fonts {
    pub small: &'static MonoFont<'static>,
    pub medium: &'static MonoFont<'static>,
    pub large: &'static MonoFont<'static>,
}

impl Default for Fonts {
    fn default() -> Self {
        Fonts::from_config(&FontConfig::default())
    }
}

impl Fonts {
    pub fn from_config(config: &FontConfig) -> Self {
        Fonts {
            small: resolve_font(&config.small, &ascii::FONT_6X10),
            medium: resolve_font(&config.medium, &ascii::FONT_9X15),
            large: resolve_font(&config.large, &ascii::FONT_10X20),
        }
    }
}

/// Look up a built-in font by name such as `"6x10"` or `"9x15_bold"`.
pub fn font_by_name(name: &str) -> Option<&'static MonoFont<'static>> {
    let font = match name.to_ascii_lowercase().as_str() {
        "4x6" => &ascii::FONT_4X6,
        "5x7" => &ascii::FONT_5X7,
        "5x8" => &ascii::FONT_5X8,
        "6x9" => &ascii::FONT_6X9,
        "6x10" => &ascii::FONT_6X10,
        "6x12" => &ascii::FONT_6X12,
        "6x13" => &ascii::FONT_6X13,
        "6x13_bold" => &ascii::FONT_6X13_BOLD,
        "7x13" => &ascii::FONT_7X13,
        "7x13_bold" => &ascii::FONT_7X13_BOLD,
        "7x14" => &ascii::FONT_7X14,
        "7x14_bold" => &ascii::FONT_7X14_BOLD,
        "8x13" => &ascii::FONT_8X13,
        "8x13_bold" => &ascii::FONT_8X13_BOLD,
        "9x15" => &ascii::FONT_9X15,
        "9x15_bold" => &ascii::FONT_9X15_BOLD,
        "9x18" => &ascii::FONT_9X18,
        "9x18_bold" => &ascii::FONT_9X18_BOLD,
        "10x20" => &ascii::FONT_10X20,
        _ => return None,
    };
    Some(font)
}

fn resolve_font(name: &str, fallback: &'static MonoFont<'static>) -> &'static MonoFont<'static> {
    font_by_name(name).unwrap_or_else(|| {
        tracing::warn!(font = name, "unknown font, using fallback");
        fallback
    })
}

/// Size of `text` rendered in `font` on a single line.
pub fn text_size(font: &MonoFont<'_>, text: &str) -> Size {
    let chars = text.chars().count() as u32;
    let width = chars * font.character_size.width + chars.saturating_sub(1) * font.character_spacing;
    Size::new(width, font.character_size.height)
}

/// Draw `text` with its top-left corner at `top_left`.
pub fn add_text(layer: &mut RasterLayer, text: &str, top_left: Point, font: &MonoFont<'_>, color: Rgb888) {
    let style = MonoTextStyle::new(font, color);
    Text::with_baseline(text, top_left, style, Baseline::Top)
        .draw(layer)
        .ok();
}

/// Paint `area` white.
pub fn clear_rect(layer: &mut RasterLayer, area: Rectangle) {
    layer.fill_rect(area, WHITE);
}

/// Current time as `"Sat, 19:37"`.
pub fn add_time(
    layer: &mut RasterLayer,
    now: DateTime<FixedOffset>,
    top_left: Point,
    font: &MonoFont<'_>,
    color: Rgb888,
) {
    add_text(layer, &now.format("%a, %H:%M").to_string(), top_left, font, color);
}

/// Whole degrees, truncated toward zero.
pub fn format_temperature(celsius: f64) -> String {
    format!("{}", celsius.trunc() as i64)
}

/// Percentage with one decimal place, e.g. `"12.3%"`.
pub fn format_percentage(value: f64) -> String {
    format!("{value:.1}%")
}

/// `"Rain 35.0%"`: chance of precipitation. `None` draws nothing.
pub fn add_rain_chance(layer: &mut RasterLayer, probability: Option<f64>, top_left: Point, font: &MonoFont<'_>) {
    let Some(probability) = probability else {
        return;
    };
    let label = format!("Rain {}", format_percentage(probability));
    add_text(layer, &label, top_left, font, INK);
}

/// Large temperature readout followed by a degrees-Celsius glyph.
///
/// `scale` magnifies `font`; `None` draws nothing.
pub fn add_temperature(
    layer: &mut RasterLayer,
    temperature: Option<f64>,
    top_left: Point,
    font: &MonoFont<'_>,
    scale: u32,
) {
    let Some(celsius) = temperature else {
        return;
    };
    add_big_reading(layer, &format_temperature(celsius), top_left, font, scale);
}

/// The `"?"` placeholder shown in place of a temperature when no weather data
/// is available at all.
pub fn add_unknown_temperature(layer: &mut RasterLayer, top_left: Point, font: &MonoFont<'_>, scale: u32) {
    add_big_reading(layer, "?", top_left, font, scale);
}

fn add_big_reading(layer: &mut RasterLayer, text: &str, top_left: Point, font: &MonoFont<'_>, scale: u32) {
    let scale = scale.max(1);
    let size = text_size(font, text);
    {
        let mut scaled = Scaled::new(&mut *layer, scale, top_left);
        Text::with_baseline(text, Point::zero(), MonoTextStyle::new(font, INK), Baseline::Top)
            .draw(&mut scaled)
            .ok();
    }
    let glyph_size = size.height * scale * 3 / 4;
    let glyph_at = top_left + Point::new((size.width * scale + scale * 2) as i32, 0);
    draw_glyph(layer, Glyph::Celsius, glyph_at, glyph_size, INK).ok();
}

/// Which sun event to show at `now`, and when it happens.
///
/// Strictly between sunrise and sunset the sunset is shown; at any other time
/// the sunrise. Before today's sunrise and after today's sunset both show
/// today's sunrise. `None` unless both times are known.
pub fn sun_event_to_show(
    now: DateTime<FixedOffset>,
    sunrise: Option<DateTime<FixedOffset>>,
    sunset: Option<DateTime<FixedOffset>>,
) -> Option<(Glyph, DateTime<FixedOffset>)> {
    let (sunrise, sunset) = (sunrise?, sunset?);
    if now > sunrise && now < sunset {
        Some((Glyph::Sunset, sunset))
    } else {
        Some((Glyph::Sunrise, sunrise))
    }
}

/// Sun glyph plus `"- HH:MM"` in the timezone of `now`.
pub fn add_sun_event(
    layer: &mut RasterLayer,
    now: DateTime<FixedOffset>,
    sunrise: Option<DateTime<FixedOffset>>,
    sunset: Option<DateTime<FixedOffset>>,
    top_left: Point,
    font: &MonoFont<'_>,
) {
    let Some((glyph, at)) = sun_event_to_show(now, sunrise, sunset) else {
        return;
    };
    let height = font.character_size.height;
    draw_glyph(layer, glyph, top_left, height, INK).ok();
    let local = at.with_timezone(now.offset());
    let label = format!("- {}", local.format("%H:%M"));
    add_text(layer, &label, top_left + Point::new(height as i32 + 6, 0), font, INK);
}

/// Weather condition icon, anchored by its top-right corner and nudged left
/// and down by up to [`ICON_JITTER`] pixels.
///
/// Missing, zero or unknown codes draw nothing.
pub fn add_weather_icon(
    layer: &mut RasterLayer,
    code: Option<u32>,
    top_right: Point,
    size: u32,
    jitter: &mut Jitter,
) {
    let Some(glyph) = code.and_then(condition_glyph) else {
        return;
    };
    let dx = jitter.offset(ICON_JITTER) as i32;
    let dy = jitter.offset(ICON_JITTER) as i32;
    let top_left = top_right + Point::new(-(size as i32) - dx, dy);
    draw_glyph(layer, glyph, top_left, size, INK).ok();
}

/// Fraction of the graph height filled by `intensity` mm/h.
///
/// Logarithmic so drizzle stays visible next to downpours; saturates at
/// [`PRECIPITATION_CAP`].
pub fn precipitation_fill(intensity: f64) -> f64 {
    if !(intensity > 0.0) {
        return 0.0;
    }
    (intensity.ln_1p() / PRECIPITATION_CAP.ln_1p()).min(1.0)
}

/// Filled area chart of precipitation intensity across the forecast horizon,
/// with `HH:MM` labels under the start, middle and end.
///
/// The plot occupies `area` minus one text line at the bottom. An empty
/// forecast draws nothing.
pub fn add_precipitation_graph(
    layer: &mut RasterLayer,
    forecasts: &[PointForecast],
    area: Rectangle,
    font: &MonoFont<'_>,
    zone: FixedOffset,
) {
    if forecasts.is_empty() || area.size.width == 0 {
        return;
    }
    let label_height = font.character_size.height + 2;
    let plot_height = area.size.height.saturating_sub(label_height);
    let base = area.top_left.y + plot_height as i32 - 1;
    let width = area.size.width;

    for column in 0..width {
        let index = (column as usize * forecasts.len()) / width as usize;
        let fill = precipitation_fill(forecasts[index].precipitation_intensity);
        let bar = (fill * plot_height as f64).round() as i32;
        if bar == 0 {
            continue;
        }
        let x = area.top_left.x + column as i32;
        Line::new(Point::new(x, base), Point::new(x, base - bar + 1))
            .into_styled(PrimitiveStyle::with_stroke(INK, 1))
            .draw(layer)
            .ok();
    }

    let label_y = base + 3;
    let last = forecasts.len() - 1;
    for (index, align) in [(0, 0.0), (last / 2, 0.5), (last, 1.0)] {
        let label = forecasts[index]
            .start_time
            .with_timezone(&zone)
            .format("%H:%M")
            .to_string();
        let label_width = text_size(font, &label).width as f64;
        let x = area.top_left.x as f64 + (width as f64 - label_width) * align;
        add_text(layer, &label, Point::new(x as i32, label_y), font, INK);
    }
}

/// One line per departure, `"{realtime}: {destination}"`, stacked downward
/// from `top_left`.
///
/// A white strip is cleared on both layers behind each line. Cancelled
/// departures get a `" CANCL"` suffix and are drawn on the accent layer only;
/// the rest go on the primary layer.
pub fn add_departures(
    primary: &mut RasterLayer,
    accent: &mut RasterLayer,
    departures: &[&Departure],
    top_left: Point,
    font: &MonoFont<'_>,
) -> Result<(), LayerError> {
    primary.ensure_same_size(accent)?;
    let mut y = top_left.y;
    for departure in departures {
        let mut line = format!("{}: {}", departure.realtime_departure, departure.destination);
        if departure.cancelled {
            line.push_str(CANCELLED_SUFFIX);
        }
        let size = text_size(font, &line);
        let strip = Rectangle::with_corners(
            Point::new(top_left.x - 5, y),
            Point::new(top_left.x + size.width as i32, y + size.height as i32),
        );
        clear_rect(primary, strip);
        clear_rect(accent, strip);

        let target = if departure.cancelled { &mut *accent } else { &mut *primary };
        add_text(target, &line, Point::new(top_left.x, y), font, INK);
        y += size.height as i32;
    }
    Ok(())
}

/// Birthday banner: clears `area`, then centres a heading at its top and the
/// names joined with `" & "` near its bottom. No names draws nothing.
pub fn add_birthdays(
    layer: &mut RasterLayer,
    names: &[String],
    area: Rectangle,
    heading_font: &MonoFont<'_>,
    names_font: &MonoFont<'_>,
) {
    if names.is_empty() {
        return;
    }
    clear_rect(layer, area);

    let centred = |text: &str, font: &MonoFont<'_>| {
        let width = text_size(font, text).width as i32;
        area.top_left.x + (area.size.width as i32 - width) / 2
    };

    let heading = "Happy birthday!";
    add_text(
        layer,
        heading,
        Point::new(centred(heading, heading_font), area.top_left.y),
        heading_font,
        INK,
    );

    let joined = names.join(" & ");
    let names_height = names_font.character_size.height as i32;
    let bottom = area.top_left.y + area.size.height as i32;
    add_text(
        layer,
        &joined,
        Point::new(centred(&joined, names_font), bottom - (10 + names_height)),
        names_font,
        INK,
    );
}
