//! # Weather Glyphs
//!
//! Small pictograms for weather conditions and sun events, drawn with
//! `embedded-graphics` primitives so no icon font has to be shipped.
//!
//! Each [`Glyph`] also knows its code point in the Weather Icons font, which is
//! what the upstream dashboards historically rendered.

use embedded_graphics::{
    geometry::Angle,
    pixelcolor::Rgb888,
    prelude::*,
    primitives::{Arc, Circle, Line, PrimitiveStyle, Rectangle, Triangle},
};

/// Every pictogram a dashboard can draw.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Glyph {
    Clear,
    Cloudy,
    Fog,
    Rain,
    Showers,
    Snow,
    Flurries,
    Hail,
    Thunderstorm,
    Wind,
    StrongWind,
    Sunrise,
    Sunset,
    Celsius,
}

impl Glyph {
    /// Weather Icons code point.
    pub fn codepoint(self) -> char {
        match self {
            Glyph::Clear => '\u{f00d}',
            Glyph::Cloudy => '\u{f002}',
            Glyph::Fog => '\u{f014}',
            Glyph::Rain => '\u{f019}',
            Glyph::Showers => '\u{f01a}',
            Glyph::Snow => '\u{f01b}',
            Glyph::Flurries => '\u{f064}',
            Glyph::Hail => '\u{f06b}',
            Glyph::Thunderstorm => '\u{f01e}',
            Glyph::Wind => '\u{f021}',
            Glyph::StrongWind => '\u{f050}',
            Glyph::Sunrise => '\u{f051}',
            Glyph::Sunset => '\u{f052}',
            Glyph::Celsius => '\u{f03c}',
        }
    }
}

/// Draw `glyph` into the `size`×`size` square whose top-left is `top_left`.
pub fn draw_glyph<D>(
    target: &mut D,
    glyph: Glyph,
    top_left: Point,
    size: u32,
    color: Rgb888,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb888>,
{
    let s = size.max(8) as i32;
    let stroke = (s / 16).max(1) as u32;
    let fill = PrimitiveStyle::with_fill(color);
    let line = PrimitiveStyle::with_stroke(color, stroke);
    let at = |x: i32, y: i32| top_left + Point::new(x, y);

    match glyph {
        Glyph::Clear => sun(target, at(s / 2, s / 2), s, color, stroke),
        Glyph::Cloudy => cloud(target, top_left, s, color),
        Glyph::Fog => {
            for i in 0..4 {
                let y = s / 5 * (i + 1);
                let inset = if i % 2 == 0 { 0 } else { s / 8 };
                Line::new(at(inset, y), at(s - 1 - inset, y))
                    .into_styled(PrimitiveStyle::with_stroke(color, stroke * 2))
                    .draw(target)?;
            }
            Ok(())
        }
        Glyph::Rain | Glyph::Showers => {
            cloud(target, top_left, s, color)?;
            let drops = if glyph == Glyph::Showers { 5 } else { 3 };
            let length = if glyph == Glyph::Showers { s / 4 } else { s / 6 };
            for i in 0..drops {
                let x = s / (drops + 1) * (i + 1);
                Line::new(at(x, s * 3 / 4), at(x - length / 3, s * 3 / 4 + length))
                    .into_styled(line)
                    .draw(target)?;
            }
            Ok(())
        }
        Glyph::Snow | Glyph::Flurries => {
            cloud(target, top_left, s, color)?;
            let flakes = if glyph == Glyph::Snow { 4 } else { 2 };
            let d = (s / 8).max(2) as u32;
            for i in 0..flakes {
                let x = s / (flakes + 1) * (i + 1);
                let y = s * 3 / 4 + (i % 2) * s / 8;
                Circle::with_center(at(x, y), d)
                    .into_styled(fill)
                    .draw(target)?;
            }
            Ok(())
        }
        Glyph::Hail => {
            cloud(target, top_left, s, color)?;
            let d = (s / 8).max(2) as u32;
            for i in 0..3 {
                let x = s / 4 * (i + 1);
                Rectangle::with_center(at(x, s * 7 / 8), Size::new_equal(d))
                    .into_styled(fill)
                    .draw(target)?;
            }
            Ok(())
        }
        Glyph::Thunderstorm => {
            cloud(target, top_left, s, color)?;
            Triangle::new(at(s / 2, s / 2), at(s * 3 / 8, s * 13 / 16), at(s / 2, s * 13 / 16))
                .into_styled(fill)
                .draw(target)?;
            Triangle::new(at(s / 2, s * 3 / 4), at(s * 5 / 8, s * 3 / 4), at(s * 7 / 16, s - 1))
                .into_styled(fill)
                .draw(target)
        }
        Glyph::Wind | Glyph::StrongWind => {
            let width = if glyph == Glyph::StrongWind { stroke * 2 } else { stroke };
            let style = PrimitiveStyle::with_stroke(color, width);
            for (i, reach) in [s * 3 / 4, s - 1, s * 5 / 8].into_iter().enumerate() {
                let y = s / 4 * (i as i32 + 1);
                Line::new(at(0, y), at(reach - s / 8, y))
                    .into_styled(style)
                    .draw(target)?;
                let curl = (s / 4).max(4) as u32;
                Arc::new(
                    at(reach - s / 8 - curl as i32 / 2, y - curl as i32),
                    curl,
                    Angle::from_degrees(90.0),
                    Angle::from_degrees(-270.0),
                )
                .into_styled(style)
                .draw(target)?;
            }
            Ok(())
        }
        Glyph::Sunrise | Glyph::Sunset => {
            let horizon = s * 3 / 4;
            Line::new(at(0, horizon), at(s - 1, horizon))
                .into_styled(line)
                .draw(target)?;
            let d = (s / 2) as u32;
            Arc::new(at(s / 4, horizon - s / 4), d, Angle::from_degrees(180.0), Angle::from_degrees(180.0))
                .into_styled(line)
                .draw(target)?;
            let (tip, base) = if glyph == Glyph::Sunrise {
                (s / 8, s * 3 / 8)
            } else {
                (s * 3 / 8, s / 8)
            };
            Triangle::new(at(s / 2, tip), at(s / 2 - s / 8, base), at(s / 2 + s / 8, base))
                .into_styled(fill)
                .draw(target)
        }
        Glyph::Celsius => {
            let ring = (s / 4) as u32;
            Circle::new(at(0, 0), ring)
                .into_styled(line)
                .draw(target)?;
            Arc::new(at(s / 3, s / 6), (s * 5 / 8) as u32, Angle::from_degrees(45.0), Angle::from_degrees(270.0))
                .into_styled(PrimitiveStyle::with_stroke(color, stroke * 2))
                .draw(target)
        }
    }
}

fn sun<D>(target: &mut D, centre: Point, s: i32, color: Rgb888, stroke: u32) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb888>,
{
    Circle::with_center(centre, (s / 2) as u32)
        .into_styled(PrimitiveStyle::with_fill(color))
        .draw(target)?;
    let (inner, outer) = (s as f32 * 0.32, s as f32 * 0.48);
    for i in 0..8 {
        let angle = i as f32 * std::f32::consts::FRAC_PI_4;
        let (sin, cos) = angle.sin_cos();
        let from = centre + Point::new((cos * inner) as i32, (sin * inner) as i32);
        let to = centre + Point::new((cos * outer) as i32, (sin * outer) as i32);
        Line::new(from, to)
            .into_styled(PrimitiveStyle::with_stroke(color, stroke))
            .draw(target)?;
    }
    Ok(())
}

/// Filled cloud occupying roughly the top two thirds of the square.
fn cloud<D>(target: &mut D, top_left: Point, s: i32, color: Rgb888) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb888>,
{
    let fill = PrimitiveStyle::with_fill(color);
    let at = |x: i32, y: i32| top_left + Point::new(x, y);
    Circle::new(at(s / 8, s / 4), (s * 3 / 8) as u32)
        .into_styled(fill)
        .draw(target)?;
    Circle::new(at(s * 5 / 16, s / 8), (s / 2) as u32)
        .into_styled(fill)
        .draw(target)?;
    Circle::new(at(s / 2, s / 4), (s * 3 / 8) as u32)
        .into_styled(fill)
        .draw(target)?;
    Rectangle::with_corners(at(s * 5 / 16, s * 3 / 8), at(s * 11 / 16, s * 5 / 8))
        .into_styled(fill)
        .draw(target)
}
