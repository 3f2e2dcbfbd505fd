//! Landscape joke dashboard: a dad joke in a cowsay bubble. The cow and the
//! bubble outline are black, the joke itself red.

use embedded_graphics::prelude::*;

use super::{system_clock, BuildError, Clock, Dashboard, LayerPair};
use crate::config::{Config, DisplayConfig};
use crate::http::HttpClient;
use crate::jokes::{bubble_interior, cowsay, IcanHazDadJoke, JokeSource};
use crate::overlay::{add_text, add_time, Fonts, INK};
use crate::raster::RasterLayer;

const LEFT_MARGIN: i32 = 90;
const LINE_SPACING: i32 = 40;
/// Shown when the joke service is unreachable.
const FALLBACK_JOKE: &str = "I would tell you a joke, but the internet is down.";

pub struct JokeDashboard {
    display: DisplayConfig,
    fonts: Fonts,
    source: Box<dyn JokeSource>,
    clock: Clock,
}

impl JokeDashboard {
    pub fn new(display: DisplayConfig, source: Box<dyn JokeSource>) -> Self {
        JokeDashboard {
            fonts: Fonts::from_config(&display.fonts),
            display,
            source,
            clock: system_clock(),
        }
    }

    pub fn from_config(config: &Config, http: &HttpClient) -> Self {
        JokeDashboard::new(
            config.display.with_size(880, 528),
            Box::new(IcanHazDadJoke::new(http.clone())),
        )
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }
}

impl Dashboard for JokeDashboard {
    fn name(&self) -> &'static str {
        "joke"
    }

    fn build_images(&mut self) -> Result<LayerPair, BuildError> {
        let (w, h) = (self.display.width, self.display.height);
        let joke = self.source.joke().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "joke fetch failed");
            FALLBACK_JOKE.to_string()
        });

        let mut primary = RasterLayer::new(w, h);
        let mut accent = RasterLayer::new(w, h);
        for (i, line) in cowsay(&joke).iter().enumerate() {
            let at = Point::new(LEFT_MARGIN, i as i32 * LINE_SPACING);
            add_text(&mut primary, line, at, self.fonts.large, INK);
            if let Some(inner) = bubble_interior(line) {
                add_text(&mut accent, &inner, at, self.fonts.large, INK);
            }
        }

        add_time(
            &mut primary,
            (self.clock)(),
            Point::new(w as i32 - 75, h as i32 - 30),
            self.fonts.small,
            INK,
        );

        Ok(LayerPair::masked(primary, accent)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::FetchError;
    use crate::layers::overlap_count;
    use chrono::DateTime;

    struct FixedJoke(Option<&'static str>);

    impl JokeSource for FixedJoke {
        fn joke(&self) -> Result<String, FetchError> {
            self.0
                .map(str::to_string)
                .ok_or(FetchError::Decode("offline".into()))
        }
    }

    fn dashboard(joke: Option<&'static str>) -> JokeDashboard {
        JokeDashboard::new(DisplayConfig::default().with_size(880, 528), Box::new(FixedJoke(joke)))
            .with_clock(Box::new(|| DateTime::parse_from_rfc3339("2024-06-05T19:37:00+01:00").unwrap()))
    }

    #[test]
    fn joke_text_is_red_and_outline_black() {
        let pair = dashboard(Some("Why don't eggs tell jokes? They'd crack each other up."))
            .build_images()
            .unwrap();
        assert_eq!(pair.dimensions(), (880, 528));
        assert!(pair.accent.ink_count() > 0);
        assert!(pair.primary.ink_count() > 0);
        assert_eq!(overlap_count(&pair.primary, &pair.accent).unwrap(), 0);

        // The top border row of the bubble has no text, so nothing red there
        let border_row_red = (0..880)
            .flat_map(|x| (0..20).map(move |y| (x, y)))
            .filter(|&(x, y)| pair.accent.get(x, y) != Some(crate::raster::WHITE))
            .count();
        assert_eq!(border_row_red, 0);
    }

    #[test]
    fn fetch_failure_still_builds() {
        let pair = dashboard(None).build_images().unwrap();
        assert!(pair.accent.ink_count() > 0, "fallback joke is drawn");
    }
}
