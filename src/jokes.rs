//! # Joke Collaborator
//!
//! Fetches a plain-text dad joke and lays it out as a cowsay speech bubble.
//! The bubble is formatted locally; no second service is involved.

use crate::http::{FetchError, HttpClient};

const DAD_JOKE_URL: &str = "https://icanhazdadjoke.com/";

/// Bubble text width, matching cowsay's default.
pub const BUBBLE_WIDTH: usize = 40;

const COW: [&str; 5] = [
    r"        \   ^__^",
    r"         \  (oo)\_______",
    r"            (__)\       )\/\",
    r"                ||----w |",
    r"                ||     ||",
];

/// Source of one-line jokes.
pub trait JokeSource {
    fn joke(&self) -> Result<String, FetchError>;
}

/// icanhazdadjoke.com client.
#[derive(Clone)]
pub struct IcanHazDadJoke {
    http: HttpClient,
}

impl IcanHazDadJoke {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

impl JokeSource for IcanHazDadJoke {
    fn joke(&self) -> Result<String, FetchError> {
        let request = self.http.get(DAD_JOKE_URL).header("Accept", "text/plain");
        let text = self.http.fetch_text(request)?;
        Ok(text.trim().to_string())
    }
}

/// Greedy word wrap. Words longer than `width` are split.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            lines.push(word.drain(..width).collect());
        }
        let word: String = word.into_iter().collect();
        let needed = current.chars().count() + usize::from(!current.is_empty()) + word.chars().count();
        if needed > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// Render `text` as a cowsay speech bubble plus cow, one string per line.
pub fn cowsay(text: &str) -> Vec<String> {
    let body = wrap(text, BUBBLE_WIDTH);
    let inner = body.iter().map(|l| l.chars().count()).max().unwrap_or(0);

    let mut lines = Vec::with_capacity(body.len() + COW.len() + 2);
    lines.push(format!(" {}", "_".repeat(inner + 2)));
    let last = body.len() - 1;
    for (i, line) in body.iter().enumerate() {
        let (open, close) = match (i, body.len()) {
            (_, 1) => ('<', '>'),
            (0, _) => ('/', '\\'),
            (i, _) if i == last => ('\\', '/'),
            _ => ('|', '|'),
        };
        lines.push(format!("{open} {line:<inner$} {close}"));
    }
    lines.push(format!(" {}", "-".repeat(inner + 2)));
    lines.extend(COW.iter().map(|l| l.to_string()));
    lines
}

/// The bubble's inner text with its border characters blanked out, so it
/// lines up exactly with the same row of the full bubble. `None` for rows
/// that are not bubble text.
pub fn bubble_interior(line: &str) -> Option<String> {
    let mut chars = line.chars();
    let open = chars.next()?;
    if !matches!(open, '<' | '/' | '|' | '\\') {
        return None;
    }
    let mut rest: Vec<char> = chars.collect();
    rest.pop();
    let inner: String = rest.into_iter().collect();
    Some(format!(" {}", inner.trim_end()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line_bubble() {
        let lines = cowsay("Hi there");
        assert_eq!(lines[0], " __________");
        assert_eq!(lines[1], "< Hi there >");
        assert_eq!(lines[2], " ----------");
        assert_eq!(lines.len(), 3 + COW.len());
        assert!(lines[3].contains("^__^"));
    }

    #[test]
    fn multi_line_bubble_uses_slanted_corners() {
        let joke = "I'm reading a book about anti-gravity. It's impossible to put down!";
        let lines = cowsay(joke);
        let bubble: Vec<_> = lines.iter().skip(1).take_while(|l| !l.starts_with(" -")).collect();
        assert_eq!(bubble.len(), 2);
        assert!(bubble[0].starts_with('/') && bubble[0].ends_with('\\'));
        assert!(bubble[1].starts_with('\\') && bubble[1].ends_with('/'));
        // Every bubble row has the same width
        assert_eq!(bubble[0].chars().count(), bubble[1].chars().count());
    }

    #[test]
    fn middle_rows_use_bars() {
        let text = "word ".repeat(30);
        let lines = cowsay(&text);
        assert!(lines[2].starts_with('|') && lines[2].ends_with('|'));
    }

    #[test]
    fn wrap_respects_width_and_splits_long_words() {
        let lines = wrap("aaaa bbbb cccccccccc d", 5);
        assert_eq!(lines, ["aaaa", "bbbb", "ccccc", "ccccc", "d"]);
        assert_eq!(wrap("", 10), [""]);
    }

    #[test]
    fn interior_aligns_with_bubble_row() {
        let row = "/ Why did the chicken \\";
        let inner = bubble_interior(row).unwrap();
        assert_eq!(inner, "  Why did the chicken");
        assert_eq!(inner.find('W'), row.find('W'));

        assert_eq!(bubble_interior("< hi >").as_deref(), Some("  hi"));
        assert_eq!(bubble_interior(" ____"), None);
        assert_eq!(bubble_interior(COW[0]), None);
        assert_eq!(bubble_interior(""), None);
    }
}
