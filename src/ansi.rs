//! ANSI stream decoder
//!
//! Converts accumulated terminal output containing Select Graphic Rendition
//! escape sequences (`ESC [ <params> m`) into styled text segments.
//!
//! [`decode`] is a pure function of its input: it always parses the whole
//! buffer, never carries state between calls, and yields segments lazily.
//! Callers re-decode the full buffer every time it grows, so an escape
//! sequence split across two network frames is handled correctly once the
//! second half arrives. The cost is O(n) work per update.

use std::sync::OnceLock;

use regex::Regex;

/// One of the sixteen standard terminal colors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnsiColor {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    BrightBlack,
    BrightRed,
    BrightGreen,
    BrightYellow,
    BrightBlue,
    BrightMagenta,
    BrightCyan,
    BrightWhite,
}

const PALETTE: [AnsiColor; 8] = [
    AnsiColor::Black,
    AnsiColor::Red,
    AnsiColor::Green,
    AnsiColor::Yellow,
    AnsiColor::Blue,
    AnsiColor::Magenta,
    AnsiColor::Cyan,
    AnsiColor::White,
];

const BRIGHT_PALETTE: [AnsiColor; 8] = [
    AnsiColor::BrightBlack,
    AnsiColor::BrightRed,
    AnsiColor::BrightGreen,
    AnsiColor::BrightYellow,
    AnsiColor::BrightBlue,
    AnsiColor::BrightMagenta,
    AnsiColor::BrightCyan,
    AnsiColor::BrightWhite,
];

impl AnsiColor {
    /// Foreground color for SGR codes 30-37 and 90-97
    pub fn from_foreground_code(code: u32) -> Option<Self> {
        match code {
            30..=37 => Some(PALETTE[(code - 30) as usize]),
            90..=97 => Some(BRIGHT_PALETTE[(code - 90) as usize]),
            _ => None,
        }
    }

    /// Background color for SGR codes 40-47 and 100-107
    pub fn from_background_code(code: u32) -> Option<Self> {
        match code {
            40..=47 => Some(PALETTE[(code - 40) as usize]),
            100..=107 => Some(BRIGHT_PALETTE[(code - 100) as usize]),
            _ => None,
        }
    }
}

/// Accumulated SGR style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Style {
    pub color: Option<AnsiColor>,
    pub bg_color: Option<AnsiColor>,
    pub bold: bool,
    pub dim: bool,
    pub underline: bool,
}

impl Style {
    /// Apply one SGR parameter; unrecognised codes are ignored
    pub fn apply(&mut self, code: u32) {
        match code {
            0 => *self = Style::default(),
            1 => self.bold = true,
            2 => self.dim = true,
            4 => self.underline = true,
            _ => {
                if let Some(color) = AnsiColor::from_foreground_code(code) {
                    self.color = Some(color);
                } else if let Some(color) = AnsiColor::from_background_code(code) {
                    self.bg_color = Some(color);
                }
            }
        }
    }

    /// Apply a raw `;`-separated parameter list
    ///
    /// An empty list, or an empty entry, means `0` (reset).
    pub fn apply_params(&mut self, params: &str) {
        for param in params.split(';') {
            if param.is_empty() {
                self.apply(0);
            } else if let Ok(code) = param.parse::<u32>() {
                self.apply(code);
            }
        }
    }

    /// True when no attribute is set
    pub fn is_plain(&self) -> bool {
        *self == Style::default()
    }
}

/// A run of text sharing one style
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnsiSegment<'a> {
    /// The text, borrowed from the decoded input
    pub text: &'a str,
    /// Byte offset of `text` within the decoded input
    pub offset: usize,
    /// Style accumulated up to the start of `text`
    pub style: Style,
}

impl AnsiSegment<'_> {
    /// Byte offset one past the end of `text` within the decoded input
    pub fn end(&self) -> usize {
        self.offset + self.text.len()
    }
}

fn sgr_regex() -> &'static Regex {
    static SGR: OnceLock<Regex> = OnceLock::new();
    SGR.get_or_init(|| Regex::new(r"\x1b\[([0-9;]*)m").expect("SGR pattern is valid"))
}

/// Decode `input` into styled segments
///
/// The returned iterator is lazy and finite. Calling `decode` twice on the
/// same input yields identical sequences.
///
/// # Examples
///
/// ```
/// use cockpit::ansi::{decode, AnsiColor};
///
/// let segments: Vec<_> = decode("\x1b[1;31mERROR\x1b[0m: failed").collect();
/// assert_eq!(segments[0].text, "ERROR");
/// assert!(segments[0].style.bold);
/// assert_eq!(segments[0].style.color, Some(AnsiColor::Red));
/// assert_eq!(segments[1].text, ": failed");
/// assert!(segments[1].style.is_plain());
/// ```
pub fn decode(input: &str) -> Segments<'_> {
    Segments {
        input,
        matches: sgr_regex().captures_iter(input),
        cursor: 0,
        style: Style::default(),
        finished: false,
    }
}

/// Lazy iterator over the segments of one input, see [`decode`]
pub struct Segments<'a> {
    input: &'a str,
    matches: regex::CaptureMatches<'static, 'a>,
    cursor: usize,
    style: Style,
    finished: bool,
}

impl<'a> Segments<'a> {
    fn segment(&self, start: usize, end: usize) -> AnsiSegment<'a> {
        AnsiSegment {
            text: &self.input[start..end],
            offset: start,
            style: self.style,
        }
    }
}

impl<'a> Iterator for Segments<'a> {
    type Item = AnsiSegment<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            let Some(caps) = self.matches.next() else {
                self.finished = true;
                if self.cursor < self.input.len() {
                    return Some(self.segment(self.cursor, self.input.len()));
                }
                return None;
            };
            let Some(whole) = caps.get(0) else {
                continue;
            };

            let pending = (whole.start() > self.cursor)
                .then(|| self.segment(self.cursor, whole.start()));

            self.style
                .apply_params(caps.get(1).map_or("", |params| params.as_str()));
            self.cursor = whole.end();

            if pending.is_some() {
                return pending;
            }
        }
        None
    }
}

impl std::iter::FusedIterator for Segments<'_> {}

/// Length of the prefix of `input` that does not end inside an escape
/// sequence
///
/// A trailing `ESC`, `ESC [` or `ESC [ <digits;>` may be the first half of
/// an SGR code whose remainder has not arrived yet. Incremental renderers
/// print only up to this length.
pub fn stable_len(input: &str) -> usize {
    let Some(esc) = input.rfind('\x1b') else {
        return input.len();
    };
    let tail = &input[esc + 1..];
    let unterminated = match tail.strip_prefix('[') {
        Some(params) => params.bytes().all(|b| b.is_ascii_digit() || b == b';'),
        None => tail.is_empty(),
    };
    if unterminated {
        esc
    } else {
        input.len()
    }
}
