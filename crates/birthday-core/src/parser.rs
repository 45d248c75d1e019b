//! Free-text birthday parsing
//!
//! The normalizer only needs `text → (year?, month, day)` and treats the
//! grammar as someone else's concern, so it depends on [`TextDateParser`].
//! [`CalendarTextParser`] is the bundled implementation: a fixed list of
//! calendar formats tried in order through `chrono`.

use chrono::{Datelike, NaiveDate};

use crate::error::ParseFailure;
use crate::model::PartialDate;

/// Interprets free-text birthdays
pub trait TextDateParser {
    fn parse(&self, text: &str) -> Result<PartialDate, ParseFailure>;
}

impl<F> TextDateParser for F
where
    F: Fn(&str) -> Result<PartialDate, ParseFailure>,
{
    fn parse(&self, text: &str) -> Result<PartialDate, ParseFailure> {
        self(text)
    }
}

/// Formats that carry a year
const WITH_YEAR: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%B %d %Y",
    "%d %B %Y",
    "%Y %B %d",
];

/// Formats without a year; a leap year is appended before parsing so that
/// February 29 validates
const WITHOUT_YEAR: &[&str] = &["--%m-%d", "%m/%d", "%m-%d", "%B %d", "%d %B"];

const LEAP_YEAR: i32 = 2000;

/// `%Y` takes any digit count; shorter years are ambiguous, not ancient
const MIN_YEAR: i32 = 1000;

/// Month-name and numeric calendar formats, English month names
///
/// Month names may be full or abbreviated in any case; commas and ordinal
/// suffixes (`1st`, `22nd`, `3rd`, `4th`) are ignored. Numeric dates are read
/// month first. Years must be written with four digits.
#[derive(Debug, Clone, Copy, Default)]
pub struct CalendarTextParser;

impl CalendarTextParser {
    pub fn new() -> Self {
        Self
    }
}

impl TextDateParser for CalendarTextParser {
    fn parse(&self, text: &str) -> Result<PartialDate, ParseFailure> {
        let cleaned = clean(text);
        if cleaned.is_empty() {
            return Err(ParseFailure::new(text, "empty text"));
        }

        for fmt in WITH_YEAR {
            if let Ok(date) = NaiveDate::parse_from_str(&cleaned, fmt) {
                if date.year() < MIN_YEAR {
                    return Err(ParseFailure::new(text, "year must have four digits"));
                }
                return Ok(to_partial(date, true));
            }
        }
        for fmt in WITHOUT_YEAR {
            let padded = format!("{} {}", cleaned, LEAP_YEAR);
            let fmt = format!("{} %Y", fmt);
            if let Ok(date) = NaiveDate::parse_from_str(&padded, &fmt) {
                return Ok(to_partial(date, false));
            }
        }
        Err(ParseFailure::new(text, "no known date format matched"))
    }
}

fn to_partial(date: NaiveDate, has_year: bool) -> PartialDate {
    PartialDate::new(has_year.then(|| date.year()), date.month(), date.day())
}

/// Collapse whitespace, drop commas and periods, strip ordinal suffixes
fn clean(text: &str) -> String {
    text.replace([',', '.'], " ")
        .split_whitespace()
        .map(strip_ordinal)
        .collect::<Vec<_>>()
        .join(" ")
}

fn strip_ordinal(word: &str) -> &str {
    let lower = word.to_ascii_lowercase();
    for suffix in ["st", "nd", "rd", "th"] {
        if lower.ends_with(suffix) {
            let head = &word[..word.len() - suffix.len()];
            if !head.is_empty() && head.bytes().all(|b| b.is_ascii_digit()) {
                return head;
            }
        }
    }
    word
}
