//! Date parsing for OCR-read expiry tokens.
//!
//! Converts a raw text token (e.g. "2022.07.19", "202501/28", "03/04/2025")
//! into a [`ParsedDate`] by trying a fixed, ordered table of formats.
//!
//! # Format precedence
//!
//! | # | Format       | Example      |
//! |---|--------------|--------------|
//! | 1 | `YYYY.MM.DD` | `2022.07.19` |
//! | 2 | `YYYYMM/DD`  | `202501/28`  |
//! | 3 | `YYYYMMDD`   | `20240530`   |
//! | 4 | `DD/MM/YYYY` | `03/04/2025` |
//! | 5 | `MM/DD/YYYY` | `12/25/2025` |
//! | 6 | `YYYY/MM/DD` | `2025-1-9`   |
//!
//! Rows 4–6 accept `-` or `/` as separators. Rows 4 and 5 share a shape, so
//! `MM/DD/YYYY` only wins when the `DD/MM/YYYY` reading is out of range.
//!
//! The first row whose shape matches *and* whose fields pass the range check
//! (`2000..=2100`, `1..=12`, `1..=31`) wins. Anything else is `None`.

use std::sync::LazyLock;

use chrono::{Datelike, Days, NaiveDate};
use regex::Regex;
use thiserror::Error;
use tracing::debug;

pub const MIN_YEAR: i32 = 2000;
pub const MAX_YEAR: i32 = 2100;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DateError {
    #[error("year {0} outside {MIN_YEAR}..={MAX_YEAR}")]
    Year(i32),
    #[error("month {0} outside 1..=12")]
    Month(u32),
    #[error("day {0} outside 1..=31")]
    Day(u32),
    #[error("{year}-{month}-{day} has no calendar date")]
    Calendar { year: i32, month: u32, day: u32 },
}

/// A calendar date read from text, with no time component.
///
/// The day is range-checked against 31 only. A day past the end of its month
/// rolls over into the next month when converted to a calendar date, so
/// `31/02/2025` lands on 3 March 2025.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParsedDate {
    year: i32,
    month: u32,
    day: u32,
    calendar: NaiveDate,
}

impl ParsedDate {
    pub fn new(year: i32, month: u32, day: u32) -> Result<Self, DateError> {
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(DateError::Year(year));
        }
        if !(1..=12).contains(&month) {
            return Err(DateError::Month(month));
        }
        if !(1..=31).contains(&day) {
            return Err(DateError::Day(day));
        }
        let calendar = NaiveDate::from_ymd_opt(year, month, 1)
            .and_then(|first| first.checked_add_days(Days::new(u64::from(day - 1))))
            .ok_or(DateError::Calendar { year, month, day })?;
        Ok(Self {
            year,
            month,
            day,
            calendar,
        })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// 1-based month as read from the text.
    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    /// The real calendar date, after day-overflow rollover.
    pub fn to_calendar_date(&self) -> NaiveDate {
        self.calendar
    }

    /// Render the calendar date as `DD-MM-YYYY`.
    pub fn format_dmy(&self) -> String {
        format!(
            "{:02}-{:02}-{}",
            self.calendar.day(),
            self.calendar.month(),
            self.calendar.year()
        )
    }
}

/// One row of the format table. Discriminants follow evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFormat {
    DottedYmd,
    CompactYmSlashD,
    CompactYmd,
    Dmy,
    Mdy,
    Ymd,
}

impl DateFormat {
    /// All formats in evaluation order.
    pub const ALL: [DateFormat; 6] = [
        Self::DottedYmd,
        Self::CompactYmSlashD,
        Self::CompactYmd,
        Self::Dmy,
        Self::Mdy,
        Self::Ymd,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DottedYmd => "YYYY.MM.DD",
            Self::CompactYmSlashD => "YYYYMM/DD",
            Self::CompactYmd => "YYYYMMDD",
            Self::Dmy => "DD/MM/YYYY",
            Self::Mdy => "MM/DD/YYYY",
            Self::Ymd => "YYYY/MM/DD",
        }
    }

    fn pattern(&self) -> &'static str {
        match self {
            Self::DottedYmd => r"^([0-9]{4})\.([0-9]{2})\.([0-9]{2})$",
            Self::CompactYmSlashD => r"^([0-9]{4})([0-9]{2})/([0-9]{1,2})$",
            Self::CompactYmd => r"^([0-9]{4})([0-9]{2})([0-9]{2})$",
            Self::Dmy | Self::Mdy => r"^([0-9]{1,2})[-/]([0-9]{1,2})[-/]([0-9]{4})$",
            Self::Ymd => r"^([0-9]{4})[-/]([0-9]{1,2})[-/]([0-9]{1,2})$",
        }
    }

    /// Whether `text` has this format's shape, ignoring field ranges.
    pub fn matches_shape(&self, text: &str) -> bool {
        RULES[*self as usize].regex.is_match(text)
    }

    /// Capture group indices as `(year, month, day)`.
    fn fields(&self) -> (usize, usize, usize) {
        match self {
            Self::DottedYmd | Self::CompactYmSlashD | Self::CompactYmd | Self::Ymd => (1, 2, 3),
            Self::Dmy => (3, 2, 1),
            Self::Mdy => (3, 1, 2),
        }
    }
}

struct Rule {
    format: DateFormat,
    regex: Regex,
}

impl Rule {
    fn extract(&self, text: &str) -> Option<ParsedDate> {
        let caps = self.regex.captures(text)?;
        let (y, m, d) = self.format.fields();
        let year = caps.get(y)?.as_str().parse().ok()?;
        let month = caps.get(m)?.as_str().parse().ok()?;
        let day = caps.get(d)?.as_str().parse().ok()?;
        match ParsedDate::new(year, month, day) {
            Ok(date) => Some(date),
            Err(e) => {
                debug!(format = self.format.as_str(), text, error = %e, "shape matched, range rejected");
                None
            }
        }
    }
}

static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    DateFormat::ALL
        .iter()
        .map(|&format| Rule {
            format,
            regex: Regex::new(format.pattern()).expect("date pattern compiles"),
        })
        .collect()
});

/// Parse a token using the first matching, in-range format.
pub fn parse(text: &str) -> Option<ParsedDate> {
    parse_format(text).map(|(_, date)| date)
}

/// Like [`parse`], also reporting which format matched.
pub fn parse_format(text: &str) -> Option<(DateFormat, ParsedDate)> {
    RULES.iter().find_map(|rule| {
        let date = rule.extract(text)?;
        debug!(format = rule.format.as_str(), text, "parsed date");
        Some((rule.format, date))
    })
}

/// Parse a token using a single format from the table.
pub fn parse_with(format: DateFormat, text: &str) -> Option<ParsedDate> {
    RULES[format as usize].extract(text)
}

static FILLER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)best before|best by|use by|expiry|expiration|exp|date|sell by|valid until")
        .expect("filler pattern compiles")
});

/// Strip label words that OCR often reads next to a date ("EXP", "Best before").
pub fn clean_date_text(text: &str) -> String {
    let stripped = FILLER.replace_all(text.trim(), "");
    stripped
        .trim_matches(|c: char| c.is_whitespace() || c == ':')
        .to_string()
}
