//! Date format mini-language
//!
//! A spreadsheet date format code (`yyyy-mm-dd`, `d-mmm-yy`, `h:mm AM/PM`)
//! compiles once into a [`DateFormat`], which can both render a timestamp
//! and parse text written in that format back into one.
//!
//! # Examples
//!
//! ```
//! use xlsbiff::sheet::datefmt::DateFormat;
//! use xlsbiff::sheet::date::ExcelDateTime;
//!
//! let fmt = DateFormat::compile("mmm yyyy").unwrap();
//! let ts = ExcelDateTime::new(2018, 3, 15, 12, 0, 0).unwrap();
//! assert_eq!(fmt.format(&ts), "Mar 2018");
//!
//! let parsed = fmt.parse("Mar 2018").unwrap();
//! assert_eq!((parsed.year(), parsed.month(), parsed.day()), (2018, 3, 1));
//! ```

pub mod lexer;
pub mod parser;

use std::fmt::Write as _;

use lexer::MeridiemStyle;
use parser::Items;
pub use parser::{Field, FormatItem};

use crate::ole::xls::error::{XlsError, XlsResult};
use crate::sheet::date::{ExcelDateTime, MONTH_ABBREVIATIONS};

/// Two-digit years below this pivot belong to the 2000s.
const TWO_DIGIT_YEAR_PIVOT: u16 = 69;

/// A compiled date format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateFormat {
    items: Items,
    twelve_hour: bool,
}

impl DateFormat {
    /// Compile a format code.
    ///
    /// Fails with [`XlsError::InvalidTimeFormatToken`] when a field is written
    /// with an unsupported run length, e.g. `yyy`.
    pub fn compile(pattern: &str) -> XlsResult<Self> {
        let items = parser::compile(&lexer::tokenize(pattern))?;
        let twelve_hour = items
            .iter()
            .any(|item| matches!(item, FormatItem::Meridiem(_)));
        Ok(DateFormat { items, twelve_hour })
    }

    pub fn items(&self) -> &[FormatItem] {
        &self.items
    }

    /// Render `ts` item by item.
    pub fn format(&self, ts: &ExcelDateTime) -> String {
        let mut out = String::new();
        for item in &self.items {
            // Writing to a String cannot fail.
            let _ = match item {
                FormatItem::Literal(text) => out.write_str(text),
                FormatItem::Meridiem(style) => out.write_str(meridiem_text(*style, ts.hour() >= 12)),
                FormatItem::Field { field, width } => match (field, width) {
                    (Field::Year, 2) => write!(out, "{:02}", ts.year() % 100),
                    (Field::Year, _) => write!(out, "{:04}", ts.year()),
                    (Field::Month, 1) => write!(out, "{}", ts.month()),
                    (Field::Month, 2) => write!(out, "{:02}", ts.month()),
                    (Field::Month, _) => out.write_str(ts.month_abbreviation()),
                    (Field::Day, 1) => write!(out, "{}", ts.day()),
                    (Field::Day, _) => write!(out, "{:02}", ts.day()),
                    (Field::Hour, _) => write!(out, "{:02}", self.display_hour(ts.hour())),
                    (Field::Minute, 1) => write!(out, "{}", ts.minute()),
                    (Field::Minute, _) => write!(out, "{:02}", ts.minute()),
                    (Field::Second, 1) => write!(out, "{}", ts.second()),
                    (Field::Second, _) => write!(out, "{:02}", ts.second()),
                },
            };
        }
        out
    }

    fn display_hour(&self, hour: u8) -> u8 {
        if !self.twelve_hour {
            return hour;
        }
        match hour % 12 {
            0 => 12,
            h => h,
        }
    }

    /// Parse text laid out by this format.
    ///
    /// Fields the format does not carry default to 1900-01-01 00:00:00.
    pub fn parse(&self, text: &str) -> XlsResult<ExcelDateTime> {
        let mut rest = text;
        let mut year = 1900u16;
        let mut month = 1u8;
        let mut day = 1u8;
        let mut hour = 0u8;
        let mut minute = 0u8;
        let mut second = 0u8;
        let mut pm: Option<bool> = None;

        for item in &self.items {
            match item {
                FormatItem::Literal(lit) => {
                    rest = rest
                        .strip_prefix(lit.as_str())
                        .ok_or_else(|| mismatch(text, lit))?;
                },
                FormatItem::Meridiem(style) => {
                    let (is_pm, len) = scan_meridiem(rest, *style).ok_or_else(|| mismatch(text, "AM/PM"))?;
                    pm = Some(is_pm);
                    rest = &rest[len..];
                },
                FormatItem::Field { field, width } => match (field, width) {
                    (Field::Month, 3) => {
                        let (m, len) = scan_month_name(rest).ok_or_else(|| mismatch(text, "month name"))?;
                        month = m;
                        rest = &rest[len..];
                    },
                    (Field::Year, 2) => {
                        let yy = take_digits(&mut rest, 2, 2).ok_or_else(|| mismatch(text, "yy"))?;
                        year = if yy < TWO_DIGIT_YEAR_PIVOT { 2000 + yy } else { 1900 + yy };
                    },
                    (Field::Year, _) => {
                        year = take_digits(&mut rest, 4, 4).ok_or_else(|| mismatch(text, "yyyy"))?;
                    },
                    (f, w) => {
                        // Single-letter fields accept one or two digits; hours are always padded.
                        let min = if *w == 1 && *f != Field::Hour { 1 } else { 2 };
                        let v = take_digits(&mut rest, min, 2).ok_or_else(|| mismatch(text, "number"))? as u8;
                        match f {
                            Field::Month => month = v,
                            Field::Day => day = v,
                            Field::Hour => hour = v,
                            Field::Minute => minute = v,
                            _ => second = v,
                        }
                    },
                },
            }
        }

        if !rest.is_empty() {
            return Err(XlsError::InvalidDate(format!(
                "unexpected trailing text {:?} in {:?}",
                rest, text
            )));
        }

        if let Some(is_pm) = pm {
            if !(1..=12).contains(&hour) {
                return Err(XlsError::InvalidDate(format!(
                    "hour {} out of range for a 12-hour clock in {:?}",
                    hour, text
                )));
            }
            hour %= 12;
            if is_pm {
                hour += 12;
            }
        }

        ExcelDateTime::new(year, month, day, hour, minute, second)
            .ok_or_else(|| XlsError::InvalidDate(format!("{:?} is not a valid date", text)))
    }
}

fn mismatch(text: &str, expected: &str) -> XlsError {
    XlsError::InvalidDate(format!("{:?} does not match: expected {}", text, expected))
}

/// Consume between `min` and `max` ASCII digits from the front of `rest`.
fn take_digits(rest: &mut &str, min: usize, max: usize) -> Option<u16> {
    let s: &str = rest;
    let len = s
        .bytes()
        .take(max)
        .take_while(u8::is_ascii_digit)
        .count();
    if len < min {
        return None;
    }
    let value = s[..len].parse().ok()?;
    *rest = &s[len..];
    Some(value)
}

fn scan_month_name(rest: &str) -> Option<(u8, usize)> {
    let head = rest.get(..3)?;
    MONTH_ABBREVIATIONS
        .iter()
        .position(|name| name.eq_ignore_ascii_case(head))
        .map(|i| (i as u8 + 1, 3))
}

fn meridiem_text(style: MeridiemStyle, pm: bool) -> &'static str {
    match (style, pm) {
        (MeridiemStyle::Full { lowercase: false }, false) => "AM",
        (MeridiemStyle::Full { lowercase: false }, true) => "PM",
        (MeridiemStyle::Full { lowercase: true }, false) => "am",
        (MeridiemStyle::Full { lowercase: true }, true) => "pm",
        (MeridiemStyle::Short { lowercase: false }, false) => "A",
        (MeridiemStyle::Short { lowercase: false }, true) => "P",
        (MeridiemStyle::Short { lowercase: true }, false) => "a",
        (MeridiemStyle::Short { lowercase: true }, true) => "p",
    }
}

fn scan_meridiem(rest: &str, style: MeridiemStyle) -> Option<(bool, usize)> {
    let len = match style {
        MeridiemStyle::Full { .. } => 2,
        MeridiemStyle::Short { .. } => 1,
    };
    let head = rest.get(..len)?;
    if head.eq_ignore_ascii_case(meridiem_text(style, false)) {
        Some((false, len))
    } else if head.eq_ignore_ascii_case(meridiem_text(style, true)) {
        Some((true, len))
    } else {
        None
    }
}

/// Render `ts` with the format code `pattern`.
pub fn format(ts: &ExcelDateTime, pattern: &str) -> XlsResult<String> {
    Ok(DateFormat::compile(pattern)?.format(ts))
}

/// Parse `text` written in the format code `pattern`.
pub fn parse(text: &str, pattern: &str) -> XlsResult<ExcelDateTime> {
    DateFormat::compile(pattern)?.parse(text)
}
