// Serial day arithmetic ported from calamine (MIT License)

//! Excel serial dates
//!
//! Spreadsheet dates are stored as a day count from an epoch, with the time of
//! day in the fractional part. The 1900 epoch deliberately keeps Lotus 1-2-3's
//! leap-year bug: serial 60 is 1900-02-29, a day that never existed. Because
//! `chrono` cannot represent that day, conversions produce [`ExcelDateTime`],
//! a plain calendar timestamp that can.

use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

/// Epoch used by a workbook (DATEMODE record).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateMode {
    /// Day 0 is 1899-12-31, with the fictitious 1900-02-29 at day 60
    #[default]
    Epoch1900,
    /// Day 0 is 1904-01-01
    Epoch1904,
}

impl DateMode {
    pub fn from_flag(flag: u16) -> Self {
        if flag == 1 {
            DateMode::Epoch1904
        } else {
            DateMode::Epoch1900
        }
    }

    pub fn is_1904(self) -> bool {
        self == DateMode::Epoch1904
    }
}

/// Largest serial accepted (9999-12-31 in the 1900 epoch).
const MAX_SERIAL_DAYS: f64 = 2_958_465.0;
const MILLIS_PER_DAY: f64 = 86_400_000.0;

pub(crate) const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// A calendar timestamp without time zone.
///
/// Unlike `chrono::NaiveDateTime` this can hold 1900-02-29.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExcelDateTime {
    year: u16,
    month: u8,
    day: u8,
    hour: u8,
    minute: u8,
    second: u8,
    millisecond: u16,
}

impl ExcelDateTime {
    /// Build a timestamp, validating every field. 1900-02-29 is accepted.
    pub fn new(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Option<Self> {
        if !is_valid_date(year, month, day) || hour > 23 || minute > 59 || second > 59 {
            return None;
        }
        Some(ExcelDateTime {
            year,
            month,
            day,
            hour,
            minute,
            second,
            millisecond: 0,
        })
    }

    /// Same timestamp with the millisecond field replaced (clamped to 999).
    pub fn with_millisecond(self, millisecond: u16) -> Self {
        ExcelDateTime {
            millisecond: millisecond.min(999),
            ..self
        }
    }

    pub fn year(&self) -> u16 {
        self.year
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    pub fn day(&self) -> u8 {
        self.day
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    pub fn second(&self) -> u8 {
        self.second
    }

    pub fn millisecond(&self) -> u16 {
        self.millisecond
    }

    /// Three-letter English month name.
    pub fn month_abbreviation(&self) -> &'static str {
        MONTH_ABBREVIATIONS[(self.month.clamp(1, 12) - 1) as usize]
    }

    /// Whether this is the non-existent 1900-02-29.
    pub fn is_fictitious_leap_day(&self) -> bool {
        self.year == 1900 && self.month == 2 && self.day == 29
    }

    /// Convert to `chrono`; `None` for 1900-02-29.
    pub fn to_naive(&self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(self.year as i32, self.month as u32, self.day as u32)?
            .and_hms_milli_opt(
                self.hour as u32,
                self.minute as u32,
                self.second as u32,
                self.millisecond as u32,
            )
    }

    /// `YYYY-MM-DDTHH:MM:SSZ`, the rendering used for built-in date formats.
    pub fn to_iso8601(&self) -> String {
        format!(
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

impl fmt::Display for ExcelDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

impl From<NaiveDateTime> for ExcelDateTime {
    fn from(dt: NaiveDateTime) -> Self {
        ExcelDateTime {
            year: dt.year().clamp(0, 9999) as u16,
            month: dt.month() as u8,
            day: dt.day() as u8,
            hour: dt.hour() as u8,
            minute: dt.minute() as u8,
            second: dt.second() as u8,
            millisecond: (dt.nanosecond() / 1_000_000).min(999) as u16,
        }
    }
}

/// Calendar validity check that also admits 1900-02-29.
pub(crate) fn is_valid_date(year: u16, month: u8, day: u8) -> bool {
    (year == 1900 && month == 2 && day == 29)
        || NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32).is_some()
}

/// Convert a serial day number to a calendar timestamp.
///
/// Negative serials clamp to day 0 and serials past 9999-12-31 clamp to that
/// day.
///
/// # Examples
///
/// ```
/// use xlsbiff::sheet::date::{serial_to_date_time, DateMode};
///
/// let leap = serial_to_date_time(60.0, DateMode::Epoch1900);
/// assert_eq!(leap.to_iso8601(), "1900-02-29T00:00:00Z");
///
/// let noon = serial_to_date_time(0.5, DateMode::Epoch1904);
/// assert_eq!(noon.to_iso8601(), "1904-01-01T12:00:00Z");
/// ```
pub fn serial_to_date_time(serial: f64, mode: DateMode) -> ExcelDateTime {
    let serial = if serial.is_finite() {
        serial.clamp(0.0, MAX_SERIAL_DAYS + 0.999_999_99)
    } else {
        0.0
    };
    let whole_days = serial.trunc();
    let (year, month, day) = civil_from_serial(whole_days as u64, mode);

    let millis = ((serial - whole_days) * MILLIS_PER_DAY).round() as u64;
    let millis = millis.min(MILLIS_PER_DAY as u64 - 1);
    let seconds = millis / 1000;

    ExcelDateTime {
        year,
        month,
        day,
        hour: (seconds / 3600) as u8,
        minute: (seconds / 60 % 60) as u8,
        second: (seconds % 60) as u8,
        millisecond: (millis % 1000) as u16,
    }
}

/// Year, month and day of a whole serial day.
fn civil_from_serial(serial_days: u64, mode: DateMode) -> (u16, u8, u8) {
    let mut months = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

    // Shift to a day count starting at 1600-01-01.
    let mut days = serial_days;
    if mode.is_1904() {
        days += 111_033;
    } else if days > 365 {
        days += 109_571;
    } else {
        days += 109_572;
    }

    let year_days_400 = days / 146_097;
    days %= 146_097;

    let year_days_100;
    if days < 36_525 {
        year_days_100 = 0;
    } else {
        year_days_100 = 1 + (days - 36_525) / 36_524;
        days = (days - 36_525) % 36_524;
    }

    let year_days_4;
    let mut non_leap_year_block = false;
    if year_days_100 == 0 {
        year_days_4 = days / 1461;
        days %= 1461;
    } else if days < 1460 {
        year_days_4 = 0;
        non_leap_year_block = true;
    } else {
        year_days_4 = 1 + (days - 1460) / 1461;
        days = (days - 1460) % 1461;
    }

    let year_days_1;
    if non_leap_year_block {
        year_days_1 = days / 365;
        days %= 365;
    } else if days < 366 {
        year_days_1 = 0;
    } else {
        year_days_1 = 1 + (days - 366) / 365;
        days = (days - 366) % 365;
    }

    let year = 1600 + year_days_400 * 400 + year_days_100 * 100 + year_days_4 * 4 + year_days_1;
    days += 1;

    if year.is_multiple_of(4) && (!year.is_multiple_of(100) || year.is_multiple_of(400)) {
        months[1] = 29;
    }

    if !mode.is_1904() && year == 1900 {
        months[1] = 29;
        if serial_days == 366 {
            days += 1;
        }
    }

    let mut month = 1;
    for month_days in months {
        if days > month_days {
            days -= month_days;
            month += 1;
        } else {
            break;
        }
    }

    (year as u16, month as u8, days as u8)
}
