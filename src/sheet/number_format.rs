// Format detection ported from calamine (MIT License)

//! Number format codes
//!
//! Only date/time formats are rendered. Every other format renders the plain
//! decimal value, so thousands separators, currency symbols and percentages
//! are not applied.

use phf::phf_map;

/// First format id available to FORMAT records.
pub const FIRST_USER_FORMAT_ID: u16 = 164;

/// Format strings for the ids Excel does not store in the file.
static BUILTIN_FORMATS: phf::Map<u16, &'static str> = phf_map! {
    0u16 => "General",
    1u16 => "0",
    2u16 => "0.00",
    3u16 => "#,##0",
    4u16 => "#,##0.00",
    5u16 => "\"$\"#,##0_);(\"$\"#,##0)",
    6u16 => "\"$\"#,##0_);[Red](\"$\"#,##0)",
    7u16 => "\"$\"#,##0.00_);(\"$\"#,##0.00)",
    8u16 => "\"$\"#,##0.00_);[Red](\"$\"#,##0.00)",
    9u16 => "0%",
    10u16 => "0.00%",
    11u16 => "0.00E+00",
    12u16 => "# ?/?",
    13u16 => "# ??/??",
    14u16 => "mm-dd-yy",
    15u16 => "d-mmm-yy",
    16u16 => "d-mmm",
    17u16 => "mmm-yy",
    18u16 => "h:mm AM/PM",
    19u16 => "h:mm:ss AM/PM",
    20u16 => "h:mm",
    21u16 => "h:mm:ss",
    22u16 => "m/d/yy h:mm",
    37u16 => "#,##0 ;(#,##0)",
    38u16 => "#,##0 ;[Red](#,##0)",
    39u16 => "#,##0.00;(#,##0.00)",
    40u16 => "#,##0.00;[Red](#,##0.00)",
    41u16 => "_(* #,##0_);_(* (#,##0);_(* \"-\"_);_(@_)",
    42u16 => "_(\"$\"* #,##0_);_(\"$\"* (#,##0);_(\"$\"* \"-\"_);_(@_)",
    43u16 => "_(* #,##0.00_);_(* (#,##0.00);_(* \"-\"??_);_(@_)",
    44u16 => "_(\"$\"* #,##0.00_);_(\"$\"* (#,##0.00);_(\"$\"* \"-\"??_);_(@_)",
    45u16 => "mm:ss",
    46u16 => "[h]:mm:ss",
    47u16 => "mmss.0",
    48u16 => "##0.0E+0",
    49u16 => "@",
};

/// Built-in format string for `id`, if Excel defines one.
pub fn builtin_format(id: u16) -> Option<&'static str> {
    BUILTIN_FORMATS.get(&id).copied()
}

/// Built-in ids with date semantics.
///
/// 27-36 and 50-58 are locale-dependent (CJK calendars) and have no fixed
/// format string, but still hold dates.
pub fn is_builtin_date_format(id: u16) -> bool {
    matches!(id, 14..=17 | 22 | 27..=36 | 50..=58)
}

/// What a number rendered through a format code represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatKind {
    Other,
    DateTime,
    /// Elapsed time such as `[h]:mm`
    TimeDelta,
}

/// Classify a format code by scanning for date/time field letters outside
/// quotes, escapes and bracketed sections.
///
/// # Examples
///
/// ```
/// use xlsbiff::sheet::number_format::{detect_format_kind, FormatKind};
///
/// assert_eq!(detect_format_kind("yyyy-mm-dd"), FormatKind::DateTime);
/// assert_eq!(detect_format_kind("[h]:mm"), FormatKind::TimeDelta);
/// assert_eq!(detect_format_kind("\"Days\"0.00"), FormatKind::Other);
/// ```
pub fn detect_format_kind(format: &str) -> FormatKind {
    let mut escaped = false;
    let mut is_quote = false;
    let mut brackets = 0u8;
    let mut prev = ' ';
    let mut hms = false;
    let mut ap = false;
    for s in format.chars() {
        match (s, escaped, is_quote, ap, brackets) {
            (_, true, ..) => escaped = false,
            ('_' | '\\', ..) => escaped = true,
            ('"', _, true, _, _) => is_quote = false,
            (_, _, true, _, _) => (),
            ('"', _, _, _, _) => is_quote = true,
            (';', ..) => return FormatKind::Other,
            ('[', ..) => brackets += 1,
            (']', .., 1) if hms => return FormatKind::TimeDelta,
            (']', ..) => brackets = brackets.saturating_sub(1),
            ('a' | 'A', _, _, false, 0) => ap = true,
            ('p' | 'm' | '/' | 'P' | 'M', _, _, true, 0) => return FormatKind::DateTime,
            ('d' | 'm' | 'h' | 'y' | 's' | 'D' | 'M' | 'H' | 'Y' | 'S', _, _, false, 0) => {
                return FormatKind::DateTime;
            },
            _ => {
                if !(hms && s.eq_ignore_ascii_case(&prev)) {
                    hms = prev == '[' && matches!(s, 'm' | 'h' | 's' | 'M' | 'H' | 'S');
                }
            },
        }
        prev = s;
    }
    FormatKind::Other
}

/// Whether a format code should render through the date-format language.
pub fn is_date_format(format: &str) -> bool {
    detect_format_kind(format) == FormatKind::DateTime
}

/// Plain decimal text of a float: shortest round-trip form, no exponent, and
/// no fraction for whole numbers. Negative zero keeps its sign.
///
/// ```
/// use xlsbiff::sheet::number_format::plain_number_text;
///
/// assert_eq!(plain_number_text(3.0), "3");
/// assert_eq!(plain_number_text(0.1), "0.1");
/// assert_eq!(plain_number_text(-1250.5), "-1250.5");
/// assert_eq!(plain_number_text(-0.0), "-0");
/// ```
pub fn plain_number_text(value: f64) -> String {
    let negative_zero = value == 0.0 && value.is_sign_negative();
    if value.fract() == 0.0 && value.abs() < 1e15 && !negative_zero {
        itoa::Buffer::new().format(value as i64).to_string()
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table() {
        assert_eq!(builtin_format(0), Some("General"));
        assert_eq!(builtin_format(14), Some("mm-dd-yy"));
        assert_eq!(builtin_format(49), Some("@"));
        assert_eq!(builtin_format(23), None);
        assert_eq!(builtin_format(FIRST_USER_FORMAT_ID), None);
    }

    #[test]
    fn test_builtin_date_ids() {
        for id in [14, 15, 16, 17, 22, 27, 36, 50, 58] {
            assert!(is_builtin_date_format(id), "id {id}");
        }
        for id in [0, 1, 13, 18, 21, 23, 37, 45, 49, 59, 164] {
            assert!(!is_builtin_date_format(id), "id {id}");
        }
    }

    #[test]
    fn test_detect_format_kind() {
        assert!(is_date_format("yyyy-mm-dd"));
        assert!(is_date_format("mmm yyyy"));
        assert!(is_date_format("h:mm AM/PM"));
        assert!(is_date_format("[$-409]d-mmm-yy"));
        assert!(!is_date_format("0.00"));
        assert!(!is_date_format("#,##0 \"days\""));
        assert!(!is_date_format("[Red]0.00"));
        assert!(!is_date_format("General"));
        assert_eq!(detect_format_kind("[mm]:ss"), FormatKind::TimeDelta);
    }

    #[test]
    fn test_plain_number_text() {
        assert_eq!(plain_number_text(0.0), "0");
        assert_eq!(plain_number_text(42.0), "42");
        assert_eq!(plain_number_text(1.5), "1.5");
        assert_eq!(plain_number_text(1e20), "100000000000000000000");
        assert_eq!(plain_number_text(0.000123), "0.000123");
        assert_eq!(plain_number_text(-0.0), "-0");
        assert_eq!(plain_number_text(-3.0), "-3");
    }
}
