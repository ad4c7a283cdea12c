//! Compiles lexer tokens into format items.

use smallvec::SmallVec;

use super::lexer::{FieldLetter, MeridiemStyle, Token};
use crate::ole::xls::error::{XlsError, XlsResult};

/// Calendar field after month/minute disambiguation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
}

/// One step of a compiled date format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatItem {
    /// A calendar field and the run length it was written with
    Field { field: Field, width: u8 },
    Meridiem(MeridiemStyle),
    Literal(String),
}

pub(crate) type Items = SmallVec<[FormatItem; 8]>;

/// Check a field width against the supported table.
fn validate_width(field: Field, letter: FieldLetter, width: usize) -> XlsResult<u8> {
    let ok = match field {
        Field::Year => matches!(width, 2 | 4),
        Field::Month => matches!(width, 1..=3),
        Field::Day | Field::Hour | Field::Minute | Field::Second => matches!(width, 1 | 2),
    };
    if ok {
        Ok(width as u8)
    } else {
        Err(XlsError::InvalidTimeFormatToken {
            token: letter.as_char(),
            width,
        })
    }
}

/// An `m` run means minutes right after an hour field or right before a
/// seconds field, and months otherwise.
fn resolve_m(tokens: &[Token], at: usize, width: usize) -> Field {
    if width > 2 {
        return Field::Month;
    }
    let field_letter = |t: &Token| match t {
        Token::Field { letter, .. } => Some(*letter),
        _ => None,
    };
    let prev = tokens[..at].iter().rev().find_map(field_letter);
    let next = tokens[at + 1..].iter().find_map(field_letter);
    if prev == Some(FieldLetter::Hour) || next == Some(FieldLetter::Second) {
        Field::Minute
    } else {
        Field::Month
    }
}

/// Single-pass compilation; stops at [`Token::End`].
pub(crate) fn compile(tokens: &[Token]) -> XlsResult<Items> {
    let mut items = Items::new();
    for (at, token) in tokens.iter().enumerate() {
        match token {
            Token::End => break,
            Token::Literal(text) => match items.last_mut() {
                Some(FormatItem::Literal(prev)) => prev.push_str(text),
                _ => items.push(FormatItem::Literal(text.clone())),
            },
            Token::Meridiem(style) => items.push(FormatItem::Meridiem(*style)),
            Token::Field { letter, width } => {
                let field = match letter {
                    FieldLetter::Year => Field::Year,
                    FieldLetter::M => resolve_m(tokens, at, *width),
                    FieldLetter::Day => Field::Day,
                    FieldLetter::Hour => Field::Hour,
                    FieldLetter::Second => Field::Second,
                };
                let width = validate_width(field, *letter, *width)?;
                items.push(FormatItem::Field { field, width });
            },
        }
    }
    Ok(items)
}
