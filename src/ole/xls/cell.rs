//! Cell contents decoded from worksheet records
//!
//! Every cell record becomes one [`CellContent`] variant. Run records (MULRK,
//! MULBLANK) cover several adjacent columns; the worksheet expands them into
//! single-column contents before storing them.

use bytes::Bytes;

use crate::common::binary::{RecordCursor, read_u16_le};
use crate::ole::xls::error::{RecordContext, XlsError, XlsResult};
use crate::ole::xls::records::{Record, record_ids};
use crate::ole::xls::rk::Rk;
use crate::ole::xls::strings::StringDecoder;
use crate::ole::xls::workbook::WorkbookGlobals;
use crate::sheet::types::{CellValue, ValueKind};

/// Value of a BOOLERR record or of a boolean/error formula result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOrError {
    Bool(bool),
    Error(u8),
}

impl BoolOrError {
    pub fn text(&self) -> &'static str {
        match *self {
            BoolOrError::Bool(true) => "TRUE",
            BoolOrError::Bool(false) => "FALSE",
            BoolOrError::Error(code) => error_text(code),
        }
    }

    fn value(&self) -> CellValue {
        match *self {
            BoolOrError::Bool(b) => CellValue {
                kind: ValueKind::Bool,
                text: self.text().to_string(),
                integer: b as i64,
                ..Default::default()
            },
            BoolOrError::Error(_) => CellValue {
                kind: ValueKind::Error,
                text: self.text().to_string(),
                ..Default::default()
            },
        }
    }
}

/// Excel error code to its display text.
pub fn error_text(code: u8) -> &'static str {
    match code {
        0x00 => "#NULL!",
        0x07 => "#DIV/0!",
        0x0F => "#VALUE!",
        0x17 => "#REF!",
        0x1D => "#NAME?",
        0x24 => "#NUM!",
        0x2A => "#N/A",
        0x2B => "#GETTING_DATA",
        _ => "#ERR!",
    }
}

/// Cached result slot of a FORMULA record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CachedResult {
    Number(f64),
    /// Text follows in a STRING record
    String,
    Bool(bool),
    Error(u8),
    Empty,
}

impl CachedResult {
    pub fn decode(bytes: [u8; 8]) -> Self {
        if bytes[6..8] != [0xFF, 0xFF] {
            return CachedResult::Number(f64::from_le_bytes(bytes));
        }
        match bytes[0] {
            0x00 => CachedResult::String,
            0x01 => CachedResult::Bool(bytes[2] != 0),
            0x02 => CachedResult::Error(bytes[2]),
            _ => CachedResult::Empty,
        }
    }
}

/// Decoded content of one cell record.
#[derive(Debug, Clone, PartialEq)]
pub enum CellContent {
    Blank {
        row: u16,
        col: u16,
        style: u16,
    },
    Number {
        row: u16,
        col: u16,
        style: u16,
        value: f64,
    },
    PackedNumber {
        row: u16,
        col: u16,
        style: u16,
        rk: Rk,
    },
    /// MULRK: one `(style, value)` per column from `first_col` to `last_col`
    PackedNumberRun {
        row: u16,
        first_col: u16,
        last_col: u16,
        elements: Vec<(u16, Rk)>,
    },
    /// MULBLANK: one style per column from `first_col` to `last_col`
    BlankRun {
        row: u16,
        first_col: u16,
        last_col: u16,
        styles: Vec<u16>,
    },
    SharedLabel {
        row: u16,
        col: u16,
        style: u16,
        index: u32,
    },
    InlineLabel {
        row: u16,
        col: u16,
        style: u16,
        text: String,
    },
    BoolOrError {
        row: u16,
        col: u16,
        style: u16,
        value: BoolOrError,
    },
    FormulaResult {
        row: u16,
        col: u16,
        style: u16,
        cached: [u8; 8],
        flags: u16,
        /// Parsed formula tokens, kept opaque
        tokens: Bytes,
    },
    /// Text result of the formula at the same address, from a STRING record
    FormulaStringResult {
        row: u16,
        col: u16,
        style: u16,
        text: String,
    },
}

/// Row, column and style shared by single-cell records.
fn read_cell_header(cur: &mut RecordCursor<'_>, id: u16) -> XlsResult<(u16, u16, u16)> {
    Ok((
        cur.read_u16().in_record(id)?,
        cur.read_u16().in_record(id)?,
        cur.read_u16().in_record(id)?,
    ))
}

impl CellContent {
    /// Decode a cell record. Returns `None` for records that carry no cell.
    ///
    /// STRING records are not handled here: they only make sense paired with
    /// the preceding FORMULA, which the worksheet decoder tracks.
    pub fn from_record(record: &Record, strings: &mut StringDecoder) -> XlsResult<Option<Self>> {
        let id = record.id;
        let mut cur = record.cursor();
        let content = match id {
            record_ids::BLANK => {
                let (row, col, style) = read_cell_header(&mut cur, id)?;
                CellContent::Blank { row, col, style }
            },
            record_ids::NUMBER => {
                let (row, col, style) = read_cell_header(&mut cur, id)?;
                let value = cur.read_f64().in_record(id)?;
                CellContent::Number {
                    row,
                    col,
                    style,
                    value,
                }
            },
            record_ids::RK => {
                let (row, col, style) = read_cell_header(&mut cur, id)?;
                let rk = Rk(cur.read_u32().in_record(id)?);
                CellContent::PackedNumber { row, col, style, rk }
            },
            record_ids::LABELSST => {
                let (row, col, style) = read_cell_header(&mut cur, id)?;
                let index = cur.read_u32().in_record(id)?;
                CellContent::SharedLabel {
                    row,
                    col,
                    style,
                    index,
                }
            },
            record_ids::LABEL => {
                let (row, col, style) = read_cell_header(&mut cur, id)?;
                let text = strings.read_long(&mut cur, true).in_record(id)?;
                CellContent::InlineLabel {
                    row,
                    col,
                    style,
                    text,
                }
            },
            record_ids::BOOLERR => {
                let (row, col, style) = read_cell_header(&mut cur, id)?;
                let raw = cur.read_u8().in_record(id)?;
                let is_error = cur.read_u8().in_record(id)? != 0;
                let value = if is_error {
                    BoolOrError::Error(raw)
                } else {
                    BoolOrError::Bool(raw != 0)
                };
                CellContent::BoolOrError {
                    row,
                    col,
                    style,
                    value,
                }
            },
            record_ids::FORMULA => {
                let (row, col, style) = read_cell_header(&mut cur, id)?;
                let cached = cur.read_array::<8>().in_record(id)?;
                let flags = cur.read_u16().in_record(id)?;
                // chn, reserved
                cur.skip(4).in_record(id)?;
                let start = cur.position();
                CellContent::FormulaResult {
                    row,
                    col,
                    style,
                    cached,
                    flags,
                    tokens: record.payload.slice(start..),
                }
            },
            record_ids::MULRK => {
                let (row, first_col) = read_run_header(&record.payload, id)?;
                cur.skip(4).in_record(id)?;
                let count = (record.payload.len() - 6) / 6;
                let mut elements = Vec::with_capacity(count);
                for _ in 0..count {
                    let style = cur.read_u16().in_record(id)?;
                    let rk = Rk(cur.read_u32().in_record(id)?);
                    elements.push((style, rk));
                }
                let last_col = read_last_col(&record.payload, id)?;
                check_run_span(id, first_col, last_col, count)?;
                CellContent::PackedNumberRun {
                    row,
                    first_col,
                    last_col,
                    elements,
                }
            },
            record_ids::MULBLANK => {
                let (row, first_col) = read_run_header(&record.payload, id)?;
                cur.skip(4).in_record(id)?;
                let count = (record.payload.len() - 6) / 2;
                let mut styles = Vec::with_capacity(count);
                for _ in 0..count {
                    styles.push(cur.read_u16().in_record(id)?);
                }
                let last_col = read_last_col(&record.payload, id)?;
                check_run_span(id, first_col, last_col, count)?;
                CellContent::BlankRun {
                    row,
                    first_col,
                    last_col,
                    styles,
                }
            },
            _ => return Ok(None),
        };
        Ok(Some(content))
    }

    pub fn row(&self) -> u16 {
        match *self {
            CellContent::Blank { row, .. }
            | CellContent::Number { row, .. }
            | CellContent::PackedNumber { row, .. }
            | CellContent::PackedNumberRun { row, .. }
            | CellContent::BlankRun { row, .. }
            | CellContent::SharedLabel { row, .. }
            | CellContent::InlineLabel { row, .. }
            | CellContent::BoolOrError { row, .. }
            | CellContent::FormulaResult { row, .. }
            | CellContent::FormulaStringResult { row, .. } => row,
        }
    }

    pub fn first_col(&self) -> u16 {
        match *self {
            CellContent::PackedNumberRun { first_col, .. } | CellContent::BlankRun { first_col, .. } => first_col,
            CellContent::Blank { col, .. }
            | CellContent::Number { col, .. }
            | CellContent::PackedNumber { col, .. }
            | CellContent::SharedLabel { col, .. }
            | CellContent::InlineLabel { col, .. }
            | CellContent::BoolOrError { col, .. }
            | CellContent::FormulaResult { col, .. }
            | CellContent::FormulaStringResult { col, .. } => col,
        }
    }

    pub fn last_col(&self) -> u16 {
        match *self {
            CellContent::PackedNumberRun { last_col, .. } | CellContent::BlankRun { last_col, .. } => last_col,
            _ => self.first_col(),
        }
    }

    /// Number of columns covered.
    pub fn width(&self) -> usize {
        (self.last_col() - self.first_col()) as usize + 1
    }

    pub fn covers(&self, col: u16) -> bool {
        (self.first_col()..=self.last_col()).contains(&col)
    }

    pub fn is_run(&self) -> bool {
        matches!(self, CellContent::PackedNumberRun { .. } | CellContent::BlankRun { .. })
    }

    /// Style index of the column `offset` places after `first_col`.
    pub fn style_at(&self, offset: usize) -> Option<u16> {
        match self {
            CellContent::PackedNumberRun { elements, .. } => elements.get(offset).map(|(s, _)| *s),
            CellContent::BlankRun { styles, .. } => styles.get(offset).copied(),
            CellContent::Blank { style, .. }
            | CellContent::Number { style, .. }
            | CellContent::PackedNumber { style, .. }
            | CellContent::SharedLabel { style, .. }
            | CellContent::InlineLabel { style, .. }
            | CellContent::BoolOrError { style, .. }
            | CellContent::FormulaResult { style, .. }
            | CellContent::FormulaStringResult { style, .. } => (offset == 0).then_some(*style),
        }
    }

    /// Split a run into one single-column content per element; other
    /// contents come back unchanged.
    pub fn expand(self) -> Vec<CellContent> {
        match self {
            CellContent::PackedNumberRun {
                row,
                first_col,
                last_col,
                elements,
            } => elements
                .into_iter()
                .zip(first_col..=last_col)
                .map(|((style, rk), col)| CellContent::PackedNumber { row, col, style, rk })
                .collect(),
            CellContent::BlankRun {
                row,
                first_col,
                last_col,
                styles,
            } => styles
                .into_iter()
                .zip(first_col..=last_col)
                .map(|(style, col)| CellContent::Blank { row, col, style })
                .collect(),
            single => vec![single],
        }
    }

    /// Value of the column `offset` places after `first_col`; empty past the end.
    pub fn value_at(&self, book: &WorkbookGlobals, offset: usize) -> CellValue {
        match self {
            CellContent::Blank { .. } | CellContent::BlankRun { .. } => CellValue::default(),
            CellContent::Number { style, value, .. } if offset == 0 => book.numeric_value(*style, *value, None),
            CellContent::PackedNumber { style, rk, .. } if offset == 0 => rk_value(book, *style, *rk),
            CellContent::PackedNumberRun { elements, .. } => match elements.get(offset) {
                Some((style, rk)) => rk_value(book, *style, *rk),
                None => CellValue::default(),
            },
            CellContent::SharedLabel { index, .. } if offset == 0 => {
                let text = book.shared_strings().get(*index as usize).unwrap_or_else(|| {
                    log::warn!("shared string index {} out of range", index);
                    ""
                });
                CellValue::text(text)
            },
            CellContent::InlineLabel { text, .. } | CellContent::FormulaStringResult { text, .. } if offset == 0 => {
                CellValue::text(text.as_str())
            },
            CellContent::BoolOrError { value, .. } if offset == 0 => value.value(),
            CellContent::FormulaResult { style, cached, .. } if offset == 0 => match CachedResult::decode(*cached) {
                CachedResult::Number(v) => book.numeric_value(*style, v, None),
                CachedResult::Bool(b) => BoolOrError::Bool(b).value(),
                CachedResult::Error(code) => BoolOrError::Error(code).value(),
                CachedResult::String => CellValue::text(""),
                CachedResult::Empty => CellValue::default(),
            },
            _ => CellValue::default(),
        }
    }

    /// Rendered text of every covered column, in column order.
    pub fn render(&self, book: &WorkbookGlobals) -> Vec<String> {
        (0..self.width())
            .map(|offset| self.value_at(book, offset).text)
            .collect()
    }

    /// Text of the column `offset` places after `first_col`.
    pub fn render_at(&self, book: &WorkbookGlobals, offset: usize) -> String {
        self.value_at(book, offset).text
    }
}

fn rk_value(book: &WorkbookGlobals, style: u16, rk: Rk) -> CellValue {
    let n = rk.as_number();
    let exact = (!n.is_float).then_some(n.int_value);
    book.numeric_value(style, rk.as_f64(), exact)
}

fn read_run_header(payload: &[u8], id: u16) -> XlsResult<(u16, u16)> {
    if payload.len() < 6 {
        return Err(XlsError::malformed(id, format!("run record of {} bytes", payload.len())));
    }
    let mut cur = RecordCursor::new(payload);
    Ok((cur.read_u16().in_record(id)?, cur.read_u16().in_record(id)?))
}

/// Run records end with their last column, whatever the element count.
fn read_last_col(payload: &[u8], id: u16) -> XlsResult<u16> {
    read_u16_le(payload, payload.len() - 2).in_record(id)
}

fn check_run_span(id: u16, first_col: u16, last_col: u16, count: usize) -> XlsResult<()> {
    if last_col < first_col || (last_col - first_col) as usize + 1 != count {
        return Err(XlsError::malformed(
            id,
            format!("columns {}..={} do not match {} elements", first_col, last_col, count),
        ));
    }
    Ok(())
}
