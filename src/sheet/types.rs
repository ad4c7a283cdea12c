//! Common types for cell values.

/// What a cell holds, independent of how it renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueKind {
    /// Empty cell
    #[default]
    Empty,
    /// Boolean value
    Bool,
    /// Exact integer
    Int,
    /// 64-bit floating point number
    Float,
    /// Number whose format marks it as a date/time serial
    DateTime,
    /// String value
    String,
    /// Error value such as `#DIV/0!`
    Error,
}

/// A cell's value together with its rendering.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CellValue {
    pub kind: ValueKind,
    /// Text as the cell renders (dates formatted, numbers as plain decimals)
    pub text: String,
    /// Numeric value for floats and dates
    pub float: f64,
    /// Numeric value for exact integers and booleans
    pub integer: i64,
    /// Number format code applied through the cell's style
    pub format: Option<String>,
}

impl CellValue {
    pub fn text(text: impl Into<String>) -> Self {
        CellValue {
            kind: ValueKind::String,
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.kind == ValueKind::Empty
    }
}
