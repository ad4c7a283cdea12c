//! Error types for XLS file parsing

use thiserror::Error;

use crate::common::binary::BinaryError;

/// Result type alias for XLS operations
pub type XlsResult<T> = Result<T, XlsError>;

/// Errors that can occur during XLS file parsing
#[derive(Error, Debug)]
pub enum XlsError {
    /// I/O error from the underlying stream
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The input does not carry the compound-file signature
    #[error("Not a compound document: signature mismatch")]
    NotAContainerFormat,

    /// Neither a `Workbook` nor a `Book` stream exists in the container
    #[error("No Workbook or Book stream found in container")]
    WorkbookStreamNotFound,

    /// Header/length inconsistency or a record too short for its fixed fields
    #[error("Malformed record 0x{record_id:04X}: {reason}")]
    MalformedRecord {
        /// Record id being decoded
        record_id: u16,
        /// What was wrong
        reason: String,
    },

    /// Two FORMAT records declared the same format id
    #[error("Format id {0} declared more than once")]
    DuplicateFormatId(u16),

    /// Records arrived in an order that cannot be attributed
    #[error("Unexpected record sequence: {0}")]
    UnexpectedRecordSequence(String),

    /// The date-format compiler met a field with an unsupported width
    #[error("Invalid time format token '{token}' (width {width})")]
    InvalidTimeFormatToken {
        /// Field letter
        token: char,
        /// Run length as written
        width: usize,
    },

    /// Text did not match a compiled date-format program
    #[error("Invalid date text: {0}")]
    InvalidDate(String),

    /// An RK value holding an exact integer was queried as a float
    #[error("RK value is integer-encoded, not a float")]
    NotAFloat,

    /// Sheet index beyond the sheet directory
    #[error("Sheet index {index} out of range ({count} sheets)")]
    SheetIndexOutOfRange {
        /// Requested index
        index: usize,
        /// Number of sheets in the directory
        count: usize,
    },
}

impl XlsError {
    /// Shorthand for [`XlsError::MalformedRecord`].
    pub(crate) fn malformed(record_id: u16, reason: impl Into<String>) -> Self {
        XlsError::MalformedRecord {
            record_id,
            reason: reason.into(),
        }
    }
}

/// Attach the record id to a low-level field read failure.
pub(crate) trait RecordContext<T> {
    fn in_record(self, record_id: u16) -> XlsResult<T>;
}

impl<T> RecordContext<T> for Result<T, BinaryError> {
    #[inline]
    fn in_record(self, record_id: u16) -> XlsResult<T> {
        self.map_err(|e| XlsError::malformed(record_id, e.to_string()))
    }
}
