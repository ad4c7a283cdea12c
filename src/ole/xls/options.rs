//! Options for opening a workbook

use std::fmt;
use std::sync::Arc;

use encoding_rs::Encoding;

use crate::ole::codepage::LegacyDecoder;

/// 65 536 rows by 256 columns, the most cells a BIFF8 sheet can address.
pub const DEFAULT_MAX_SHARED_STRINGS: usize = 65_536 * 256;

/// How a workbook is decoded.
///
/// ```
/// use xlsbiff::WorkbookOptions;
///
/// let options = WorkbookOptions::default()
///     .with_fallback_encoding(encoding_rs::WINDOWS_1252)
///     .with_max_shared_strings(1_000_000);
/// assert_eq!(options.max_shared_strings, 1_000_000);
/// ```
#[derive(Clone)]
pub struct WorkbookOptions {
    /// Decoder for single-byte text in BIFF5 workbooks. Takes precedence over
    /// the workbook's CODEPAGE record.
    pub legacy_decoder: Option<Arc<dyn LegacyDecoder>>,
    /// Encoding used when the workbook's codepage is missing or unknown
    pub fallback_encoding: &'static Encoding,
    /// Upper bound on the unique count an SST record may declare
    pub max_shared_strings: usize,
}

impl Default for WorkbookOptions {
    fn default() -> Self {
        WorkbookOptions {
            legacy_decoder: None,
            fallback_encoding: encoding_rs::WINDOWS_1251,
            max_shared_strings: DEFAULT_MAX_SHARED_STRINGS,
        }
    }
}

impl WorkbookOptions {
    pub fn with_legacy_decoder(mut self, decoder: Arc<dyn LegacyDecoder>) -> Self {
        self.legacy_decoder = Some(decoder);
        self
    }

    pub fn with_fallback_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.fallback_encoding = encoding;
        self
    }

    pub fn with_max_shared_strings(mut self, max: usize) -> Self {
        self.max_shared_strings = max;
        self
    }
}

impl fmt::Debug for WorkbookOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkbookOptions")
            .field("legacy_decoder", &self.legacy_decoder.is_some())
            .field("fallback_encoding", &self.fallback_encoding.name())
            .field("max_shared_strings", &self.max_shared_strings)
            .finish()
    }
}
