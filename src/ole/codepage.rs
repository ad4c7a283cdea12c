//! Codepage decoding for legacy single-byte BIFF text
//!
//! BIFF5 workbooks store every string as bytes in the workbook's codepage
//! (announced by the CODEPAGE record). Decoding is pluggable: callers may inject
//! a [`LegacyDecoder`], otherwise the codepage id selects an `encoding_rs`
//! encoding, and an unknown or missing codepage falls back to a configured
//! default.

use encoding_rs::Encoding;

/// Injected single-byte text decoder for legacy-era workbooks.
///
/// Implemented for `&'static Encoding`, so any `encoding_rs` encoding can be
/// passed directly:
///
/// ```
/// use std::sync::Arc;
/// use xlsbiff::ole::codepage::LegacyDecoder;
///
/// let decoder: Arc<dyn LegacyDecoder> = Arc::new(encoding_rs::WINDOWS_1251);
/// assert_eq!(decoder.decode_legacy(b"\xcf\xf0\xe8"), "При");
/// ```
pub trait LegacyDecoder: Send + Sync {
    /// Decode `bytes` into text. Must not fail; unmappable bytes become U+FFFD.
    fn decode_legacy(&self, bytes: &[u8]) -> String;
}

impl LegacyDecoder for &'static Encoding {
    fn decode_legacy(&self, bytes: &[u8]) -> String {
        self.decode_without_bom_handling(bytes).0.into_owned()
    }
}

/// Decode bytes using the specified Windows codepage.
///
/// Returns `None` if the codepage has no mapping.
///
/// # Examples
///
/// ```
/// use xlsbiff::ole::codepage::decode_bytes;
///
/// assert_eq!(decode_bytes(b"Hello", 1252), Some("Hello".to_string()));
/// assert_eq!(decode_bytes(b"Hello", 99999), None);
/// ```
#[inline]
pub fn decode_bytes(bytes: &[u8], codepage: u16) -> Option<String> {
    let encoding = codepage_to_encoding(codepage)?;
    Some(encoding.decode_legacy(bytes))
}

/// Map a CODEPAGE record value to an `encoding_rs` encoding.
///
/// Besides the Windows codepage identifiers this covers the BIFF-specific
/// values 367 (ASCII), 32768 (Apple Roman) and 32769 (ANSI Latin I).
/// UTF-16 (1200) is deliberately absent: it marks BIFF8 workbooks, whose text is
/// self-describing and never routed through this table.
#[inline]
pub fn codepage_to_encoding(codepage: u16) -> Option<&'static Encoding> {
    match codepage {
        // DOS codepages
        437 => Some(encoding_rs::IBM866), // IBM866 (close approximation to CP437)
        866 => Some(encoding_rs::IBM866),

        // ASCII and the BIFF aliases for Latin I
        367 | 1252 | 32769 => Some(encoding_rs::WINDOWS_1252),

        874 => Some(encoding_rs::WINDOWS_874),   // Thai
        1250 => Some(encoding_rs::WINDOWS_1250), // Central European
        1251 => Some(encoding_rs::WINDOWS_1251), // Cyrillic
        1253 => Some(encoding_rs::WINDOWS_1253), // Greek
        1254 => Some(encoding_rs::WINDOWS_1254), // Turkish
        1255 => Some(encoding_rs::WINDOWS_1255), // Hebrew
        1256 => Some(encoding_rs::WINDOWS_1256), // Arabic
        1257 => Some(encoding_rs::WINDOWS_1257), // Baltic
        1258 => Some(encoding_rs::WINDOWS_1258), // Vietnamese

        // East Asian codepages
        932 => Some(encoding_rs::SHIFT_JIS),
        936 => Some(encoding_rs::GBK),
        949 => Some(encoding_rs::EUC_KR),
        950 => Some(encoding_rs::BIG5),
        20932 => Some(encoding_rs::EUC_JP),
        54936 => Some(encoding_rs::GB18030),

        // ISO 8859 series
        28592 => Some(encoding_rs::ISO_8859_2),
        28593 => Some(encoding_rs::ISO_8859_3),
        28594 => Some(encoding_rs::ISO_8859_4),
        28595 => Some(encoding_rs::ISO_8859_5),
        28596 => Some(encoding_rs::ISO_8859_6),
        28597 => Some(encoding_rs::ISO_8859_7),
        28598 => Some(encoding_rs::ISO_8859_8),
        28605 => Some(encoding_rs::ISO_8859_15),

        // Macintosh
        10000 | 32768 => Some(encoding_rs::MACINTOSH),

        65001 => Some(encoding_rs::UTF_8),

        _ => None,
    }
}
