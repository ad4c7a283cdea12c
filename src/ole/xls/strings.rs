//! BIFF string decoding and the shared string table
//!
//! BIFF8 strings start with an option byte announcing 16-bit characters, a
//! rich-text run table and a phonetic block. A string may not fit in the
//! record that starts it: the rest continues in the next CONTINUE record,
//! which starts with a fresh option byte when characters remain. The
//! [`StringDecoder`] therefore keeps what is still owed between calls.

use std::sync::Arc;

use bitflags::bitflags;
use encoding_rs::Encoding;

use crate::common::binary::{BinaryResult, RecordCursor, decode_utf16le};
use crate::ole::codepage::{LegacyDecoder, codepage_to_encoding};
use crate::ole::xls::error::{RecordContext, XlsError, XlsResult};
use crate::ole::xls::records::record_ids;

bitflags! {
    /// Option byte of an XLUnicodeRichExtendedString.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StringFlags: u8 {
        const HIGH_BYTE = 0x01;
        const PHONETIC = 0x04;
        const RICH_TEXT = 0x08;
    }
}

/// Text decoded from one record and whether the string is finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedString {
    pub text: String,
    /// False when characters remain for the next CONTINUE record
    pub complete: bool,
}

/// What a split string still owes the next continuation record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingString {
    pub chars: usize,
    pub rich_bytes: usize,
    pub phonetic_bytes: usize,
}

impl PendingString {
    pub fn is_empty(&self) -> bool {
        self.chars == 0 && self.rich_bytes == 0 && self.phonetic_bytes == 0
    }
}

/// Per-workbook string decoder.
pub struct StringDecoder {
    legacy: bool,
    codepage: Option<u16>,
    legacy_decoder: Option<Arc<dyn LegacyDecoder>>,
    fallback: &'static Encoding,
    pending: PendingString,
}

impl std::fmt::Debug for StringDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StringDecoder")
            .field("legacy", &self.legacy)
            .field("codepage", &self.codepage)
            .field("injected_decoder", &self.legacy_decoder.is_some())
            .field("fallback", &self.fallback.name())
            .field("pending", &self.pending)
            .finish()
    }
}

impl StringDecoder {
    pub fn new(legacy_decoder: Option<Arc<dyn LegacyDecoder>>, fallback: &'static Encoding) -> Self {
        StringDecoder {
            legacy: false,
            codepage: None,
            legacy_decoder,
            fallback,
            pending: PendingString::default(),
        }
    }

    pub fn set_legacy(&mut self, legacy: bool) {
        self.legacy = legacy;
    }

    pub fn is_legacy(&self) -> bool {
        self.legacy
    }

    pub fn set_codepage(&mut self, codepage: u16) {
        if self.legacy && self.legacy_decoder.is_none() && codepage_to_encoding(codepage).is_none() {
            log::warn!(
                "codepage {} has no mapping, decoding text as {}",
                codepage,
                self.fallback.name()
            );
        }
        self.codepage = Some(codepage);
    }

    pub fn pending(&self) -> PendingString {
        self.pending
    }

    pub fn clear_pending(&mut self) {
        self.pending = PendingString::default();
    }

    /// Bytes per rich-text run entry.
    fn rich_run_size(&self) -> usize {
        if self.legacy { 2 } else { 4 }
    }

    /// Decode a fresh string of `count` characters.
    ///
    /// Clears any state left from an earlier split string.
    pub fn read(&mut self, cur: &mut RecordCursor<'_>, count: usize) -> BinaryResult<DecodedString> {
        self.pending = PendingString::default();

        if self.legacy {
            let bytes = cur.take_up_to(count);
            let text = self.decode_legacy(bytes);
            if bytes.len() < count {
                self.pending.chars = count - bytes.len();
                return Ok(DecodedString { text, complete: false });
            }
            return Ok(DecodedString { text, complete: true });
        }

        if cur.is_empty() {
            // The record ended right after the length field.
            self.pending.chars = count;
            return Ok(DecodedString {
                text: String::new(),
                complete: count == 0,
            });
        }

        let flags = StringFlags::from_bits_retain(cur.read_u8()?);
        let rich_runs = if flags.contains(StringFlags::RICH_TEXT) {
            cur.read_u16()? as usize
        } else {
            0
        };
        let phonetic_bytes = if flags.contains(StringFlags::PHONETIC) {
            cur.read_u32()? as usize
        } else {
            0
        };
        let owed = PendingString {
            chars: count,
            rich_bytes: rich_runs * self.rich_run_size(),
            phonetic_bytes,
        };
        Ok(self.read_chars(cur, flags, owed))
    }

    /// Resume a split string at the start of a CONTINUE record.
    ///
    /// Returns the continued text when characters were outstanding, and
    /// `None` when at most the trailing rich-text/phonetic bytes were owed.
    pub fn read_continued(&mut self, cur: &mut RecordCursor<'_>) -> BinaryResult<Option<DecodedString>> {
        let owed = std::mem::take(&mut self.pending);
        if owed.chars > 0 {
            if self.legacy {
                self.pending.chars = owed.chars;
                let bytes = cur.take_up_to(owed.chars);
                self.pending.chars -= bytes.len();
                let text = self.decode_legacy(bytes);
                return Ok(Some(DecodedString {
                    text,
                    complete: self.pending.chars == 0,
                }));
            }
            let flags = StringFlags::from_bits_retain(cur.read_u8()?);
            return Ok(Some(self.read_chars(cur, flags, owed)));
        }
        self.skip_owed(cur, owed);
        Ok(None)
    }

    /// Read up to `owed.chars` characters, then skip the owed trailing bytes.
    fn read_chars(&mut self, cur: &mut RecordCursor<'_>, flags: StringFlags, owed: PendingString) -> DecodedString {
        let (text, got) = if flags.contains(StringFlags::HIGH_BYTE) {
            let n = owed.chars.min(cur.remaining() / 2);
            (decode_utf16le(cur.take_up_to(n * 2)), n)
        } else {
            // Compressed UTF-16: each byte is a code point below U+0100.
            let bytes = cur.take_up_to(owed.chars);
            (bytes.iter().map(|&b| b as char).collect(), bytes.len())
        };

        if got < owed.chars {
            self.pending = PendingString {
                chars: owed.chars - got,
                ..owed
            };
            return DecodedString { text, complete: false };
        }

        self.skip_owed(cur, PendingString { chars: 0, ..owed });
        DecodedString { text, complete: true }
    }

    fn skip_owed(&mut self, cur: &mut RecordCursor<'_>, owed: PendingString) {
        let rich = cur.skip_up_to(owed.rich_bytes);
        let phonetic = cur.skip_up_to(owed.phonetic_bytes);
        self.pending = PendingString {
            chars: 0,
            rich_bytes: owed.rich_bytes - rich,
            phonetic_bytes: owed.phonetic_bytes - phonetic,
        };
    }

    /// Decode single-byte text through the injected decoder, the workbook
    /// codepage, or the fallback encoding, in that order.
    pub fn decode_legacy(&self, bytes: &[u8]) -> String {
        if let Some(decoder) = &self.legacy_decoder {
            return decoder.decode_legacy(bytes);
        }
        let encoding = self
            .codepage
            .and_then(codepage_to_encoding)
            .unwrap_or(self.fallback);
        encoding.decode_legacy(bytes)
    }

    /// Read a string with an 8-bit length prefix (sheet and font names).
    pub fn read_short(&mut self, cur: &mut RecordCursor<'_>) -> BinaryResult<String> {
        let count = cur.read_u8()? as usize;
        Ok(self.read(cur, count)?.text)
    }

    /// Read a string with a 16-bit length prefix (FORMAT, LABEL, STRING).
    ///
    /// BIFF5 stores these with an 8-bit prefix in some records; callers pick
    /// via `wide_count`.
    pub fn read_long(&mut self, cur: &mut RecordCursor<'_>, wide_count: bool) -> BinaryResult<String> {
        let count = if wide_count {
            cur.read_u16()? as usize
        } else {
            cur.read_u8()? as usize
        };
        Ok(self.read(cur, count)?.text)
    }
}

/// Workbook-global string pool addressed by LABELSST cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SharedStringTable {
    strings: Vec<String>,
}

impl SharedStringTable {
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.strings.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.strings.iter().map(String::as_str)
    }
}

/// Fills a [`SharedStringTable`] from an SST record and its CONTINUE records.
#[derive(Debug)]
pub(crate) struct SstBuilder {
    strings: Vec<String>,
    next_slot: usize,
}

impl SstBuilder {
    /// Start from the SST record: allocate the declared unique count, then
    /// read as many strings as the record holds.
    pub fn from_sst(payload: &[u8], decoder: &mut StringDecoder, max_strings: usize) -> XlsResult<Self> {
        let mut cur = RecordCursor::new(payload);
        let _total = cur.read_u32().in_record(record_ids::SST)?;
        let unique = cur.read_u32().in_record(record_ids::SST)? as usize;
        if unique > max_strings {
            return Err(XlsError::malformed(
                record_ids::SST,
                format!("declares {} unique strings, limit is {}", unique, max_strings),
            ));
        }

        let mut builder = SstBuilder {
            strings: vec![String::new(); unique],
            next_slot: 0,
        };
        builder.fill(&mut cur, decoder)?;
        Ok(builder)
    }

    /// Resume from a CONTINUE record that directly follows the SST run.
    pub fn continue_with(&mut self, payload: &[u8], decoder: &mut StringDecoder) -> XlsResult<()> {
        let mut cur = RecordCursor::new(payload);
        if let Some(part) = decoder.read_continued(&mut cur).in_record(record_ids::CONTINUE)? {
            if let Some(slot) = self.strings.get_mut(self.next_slot) {
                slot.push_str(&part.text);
            }
            if !part.complete {
                return Ok(());
            }
            self.next_slot += 1;
        }
        self.fill(&mut cur, decoder)
    }

    fn fill(&mut self, cur: &mut RecordCursor<'_>, decoder: &mut StringDecoder) -> XlsResult<()> {
        while self.next_slot < self.strings.len() {
            if cur.remaining() < 2 {
                break;
            }
            let count = cur.read_u16().in_record(record_ids::SST)? as usize;
            let part = decoder.read(cur, count).in_record(record_ids::SST)?;
            self.strings[self.next_slot].push_str(&part.text);
            if !part.complete {
                return Ok(());
            }
            self.next_slot += 1;
        }
        Ok(())
    }

    /// Slots filled so far.
    pub fn filled(&self) -> usize {
        self.next_slot
    }

    pub fn finish(self) -> SharedStringTable {
        if self.next_slot < self.strings.len() {
            log::warn!(
                "shared string table declared {} strings but only {} were read",
                self.strings.len(),
                self.next_slot
            );
        }
        SharedStringTable {
            strings: self.strings,
        }
    }
}
