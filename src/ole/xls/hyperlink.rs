//! HYPERLINK records
//!
//! The payload is a cell range followed by an OLE hyperlink object: a flag
//! word, then optional display name, target frame, moniker and location. The
//! moniker's class id tells URL monikers from file monikers.

use bitflags::bitflags;

use crate::common::binary::{BinaryResult, RecordCursor, decode_utf16le};
use crate::ole::xls::strings::StringDecoder;

bitflags! {
    /// Flags of the hyperlink object.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct HyperlinkFlags: u32 {
        const HAS_MONIKER = 0x0001;
        const ABSOLUTE = 0x0002;
        const SITE_GAVE_DISPLAY_NAME = 0x0004;
        const HAS_LOCATION = 0x0008;
        const HAS_DISPLAY_NAME = 0x0010;
        const HAS_GUID = 0x0020;
        const HAS_CREATION_TIME = 0x0040;
        const HAS_FRAME_NAME = 0x0080;
        const MONIKER_SAVED_AS_STRING = 0x0100;
    }
}

/// URL moniker class id, read as two big-endian words.
const URL_MONIKER: (u64, u64) = (0xE0C9_EA79_F9BA_CE11, 0x8C82_00AA_004B_A90B);
/// File moniker class id, read as two big-endian words.
const FILE_MONIKER: (u64, u64) = (0x0303_0000_0000_0000, 0xC000_0000_0000_0046);

/// Range of cells a hyperlink covers (inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CellRange {
    pub first_row: u16,
    pub last_row: u16,
    pub first_col: u16,
    pub last_col: u16,
}

impl CellRange {
    pub fn contains_col(&self, col: u16) -> bool {
        (self.first_col..=self.last_col).contains(&col)
    }
}

/// A decoded HYPERLINK record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HyperLink {
    pub range: CellRange,
    pub description: Option<String>,
    pub target_frame: Option<String>,
    pub url: Option<String>,
    pub short_file_path: Option<String>,
    pub extended_file_path: Option<String>,
    /// Location inside the target, e.g. `Sheet2!A1`
    pub text_mark: Option<String>,
}

impl HyperLink {
    pub fn parse(payload: &[u8], strings: &StringDecoder) -> BinaryResult<Self> {
        let mut cur = RecordCursor::new(payload);
        let range = CellRange {
            first_row: cur.read_u16()?,
            last_row: cur.read_u16()?,
            first_col: cur.read_u16()?,
            last_col: cur.read_u16()?,
        };
        // hyperlink object class id and stream version
        cur.skip(20)?;
        let flags = HyperlinkFlags::from_bits_retain(cur.read_u32()?);

        let mut link = HyperLink {
            range,
            ..Default::default()
        };

        if flags.intersects(HyperlinkFlags::HAS_DISPLAY_NAME | HyperlinkFlags::SITE_GAVE_DISPLAY_NAME) {
            link.description = Some(read_counted_utf16(&mut cur)?);
        }
        if flags.contains(HyperlinkFlags::HAS_FRAME_NAME) {
            link.target_frame = Some(read_counted_utf16(&mut cur)?);
        }
        if flags.contains(HyperlinkFlags::HAS_MONIKER) {
            if flags.contains(HyperlinkFlags::MONIKER_SAVED_AS_STRING) {
                link.url = Some(read_counted_utf16(&mut cur)?);
            } else {
                link.read_moniker(&mut cur, strings)?;
            }
        }
        if flags.contains(HyperlinkFlags::HAS_LOCATION) {
            link.text_mark = Some(read_counted_utf16(&mut cur)?);
        }
        Ok(link)
    }

    fn read_moniker(&mut self, cur: &mut RecordCursor<'_>, strings: &StringDecoder) -> BinaryResult<()> {
        let class_id = (
            u64::from_be_bytes(cur.read_array()?),
            u64::from_be_bytes(cur.read_array()?),
        );
        if class_id == URL_MONIKER {
            let byte_len = cur.read_u32()? as usize;
            let bytes = cur.read_bytes(byte_len)?;
            self.url = Some(trim_nul(decode_utf16le(bytes)));
        } else if class_id == FILE_MONIKER {
            let _up_count = cur.read_u16()?;
            let ansi_len = cur.read_u32()? as usize;
            let ansi = cur.read_bytes(ansi_len)?;
            self.short_file_path = Some(trim_nul(strings.decode_legacy(ansi)));
            // end-of-server marker, version, reserved
            cur.skip(24)?;
            let unicode_size = cur.read_u32()?;
            if unicode_size > 0 {
                let byte_len = cur.read_u32()? as usize;
                // key value
                cur.skip(2)?;
                let bytes = cur.read_bytes(byte_len)?;
                self.extended_file_path = Some(trim_nul(decode_utf16le(bytes)));
            }
        } else {
            log::debug!("hyperlink with unknown moniker class {:016X}{:016X}", class_id.0, class_id.1);
        }
        Ok(())
    }

    /// Where the link points: URL, else local path, else in-document location.
    pub fn target(&self) -> &str {
        self.url
            .as_deref()
            .or(self.extended_file_path.as_deref())
            .or(self.short_file_path.as_deref())
            .or(self.text_mark.as_deref())
            .unwrap_or("")
    }

    pub fn is_url(&self) -> bool {
        self.url.is_some()
    }

    /// Cell text for a covered column: `description(url)` for web links,
    /// the path for file links.
    pub fn display_text(&self) -> String {
        match (&self.url, &self.description) {
            (Some(url), Some(desc)) if !desc.is_empty() => format!("{}({})", desc, url),
            (Some(url), _) => url.clone(),
            _ => self.target().to_string(),
        }
    }
}

/// A u32 character count followed by UTF-16 text that includes a trailing NUL.
fn read_counted_utf16(cur: &mut RecordCursor<'_>) -> BinaryResult<String> {
    let count = cur.read_u32()? as usize;
    let bytes = cur.read_bytes(count.saturating_mul(2))?;
    Ok(trim_nul(decode_utf16le(bytes)))
}

fn trim_nul(mut s: String) -> String {
    while s.ends_with('\0') {
        s.pop();
    }
    s
}
