//! Style records: XF, FONT and FORMAT.

use std::collections::HashMap;

use crate::common::binary::RecordCursor;
use crate::ole::xls::error::{RecordContext, XlsError, XlsResult};
use crate::ole::xls::records::record_ids;
use crate::ole::xls::strings::StringDecoder;
use crate::sheet::number_format::builtin_format;

/// Era-specific remainder of an XF record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XfLayout {
    /// BIFF5: eight 16-bit words in total
    Legacy {
        alignment: u16,
        color: u16,
        fill: u16,
        border: u16,
        line_style: u16,
    },
    /// BIFF8: 20 bytes in total
    Current {
        alignment: u8,
        rotation: u8,
        indent: u8,
        used_attributes: u8,
        border_lines: u32,
        border_colors: u32,
        fill_colors: u16,
    },
}

/// Extended format (XF) record: the style a cell's style index points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtendedFormat {
    pub font_index: u16,
    /// Number format id, resolved through the [`FormatTable`]
    pub format_id: u16,
    pub type_flags: u16,
    pub layout: XfLayout,
}

impl ExtendedFormat {
    pub fn parse(payload: &[u8], legacy: bool) -> XlsResult<Self> {
        let mut cur = RecordCursor::new(payload);
        let id = record_ids::XF;
        let font_index = cur.read_u16().in_record(id)?;
        let format_id = cur.read_u16().in_record(id)?;
        let type_flags = cur.read_u16().in_record(id)?;
        let layout = if legacy {
            XfLayout::Legacy {
                alignment: cur.read_u16().in_record(id)?,
                color: cur.read_u16().in_record(id)?,
                fill: cur.read_u16().in_record(id)?,
                border: cur.read_u16().in_record(id)?,
                line_style: cur.read_u16().in_record(id)?,
            }
        } else {
            XfLayout::Current {
                alignment: cur.read_u8().in_record(id)?,
                rotation: cur.read_u8().in_record(id)?,
                indent: cur.read_u8().in_record(id)?,
                used_attributes: cur.read_u8().in_record(id)?,
                border_lines: cur.read_u32().in_record(id)?,
                border_colors: cur.read_u32().in_record(id)?,
                fill_colors: cur.read_u16().in_record(id)?,
            }
        };
        Ok(ExtendedFormat {
            font_index,
            format_id,
            type_flags,
            layout,
        })
    }

    /// Salvage a short XF record: whatever leading fields are present are
    /// kept, the rest are zero. Keeps later style indices aligned.
    pub fn truncated(payload: &[u8], legacy: bool) -> Self {
        let mut cur = RecordCursor::new(payload);
        let font_index = cur.read_u16().unwrap_or(0);
        let format_id = cur.read_u16().unwrap_or(0);
        let type_flags = cur.read_u16().unwrap_or(0);
        let layout = if legacy {
            XfLayout::Legacy {
                alignment: 0,
                color: 0,
                fill: 0,
                border: 0,
                line_style: 0,
            }
        } else {
            XfLayout::Current {
                alignment: 0,
                rotation: 0,
                indent: 0,
                used_attributes: 0,
                border_lines: 0,
                border_colors: 0,
                fill_colors: 0,
            }
        };
        ExtendedFormat {
            font_index,
            format_id,
            type_flags,
            layout,
        }
    }

    /// Cell style XFs can be applied to cells; style XFs only parent them.
    pub fn is_style_xf(&self) -> bool {
        self.type_flags & 0x0004 != 0
    }
}

/// FONT record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Font {
    /// Height in twips (1/20 pt)
    pub height: u16,
    pub options: u16,
    pub color_index: u16,
    pub weight: u16,
    pub escapement: u16,
    pub underline: u8,
    pub family: u8,
    pub charset: u8,
    pub name: String,
}

impl Font {
    pub fn parse(payload: &[u8], strings: &mut StringDecoder) -> XlsResult<Self> {
        let mut cur = RecordCursor::new(payload);
        let id = record_ids::FONT;
        let height = cur.read_u16().in_record(id)?;
        let options = cur.read_u16().in_record(id)?;
        let color_index = cur.read_u16().in_record(id)?;
        let weight = cur.read_u16().in_record(id)?;
        let escapement = cur.read_u16().in_record(id)?;
        let underline = cur.read_u8().in_record(id)?;
        let family = cur.read_u8().in_record(id)?;
        let charset = cur.read_u8().in_record(id)?;
        cur.skip(1).in_record(id)?;
        let name = strings.read_short(&mut cur).in_record(id)?;
        Ok(Font {
            height,
            options,
            color_index,
            weight,
            escapement,
            underline,
            family,
            charset,
            name,
        })
    }

    pub fn is_bold(&self) -> bool {
        self.weight >= 700
    }

    pub fn is_italic(&self) -> bool {
        self.options & 0x0002 != 0
    }
}

/// FORMAT record: a number format code bound to an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatRecord {
    pub id: u16,
    pub code: String,
}

impl FormatRecord {
    /// BIFF8 stores the code with a 16-bit length, BIFF5 with an 8-bit one.
    pub fn parse(payload: &[u8], strings: &mut StringDecoder) -> XlsResult<Self> {
        let mut cur = RecordCursor::new(payload);
        let id = cur.read_u16().in_record(record_ids::FORMAT)?;
        let wide = !strings.is_legacy();
        let code = strings.read_long(&mut cur, wide).in_record(record_ids::FORMAT)?;
        Ok(FormatRecord { id, code })
    }
}

/// Number format codes by id: the workbook's FORMAT records over the
/// built-in table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatTable {
    user: HashMap<u16, String>,
}

impl FormatTable {
    /// Register a FORMAT record; ids must be unique within a workbook.
    pub fn insert(&mut self, record: FormatRecord) -> XlsResult<()> {
        if self.user.contains_key(&record.id) {
            return Err(XlsError::DuplicateFormatId(record.id));
        }
        self.user.insert(record.id, record.code);
        Ok(())
    }

    /// Format code for `id`, preferring the workbook's own definition.
    pub fn get(&self, id: u16) -> Option<&str> {
        self.user
            .get(&id)
            .map(String::as_str)
            .or_else(|| builtin_format(id))
    }

    /// Whether the workbook defined `id` itself.
    pub fn is_user_defined(&self, id: u16) -> bool {
        self.user.contains_key(&id)
    }

    /// Formats declared by the workbook.
    pub fn user_formats(&self) -> impl Iterator<Item = (u16, &str)> {
        self.user.iter().map(|(id, code)| (*id, code.as_str()))
    }

    pub fn len(&self) -> usize {
        self.user.len()
    }

    pub fn is_empty(&self) -> bool {
        self.user.is_empty()
    }
}
