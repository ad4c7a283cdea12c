//! BIFF record stream and fixed-layout record headers
//!
//! A workbook stream is a flat sequence of records, each a 2-byte id, a 2-byte
//! payload length and the payload itself. [`RecordStream`] yields them one at a
//! time with the payload fully buffered, so a field-level decode failure never
//! desynchronizes the cursor for the next record.

use std::io::{ErrorKind, Read, Seek, SeekFrom};

use bitflags::bitflags;
use bytes::Bytes;

use crate::common::binary::RecordCursor;
use crate::ole::xls::error::{RecordContext, XlsError, XlsResult};

/// BIFF record ids understood by the decoders.
pub mod record_ids {
    pub const FORMULA: u16 = 0x0006;
    pub const EOF: u16 = 0x000A;
    pub const DATEMODE: u16 = 0x0022;
    pub const FONT: u16 = 0x0031;
    pub const CONTINUE: u16 = 0x003C;
    pub const CODEPAGE: u16 = 0x0042;
    pub const BOUNDSHEET: u16 = 0x0085;
    pub const MULRK: u16 = 0x00BD;
    pub const MULBLANK: u16 = 0x00BE;
    pub const XF: u16 = 0x00E0;
    pub const SST: u16 = 0x00FC;
    pub const LABELSST: u16 = 0x00FD;
    pub const HYPERLINK: u16 = 0x01B8;
    pub const BLANK: u16 = 0x0201;
    pub const NUMBER: u16 = 0x0203;
    pub const LABEL: u16 = 0x0204;
    pub const BOOLERR: u16 = 0x0205;
    pub const STRING: u16 = 0x0207;
    pub const ROW: u16 = 0x0208;
    pub const ARRAY: u16 = 0x0221;
    pub const TABLE: u16 = 0x0236;
    pub const WINDOW2: u16 = 0x023E;
    pub const RK: u16 = 0x027E;
    pub const FORMAT: u16 = 0x041E;
    pub const SHRFMLA: u16 = 0x04BC;
    pub const BOF: u16 = 0x0809;
}

/// BOF version word of BIFF8 workbooks; anything else is decoded as BIFF5.
pub const BIFF8_VERSION: u16 = 0x0600;

/// One record with its payload.
#[derive(Debug, Clone)]
pub struct Record {
    pub id: u16,
    pub payload: Bytes,
}

impl Record {
    pub fn cursor(&self) -> RecordCursor<'_> {
        RecordCursor::new(&self.payload)
    }
}

/// Cursor over the records of one byte stream.
///
/// End of stream exactly at a header boundary, or part way through a header,
/// both end iteration cleanly. A payload shorter than its declared length is a
/// [`XlsError::MalformedRecord`].
pub struct RecordStream<R> {
    reader: R,
    done: bool,
}

impl<R> std::fmt::Debug for RecordStream<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStream").field("done", &self.done).finish()
    }
}

impl<R: Read + Seek> RecordStream<R> {
    pub fn new(reader: R) -> Self {
        RecordStream {
            reader,
            done: false,
        }
    }

    /// Position the stream at an absolute byte offset, e.g. a sheet's BOF.
    pub fn seek(&mut self, offset: u64) -> XlsResult<()> {
        self.reader.seek(SeekFrom::Start(offset))?;
        self.done = false;
        Ok(())
    }

    /// Read the next record, or `None` at the end of usable data.
    pub fn next_record(&mut self) -> XlsResult<Option<Record>> {
        if self.done {
            return Ok(None);
        }

        let mut header = [0u8; 4];
        let got = read_fully(&mut self.reader, &mut header)?;
        if got < header.len() {
            if got > 0 {
                log::debug!("ignoring {} trailing bytes after the last record", got);
            }
            self.done = true;
            return Ok(None);
        }

        let id = u16::from_le_bytes([header[0], header[1]]);
        let len = u16::from_le_bytes([header[2], header[3]]) as usize;
        let mut payload = vec![0u8; len];
        match self.reader.read_exact(&mut payload) {
            Ok(()) => {},
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                self.done = true;
                return Err(XlsError::malformed(
                    id,
                    format!("payload truncated, {} bytes declared", len),
                ));
            },
            Err(e) => return Err(e.into()),
        }

        Ok(Some(Record {
            id,
            payload: Bytes::from(payload),
        }))
    }
}

impl<R: Read + Seek> Iterator for RecordStream<R> {
    type Item = XlsResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

/// Like `read_exact`, but reports how many bytes were read before end of stream.
fn read_fully<R: Read>(reader: &mut R, buf: &mut [u8]) -> XlsResult<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

/// Substream kinds announced by a BOF record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubstreamType {
    Globals,
    VbModule,
    Worksheet,
    Chart,
    MacroSheet,
    Workspace,
    Other(u16),
}

impl From<u16> for SubstreamType {
    fn from(value: u16) -> Self {
        match value {
            0x0005 => SubstreamType::Globals,
            0x0006 => SubstreamType::VbModule,
            0x0010 => SubstreamType::Worksheet,
            0x0020 => SubstreamType::Chart,
            0x0040 => SubstreamType::MacroSheet,
            0x0100 => SubstreamType::Workspace,
            v => SubstreamType::Other(v),
        }
    }
}

/// BOF (beginning of substream) record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BofRecord {
    pub version: u16,
    pub substream: SubstreamType,
}

impl BofRecord {
    pub fn parse(payload: &[u8]) -> XlsResult<Self> {
        let mut cur = RecordCursor::new(payload);
        let version = cur.read_u16().in_record(record_ids::BOF)?;
        let substream = cur.read_u16().in_record(record_ids::BOF)?.into();
        Ok(BofRecord { version, substream })
    }

    /// Whether this BOF announces a pre-BIFF8 workbook.
    pub fn is_legacy(&self) -> bool {
        self.version != BIFF8_VERSION
    }
}

/// Sheet visibility types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SheetVisibility {
    #[default]
    Visible,
    Hidden,
    VeryHidden,
}

impl SheetVisibility {
    /// The reserved value 3 is read as visible.
    pub fn from_u8(value: u8) -> Self {
        match value & 0x3 {
            0x01 => SheetVisibility::Hidden,
            0x02 => SheetVisibility::VeryHidden,
            _ => SheetVisibility::Visible,
        }
    }
}

/// Sheet types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SheetType {
    #[default]
    WorkSheet,
    MacroSheet,
    ChartSheet,
    VbModule,
    Other(u8),
}

impl SheetType {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0x00 => SheetType::WorkSheet,
            0x01 => SheetType::MacroSheet,
            0x02 => SheetType::ChartSheet,
            0x06 => SheetType::VbModule,
            v => SheetType::Other(v),
        }
    }
}

/// Fixed part of a BOUNDSHEET record; the sheet name follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundSheetHeader {
    /// Stream offset of the sheet's BOF record
    pub offset: u32,
    pub visibility: SheetVisibility,
    pub sheet_type: SheetType,
}

impl BoundSheetHeader {
    pub fn parse(cur: &mut RecordCursor<'_>) -> XlsResult<Self> {
        let offset = cur.read_u32().in_record(record_ids::BOUNDSHEET)?;
        let visibility = SheetVisibility::from_u8(cur.read_u8().in_record(record_ids::BOUNDSHEET)?);
        let sheet_type = SheetType::from_u8(cur.read_u8().in_record(record_ids::BOUNDSHEET)?);
        Ok(BoundSheetHeader {
            offset,
            visibility,
            sheet_type,
        })
    }
}

bitflags! {
    /// Option flags of the WINDOW2 record.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct WindowOptions: u16 {
        const DISPLAY_FORMULAS = 0x0001;
        const DISPLAY_GRIDLINES = 0x0002;
        const DISPLAY_HEADINGS = 0x0004;
        const FROZEN = 0x0008;
        const DISPLAY_ZEROS = 0x0010;
        const DEFAULT_HEADER_COLOR = 0x0020;
        const RIGHT_TO_LEFT = 0x0040;
        const DISPLAY_OUTLINE = 0x0080;
        const FROZEN_NO_SPLIT = 0x0100;
        const SELECTED = 0x0200;
        const DISPLAYED = 0x0400;
        const PAGE_BREAK_PREVIEW = 0x0800;
    }
}

impl WindowOptions {
    pub fn parse(payload: &[u8]) -> XlsResult<Self> {
        let bits = RecordCursor::new(payload)
            .read_u16()
            .in_record(record_ids::WINDOW2)?;
        Ok(WindowOptions::from_bits_retain(bits))
    }

    pub fn is_right_to_left(&self) -> bool {
        self.contains(WindowOptions::RIGHT_TO_LEFT)
    }

    /// The sheet is the one displayed when the workbook opens. A tab that is
    /// merely part of a multi-sheet selection does not count.
    pub fn is_selected(&self) -> bool {
        self.contains(WindowOptions::DISPLAYED)
    }
}

/// ROW record: declared extent and metadata of one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowHeader {
    pub index: u16,
    pub first_col: u16,
    /// One past the last column holding a cell
    pub last_col_plus_one: u16,
    pub height: u16,
    pub flags: u32,
}

impl RowHeader {
    pub fn parse(payload: &[u8]) -> XlsResult<Self> {
        let mut cur = RecordCursor::new(payload);
        let index = cur.read_u16().in_record(record_ids::ROW)?;
        let first_col = cur.read_u16().in_record(record_ids::ROW)?;
        let last_col_plus_one = cur.read_u16().in_record(record_ids::ROW)?;
        let height = cur.read_u16().in_record(record_ids::ROW)?;
        // irwMac and reserved
        cur.skip_up_to(4);
        let flags = cur.read_u32().unwrap_or(0);
        Ok(RowHeader {
            index,
            first_col,
            last_col_plus_one,
            height,
            flags,
        })
    }

    /// Declared inclusive column span, if the row holds any cells.
    pub fn column_span(&self) -> Option<(u16, u16)> {
        (self.last_col_plus_one > self.first_col)
            .then(|| (self.first_col, self.last_col_plus_one - 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn record(id: u16, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&id.to_le_bytes());
        out.extend_from_slice(&(payload.len() as u16).to_le_bytes());
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn test_records_then_clean_end() {
        let mut data = record(record_ids::BOF, &[0x00, 0x06, 0x05, 0x00]);
        data.extend(record(record_ids::EOF, &[]));
        let mut stream = RecordStream::new(Cursor::new(data));

        let bof = stream.next_record().unwrap().unwrap();
        assert_eq!(bof.id, record_ids::BOF);
        assert_eq!(bof.payload.len(), 4);
        let eof = stream.next_record().unwrap().unwrap();
        assert_eq!(eof.id, record_ids::EOF);
        assert!(stream.next_record().unwrap().is_none());
    }

    #[test]
    fn test_end_mid_header_is_clean() {
        let mut data = record(record_ids::EOF, &[]);
        data.extend_from_slice(&[0x09, 0x08, 0x04]);
        let records: Vec<_> = RecordStream::new(Cursor::new(data)).collect();
        assert_eq!(records.len(), 1);
        assert!(records[0].is_ok());
    }

    #[test]
    fn test_short_payload_is_malformed() {
        let mut data = record(record_ids::NUMBER, &[0u8; 14]);
        data.truncate(10);
        let err = RecordStream::new(Cursor::new(data)).next_record().unwrap_err();
        assert!(matches!(
            err,
            XlsError::MalformedRecord {
                record_id: record_ids::NUMBER,
                ..
            }
        ));
    }

    #[test]
    fn test_seek_restarts_after_end() {
        let data = record(record_ids::EOF, &[]);
        let mut stream = RecordStream::new(Cursor::new(data));
        assert!(stream.next_record().unwrap().is_some());
        assert!(stream.next_record().unwrap().is_none());
        stream.seek(0).unwrap();
        assert!(stream.next_record().unwrap().is_some());
    }

    #[test]
    fn test_bof_versions() {
        let bof = BofRecord::parse(&[0x00, 0x06, 0x10, 0x00]).unwrap();
        assert!(!bof.is_legacy());
        assert_eq!(bof.substream, SubstreamType::Worksheet);
        let bof = BofRecord::parse(&[0x00, 0x05, 0x05, 0x00]).unwrap();
        assert!(bof.is_legacy());
        assert_eq!(bof.substream, SubstreamType::Globals);
        assert!(BofRecord::parse(&[0x00]).is_err());
    }

    #[test]
    fn test_window_options() {
        let opts = WindowOptions::parse(&[0x40, 0x06]).unwrap();
        assert!(opts.is_right_to_left());
        assert!(opts.is_selected());
        let opts = WindowOptions::parse(&[0xB6, 0x00]).unwrap();
        assert!(!opts.is_right_to_left());
        assert!(!opts.is_selected());
        // tab selected but not displayed
        let opts = WindowOptions::parse(&[0x00, 0x02]).unwrap();
        assert!(!opts.is_selected());
    }

    #[test]
    fn test_row_header_span() {
        let mut payload = Vec::new();
        for v in [7u16, 2, 5, 300, 0, 0] {
            payload.extend_from_slice(&v.to_le_bytes());
        }
        payload.extend_from_slice(&0x100u32.to_le_bytes());
        let row = RowHeader::parse(&payload).unwrap();
        assert_eq!(row.index, 7);
        assert_eq!(row.column_span(), Some((2, 4)));
        assert_eq!(row.flags, 0x100);

        let empty = RowHeader { last_col_plus_one: 2, ..row };
        assert_eq!(empty.column_span(), None);
    }
}
