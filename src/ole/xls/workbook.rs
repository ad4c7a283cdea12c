//! Workbook stream decoding
//!
//! Opening a workbook scans the globals substream once: BOF, CODEPAGE, fonts,
//! formats, XF records, the shared string table and the sheet directory. Sheet
//! contents stay on the stream until a sheet is first requested.

use std::collections::HashMap;
use std::io::{Read, Seek};

use crate::ole::xls::error::{RecordContext, XlsError, XlsResult};
use crate::ole::xls::options::WorkbookOptions;
use crate::ole::xls::records::{BoundSheetHeader, BofRecord, RecordStream, SubstreamType, record_ids};
use crate::ole::xls::strings::{SharedStringTable, SstBuilder, StringDecoder};
use crate::ole::xls::styles::{ExtendedFormat, Font, FormatRecord, FormatTable};
use crate::ole::xls::worksheet::{SheetRef, WorkSheet};
use crate::sheet::date::{DateMode, ExcelDateTime, serial_to_date_time};
use crate::sheet::datefmt::DateFormat;
use crate::sheet::number_format::{FormatKind, detect_format_kind, is_builtin_date_format, plain_number_text};
use crate::sheet::types::{CellValue, ValueKind};

/// Tables shared by every sheet of a workbook. Immutable once the globals
/// substream has been scanned.
#[derive(Debug, Clone, Default)]
pub struct WorkbookGlobals {
    legacy: bool,
    version: u16,
    book_type: Option<SubstreamType>,
    codepage: Option<u16>,
    styles: Vec<ExtendedFormat>,
    fonts: Vec<Font>,
    formats: FormatTable,
    shared_strings: SharedStringTable,
    date_mode: DateMode,
    /// Compiled programs of the user formats that hold dates
    date_formats: HashMap<u16, DateFormat>,
}

impl WorkbookGlobals {
    /// Whether the workbook predates BIFF8.
    pub fn is_legacy(&self) -> bool {
        self.legacy
    }

    /// Version word of the globals BOF record.
    pub fn version(&self) -> u16 {
        self.version
    }

    pub fn book_type(&self) -> Option<SubstreamType> {
        self.book_type
    }

    pub fn codepage(&self) -> Option<u16> {
        self.codepage
    }

    pub fn styles(&self) -> &[ExtendedFormat] {
        &self.styles
    }

    pub fn fonts(&self) -> &[Font] {
        &self.fonts
    }

    pub fn formats(&self) -> &FormatTable {
        &self.formats
    }

    pub fn shared_strings(&self) -> &SharedStringTable {
        &self.shared_strings
    }

    pub fn date_mode(&self) -> DateMode {
        self.date_mode
    }

    /// Format code applied by style `style`, if the style exists and names a
    /// known format.
    pub fn number_format(&self, style: u16) -> Option<&str> {
        let xf = self.styles.get(style as usize)?;
        self.formats.get(xf.format_id)
    }

    /// Render a number through the format of style `style`.
    ///
    /// Date formats produce a [`ValueKind::DateTime`]; everything else is
    /// plain decimal text. `exact` carries an integer known to be exact, as
    /// decoded from an integer RK value.
    pub fn numeric_value(&self, style: u16, value: f64, exact: Option<i64>) -> CellValue {
        let Some(xf) = self.styles.get(style as usize) else {
            log::warn!(
                "style index {} out of range ({} styles), rendering raw value",
                style,
                self.styles.len()
            );
            return plain_value(value, exact, None);
        };
        let format_id = xf.format_id;
        let format = self.formats.get(format_id).map(str::to_string);

        if let Some(program) = self.date_formats.get(&format_id) {
            let ts = serial_to_date_time(value, self.date_mode);
            return CellValue {
                kind: ValueKind::DateTime,
                text: program.format(&ts),
                float: value,
                integer: value as i64,
                format,
            };
        }
        if is_builtin_date_format(format_id) && !self.formats.is_user_defined(format_id) {
            let ts = serial_to_date_time(value, self.date_mode);
            return CellValue {
                kind: ValueKind::DateTime,
                text: ts.to_iso8601(),
                float: value,
                integer: value as i64,
                format,
            };
        }
        plain_value(value, exact, format)
    }

    fn compile_date_formats(&mut self) {
        for (id, code) in self.formats.user_formats() {
            if detect_format_kind(code) != FormatKind::DateTime {
                continue;
            }
            match DateFormat::compile(code) {
                Ok(program) => {
                    self.date_formats.insert(id, program);
                },
                Err(e) => log::warn!("format {} ({:?}) renders as a plain number: {}", id, code, e),
            }
        }
    }
}

fn plain_value(value: f64, exact: Option<i64>, format: Option<String>) -> CellValue {
    match exact {
        Some(integer) => CellValue {
            kind: ValueKind::Int,
            text: itoa::Buffer::new().format(integer).to_string(),
            float: integer as f64,
            integer,
            format,
        },
        None => CellValue {
            kind: ValueKind::Float,
            text: plain_number_text(value),
            float: value,
            integer: value as i64,
            format,
        },
    }
}

/// Record that came before a CONTINUE in the globals substream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Previous {
    /// SST, or a CONTINUE attributed to it
    SharedStrings,
    Other,
}

/// Rendered rows of each sheet, and the sheet names, from [`Workbook::read_all`].
pub type SheetTexts = (Vec<Vec<Vec<String>>>, Vec<String>);

/// An opened workbook stream.
pub struct Workbook<R> {
    records: RecordStream<R>,
    strings: StringDecoder,
    globals: WorkbookGlobals,
    sheets: Vec<WorkSheet>,
}

impl<R> std::fmt::Debug for Workbook<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workbook")
            .field("records", &self.records)
            .field("strings", &self.strings)
            .field("globals", &self.globals)
            .field("sheets", &self.sheets)
            .finish()
    }
}

impl<R: Read + Seek> Workbook<R> {
    /// Scan the globals substream of a workbook stream.
    ///
    /// Use this when the stream has already been taken out of its container;
    /// [`crate::open_workbook`] handles the container.
    pub fn from_stream(reader: R, options: WorkbookOptions) -> XlsResult<Self> {
        let mut workbook = Workbook {
            records: RecordStream::new(reader),
            strings: StringDecoder::new(options.legacy_decoder.clone(), options.fallback_encoding),
            globals: WorkbookGlobals::default(),
            sheets: Vec::new(),
        };
        workbook.scan_globals(&options)?;
        Ok(workbook)
    }

    fn scan_globals(&mut self, options: &WorkbookOptions) -> XlsResult<()> {
        let mut previous = Previous::Other;
        let mut sst: Option<SstBuilder> = None;
        let mut seen_bof = false;

        while let Some(record) = self.records.next_record()? {
            if record.id != record_ids::CONTINUE {
                self.strings.clear_pending();
            }
            let mut current = Previous::Other;

            match record.id {
                record_ids::BOF if !seen_bof => {
                    let bof = BofRecord::parse(&record.payload)?;
                    seen_bof = true;
                    self.globals.version = bof.version;
                    self.globals.book_type = Some(bof.substream);
                    self.globals.legacy = bof.is_legacy();
                    self.strings.set_legacy(bof.is_legacy());
                },
                record_ids::EOF => break,
                record_ids::CODEPAGE => {
                    let codepage = record.cursor().read_u16().in_record(record.id)?;
                    self.globals.codepage = Some(codepage);
                    self.strings.set_codepage(codepage);
                },
                record_ids::XF => {
                    let legacy = self.globals.legacy;
                    let xf = ExtendedFormat::parse(&record.payload, legacy).unwrap_or_else(|e| {
                        log::warn!("short XF record #{}: {}", self.globals.styles.len(), e);
                        ExtendedFormat::truncated(&record.payload, legacy)
                    });
                    self.globals.styles.push(xf);
                },
                record_ids::FONT => {
                    let font = Font::parse(&record.payload, &mut self.strings)?;
                    self.globals.fonts.push(font);
                },
                record_ids::FORMAT => {
                    let format = FormatRecord::parse(&record.payload, &mut self.strings)?;
                    self.globals.formats.insert(format)?;
                },
                record_ids::DATEMODE => {
                    let flag = record.cursor().read_u16().in_record(record.id)?;
                    self.globals.date_mode = DateMode::from_flag(flag);
                },
                record_ids::BOUNDSHEET => {
                    let mut cur = record.cursor();
                    let header = BoundSheetHeader::parse(&mut cur)?;
                    let name = self.strings.read_short(&mut cur).in_record(record.id)?;
                    self.sheets.push(WorkSheet::new(name, header));
                },
                record_ids::SST => {
                    sst = Some(SstBuilder::from_sst(
                        &record.payload,
                        &mut self.strings,
                        options.max_shared_strings,
                    )?);
                    current = Previous::SharedStrings;
                },
                record_ids::CONTINUE => match (&mut sst, previous) {
                    (Some(builder), Previous::SharedStrings) => {
                        builder.continue_with(&record.payload, &mut self.strings)?;
                        current = Previous::SharedStrings;
                    },
                    _ => log::warn!("ignoring CONTINUE record not attached to the shared string table"),
                },
                _ => {},
            }
            previous = current;
        }

        self.strings.clear_pending();
        if let Some(builder) = sst {
            log::debug!("read {} shared strings", builder.filled());
            self.globals.shared_strings = builder.finish();
        }
        self.globals.compile_date_formats();

        log::debug!(
            "scanned workbook globals: version {:#06X}, {} sheets, {} shared strings, {} styles, {} fonts, {} formats",
            self.globals.version,
            self.sheets.len(),
            self.globals.shared_strings.len(),
            self.globals.styles.len(),
            self.globals.fonts.len(),
            self.globals.formats.len()
        );
        Ok(())
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    /// Sheet names in directory order.
    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name().to_string()).collect()
    }

    /// Directory entries, parsed or not.
    pub fn sheets(&self) -> &[WorkSheet] {
        &self.sheets
    }

    /// Sheet `index`, decoding it on first access.
    pub fn sheet(&mut self, index: usize) -> XlsResult<SheetRef<'_>> {
        let count = self.sheets.len();
        let sheet = self
            .sheets
            .get_mut(index)
            .ok_or(XlsError::SheetIndexOutOfRange { index, count })?;
        sheet.parse(&mut self.records, &mut self.strings)?;
        Ok(SheetRef::new(&self.sheets[index], &self.globals))
    }

    /// First sheet called `name`.
    pub fn sheet_by_name(&mut self, name: &str) -> Option<XlsResult<SheetRef<'_>>> {
        let index = self.sheets.iter().position(|s| s.name() == name)?;
        Some(self.sheet(index))
    }

    /// Rendered text of every sheet, at most `max_rows` rows across all sheets
    /// combined, with the sheet names.
    pub fn read_all(&mut self, max_rows: usize) -> XlsResult<SheetTexts> {
        let mut remaining = max_rows;
        let mut all = Vec::with_capacity(self.sheets.len());
        for index in 0..self.sheets.len() {
            if remaining == 0 {
                all.push(Vec::new());
                continue;
            }
            let rows = self.sheet(index)?.texts(remaining);
            remaining -= rows.len();
            all.push(rows);
        }
        Ok((all, self.sheet_names()))
    }

    pub fn globals(&self) -> &WorkbookGlobals {
        &self.globals
    }

    pub fn fonts(&self) -> &[Font] {
        self.globals.fonts()
    }

    pub fn styles(&self) -> &[ExtendedFormat] {
        self.globals.styles()
    }

    pub fn formats(&self) -> &FormatTable {
        self.globals.formats()
    }

    pub fn shared_strings(&self) -> &SharedStringTable {
        self.globals.shared_strings()
    }

    pub fn date_mode(&self) -> DateMode {
        self.globals.date_mode()
    }

    /// Convert a date serial under the workbook's epoch.
    pub fn to_date_time(&self, serial: f64) -> ExcelDateTime {
        serial_to_date_time(serial, self.globals.date_mode)
    }
}
