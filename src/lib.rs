//! xlsbiff - A reader for legacy binary Excel workbooks (.xls)
//!
//! Parses the BIFF5 and BIFF8 record streams stored inside OLE2 compound
//! documents and exposes sheets, rows and rendered cell values.
//!
//! # Features
//!
//! - **Lazy sheets**: the workbook globals are read on open, each sheet on first access
//! - **Shared strings**: strings split across CONTINUE records are reassembled
//! - **Dates**: both epochs, the 1900 leap-day bug, and user date formats
//! - **Legacy text**: BIFF5 codepages through `encoding_rs` or an injected decoder
//! - **Hyperlinks**: URL, file and in-document links per row
//!
//! # Example - Reading every sheet
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut workbook = xlsbiff::open_path("report.xls")?;
//! let (sheets, names) = workbook.read_all(1000)?;
//! for (name, rows) in names.iter().zip(&sheets) {
//!     println!("{}: {} rows", name, rows.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Single cells
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut workbook = xlsbiff::open_path("report.xls")?;
//! let sheet = workbook.sheet(0)?;
//! if let Some(row) = sheet.row(0) {
//!     let value = row.cell_value(2);
//!     println!("C1 = {} ({:?})", value.text, value.kind);
//! }
//! # Ok(())
//! # }
//! ```

pub mod common;
pub mod ole;
pub mod sheet;

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

pub use ole::codepage::LegacyDecoder;
pub use ole::container::{CompoundContainer, Container, ReadSeek, find_workbook_stream};
pub use ole::xls::{
    CellContent, HyperLink, RowRef, SheetRef, SheetType, SheetVisibility, Workbook, WorkbookOptions, XlsError,
    XlsResult,
};
pub use sheet::{CellValue, DateMode, ExcelDateTime, ValueKind, serial_to_date_time};

/// Workbook whose stream was taken out of a container.
pub type StreamWorkbook = Workbook<Box<dyn ReadSeek + Send>>;

/// Open an `.xls` compound document with default options.
pub fn open_workbook<R: Read + Seek>(reader: R) -> XlsResult<StreamWorkbook> {
    open_workbook_with(reader, WorkbookOptions::default())
}

/// Open an `.xls` compound document.
pub fn open_workbook_with<R: Read + Seek>(reader: R, options: WorkbookOptions) -> XlsResult<StreamWorkbook> {
    let mut container = CompoundContainer::open(reader)?;
    open_workbook_from(&mut container, options)
}

/// Open an `.xls` file on disk with default options.
pub fn open_path<P: AsRef<Path>>(path: P) -> XlsResult<StreamWorkbook> {
    let file = File::open(path)?;
    open_workbook(BufReader::new(file))
}

/// Open the workbook stream of any [`Container`].
pub fn open_workbook_from<C: Container>(container: &mut C, options: WorkbookOptions) -> XlsResult<StreamWorkbook> {
    let entries = container.list_entries();
    let name = find_workbook_stream(&entries)?.to_string();
    let stream = container.open_stream(&name)?;
    Workbook::from_stream(stream, options)
}
