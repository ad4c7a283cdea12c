//! Legacy Excel (.xls) workbook reader
//!
//! Decodes the BIFF5 and BIFF8 record streams found in the "Workbook" (or
//! "Book") stream of a compound file. The globals substream is scanned when
//! the workbook is opened; sheets are decoded on first access.

/// Error types for XLS parsing
pub mod error;

/// Record stream and fixed-layout record headers
pub mod records;

/// RK packed number codec
pub mod rk;

/// String decoding with CONTINUE support, and the shared string table
pub mod strings;

/// XF, FONT and FORMAT records
pub mod styles;

/// Cell record contents and rendering
pub mod cell;

/// HYPERLINK records
pub mod hyperlink;

/// Sheet substreams, rows and cell attribution
pub mod worksheet;

/// Workbook globals and lazy sheet access
pub mod workbook;

/// Decoding options
pub mod options;

pub use cell::{BoolOrError, CachedResult, CellContent};
pub use error::{XlsError, XlsResult};
pub use hyperlink::{CellRange, HyperLink};
pub use options::WorkbookOptions;
pub use records::{SheetType, SheetVisibility};
pub use rk::Rk;
pub use strings::SharedStringTable;
pub use workbook::{SheetTexts, Workbook, WorkbookGlobals};
pub use worksheet::{RowRef, SheetRef, WorkSheet};
