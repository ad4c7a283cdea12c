//! Cell value types and the date machinery used to render them.
//!
//! - [`types`]: the [`types::CellValue`] returned for a cell
//! - [`date`]: Excel serial dates under both epochs
//! - [`number_format`]: built-in format codes and date detection
//! - [`datefmt`]: the date format mini-language

pub mod date;
pub mod datefmt;
pub mod number_format;
pub mod types;

pub use date::{DateMode, ExcelDateTime, serial_to_date_time};
pub use types::{CellValue, ValueKind};
