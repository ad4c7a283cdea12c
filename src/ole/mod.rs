//! OLE2 compound file support
//!
//! The container seam hands the XLS decoder one seekable workbook stream;
//! the codepage table decodes the single-byte text of BIFF5 workbooks.

/// Codepage ids and the legacy text decoder seam
pub mod codepage;

/// Compound file container access
pub mod container;

/// Legacy Excel workbook (.xls) reader
pub mod xls;

pub use container::{CompoundContainer, Container, ContainerEntry, EntryKind, ReadSeek};
