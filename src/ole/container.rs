//! Compound-file container access
//!
//! An `.xls` file is an OLE2 compound document; the BIFF record stream lives in
//! a stream named `Workbook` (BIFF8) or `Book` (BIFF5). The decoder only needs
//! two capabilities from the container, captured by the [`Container`] trait, so
//! callers with their own OLE reader can plug it in. [`CompoundContainer`] is
//! the default implementation over the `cfb` crate.

use std::io::{Cursor, Read, Seek, SeekFrom};
use std::path::PathBuf;

use crate::ole::xls::error::{XlsError, XlsResult};

/// Magic bytes at offset 0 of every compound document.
pub const CFB_SIGNATURE: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Stream names tried, in order, when locating the workbook stream.
pub const WORKBOOK_STREAM_NAMES: [&str; 2] = ["Workbook", "Book"];

/// A seekable byte stream handed out by a [`Container`].
pub trait ReadSeek: Read + Seek {}

impl<T: Read + Seek> ReadSeek for T {}

/// Kind of a container directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Stream,
    Storage,
    Root,
}

/// One directory entry of a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerEntry {
    /// Entry name without its parent path
    pub name: String,
    /// Full path inside the container
    pub path: PathBuf,
    pub kind: EntryKind,
}

/// Named-stream access into an outer container.
pub trait Container {
    /// Every entry in the container, in directory order.
    fn list_entries(&self) -> Vec<ContainerEntry>;

    /// Open the stream called `name` as a flat seekable byte sequence.
    fn open_stream(&mut self, name: &str) -> XlsResult<Box<dyn ReadSeek + Send>>;
}

/// Pick the workbook stream name present in `entries`: `Workbook` first, then `Book`.
pub fn find_workbook_stream(entries: &[ContainerEntry]) -> XlsResult<&str> {
    WORKBOOK_STREAM_NAMES
        .iter()
        .find_map(|wanted| {
            entries
                .iter()
                .find(|e| e.kind == EntryKind::Stream && e.name == *wanted)
                .map(|e| e.name.as_str())
        })
        .ok_or(XlsError::WorkbookStreamNotFound)
}

/// [`Container`] backed by `cfb::CompoundFile`.
pub struct CompoundContainer<F> {
    inner: cfb::CompoundFile<F>,
}

impl<F: Read + Seek> CompoundContainer<F> {
    /// Open a compound document, checking the signature before handing the
    /// reader to `cfb`.
    pub fn open(mut reader: F) -> XlsResult<Self> {
        let start = reader.stream_position()?;
        let mut magic = [0u8; 8];
        let matches = match reader.read_exact(&mut magic) {
            Ok(()) => magic == CFB_SIGNATURE,
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => false,
            Err(e) => return Err(e.into()),
        };
        if !matches {
            return Err(XlsError::NotAContainerFormat);
        }
        reader.seek(SeekFrom::Start(start))?;

        let inner = cfb::CompoundFile::open(reader)?;
        Ok(CompoundContainer { inner })
    }

    /// Give back the underlying compound file.
    pub fn into_inner(self) -> cfb::CompoundFile<F> {
        self.inner
    }
}

impl<F: Read + Seek> Container for CompoundContainer<F> {
    fn list_entries(&self) -> Vec<ContainerEntry> {
        self.inner
            .walk()
            .map(|entry| ContainerEntry {
                name: entry.name().to_string(),
                path: entry.path().to_path_buf(),
                kind: if entry.is_root() {
                    EntryKind::Root
                } else if entry.is_stream() {
                    EntryKind::Stream
                } else {
                    EntryKind::Storage
                },
            })
            .collect()
    }

    fn open_stream(&mut self, name: &str) -> XlsResult<Box<dyn ReadSeek + Send>> {
        let path = self
            .list_entries()
            .into_iter()
            .find(|e| e.kind == EntryKind::Stream && e.name == name)
            .map(|e| e.path)
            .ok_or(XlsError::WorkbookStreamNotFound)?;

        // Buffer the stream so it does not borrow from the compound file.
        let mut stream = self.inner.open_stream(&path)?;
        let mut bytes = Vec::with_capacity(usize::try_from(stream.len()).unwrap_or(0));
        stream.read_to_end(&mut bytes)?;
        log::debug!("opened container stream {:?} ({} bytes)", path, bytes.len());
        Ok(Box::new(Cursor::new(bytes)))
    }
}
