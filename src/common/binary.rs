//! Binary data parsing utilities.
//!
//! This module provides functions for reading little-endian fields out of BIFF
//! record payloads, plus [`RecordCursor`], a forward-only reader over a single
//! payload that the record decoders share.

use zerocopy::{F64, FromBytes, LE, U16, U32};

/// Binary parsing error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BinaryError {
    /// Not enough data to read the requested type
    #[error("insufficient data: expected {expected} bytes, got {available}")]
    InsufficientData { expected: usize, available: usize },
    /// Failed to parse the data
    #[error("parse error: {0}")]
    ParseError(String),
}

/// Result type for binary operations
pub type BinaryResult<T> = Result<T, BinaryError>;

/// Read a little-endian u16 from a byte slice at the given offset.
///
/// # Examples
///
/// ```
/// use xlsbiff::common::binary::read_u16_le;
/// let data = [0x34, 0x12, 0x78, 0x56];
/// assert_eq!(read_u16_le(&data, 0).unwrap(), 0x1234);
/// assert_eq!(read_u16_le(&data, 2).unwrap(), 0x5678);
/// ```
#[inline]
pub fn read_u16_le(data: &[u8], offset: usize) -> BinaryResult<u16> {
    if offset + 2 > data.len() {
        return Err(BinaryError::InsufficientData {
            expected: offset + 2,
            available: data.len(),
        });
    }
    U16::<LE>::read_from_bytes(&data[offset..offset + 2])
        .map(|v| v.get())
        .map_err(|_| BinaryError::ParseError("Failed to read u16".to_string()))
}

/// Read a little-endian u32 from a byte slice at the given offset.
///
/// # Examples
///
/// ```
/// use xlsbiff::common::binary::read_u32_le;
/// let data = [0x78, 0x56, 0x34, 0x12];
/// assert_eq!(read_u32_le(&data, 0).unwrap(), 0x12345678);
/// ```
#[inline]
pub fn read_u32_le(data: &[u8], offset: usize) -> BinaryResult<u32> {
    if offset + 4 > data.len() {
        return Err(BinaryError::InsufficientData {
            expected: offset + 4,
            available: data.len(),
        });
    }
    U32::<LE>::read_from_bytes(&data[offset..offset + 4])
        .map(|v| v.get())
        .map_err(|_| BinaryError::ParseError("Failed to read u32".to_string()))
}

/// Read a little-endian f64 from a byte slice at the given offset.
///
/// # Examples
///
/// ```
/// use xlsbiff::common::binary::read_f64_le;
/// let data = [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xF0, 0x3F];
/// assert!((read_f64_le(&data, 0).unwrap() - 1.0).abs() < f64::EPSILON);
/// ```
#[inline]
pub fn read_f64_le(data: &[u8], offset: usize) -> BinaryResult<f64> {
    if offset + 8 > data.len() {
        return Err(BinaryError::InsufficientData {
            expected: offset + 8,
            available: data.len(),
        });
    }
    F64::<LE>::read_from_bytes(&data[offset..offset + 8])
        .map(|v| v.get())
        .map_err(|_| BinaryError::ParseError("Failed to read f64".to_string()))
}

/// Decode UTF-16LE code units into a `String`.
///
/// A trailing odd byte is ignored. Unpaired surrogates are replaced with
/// U+FFFD rather than failing the whole string.
///
/// # Examples
///
/// ```
/// use xlsbiff::common::binary::decode_utf16le;
/// let data = [0x48, 0x00, 0x69, 0x00];
/// assert_eq!(decode_utf16le(&data), "Hi");
/// ```
pub fn decode_utf16le(data: &[u8]) -> String {
    let units = data
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]));
    char::decode_utf16(units)
        .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

/// Forward-only reader over one record payload.
///
/// All reads are bounds-checked; a failed read leaves the cursor where it was.
#[derive(Debug, Clone)]
pub struct RecordCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> RecordCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        RecordCursor { data, pos: 0 }
    }

    /// Bytes consumed so far.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left before the end of the payload.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    #[inline]
    pub fn read_u8(&mut self) -> BinaryResult<u8> {
        let b = *self
            .data
            .get(self.pos)
            .ok_or(BinaryError::InsufficientData {
                expected: self.pos + 1,
                available: self.data.len(),
            })?;
        self.pos += 1;
        Ok(b)
    }

    #[inline]
    pub fn read_u16(&mut self) -> BinaryResult<u16> {
        let v = read_u16_le(self.data, self.pos)?;
        self.pos += 2;
        Ok(v)
    }

    #[inline]
    pub fn read_u32(&mut self) -> BinaryResult<u32> {
        let v = read_u32_le(self.data, self.pos)?;
        self.pos += 4;
        Ok(v)
    }

    #[inline]
    pub fn read_f64(&mut self) -> BinaryResult<f64> {
        let v = read_f64_le(self.data, self.pos)?;
        self.pos += 8;
        Ok(v)
    }

    /// Read exactly `len` bytes.
    pub fn read_bytes(&mut self, len: usize) -> BinaryResult<&'a [u8]> {
        if len > self.remaining() {
            return Err(BinaryError::InsufficientData {
                expected: self.pos + len,
                available: self.data.len(),
            });
        }
        let out = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    /// Read a fixed-size array, e.g. the 8-byte cached formula result.
    pub fn read_array<const N: usize>(&mut self) -> BinaryResult<[u8; N]> {
        let bytes = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    /// Read up to `len` bytes, returning fewer when the payload ends first.
    pub fn take_up_to(&mut self, len: usize) -> &'a [u8] {
        let n = len.min(self.remaining());
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        out
    }

    /// Skip exactly `len` bytes.
    pub fn skip(&mut self, len: usize) -> BinaryResult<()> {
        self.read_bytes(len).map(|_| ())
    }

    /// Skip up to `len` bytes and return how many were actually skipped.
    pub fn skip_up_to(&mut self, len: usize) -> usize {
        self.take_up_to(len).len()
    }

    /// Everything not yet consumed.
    pub fn rest(&mut self) -> &'a [u8] {
        self.take_up_to(self.remaining())
    }
}
