//! # XDR Codec
//!
//! Minimal RFC 4506 reader/writer for the ledger's interchange format.
//!
//! XDR is simple enough that a full code generator would be overkill for the
//! handful of structures a native payment needs:
//!
//! - every integer is big-endian, 4 or 8 bytes;
//! - every item is padded with zeros to a multiple of 4 bytes;
//! - variable-length data is prefixed with a `u32` length;
//! - unions are a `u32`/`i32` discriminant followed by the arm;
//! - optionals are a `bool` (as `u32` 0/1) followed by the value.
//!
//! The reader is strict. Non-zero padding, lengths over the declared
//! maximum, booleans other than 0/1, and trailing bytes after the top-level
//! value are all rejected. Envelopes parsed from outside the crate are
//! untrusted, and a lenient decoder would let two different byte strings
//! decode to the same envelope but hash differently.

use crate::error::SigningError;

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Types with a canonical XDR encoding.
pub trait WriteXdr {
    fn write_xdr(&self, w: &mut XdrWriter);

    /// Encodes `self` into a fresh buffer.
    fn to_xdr(&self) -> Vec<u8> {
        let mut w = XdrWriter::new();
        self.write_xdr(&mut w);
        w.into_bytes()
    }
}

/// Types that can be decoded from XDR.
pub trait ReadXdr: Sized {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, SigningError>;

    /// Decodes a complete value; trailing bytes are an error.
    fn from_xdr(bytes: &[u8]) -> Result<Self, SigningError> {
        let mut r = XdrReader::new(bytes);
        let value = Self::read_xdr(&mut r)?;
        r.finish()?;
        Ok(value)
    }
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Append-only XDR encoder.
#[derive(Debug, Default)]
pub struct XdrWriter {
    buf: Vec<u8>,
}

impl XdrWriter {
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(256),
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_bool(&mut self, v: bool) {
        self.write_u32(v as u32);
    }

    /// `opaque[n]`: raw bytes plus padding, no length prefix.
    pub fn write_fixed_opaque(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
        self.pad(bytes.len());
    }

    /// `opaque<max>`: length prefix, bytes, padding.
    ///
    /// Callers validate `max` before constructing the value being written,
    /// so an overlong input here is a bug, not bad data.
    pub fn write_var_opaque(&mut self, bytes: &[u8], max: usize) {
        debug_assert!(bytes.len() <= max, "var opaque exceeds declared maximum");
        self.write_u32(bytes.len() as u32);
        self.write_fixed_opaque(bytes);
    }

    /// `string<max>`; same layout as `opaque<max>`.
    pub fn write_string(&mut self, s: &str, max: usize) {
        self.write_var_opaque(s.as_bytes(), max);
    }

    /// Length prefix for a variable-length array.
    pub fn write_len(&mut self, len: usize, max: usize) {
        debug_assert!(len <= max, "array exceeds declared maximum");
        self.write_u32(len as u32);
    }

    fn pad(&mut self, len: usize) {
        let padding = (4 - len % 4) % 4;
        self.buf.extend(std::iter::repeat(0u8).take(padding));
    }
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// Strict XDR decoder over a borrowed buffer.
#[derive(Debug)]
pub struct XdrReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> XdrReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Fails if any input is left over.
    pub fn finish(&self) -> Result<(), SigningError> {
        if self.remaining() != 0 {
            return Err(SigningError::serialization(format!(
                "{} trailing bytes after value",
                self.remaining()
            )));
        }
        Ok(())
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], SigningError> {
        if self.remaining() < n {
            return Err(SigningError::serialization(format!(
                "unexpected end of input at offset {} (needed {} bytes, {} left)",
                self.pos,
                n,
                self.remaining()
            )));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u32(&mut self) -> Result<u32, SigningError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_i32(&mut self) -> Result<i32, SigningError> {
        Ok(self.read_u32()? as i32)
    }

    pub fn read_u64(&mut self) -> Result<u64, SigningError> {
        let mut arr = [0u8; 8];
        arr.copy_from_slice(self.take(8)?);
        Ok(u64::from_be_bytes(arr))
    }

    pub fn read_i64(&mut self) -> Result<i64, SigningError> {
        Ok(self.read_u64()? as i64)
    }

    pub fn read_bool(&mut self) -> Result<bool, SigningError> {
        match self.read_u32()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(SigningError::serialization(format!(
                "invalid boolean value {other}"
            ))),
        }
    }

    /// `opaque[N]`.
    pub fn read_fixed_opaque<const N: usize>(&mut self) -> Result<[u8; N], SigningError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        self.skip_padding(N)?;
        Ok(out)
    }

    /// `opaque<max>`.
    pub fn read_var_opaque(&mut self, max: usize) -> Result<Vec<u8>, SigningError> {
        let len = self.read_len(max)?;
        let bytes = self.take(len)?.to_vec();
        self.skip_padding(len)?;
        Ok(bytes)
    }

    /// `string<max>`, which must be valid UTF-8.
    pub fn read_string(&mut self, max: usize) -> Result<String, SigningError> {
        let bytes = self.read_var_opaque(max)?;
        String::from_utf8(bytes)
            .map_err(|_| SigningError::serialization("string is not valid UTF-8"))
    }

    /// Length prefix for a variable-length array or opaque.
    pub fn read_len(&mut self, max: usize) -> Result<usize, SigningError> {
        let len = self.read_u32()? as usize;
        if len > max {
            return Err(SigningError::serialization(format!(
                "length {len} exceeds maximum {max}"
            )));
        }
        Ok(len)
    }

    fn skip_padding(&mut self, len: usize) -> Result<(), SigningError> {
        let padding = (4 - len % 4) % 4;
        if self.take(padding)?.iter().any(|b| *b != 0) {
            return Err(SigningError::serialization("non-zero padding"));
        }
        Ok(())
    }
}
