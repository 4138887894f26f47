//! Low-level endian-aware reads over a seekable byte source.

use std::io::{Read, Seek, SeekFrom};

use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use encoding_rs::Encoding;

use super::types::error::{DtaError, Result};
use super::types::models::ByteOrder;

/// Wraps a seekable binary source and exposes typed primitive reads.
///
/// The byte-order mode is mutable state, set once after the header's order
/// marker has been decoded; it affects only reads issued after the change.
/// Every fixed-size read either consumes exactly the stated bytes or fails
/// with [`DtaError::UnexpectedEof`] naming the offset.
#[derive(Debug)]
pub struct ByteReader<R> {
    inner: R,
    order: ByteOrder,
    len: u64,
}

impl<R: Read + Seek> ByteReader<R> {
    /// Takes ownership of the source and caches its total length.
    ///
    /// The source is left positioned at offset 0.
    pub fn new(mut inner: R) -> Result<Self> {
        let len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(0))?;
        Ok(Self {
            inner,
            order: ByteOrder::LittleEndian,
            len,
        })
    }

    /// Total length of the underlying source, in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn order(&self) -> ByteOrder {
        self.order
    }

    pub fn set_order(&mut self, order: ByteOrder) {
        self.order = order;
    }

    pub fn position(&mut self) -> Result<u64> {
        Ok(self.inner.stream_position()?)
    }

    pub fn seek(&mut self, pos: u64) -> Result<()> {
        self.inner.seek(SeekFrom::Start(pos))?;
        Ok(())
    }

    pub fn skip(&mut self, n: u64) -> Result<()> {
        self.inner.seek(SeekFrom::Current(n as i64))?;
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.map_eof(|r| r.inner.read_u8(), "u8")
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.map_eof(
            |r| match r.order {
                ByteOrder::LittleEndian => r.inner.read_u16::<LittleEndian>(),
                ByteOrder::BigEndian => r.inner.read_u16::<BigEndian>(),
            },
            "u16",
        )
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.map_eof(
            |r| match r.order {
                ByteOrder::LittleEndian => r.inner.read_u32::<LittleEndian>(),
                ByteOrder::BigEndian => r.inner.read_u32::<BigEndian>(),
            },
            "u32",
        )
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.map_eof(
            |r| match r.order {
                ByteOrder::LittleEndian => r.inner.read_u64::<LittleEndian>(),
                ByteOrder::BigEndian => r.inner.read_u64::<BigEndian>(),
            },
            "u64",
        )
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(self.read_u16()? as i16)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.read_u32()? as i32)
    }

    /// Reads the raw 32 bits with the current byte order and reinterprets
    /// them as an IEEE 754 single.
    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    /// Reads the raw 64 bits with the current byte order and reinterprets
    /// them as an IEEE 754 double.
    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_bits(self.read_u64()?))
    }

    /// Reads exactly `n` bytes into a fresh buffer; short reads fail.
    pub fn read_exact_vec(&mut self, n: usize, context: &'static str) -> Result<Vec<u8>> {
        let offset = self.position()?;
        let mut buf = vec![0u8; n];
        self.inner.read_exact(&mut buf).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                DtaError::UnexpectedEof { context, offset }
            } else {
                DtaError::Io(e)
            }
        })?;
        Ok(buf)
    }

    /// Reads exactly `max` bytes and decodes the prefix before the first
    /// NUL (or the whole field if none) with the given encoding.
    pub fn read_nul_padded(
        &mut self,
        max: usize,
        encoding: &'static Encoding,
        context: &'static str,
    ) -> Result<String> {
        let buf = self.read_exact_vec(max, context)?;
        Ok(decode_nul_terminated(&buf, encoding))
    }

    fn map_eof<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> std::io::Result<T>,
        context: &'static str,
    ) -> Result<T> {
        let offset = self.inner.stream_position()?;
        f(self).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                DtaError::UnexpectedEof { context, offset }
            } else {
                DtaError::Io(e)
            }
        })
    }
}

/// Decodes the prefix of `bytes` before the first NUL with `encoding`.
///
/// An unterminated field decodes in full; an empty prefix is the empty
/// string, which is a legal value.
pub fn decode_nul_terminated(bytes: &[u8], encoding: &'static Encoding) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    let (text, _, _) = encoding.decode(&bytes[..end]);
    text.into_owned()
}
