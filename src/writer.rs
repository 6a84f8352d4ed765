//! Exact-size writer for wire-format bytes.
//!
//! Serialization is two-pass: the size pass computes the exact encoded length
//! of every populated field, and this writer emits into a buffer pre-sized by
//! it. Running out of room is a [`SpaceExhausted`] error, never a
//! reallocation.
//!
//! [`SpaceExhausted`]: crate::error::EncodeError::SpaceExhausted

use crate::error::EncodeError;
use crate::varint::Varint;
use crate::wire::{WireType, MAX_FIELD_NUMBER, MIN_FIELD_NUMBER};

/// Writes wire-format bytes into a fixed-size buffer.
pub struct Writer<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> Writer<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Writer { buf, pos: 0 }
    }

    /// Bytes written so far.
    #[inline]
    pub fn written(&self) -> usize {
        self.pos
    }

    /// Bytes of room left.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    #[inline]
    fn ensure(&self, needed: usize) -> Result<(), EncodeError> {
        if self.remaining() < needed {
            return Err(EncodeError::SpaceExhausted {
                needed,
                remaining: self.remaining(),
            });
        }
        Ok(())
    }

    /// Writes raw bytes with no framing.
    pub fn write_raw(&mut self, data: &[u8]) -> Result<(), EncodeError> {
        self.ensure(data.len())?;
        self.buf[self.pos..self.pos + data.len()].copy_from_slice(data);
        self.pos += data.len();
        Ok(())
    }

    pub fn write_varint32(&mut self, value: u32) -> Result<(), EncodeError> {
        let needed = value.encoded_varint_len();
        self.ensure(needed)?;
        let written = value.encode_varint(&mut self.buf[self.pos..]);
        debug_assert_eq!(written, needed);
        self.pos += written;
        Ok(())
    }

    pub fn write_varint64(&mut self, value: u64) -> Result<(), EncodeError> {
        let needed = value.encoded_varint_len();
        self.ensure(needed)?;
        let written = value.encode_varint(&mut self.buf[self.pos..]);
        debug_assert_eq!(written, needed);
        self.pos += written;
        Ok(())
    }

    pub fn write_fixed32(&mut self, value: u32) -> Result<(), EncodeError> {
        self.write_raw(&value.to_le_bytes())
    }

    pub fn write_fixed64(&mut self, value: u64) -> Result<(), EncodeError> {
        self.write_raw(&value.to_le_bytes())
    }

    /// Writes a field key.
    pub fn write_key(&mut self, field_number: u32, wire_type: WireType) -> Result<(), EncodeError> {
        debug_assert!((MIN_FIELD_NUMBER..=MAX_FIELD_NUMBER).contains(&field_number));
        self.write_varint32((field_number << 3) | u32::from(wire_type.into_raw()))
    }

    /// Writes a length prefix followed by `data`.
    pub fn write_len_prefixed(&mut self, data: &[u8]) -> Result<(), EncodeError> {
        self.write_varint64(data.len() as u64)?;
        self.write_raw(data)
    }
}
