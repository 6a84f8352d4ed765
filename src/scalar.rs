//! Scalar field kinds and repeated-field helpers.
//!
//! Each representable kind implements [`Scalar`]; the wrapper newtypes select
//! the alternate encodings (`sint32` zigzag, `fixed32` little-endian, ...)
//! that share a Rust primitive with the default varint kinds.

use bytes::Bytes;

use crate::error::{DecodeError, EncodeError};
use crate::reader::Reader;
use crate::varint::{
    zigzag_decode_32, zigzag_decode_64, zigzag_encode_32, zigzag_encode_64, Varint,
};
use crate::wire::{encoded_key_len, len_prefixed_size, FieldKey, WireType};
use crate::writer::Writer;

/// A value with a fixed wire-format encoding.
///
/// `read` consumes exactly one encoded value (length prefix included for
/// length-delimited kinds) and `size` is the exact length `write` will emit;
/// neither touches the field key.
pub trait Scalar: Sized + Default + Clone {
    /// The wire type this kind is framed with.
    const WIRE_TYPE: WireType;

    fn read(reader: &mut Reader<'_>) -> Result<Self, DecodeError>;
    fn write(&self, writer: &mut Writer<'_>) -> Result<(), EncodeError>;
    fn size(&self) -> usize;
}

macro_rules! impl_varint_scalar {
    ($($ty:ty => ($read:expr, $to_u64:expr)),+ $(,)?) => {$(
        impl Scalar for $ty {
            const WIRE_TYPE: WireType = WireType::Varint;

            #[inline]
            fn read(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
                reader.read_varint64().map($read)
            }

            #[inline]
            fn write(&self, writer: &mut Writer<'_>) -> Result<(), EncodeError> {
                writer.write_varint64($to_u64(*self))
            }

            #[inline]
            fn size(&self) -> usize {
                $to_u64(*self).encoded_varint_len()
            }
        }
    )+};
}

impl_varint_scalar! {
    u64 => (|v| v, |v| v),
    u32 => (|v: u64| v as u32, |v| u64::from(v)),
    // int32/int64 are encoded sign-extended to 64 bits, so negative values
    // always occupy ten bytes.
    i64 => (|v: u64| v as i64, |v: i64| v as u64),
    i32 => (|v: u64| v as i32, |v: i32| v as i64 as u64),
    bool => (|v: u64| v != 0, |v: bool| u64::from(v)),
}

/// Zigzag-encoded signed 32-bit integer (`sint32`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(transparent)]
pub struct Sint32(pub i32);

impl core::ops::Deref for Sint32 {
    type Target = i32;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Scalar for Sint32 {
    const WIRE_TYPE: WireType = WireType::Varint;

    #[inline]
    fn read(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        reader.read_varint32().map(|v| Sint32(zigzag_decode_32(v)))
    }

    #[inline]
    fn write(&self, writer: &mut Writer<'_>) -> Result<(), EncodeError> {
        writer.write_varint32(zigzag_encode_32(self.0))
    }

    #[inline]
    fn size(&self) -> usize {
        zigzag_encode_32(self.0).encoded_varint_len()
    }
}

/// Zigzag-encoded signed 64-bit integer (`sint64`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(transparent)]
pub struct Sint64(pub i64);

impl core::ops::Deref for Sint64 {
    type Target = i64;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Scalar for Sint64 {
    const WIRE_TYPE: WireType = WireType::Varint;

    #[inline]
    fn read(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        reader.read_varint64().map(|v| Sint64(zigzag_decode_64(v)))
    }

    #[inline]
    fn write(&self, writer: &mut Writer<'_>) -> Result<(), EncodeError> {
        writer.write_varint64(zigzag_encode_64(self.0))
    }

    #[inline]
    fn size(&self) -> usize {
        zigzag_encode_64(self.0).encoded_varint_len()
    }
}

macro_rules! impl_fixed_scalar {
    ($($(#[$doc:meta])* $name:ident($inner:ty): $wire:ident, $width:expr, $read:ident($from:expr), $write:ident($to:expr);)+) => {$(
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Default)]
        #[repr(transparent)]
        pub struct $name(pub $inner);

        impl core::ops::Deref for $name {
            type Target = $inner;
            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl Scalar for $name {
            const WIRE_TYPE: WireType = WireType::$wire;

            #[inline]
            fn read(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
                reader.$read().map(|v| $name($from(v)))
            }

            #[inline]
            fn write(&self, writer: &mut Writer<'_>) -> Result<(), EncodeError> {
                writer.$write($to(self.0))
            }

            #[inline]
            fn size(&self) -> usize {
                $width
            }
        }
    )+};
}

impl_fixed_scalar! {
    /// Little-endian unsigned 32-bit integer (`fixed32`).
    Fixed32(u32): Fixed32, 4, read_fixed32(|v| v), write_fixed32(|v| v);
    /// Little-endian unsigned 64-bit integer (`fixed64`).
    Fixed64(u64): Fixed64, 8, read_fixed64(|v| v), write_fixed64(|v| v);
    /// Little-endian signed 32-bit integer (`sfixed32`).
    Sfixed32(i32): Fixed32, 4, read_fixed32(|v| v as i32), write_fixed32(|v: i32| v as u32);
    /// Little-endian signed 64-bit integer (`sfixed64`).
    Sfixed64(i64): Fixed64, 8, read_fixed64(|v| v as i64), write_fixed64(|v: i64| v as u64);
}

impl Scalar for f32 {
    const WIRE_TYPE: WireType = WireType::Fixed32;

    #[inline]
    fn read(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        reader.read_fixed32().map(f32::from_bits)
    }

    #[inline]
    fn write(&self, writer: &mut Writer<'_>) -> Result<(), EncodeError> {
        writer.write_fixed32(self.to_bits())
    }

    #[inline]
    fn size(&self) -> usize {
        4
    }
}

impl Scalar for f64 {
    const WIRE_TYPE: WireType = WireType::Fixed64;

    #[inline]
    fn read(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        reader.read_fixed64().map(f64::from_bits)
    }

    #[inline]
    fn write(&self, writer: &mut Writer<'_>) -> Result<(), EncodeError> {
        writer.write_fixed64(self.to_bits())
    }

    #[inline]
    fn size(&self) -> usize {
        8
    }
}

impl Scalar for String {
    const WIRE_TYPE: WireType = WireType::LengthDelimited;

    fn read(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let len = reader.read_len()?;
        let raw = reader.read_exact(len)?;
        core::str::from_utf8(raw)
            .map(str::to_owned)
            .map_err(|_| DecodeError::InvalidUtf8)
    }

    fn write(&self, writer: &mut Writer<'_>) -> Result<(), EncodeError> {
        writer.write_len_prefixed(self.as_bytes())
    }

    fn size(&self) -> usize {
        len_prefixed_size(self.len())
    }
}

impl Scalar for Bytes {
    const WIRE_TYPE: WireType = WireType::LengthDelimited;

    fn read(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let len = reader.read_len()?;
        reader.read_exact(len).map(Bytes::copy_from_slice)
    }

    fn write(&self, writer: &mut Writer<'_>) -> Result<(), EncodeError> {
        writer.write_len_prefixed(self)
    }

    fn size(&self) -> usize {
        len_prefixed_size(self.len())
    }
}

// === Field helpers ===

/// Writes one singular field: key plus value.
#[inline]
pub fn write_field<T: Scalar>(
    writer: &mut Writer<'_>,
    field_number: u32,
    value: &T,
) -> Result<(), EncodeError> {
    writer.write_key(field_number, T::WIRE_TYPE)?;
    value.write(writer)
}

/// Encoded length of one singular field, key included.
#[inline]
pub fn field_size<T: Scalar>(field_number: u32, value: &T) -> usize {
    encoded_key_len(field_number) + value.size()
}

/// Merges one wire occurrence of a repeated scalar field.
///
/// Framing is dispatched on the wire type actually observed, not the field's
/// declared packing: a length-delimited occurrence of a non-length-delimited
/// kind is a packed run and contributes every element inside it; anything
/// else contributes a single element.
pub fn merge_repeated<T: Scalar>(
    reader: &mut Reader<'_>,
    key: FieldKey,
    values: &mut Vec<T>,
) -> Result<(), DecodeError> {
    if key.wire_type() == WireType::LengthDelimited && T::WIRE_TYPE != WireType::LengthDelimited {
        let len = reader.read_len()?;
        reader.push_limit(len)?;
        while !reader.at_end() {
            values.push(T::read(reader)?);
        }
        reader.pop_limit();
    } else {
        if values.is_empty() {
            // Encoders emit repeated fields contiguously; size the backing
            // storage for that case up front.
            let run = reader.repeated_run_len(key)?;
            values.reserve(run);
        }
        values.push(T::read(reader)?);
    }
    Ok(())
}

/// Writes a repeated field unpacked: one key per element.
pub fn write_repeated_unpacked<T: Scalar>(
    writer: &mut Writer<'_>,
    field_number: u32,
    values: &[T],
) -> Result<(), EncodeError> {
    for value in values {
        write_field(writer, field_number, value)?;
    }
    Ok(())
}

/// Encoded length of an unpacked repeated field.
pub fn repeated_unpacked_size<T: Scalar>(field_number: u32, values: &[T]) -> usize {
    values.iter().map(|v| field_size(field_number, v)).sum()
}

/// Writes a repeated numeric field packed: one key, one length-prefixed run.
///
/// Empty fields emit nothing.
pub fn write_repeated_packed<T: Scalar>(
    writer: &mut Writer<'_>,
    field_number: u32,
    values: &[T],
) -> Result<(), EncodeError> {
    if values.is_empty() {
        return Ok(());
    }
    writer.write_key(field_number, WireType::LengthDelimited)?;
    let body: usize = values.iter().map(Scalar::size).sum();
    writer.write_varint64(body as u64)?;
    for value in values {
        value.write(writer)?;
    }
    Ok(())
}

/// Encoded length of a packed repeated field.
pub fn repeated_packed_size<T: Scalar>(field_number: u32, values: &[T]) -> usize {
    if values.is_empty() {
        return 0;
    }
    let body: usize = values.iter().map(Scalar::size).sum();
    encoded_key_len(field_number) + len_prefixed_size(body)
}
