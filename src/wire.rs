//! Field keys and wire types for the protobuf wire format.
//!
//! Every encoded field starts with a key: the field number and the payload's
//! framing packed into a single varint as `(field_number << 3) | wire_type`.
//! See <https://protobuf.dev/programming-guides/encoding> under "Message
//! Structure".

use core::fmt;

use crate::error::DecodeError;
use crate::varint::Varint;

/// Minimum valid field number.
pub const MIN_FIELD_NUMBER: u32 = 1;
/// Maximum valid field number.
pub const MAX_FIELD_NUMBER: u32 = (1 << 29) - 1;

/// The 3-bit code selecting a field's payload framing.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum WireType {
    /// Variable length integer: `int32`, `int64`, `uint32`, `uint64`,
    /// `sint32`, `sint64`, `bool`, `enum`.
    Varint = 0,
    /// 64-bit little-endian: `fixed64`, `sfixed64`, `double`.
    Fixed64 = 1,
    /// Length-prefixed: `string`, `bytes`, `message`, packed repeated fields.
    LengthDelimited = 2,
    /// Start of a group.
    StartGroup = 3,
    /// End of a group.
    EndGroup = 4,
    /// 32-bit little-endian: `fixed32`, `sfixed32`, `float`.
    Fixed32 = 5,
}

impl WireType {
    /// Try to decode a [`WireType`] from its raw 3-bit value.
    #[inline]
    pub fn from_raw(value: u8) -> Result<Self, DecodeError> {
        match value {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::Fixed64),
            2 => Ok(WireType::LengthDelimited),
            3 => Ok(WireType::StartGroup),
            4 => Ok(WireType::EndGroup),
            5 => Ok(WireType::Fixed32),
            _ => Err(DecodeError::InvalidWireType(value)),
        }
    }

    /// The raw 3-bit value of this [`WireType`].
    #[inline]
    pub const fn into_raw(self) -> u8 {
        self as u8
    }
}

/// A validated field key: field number plus [`WireType`], packed the way the
/// wire stores them.
///
/// Bits 0-2 hold the wire type (0-5), bits 3-31 the field number
/// (1 to 2^29-1). Construction validates both, so the accessors cannot fail
/// and decoding a key always recovers the exact pair that produced it.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct FieldKey(u32);

impl FieldKey {
    /// Packs a field number and wire type into a key.
    ///
    /// The field number must be in `1..=2^29-1`; out-of-range numbers are a
    /// caller bug, checked in debug builds.
    #[inline]
    pub const fn new(field_number: u32, wire_type: WireType) -> Self {
        debug_assert!(field_number >= MIN_FIELD_NUMBER && field_number <= MAX_FIELD_NUMBER);
        FieldKey((field_number << 3) | wire_type as u32)
    }

    /// Validates a raw key value decoded off the wire.
    #[inline]
    pub fn try_from_raw(raw: u32) -> Result<Self, DecodeError> {
        let wire_type_raw = (raw & 0b111) as u8;
        WireType::from_raw(wire_type_raw)?;

        let field_number = raw >> 3;
        if field_number < MIN_FIELD_NUMBER || field_number > MAX_FIELD_NUMBER {
            return Err(DecodeError::FieldNumberOutOfRange);
        }

        Ok(FieldKey(raw))
    }

    /// Returns the field number component of this key.
    #[inline]
    pub const fn field_number(self) -> u32 {
        self.0 >> 3
    }

    /// Returns the [`WireType`] component of this key.
    #[inline]
    pub const fn wire_type(self) -> WireType {
        // Validated at construction; 5 is the largest reachable value.
        match self.0 & 0b111 {
            0 => WireType::Varint,
            1 => WireType::Fixed64,
            2 => WireType::LengthDelimited,
            3 => WireType::StartGroup,
            4 => WireType::EndGroup,
            _ => WireType::Fixed32,
        }
    }

    /// Decomposes this key into its field number and [`WireType`].
    #[inline]
    pub const fn into_parts(self) -> (u32, WireType) {
        (self.field_number(), self.wire_type())
    }

    /// The packed varint value of this key.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldKey")
            .field("field_number", &self.field_number())
            .field("wire_type", &self.wire_type())
            .finish()
    }
}

/// Returns the encoded length of a field key.
///
/// The wire type never affects the length since it only occupies the low
/// 3 bits.
#[inline]
pub fn encoded_key_len(field_number: u32) -> usize {
    (field_number << 3).encoded_varint_len()
}

/// Returns the encoded length of a length-prefixed payload of `len` bytes,
/// prefix included.
#[inline]
pub fn len_prefixed_size(len: usize) -> usize {
    (len as u64).encoded_varint_len() + len
}
