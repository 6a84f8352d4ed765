//! Extension descriptors, dynamically-typed values, and the registry.
//!
//! Extensions are fields a message declares room for without declaring types.
//! On the wire they are indistinguishable from unknown fields; a descriptor
//! supplies the type at access time. The representable kinds form a closed
//! set, so values are a plain enum rather than type-erased dispatch.

use std::collections::HashMap;

use bytes::Bytes;

use crate::error::{DecodeError, EncodeError};
use crate::message::Message;
use crate::reader::Reader;
use crate::scalar::{self, Scalar};
use crate::wire::WireType;
use crate::writer::Writer;

/// The declared type of an extension field.
///
/// `Message` is declarable so the registry can describe message-typed
/// extensions, but their values move through the generic message accessors
/// on [`FieldSet`](crate::field_set::FieldSet), never through [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Uint32,
    Uint64,
    Int32,
    Int64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Bool,
    Float,
    Double,
    String,
    Bytes,
    Message,
}

impl ValueKind {
    /// The wire type values of this kind are framed with when written
    /// unpacked.
    pub const fn wire_type(self) -> WireType {
        match self {
            ValueKind::Uint32
            | ValueKind::Uint64
            | ValueKind::Int32
            | ValueKind::Int64
            | ValueKind::Sint32
            | ValueKind::Sint64
            | ValueKind::Bool => WireType::Varint,
            ValueKind::Fixed32 | ValueKind::Sfixed32 | ValueKind::Float => WireType::Fixed32,
            ValueKind::Fixed64 | ValueKind::Sfixed64 | ValueKind::Double => WireType::Fixed64,
            ValueKind::String | ValueKind::Bytes | ValueKind::Message => {
                WireType::LengthDelimited
            }
        }
    }
}

/// One decoded extension value of a scalar kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Uint32(u32),
    Uint64(u64),
    Int32(i32),
    Int64(i64),
    Sint32(i32),
    Sint64(i64),
    Fixed32(u32),
    Fixed64(u64),
    Sfixed32(i32),
    Sfixed64(i64),
    Bool(bool),
    Float(f32),
    Double(f64),
    String(String),
    Bytes(Bytes),
}

impl Value {
    pub const fn kind(&self) -> ValueKind {
        match self {
            Value::Uint32(_) => ValueKind::Uint32,
            Value::Uint64(_) => ValueKind::Uint64,
            Value::Int32(_) => ValueKind::Int32,
            Value::Int64(_) => ValueKind::Int64,
            Value::Sint32(_) => ValueKind::Sint32,
            Value::Sint64(_) => ValueKind::Sint64,
            Value::Fixed32(_) => ValueKind::Fixed32,
            Value::Fixed64(_) => ValueKind::Fixed64,
            Value::Sfixed32(_) => ValueKind::Sfixed32,
            Value::Sfixed64(_) => ValueKind::Sfixed64,
            Value::Bool(_) => ValueKind::Bool,
            Value::Float(_) => ValueKind::Float,
            Value::Double(_) => ValueKind::Double,
            Value::String(_) => ValueKind::String,
            Value::Bytes(_) => ValueKind::Bytes,
        }
    }

    #[inline]
    pub(crate) fn wire_type(&self) -> WireType {
        self.kind().wire_type()
    }

    /// Decodes one value of `kind` from the reader.
    ///
    /// `kind` must not be [`ValueKind::Message`]; callers dispatch
    /// message-typed data through the message accessors before reaching here.
    pub(crate) fn decode(kind: ValueKind, reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(match kind {
            ValueKind::Uint32 => Value::Uint32(u32::read(reader)?),
            ValueKind::Uint64 => Value::Uint64(u64::read(reader)?),
            ValueKind::Int32 => Value::Int32(i32::read(reader)?),
            ValueKind::Int64 => Value::Int64(i64::read(reader)?),
            ValueKind::Sint32 => Value::Sint32(*scalar::Sint32::read(reader)?),
            ValueKind::Sint64 => Value::Sint64(*scalar::Sint64::read(reader)?),
            ValueKind::Fixed32 => Value::Fixed32(*scalar::Fixed32::read(reader)?),
            ValueKind::Fixed64 => Value::Fixed64(*scalar::Fixed64::read(reader)?),
            ValueKind::Sfixed32 => Value::Sfixed32(*scalar::Sfixed32::read(reader)?),
            ValueKind::Sfixed64 => Value::Sfixed64(*scalar::Sfixed64::read(reader)?),
            ValueKind::Bool => Value::Bool(bool::read(reader)?),
            ValueKind::Float => Value::Float(f32::read(reader)?),
            ValueKind::Double => Value::Double(f64::read(reader)?),
            ValueKind::String => Value::String(String::read(reader)?),
            ValueKind::Bytes => Value::Bytes(Bytes::read(reader)?),
            ValueKind::Message => {
                return Err(DecodeError::Programming {
                    reason: "message-typed extensions decode via their message type",
                })
            }
        })
    }

    pub(crate) fn write(&self, writer: &mut Writer<'_>) -> Result<(), EncodeError> {
        match self {
            Value::Uint32(v) => v.write(writer),
            Value::Uint64(v) => v.write(writer),
            Value::Int32(v) => v.write(writer),
            Value::Int64(v) => v.write(writer),
            Value::Sint32(v) => scalar::Sint32(*v).write(writer),
            Value::Sint64(v) => scalar::Sint64(*v).write(writer),
            Value::Fixed32(v) => scalar::Fixed32(*v).write(writer),
            Value::Fixed64(v) => scalar::Fixed64(*v).write(writer),
            Value::Sfixed32(v) => scalar::Sfixed32(*v).write(writer),
            Value::Sfixed64(v) => scalar::Sfixed64(*v).write(writer),
            Value::Bool(v) => v.write(writer),
            Value::Float(v) => v.write(writer),
            Value::Double(v) => v.write(writer),
            Value::String(v) => v.write(writer),
            Value::Bytes(v) => v.write(writer),
        }
    }

    pub(crate) fn size(&self) -> usize {
        match self {
            Value::Uint32(v) => v.size(),
            Value::Uint64(v) => v.size(),
            Value::Int32(v) => v.size(),
            Value::Int64(v) => v.size(),
            Value::Sint32(v) => scalar::Sint32(*v).size(),
            Value::Sint64(v) => scalar::Sint64(*v).size(),
            Value::Fixed32(v) => scalar::Fixed32(*v).size(),
            Value::Fixed64(v) => scalar::Fixed64(*v).size(),
            Value::Sfixed32(v) => scalar::Sfixed32(*v).size(),
            Value::Sfixed64(v) => scalar::Sfixed64(*v).size(),
            Value::Bool(v) => v.size(),
            Value::Float(v) => v.size(),
            Value::Double(v) => v.size(),
            Value::String(v) => v.size(),
            Value::Bytes(v) => v.size(),
        }
    }
}

/// An immutable extension field descriptor: number, kind, cardinality.
///
/// Descriptors carry no data; messages declare them as constants and share
/// them by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extension {
    pub field_number: u32,
    pub kind: ValueKind,
    pub repeated: bool,
}

impl Extension {
    pub const fn singular(field_number: u32, kind: ValueKind) -> Self {
        Extension { field_number, kind, repeated: false }
    }

    pub const fn repeated(field_number: u32, kind: ValueKind) -> Self {
        Extension { field_number, kind, repeated: true }
    }

    /// Decodes `payload` per this descriptor and discards the result, so a
    /// registered extension's data is validated at merge time instead of
    /// first access.
    ///
    /// Entries whose framing does not match the descriptor are left alone
    /// rather than rejected: the registry only accelerates error reporting
    /// and must never break raw round-tripping. Message kinds are skipped;
    /// the payload was already structurally validated by the field scan.
    pub(crate) fn validate_entry(
        &self,
        wire_type: WireType,
        payload: &[u8],
    ) -> Result<(), DecodeError> {
        if self.kind == ValueKind::Message {
            return Ok(());
        }
        let expected = self.kind.wire_type();
        let mut reader = Reader::new(payload);
        if wire_type == expected {
            Value::decode(self.kind, &mut reader)?;
        } else if self.repeated
            && wire_type == WireType::LengthDelimited
            && expected != WireType::LengthDelimited
        {
            // A packed run: length prefix, then back-to-back bare values.
            let len = reader.read_len()?;
            reader.push_limit(len)?;
            while !reader.at_end() {
                Value::decode(self.kind, &mut reader)?;
            }
        }
        Ok(())
    }
}

/// Maps `(host message name, field number)` to a descriptor during merge.
///
/// Purely optional: unknown and extension data round-trips byte-for-byte
/// whether or not a registry is attached, and an empty registry is valid.
#[derive(Debug, Default)]
pub struct ExtensionRegistry {
    by_field: HashMap<(&'static str, u32), Extension>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        ExtensionRegistry::default()
    }

    /// Registers `extension` as extending message type `M`.
    pub fn register<M: Message>(&mut self, extension: Extension) {
        self.by_field.insert((M::NAME, extension.field_number), extension);
    }

    pub fn find(&self, message_name: &'static str, field_number: u32) -> Option<&Extension> {
        self.by_field.get(&(message_name, field_number))
    }

    pub fn is_empty(&self) -> bool {
        self.by_field.is_empty()
    }
}
