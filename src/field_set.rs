//! Storage for unknown and extension fields.
//!
//! Both arrive the same way: a field number the message does not statically
//! know, captured during merge as the key plus its exact payload span. The
//! store keeps them raw so re-serialization reproduces the original bytes
//! byte-for-byte, and decodes on demand when a descriptor supplies a type.

use bytes::Bytes;
use smallvec::SmallVec;

use crate::error::{EncodeError, ExtensionError};
use crate::extension::{Extension, Value, ValueKind};
use crate::field_map::{CompactSortedMap, FrozenError};
use crate::message::Message;
use crate::reader::Reader;
use crate::wire::{encoded_key_len, len_prefixed_size, FieldKey, WireType};
use crate::writer::Writer;

/// One raw captured field occurrence.
///
/// The payload excludes the key but includes every inner framing byte: the
/// length prefix of a length-delimited field, or the end-group key of a
/// group. Writing the key back followed by the payload reproduces the
/// original span exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnknownFieldEntry {
    pub key: FieldKey,
    pub payload: Bytes,
}

/// Per-field append-only log.
type EntryLog = SmallVec<[UnknownFieldEntry; 1]>;

/// The unknown/extension field store of one message.
///
/// Entries are grouped by field number (ascending on output) and kept in
/// encounter order within a field, which is what the last-wins rule for
/// singular fields and the ordering rule for repeated fields both key off.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldSet {
    map: CompactSortedMap<u32, EntryLog>,
}

impl FieldSet {
    pub fn new() -> Self {
        FieldSet::default()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Total number of stored entries across all field numbers.
    pub fn len(&self) -> usize {
        self.map.iter().map(|(_, log)| log.len()).sum()
    }

    pub fn clear(&mut self) -> Result<(), FrozenError> {
        self.map.clear()
    }

    /// Appends one raw occurrence captured off the wire.
    pub fn push_raw(&mut self, key: FieldKey, payload: Bytes) -> Result<(), FrozenError> {
        let log = self.map.get_or_insert_with(key.field_number(), EntryLog::new)?;
        log.push(UnknownFieldEntry { key, payload });
        Ok(())
    }

    /// All entries, ascending by field number, encounter order within each.
    pub fn iter(&self) -> impl Iterator<Item = &UnknownFieldEntry> {
        self.map.iter().flat_map(|(_, log)| log.iter())
    }

    /// The raw entries stored for one field number.
    pub fn entries(&self, field_number: u32) -> &[UnknownFieldEntry] {
        self.map.get(&field_number).map_or(&[], |log| log.as_slice())
    }

    /// Makes the store permanently immutable, per-field logs included.
    pub fn freeze(&mut self) {
        self.map.freeze_with(EntryLog::shrink_to_fit);
    }

    pub fn is_frozen(&self) -> bool {
        self.map.is_frozen()
    }

    // === Raw serialization ===

    /// Writes every stored entry back out, keys included.
    pub fn write_to(&self, writer: &mut Writer<'_>) -> Result<(), EncodeError> {
        for entry in self.iter() {
            writer.write_varint32(entry.key.raw())?;
            writer.write_raw(&entry.payload)?;
        }
        Ok(())
    }

    /// Exact number of bytes [`FieldSet::write_to`] will emit.
    pub fn compute_size(&self) -> usize {
        self.iter()
            .map(|e| encoded_key_len(e.key.field_number()) + e.payload.len())
            .sum()
    }

    // === Typed scalar access ===

    /// Decodes a singular extension, or `None` if absent.
    ///
    /// Later occurrences of a singular field override earlier ones, so only
    /// the last stored entry is decoded.
    pub fn get(&self, ext: &Extension) -> Result<Option<Value>, ExtensionError> {
        self.check_scalar(ext, false)?;
        let Some(entry) = self.entries(ext.field_number).last() else {
            return Ok(None);
        };
        let expected = ext.kind.wire_type();
        if entry.key.wire_type() != expected {
            return Err(ExtensionError::WireTypeMismatch {
                field_number: ext.field_number,
                expected,
                found: entry.key.wire_type(),
            });
        }
        let mut reader = Reader::new(&entry.payload);
        Ok(Some(Value::decode(ext.kind, &mut reader)?))
    }

    /// Decodes every occurrence of a repeated extension in encounter order.
    ///
    /// Length-delimited entries of a numeric kind are packed runs and
    /// contribute all their elements, so packed and unpacked encoders read
    /// back identically.
    pub fn get_repeated(&self, ext: &Extension) -> Result<Vec<Value>, ExtensionError> {
        self.check_scalar(ext, true)?;
        let expected = ext.kind.wire_type();
        let mut values = Vec::new();
        for entry in self.entries(ext.field_number) {
            let found = entry.key.wire_type();
            let mut reader = Reader::new(&entry.payload);
            if found == expected {
                values.push(Value::decode(ext.kind, &mut reader)?);
            } else if found == WireType::LengthDelimited && expected != WireType::LengthDelimited
            {
                let len = reader.read_len().map_err(ExtensionError::Decode)?;
                reader.push_limit(len).map_err(ExtensionError::Decode)?;
                while !reader.at_end() {
                    values.push(Value::decode(ext.kind, &mut reader)?);
                }
            } else {
                return Err(ExtensionError::WireTypeMismatch {
                    field_number: ext.field_number,
                    expected,
                    found,
                });
            }
        }
        Ok(values)
    }

    /// Replaces a singular extension's entries with `value`, or removes the
    /// field entirely when `value` is `None`.
    pub fn set(&mut self, ext: &Extension, value: Option<Value>) -> Result<(), ExtensionError> {
        self.check_scalar(ext, false)?;
        self.map.remove(&ext.field_number)?;
        let Some(value) = value else {
            return Ok(());
        };
        self.check_value_kind(ext, &value)?;
        self.push_encoded(ext.field_number, &value)
    }

    /// Replaces a repeated extension's entries with `values`, one entry per
    /// element in order.
    ///
    /// Entries are always written unpacked; the decode side's packed
    /// tolerance keeps round-trips lossless either way.
    pub fn set_repeated(&mut self, ext: &Extension, values: &[Value]) -> Result<(), ExtensionError> {
        self.check_scalar(ext, true)?;
        self.map.remove(&ext.field_number)?;
        for value in values {
            self.check_value_kind(ext, value)?;
            self.push_encoded(ext.field_number, value)?;
        }
        Ok(())
    }

    // === Typed message access ===

    /// Decodes a singular message-typed extension.
    pub fn get_message<M: Message>(&self, ext: &Extension) -> Result<Option<M>, ExtensionError> {
        self.check_message(ext, false)?;
        match self.entries(ext.field_number).last() {
            Some(entry) => decode_message_entry(ext.field_number, entry).map(Some),
            None => Ok(None),
        }
    }

    /// Decodes every occurrence of a repeated message-typed extension.
    pub fn get_repeated_message<M: Message>(
        &self,
        ext: &Extension,
    ) -> Result<Vec<M>, ExtensionError> {
        self.check_message(ext, true)?;
        self.entries(ext.field_number)
            .iter()
            .map(|entry| decode_message_entry(ext.field_number, entry))
            .collect()
    }

    /// Replaces a singular message-typed extension.
    pub fn set_message<M: Message>(
        &mut self,
        ext: &Extension,
        message: Option<&M>,
    ) -> Result<(), ExtensionError> {
        self.check_message(ext, false)?;
        self.map.remove(&ext.field_number)?;
        match message {
            Some(message) => self.push_encoded_message(ext.field_number, message),
            None => Ok(()),
        }
    }

    /// Replaces a repeated message-typed extension, one entry per element.
    pub fn set_repeated_message<M: Message>(
        &mut self,
        ext: &Extension,
        messages: &[M],
    ) -> Result<(), ExtensionError> {
        self.check_message(ext, true)?;
        self.map.remove(&ext.field_number)?;
        for message in messages {
            self.push_encoded_message(ext.field_number, message)?;
        }
        Ok(())
    }

    // === Helpers ===

    fn check_scalar(&self, ext: &Extension, repeated: bool) -> Result<(), ExtensionError> {
        if ext.kind == ValueKind::Message {
            return Err(ExtensionError::MessageTyped { field_number: ext.field_number });
        }
        if ext.repeated != repeated {
            return Err(ExtensionError::Cardinality { field_number: ext.field_number });
        }
        Ok(())
    }

    fn check_message(&self, ext: &Extension, repeated: bool) -> Result<(), ExtensionError> {
        if ext.kind != ValueKind::Message {
            return Err(ExtensionError::ValueKindMismatch {
                field_number: ext.field_number,
                expected: ext.kind,
                found: ValueKind::Message,
            });
        }
        if ext.repeated != repeated {
            return Err(ExtensionError::Cardinality { field_number: ext.field_number });
        }
        Ok(())
    }

    fn check_value_kind(&self, ext: &Extension, value: &Value) -> Result<(), ExtensionError> {
        if value.kind() != ext.kind {
            return Err(ExtensionError::ValueKindMismatch {
                field_number: ext.field_number,
                expected: ext.kind,
                found: value.kind(),
            });
        }
        Ok(())
    }

    fn push_encoded(&mut self, field_number: u32, value: &Value) -> Result<(), ExtensionError> {
        let mut buf = vec![0u8; value.size()];
        let mut writer = Writer::new(&mut buf);
        value.write(&mut writer)?;
        let key = FieldKey::new(field_number, value.wire_type());
        self.push_raw(key, Bytes::from(buf))?;
        Ok(())
    }

    fn push_encoded_message<M: Message>(
        &mut self,
        field_number: u32,
        message: &M,
    ) -> Result<(), ExtensionError> {
        let body = message.compute_size();
        let mut buf = vec![0u8; len_prefixed_size(body)];
        let total = buf.len();
        let mut writer = Writer::new(&mut buf);
        writer.write_varint64(body as u64)?;
        message.write_fields(&mut writer)?;
        if writer.written() != total {
            return Err(EncodeError::SizeMismatch {
                computed: total,
                written: writer.written(),
            }
            .into());
        }
        let key = FieldKey::new(field_number, WireType::LengthDelimited);
        self.push_raw(key, Bytes::from(buf))?;
        Ok(())
    }
}

fn decode_message_entry<M: Message>(
    field_number: u32,
    entry: &UnknownFieldEntry,
) -> Result<M, ExtensionError> {
    if entry.key.wire_type() != WireType::LengthDelimited {
        return Err(ExtensionError::WireTypeMismatch {
            field_number,
            expected: WireType::LengthDelimited,
            found: entry.key.wire_type(),
        });
    }
    let mut reader = Reader::new(&entry.payload);
    let len = reader.read_len()?;
    let body = reader.read_exact(len)?;
    let mut message = M::default();
    crate::message::merge_from_slice(&mut message, body)?;
    Ok(message)
}
