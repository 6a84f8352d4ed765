//! The message trait, the merge engine, and serialization entry points.
//!
//! A message type implements [`Message`] by describing its known fields;
//! everything else is generic: the merge loop walks keys and dispatches each
//! to the message, falling through to raw unknown-field capture, and
//! serialization mirrors the same field set back out through the two-pass
//! writer.

use core::cell::Cell;
use core::hash::{Hash, Hasher};

use bytes::Bytes;

use crate::error::{DecodeError, EncodeError};
use crate::extension::ExtensionRegistry;
use crate::field_set::FieldSet;
use crate::reader::Reader;
use crate::wire::{encoded_key_len, len_prefixed_size, FieldKey, WireType};
use crate::writer::Writer;

/// A wire-format message.
///
/// Implementations handle their statically known fields; unknown and
/// extension data lives in the embedded [`FieldSet`] and is managed by the
/// merge engine and the serialization helpers in this module.
pub trait Message: Default + Sized {
    /// Fully qualified message type name, used for extension-registry lookups
    /// and error reporting.
    const NAME: &'static str;

    /// Merges one occurrence of a known field.
    ///
    /// Returns `Ok(false)` without consuming anything when the field number
    /// is not statically known; the engine then captures the payload raw.
    /// Singular fields overwrite, repeated fields append.
    fn merge_field(&mut self, key: FieldKey, reader: &mut Reader<'_>) -> Result<bool, DecodeError>;

    /// Writes every populated known field, then the stored unknown fields.
    fn write_fields(&self, writer: &mut Writer<'_>) -> Result<(), EncodeError>;

    /// Exact number of bytes [`Message::write_fields`] will emit.
    fn compute_size(&self) -> usize;

    /// Whether every schema-required field is present, recursively. Checked
    /// by the `parse` entry points only; merging never enforces it.
    fn is_initialized(&self) -> bool {
        true
    }

    fn field_set(&self) -> &FieldSet;
    fn field_set_mut(&mut self) -> &mut FieldSet;

    /// The message's size memo, if it carries one. The default is none:
    /// sizes are recomputed on every serialization.
    fn cached_size(&self) -> Option<&CachedSize> {
        None
    }
}

/// An opt-in memo of the last computed serialized size.
///
/// Deliberately not invalidated by mutation: it is refreshed by
/// [`serialize_to_vec`] and trusted only immediately after a size pass, the
/// one window where nested sizes get re-read during the write pass. Message
/// equality and hashing ignore it.
#[derive(Debug, Clone, Default)]
pub struct CachedSize(Cell<usize>);

impl CachedSize {
    pub fn get(&self) -> usize {
        self.0.get()
    }

    pub fn set(&self, size: usize) {
        self.0.set(size);
    }
}

impl PartialEq for CachedSize {
    fn eq(&self, _: &Self) -> bool {
        true
    }
}

impl Eq for CachedSize {}

impl Hash for CachedSize {
    fn hash<H: Hasher>(&self, _: &mut H) {}
}

// === Merge entry points ===

/// Merges fields from `data` into `message` in place.
///
/// Later singular occurrences overwrite, repeated occurrences append, and
/// unrecognized field numbers are captured raw. The required-field check is
/// skipped; use [`parse_from_slice`] to enforce it.
pub fn merge_from_slice<M: Message>(message: &mut M, data: &[u8]) -> Result<(), DecodeError> {
    let mut reader = Reader::new(data);
    merge_scoped(message, &mut reader)
}

/// Merges fields from a caller-configured reader until its current scope
/// ends.
pub fn merge_scoped<M: Message>(
    message: &mut M,
    reader: &mut Reader<'_>,
) -> Result<(), DecodeError> {
    merge_until_group_end(message, reader, None)
}

/// Parses a new message from `data`, then runs the required-field check.
pub fn parse_from_slice<M: Message>(data: &[u8]) -> Result<M, DecodeError> {
    let mut reader = Reader::new(data);
    parse_from_reader(&mut reader)
}

/// Parses a new message from `data` with a registry attached, so registered
/// extension payloads are validated during the merge.
pub fn parse_with_registry<M: Message>(
    data: &[u8],
    registry: &ExtensionRegistry,
) -> Result<M, DecodeError> {
    let mut reader = Reader::new(data);
    reader.set_registry(registry);
    parse_from_reader(&mut reader)
}

fn parse_from_reader<M: Message>(reader: &mut Reader<'_>) -> Result<M, DecodeError> {
    let mut message = M::default();
    merge_scoped(&mut message, reader)?;
    if !message.is_initialized() {
        return Err(DecodeError::Uninitialized(M::NAME));
    }
    Ok(message)
}

/// The merge loop.
///
/// Inside a group (`group` is the group's field number) the matching
/// end-group key terminates normally; any other end-group key is mismatched.
/// At the top level an end-group key has no enclosing group to end.
fn merge_until_group_end<M: Message>(
    message: &mut M,
    reader: &mut Reader<'_>,
    group: Option<u32>,
) -> Result<(), DecodeError> {
    while let Some(key) = reader.read_key()? {
        if key.wire_type() == WireType::EndGroup {
            return match group {
                Some(expected) if key.field_number() == expected => Ok(()),
                Some(expected) => Err(DecodeError::MismatchedGroupEnd {
                    expected,
                    found: key.field_number(),
                }),
                None => Err(DecodeError::UnexpectedGroupEnd),
            };
        }
        if message.merge_field(key, reader)? {
            continue;
        }
        capture_unknown(message, key, reader)?;
    }
    match group {
        Some(field_number) => Err(DecodeError::UnterminatedGroup(field_number)),
        None => Ok(()),
    }
}

/// Captures one unrecognized field as a raw entry: the exact payload span,
/// inner framing bytes included.
fn capture_unknown<M: Message>(
    message: &mut M,
    key: FieldKey,
    reader: &mut Reader<'_>,
) -> Result<(), DecodeError> {
    let start = reader.pos();
    // End-group keys were already handled by the merge loop, so this always
    // consumes a payload.
    reader.skip_field(key)?;
    let payload = Bytes::copy_from_slice(reader.slice_from(start));

    if let Some(registry) = reader.registry() {
        if let Some(ext) = registry.find(M::NAME, key.field_number()) {
            ext.validate_entry(key.wire_type(), &payload)?;
        }
    }

    message
        .field_set_mut()
        .push_raw(key, payload)
        .map_err(|_| DecodeError::Programming {
            reason: "merge into a frozen message",
        })
}

// === Serialization entry points ===

/// Serializes `message` into a buffer of exactly its computed size.
pub fn serialize_to_vec<M: Message>(message: &M) -> Result<Vec<u8>, EncodeError> {
    let size = message.compute_size();
    if let Some(cached) = message.cached_size() {
        cached.set(size);
    }
    let mut buf = vec![0u8; size];
    let mut writer = Writer::new(&mut buf);
    message.write_fields(&mut writer)?;
    if writer.written() != size {
        return Err(EncodeError::SizeMismatch {
            computed: size,
            written: writer.written(),
        });
    }
    Ok(buf)
}

/// Serializes `message` preceded by a length varint, the framing that lets
/// back-to-back messages share one stream.
pub fn serialize_delimited_to_vec<M: Message>(message: &M) -> Result<Vec<u8>, EncodeError> {
    let size = message.compute_size();
    if let Some(cached) = message.cached_size() {
        cached.set(size);
    }
    let mut buf = vec![0u8; len_prefixed_size(size)];
    let total = buf.len();
    let mut writer = Writer::new(&mut buf);
    writer.write_varint64(size as u64)?;
    message.write_fields(&mut writer)?;
    if writer.written() != total {
        return Err(EncodeError::SizeMismatch {
            computed: total,
            written: writer.written(),
        });
    }
    Ok(buf)
}

/// Parses one length-delimited message off the reader, leaving the cursor on
/// the next frame.
pub fn parse_delimited_from<M: Message>(reader: &mut Reader<'_>) -> Result<M, DecodeError> {
    let len = reader.read_len()?;
    reader.push_limit(len)?;
    let mut message = M::default();
    merge_scoped(&mut message, reader)?;
    reader.pop_limit();
    if !message.is_initialized() {
        return Err(DecodeError::Uninitialized(M::NAME));
    }
    Ok(message)
}

// === Nested field helpers for Message implementations ===

/// Merges a length-delimited nested message field into `field`.
pub fn merge_message_field<M: Message>(
    field: &mut M,
    reader: &mut Reader<'_>,
) -> Result<(), DecodeError> {
    let len = reader.read_len()?;
    reader.push_limit(len)?;
    reader.enter_recursion()?;
    merge_until_group_end(field, reader, None)?;
    reader.exit_recursion();
    reader.pop_limit();
    Ok(())
}

/// Writes a nested message field: key, length prefix, fields.
pub fn write_message_field<M: Message>(
    writer: &mut Writer<'_>,
    field_number: u32,
    message: &M,
) -> Result<(), EncodeError> {
    writer.write_key(field_number, WireType::LengthDelimited)?;
    writer.write_varint64(message.compute_size() as u64)?;
    message.write_fields(writer)
}

/// Encoded length of a nested message field, key and prefix included.
pub fn message_field_size<M: Message>(field_number: u32, message: &M) -> usize {
    encoded_key_len(field_number) + len_prefixed_size(message.compute_size())
}

/// Merges a group field into `field`, consuming the matching end-group key.
pub fn merge_group_field<M: Message>(
    field: &mut M,
    field_number: u32,
    reader: &mut Reader<'_>,
) -> Result<(), DecodeError> {
    reader.enter_recursion()?;
    merge_until_group_end(field, reader, Some(field_number))?;
    reader.exit_recursion();
    Ok(())
}

/// Writes a group field: start key, fields, end key.
pub fn write_group_field<M: Message>(
    writer: &mut Writer<'_>,
    field_number: u32,
    message: &M,
) -> Result<(), EncodeError> {
    writer.write_key(field_number, WireType::StartGroup)?;
    message.write_fields(writer)?;
    writer.write_key(field_number, WireType::EndGroup)
}

/// Encoded length of a group field, both delimiter keys included.
pub fn group_field_size<M: Message>(field_number: u32, message: &M) -> usize {
    2 * encoded_key_len(field_number) + message.compute_size()
}
