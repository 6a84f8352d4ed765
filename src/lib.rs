//! A protobuf wire-format engine: bounded decoding, exact-size two-pass
//! encoding, in-place merging, and raw-fidelity storage for unknown and
//! extension fields.
//!
//! The pieces compose bottom-up:
//!
//! - [`varint`] and [`wire`] are the encoding primitives: base-128 integers,
//!   zigzag, and packed field keys.
//! - [`reader`] walks encoded bytes under a stack of nested length limits and
//!   a recursion guard; [`writer`] emits into a buffer pre-sized by the size
//!   pass and never reallocates.
//! - [`message`] hosts the [`Message`] trait and the merge engine that
//!   dispatches field keys to known fields or raw capture.
//! - [`field_set`] stores captured unknown/extension entries so they
//!   round-trip byte-for-byte, with typed access through [`extension`]
//!   descriptors; [`field_map`] is its compact sorted backing container.
//!
//! Malformed input fails the whole parse; there is no partial-success mode.
//!
//! ```
//! use protowire::{
//!     merge_from_slice, parse_from_slice, scalar, serialize_to_vec, DecodeError, EncodeError,
//!     FieldKey, FieldSet, Message, Reader, Scalar, WireType, Writer,
//! };
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Ping {
//!     seq: u64,
//!     unknown: FieldSet,
//! }
//!
//! impl Message for Ping {
//!     const NAME: &'static str = "example.Ping";
//!
//!     fn merge_field(&mut self, key: FieldKey, reader: &mut Reader<'_>) -> Result<bool, DecodeError> {
//!         match (key.field_number(), key.wire_type()) {
//!             (1, WireType::Varint) => {
//!                 self.seq = u64::read(reader)?;
//!                 Ok(true)
//!             }
//!             _ => Ok(false),
//!         }
//!     }
//!
//!     fn write_fields(&self, writer: &mut Writer<'_>) -> Result<(), EncodeError> {
//!         if self.seq != 0 {
//!             scalar::write_field(writer, 1, &self.seq)?;
//!         }
//!         self.unknown.write_to(writer)
//!     }
//!
//!     fn compute_size(&self) -> usize {
//!         let mut size = 0;
//!         if self.seq != 0 {
//!             size += scalar::field_size(1, &self.seq);
//!         }
//!         size + self.unknown.compute_size()
//!     }
//!
//!     fn field_set(&self) -> &FieldSet {
//!         &self.unknown
//!     }
//!
//!     fn field_set_mut(&mut self) -> &mut FieldSet {
//!         &mut self.unknown
//!     }
//! }
//!
//! let bytes = serialize_to_vec(&Ping { seq: 42, unknown: FieldSet::new() }).unwrap();
//! let ping: Ping = parse_from_slice(&bytes).unwrap();
//! assert_eq!(ping.seq, 42);
//!
//! let mut merged = Ping::default();
//! merge_from_slice(&mut merged, &bytes).unwrap();
//! assert_eq!(merged, ping);
//! ```

pub mod error;
pub mod extension;
pub mod field_map;
pub mod field_set;
pub mod message;
pub mod reader;
pub mod scalar;
pub mod varint;
pub mod wire;
pub mod writer;

pub use crate::error::{DecodeError, EncodeError, ExtensionError};
pub use crate::extension::{Extension, ExtensionRegistry, Value, ValueKind};
pub use crate::field_map::{CompactSortedMap, FrozenError};
pub use crate::field_set::{FieldSet, UnknownFieldEntry};
pub use crate::message::{
    merge_from_slice, merge_scoped, parse_delimited_from, parse_from_slice, parse_with_registry,
    serialize_delimited_to_vec, serialize_to_vec, CachedSize, Message,
};
pub use crate::reader::{FieldScan, Reader, DEFAULT_RECURSION_LIMIT};
pub use crate::scalar::Scalar;
pub use crate::varint::Varint;
pub use crate::wire::{FieldKey, WireType, MAX_FIELD_NUMBER, MIN_FIELD_NUMBER};
pub use crate::writer::Writer;
