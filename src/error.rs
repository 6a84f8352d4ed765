//! Error types for wire decoding, encoding, and extension access.

use thiserror::Error;

use crate::field_map::FrozenError;
use crate::wire::WireType;

/// An error produced while decoding wire-format bytes.
///
/// Every variant except [`DecodeError::Uninitialized`] describes malformed
/// input. The first error aborts the entire top-level parse; there is no
/// partial-success mode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("invalid varint: continuation bit set past the maximum width")]
    InvalidVarint,

    #[error("unexpected end of input: needed {needed} more bytes")]
    Truncated { needed: usize },

    #[error("invalid 'wire type' value: {0}")]
    InvalidWireType(u8),

    #[error("field number out of range")]
    FieldNumberOutOfRange,

    #[error("length prefix {0} exceeds platform addressable memory")]
    LengthOverflow(u64),

    #[error("nested length limit extends past the enclosing scope")]
    LimitViolation,

    #[error("group field {expected} terminated by end-group tag for field {found}")]
    MismatchedGroupEnd { expected: u32, found: u32 },

    #[error("end-group tag with no enclosing group")]
    UnexpectedGroupEnd,

    #[error("group field {0} is missing its end-group tag")]
    UnterminatedGroup(u32),

    #[error("invalid UTF-8 in string field")]
    InvalidUtf8,

    /// The input nests messages/groups deeper than the reader's configured
    /// maximum. The bytes are the cause, so this is a malformed-input error
    /// from the caller's perspective.
    #[error("recursion limit exceeded")]
    RecursionLimitExceeded,

    /// Well-formed bytes, but the decoded message is missing required fields.
    /// Only surfaced by the "parse" entry points; "merge" variants skip the
    /// check.
    #[error("message '{0}' is missing required fields")]
    Uninitialized(&'static str),

    #[error("programming error: '{reason}'")]
    Programming { reason: &'static str },
}

/// An error produced while serializing a message.
///
/// Serialization writes into a buffer pre-sized by the size-computation pass
/// and never reallocates, so every variant here is an implementation or usage
/// defect rather than a property of the message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("output buffer exhausted: needed {needed} bytes, {remaining} remaining")]
    SpaceExhausted { needed: usize, remaining: usize },

    #[error("computed size {computed} does not match bytes written {written}")]
    SizeMismatch { computed: usize, written: usize },
}

/// An error produced by typed extension access on a [`FieldSet`].
///
/// Mismatch variants are caller bugs (the wrong descriptor or accessor for
/// the stored data), not wire errors.
///
/// [`FieldSet`]: crate::field_set::FieldSet
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtensionError {
    /// A stored entry's framing does not match the descriptor's kind.
    #[error("extension field {field_number} holds {found:?} data, descriptor expects {expected:?}")]
    WireTypeMismatch {
        field_number: u32,
        expected: WireType,
        found: WireType,
    },

    /// A `set` was given a [`Value`](crate::extension::Value) whose kind does
    /// not match the descriptor.
    #[error("extension field {field_number} is declared {expected:?}, got a {found:?} value")]
    ValueKindMismatch {
        field_number: u32,
        expected: crate::extension::ValueKind,
        found: crate::extension::ValueKind,
    },

    /// A singular accessor was used on a repeated extension or vice versa.
    #[error("extension field {field_number} has the wrong cardinality for this accessor")]
    Cardinality { field_number: u32 },

    /// A scalar accessor was used on a message-typed extension.
    #[error("extension field {field_number} is message-typed, use the message accessors")]
    MessageTyped { field_number: u32 },

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Frozen(#[from] FrozenError),
}
