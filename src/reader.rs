//! Bounded cursor over an encoded message.
//!
//! The reader owns nothing: it walks an immutable byte slice with a cursor,
//! a LIFO stack of nested length limits, and a recursion guard. Lookahead is
//! a saved position plus restore, never a stateful mark/reset stream.

use smallvec::SmallVec;

use crate::error::DecodeError;
use crate::extension::ExtensionRegistry;
use crate::varint::Varint;
use crate::wire::{FieldKey, WireType};

/// Default maximum nested message/group depth within one parse.
pub const DEFAULT_RECURSION_LIMIT: u32 = 64;

/// Result of [`Reader::skip_field`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FieldScan {
    /// The field's payload was skipped.
    Skipped,
    /// The key was an end-group tag: the *caller's* enclosing group has
    /// ended and nothing was consumed beyond the key itself.
    GroupEnd,
}

/// A bounded reader over wire-format bytes.
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
    /// Current effective end: `min(buffer end, innermost pushed limit)`.
    limit: usize,
    /// Enclosing limits, restored by [`Reader::pop_limit`].
    limits: SmallVec<[usize; 8]>,
    depth: u32,
    recursion_limit: u32,
    registry: Option<&'a ExtensionRegistry>,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Reader {
            buf,
            pos: 0,
            limit: buf.len(),
            limits: SmallVec::new(),
            depth: 0,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            registry: None,
        }
    }

    /// Overrides the maximum nested message/group depth for this reader.
    pub fn set_recursion_limit(&mut self, limit: u32) {
        self.recursion_limit = limit;
    }

    /// Attaches an extension registry consulted by the merge engine for
    /// unrecognized field numbers.
    pub fn set_registry(&mut self, registry: &'a ExtensionRegistry) {
        self.registry = Some(registry);
    }

    pub(crate) fn registry(&self) -> Option<&'a ExtensionRegistry> {
        self.registry
    }

    /// Current byte offset from the start of the buffer.
    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// True once the cursor reaches the innermost limit (or the buffer end).
    #[inline]
    pub fn at_end(&self) -> bool {
        self.pos >= self.limit
    }

    /// Bytes remaining in the current scope.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.limit - self.pos
    }

    /// The span of already-consumed bytes starting at `start`.
    ///
    /// `start` must be a position previously returned by [`Reader::pos`].
    #[inline]
    pub fn slice_from(&self, start: usize) -> &'a [u8] {
        debug_assert!(start <= self.pos);
        &self.buf[start..self.pos]
    }

    #[inline]
    fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..self.limit]
    }

    /// Consumes exactly `len` bytes.
    #[inline]
    pub fn read_exact(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < len {
            return Err(DecodeError::Truncated {
                needed: len - self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    // === Limit stack ===

    /// Scopes the next `len` bytes as a nested length-delimited region.
    ///
    /// Fails if the new scope would extend past the enclosing one.
    pub fn push_limit(&mut self, len: usize) -> Result<(), DecodeError> {
        let end = self
            .pos
            .checked_add(len)
            .ok_or(DecodeError::LengthOverflow(len as u64))?;
        if end > self.limit {
            return Err(DecodeError::LimitViolation);
        }
        self.limits.push(self.limit);
        self.limit = end;
        Ok(())
    }

    /// Restores the enclosing scope's limit.
    pub fn pop_limit(&mut self) {
        if let Some(limit) = self.limits.pop() {
            self.limit = limit;
        }
    }

    // === Recursion guard ===

    /// Accounts for entering a nested message or group.
    pub fn enter_recursion(&mut self) -> Result<(), DecodeError> {
        if self.depth >= self.recursion_limit {
            return Err(DecodeError::RecursionLimitExceeded);
        }
        self.depth += 1;
        Ok(())
    }

    /// Accounts for leaving a nested message or group.
    pub fn exit_recursion(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    // === Primitive reads ===

    /// Reads the next field key, or `None` at the end of the current scope.
    ///
    /// A raw key of zero also terminates the scope normally.
    pub fn read_key(&mut self) -> Result<Option<FieldKey>, DecodeError> {
        if self.at_end() {
            return Ok(None);
        }
        let raw = self.read_varint32()?;
        if raw == 0 {
            return Ok(None);
        }
        FieldKey::try_from_raw(raw).map(Some)
    }

    pub fn read_varint32(&mut self) -> Result<u32, DecodeError> {
        let (value, read) = u32::decode_varint(self.rest())?;
        self.pos += read;
        Ok(value)
    }

    pub fn read_varint64(&mut self) -> Result<u64, DecodeError> {
        let (value, read) = u64::decode_varint(self.rest())?;
        self.pos += read;
        Ok(value)
    }

    /// Reads the length prefix of a length-delimited field.
    pub fn read_len(&mut self) -> Result<usize, DecodeError> {
        let len = self.read_varint64()?;
        usize::try_from(len).map_err(|_| DecodeError::LengthOverflow(len))
    }

    pub fn read_fixed32(&mut self) -> Result<u32, DecodeError> {
        let b = self.read_exact(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_fixed64(&mut self) -> Result<u64, DecodeError> {
        let b = self.read_exact(8)?;
        Ok(u64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
    }

    // === Field skipping ===

    /// Skips over one field's payload based on the key's wire type.
    ///
    /// Groups are skipped recursively to the matching end-group tag. A bare
    /// end-group key consumes nothing further and reports
    /// [`FieldScan::GroupEnd`] so the caller can terminate its own group.
    pub fn skip_field(&mut self, key: FieldKey) -> Result<FieldScan, DecodeError> {
        match key.wire_type() {
            WireType::Varint => {
                self.read_varint64()?;
            }
            WireType::Fixed64 => {
                self.read_exact(8)?;
            }
            WireType::Fixed32 => {
                self.read_exact(4)?;
            }
            WireType::LengthDelimited => {
                let len = self.read_len()?;
                self.read_exact(len)?;
            }
            WireType::StartGroup => self.skip_group(key.field_number())?,
            WireType::EndGroup => return Ok(FieldScan::GroupEnd),
        }
        Ok(FieldScan::Skipped)
    }

    /// Skips fields until the end-group tag matching `field_number`,
    /// consuming the end-group tag itself.
    fn skip_group(&mut self, field_number: u32) -> Result<(), DecodeError> {
        self.enter_recursion()?;
        loop {
            let key = self
                .read_key()?
                .ok_or(DecodeError::UnterminatedGroup(field_number))?;
            if key.wire_type() == WireType::EndGroup {
                if key.field_number() == field_number {
                    break;
                }
                return Err(DecodeError::MismatchedGroupEnd {
                    expected: field_number,
                    found: key.field_number(),
                });
            }
            self.skip_field(key)?;
        }
        self.exit_recursion();
        Ok(())
    }

    // === Repeated-field lookahead ===

    /// Counts how many times `key` occurs back-to-back starting at the
    /// current position (the value of the first occurrence unconsumed), then
    /// rewinds.
    ///
    /// Encoders emit repeated fields contiguously, so this sizes the backing
    /// storage for the common case. Non-contiguous repeats still parse
    /// correctly; the count only affects pre-allocation.
    pub fn repeated_run_len(&mut self, key: FieldKey) -> Result<usize, DecodeError> {
        let start = self.pos;
        let mut count = 1usize;
        self.skip_field(key)?;
        while !self.at_end() {
            let mark = self.pos;
            match self.read_key()? {
                Some(next) if next == key => {
                    self.skip_field(key)?;
                    count += 1;
                }
                _ => {
                    self.pos = mark;
                    break;
                }
            }
        }
        self.pos = start;
        Ok(count)
    }
}
