//! Message types shared by the integration tests.

#![allow(dead_code)]

use bytes::Bytes;

use protowire::message::{merge_message_field, message_field_size, write_message_field};
use protowire::scalar::{self, Fixed32, Fixed64, Scalar, Sfixed32, Sfixed64, Sint32, Sint64};
use protowire::{DecodeError, EncodeError, FieldKey, FieldSet, Message, Reader, WireType, Writer};

/// One field of every representable scalar kind, plus packed and unpacked
/// repeated fields.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct AllKinds {
    pub uint32_field: u32,
    pub uint64_field: u64,
    pub int32_field: i32,
    pub int64_field: i64,
    pub sint32_field: i32,
    pub sint64_field: i64,
    pub fixed32_field: u32,
    pub fixed64_field: u64,
    pub sfixed32_field: i32,
    pub sfixed64_field: i64,
    pub bool_field: bool,
    pub float_field: f32,
    pub double_field: f64,
    pub string_field: String,
    pub bytes_field: Bytes,
    pub packed_uints: Vec<u32>,
    pub names: Vec<String>,
    pub unknown: FieldSet,
}

impl Message for AllKinds {
    const NAME: &'static str = "test.AllKinds";

    fn merge_field(&mut self, key: FieldKey, reader: &mut Reader<'_>) -> Result<bool, DecodeError> {
        match (key.field_number(), key.wire_type()) {
            (1, WireType::Varint) => self.uint32_field = u32::read(reader)?,
            (2, WireType::Varint) => self.uint64_field = u64::read(reader)?,
            (3, WireType::Varint) => self.int32_field = i32::read(reader)?,
            (4, WireType::Varint) => self.int64_field = i64::read(reader)?,
            (5, WireType::Varint) => self.sint32_field = *Sint32::read(reader)?,
            (6, WireType::Varint) => self.sint64_field = *Sint64::read(reader)?,
            (7, WireType::Fixed32) => self.fixed32_field = *Fixed32::read(reader)?,
            (8, WireType::Fixed64) => self.fixed64_field = *Fixed64::read(reader)?,
            (9, WireType::Fixed32) => self.sfixed32_field = *Sfixed32::read(reader)?,
            (10, WireType::Fixed64) => self.sfixed64_field = *Sfixed64::read(reader)?,
            (11, WireType::Varint) => self.bool_field = bool::read(reader)?,
            (12, WireType::Fixed32) => self.float_field = f32::read(reader)?,
            (13, WireType::Fixed64) => self.double_field = f64::read(reader)?,
            (14, WireType::LengthDelimited) => self.string_field = String::read(reader)?,
            (15, WireType::LengthDelimited) => self.bytes_field = Bytes::read(reader)?,
            (16, WireType::Varint | WireType::LengthDelimited) => {
                scalar::merge_repeated(reader, key, &mut self.packed_uints)?
            }
            (17, WireType::LengthDelimited) => {
                scalar::merge_repeated(reader, key, &mut self.names)?
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn write_fields(&self, writer: &mut Writer<'_>) -> Result<(), EncodeError> {
        if self.uint32_field != 0 {
            scalar::write_field(writer, 1, &self.uint32_field)?;
        }
        if self.uint64_field != 0 {
            scalar::write_field(writer, 2, &self.uint64_field)?;
        }
        if self.int32_field != 0 {
            scalar::write_field(writer, 3, &self.int32_field)?;
        }
        if self.int64_field != 0 {
            scalar::write_field(writer, 4, &self.int64_field)?;
        }
        if self.sint32_field != 0 {
            scalar::write_field(writer, 5, &Sint32(self.sint32_field))?;
        }
        if self.sint64_field != 0 {
            scalar::write_field(writer, 6, &Sint64(self.sint64_field))?;
        }
        if self.fixed32_field != 0 {
            scalar::write_field(writer, 7, &Fixed32(self.fixed32_field))?;
        }
        if self.fixed64_field != 0 {
            scalar::write_field(writer, 8, &Fixed64(self.fixed64_field))?;
        }
        if self.sfixed32_field != 0 {
            scalar::write_field(writer, 9, &Sfixed32(self.sfixed32_field))?;
        }
        if self.sfixed64_field != 0 {
            scalar::write_field(writer, 10, &Sfixed64(self.sfixed64_field))?;
        }
        if self.bool_field {
            scalar::write_field(writer, 11, &self.bool_field)?;
        }
        if self.float_field != 0.0 {
            scalar::write_field(writer, 12, &self.float_field)?;
        }
        if self.double_field != 0.0 {
            scalar::write_field(writer, 13, &self.double_field)?;
        }
        if !self.string_field.is_empty() {
            scalar::write_field(writer, 14, &self.string_field)?;
        }
        if !self.bytes_field.is_empty() {
            scalar::write_field(writer, 15, &self.bytes_field)?;
        }
        scalar::write_repeated_packed(writer, 16, &self.packed_uints)?;
        scalar::write_repeated_unpacked(writer, 17, &self.names)?;
        self.unknown.write_to(writer)
    }

    fn compute_size(&self) -> usize {
        let mut size = 0;
        if self.uint32_field != 0 {
            size += scalar::field_size(1, &self.uint32_field);
        }
        if self.uint64_field != 0 {
            size += scalar::field_size(2, &self.uint64_field);
        }
        if self.int32_field != 0 {
            size += scalar::field_size(3, &self.int32_field);
        }
        if self.int64_field != 0 {
            size += scalar::field_size(4, &self.int64_field);
        }
        if self.sint32_field != 0 {
            size += scalar::field_size(5, &Sint32(self.sint32_field));
        }
        if self.sint64_field != 0 {
            size += scalar::field_size(6, &Sint64(self.sint64_field));
        }
        if self.fixed32_field != 0 {
            size += scalar::field_size(7, &Fixed32(self.fixed32_field));
        }
        if self.fixed64_field != 0 {
            size += scalar::field_size(8, &Fixed64(self.fixed64_field));
        }
        if self.sfixed32_field != 0 {
            size += scalar::field_size(9, &Sfixed32(self.sfixed32_field));
        }
        if self.sfixed64_field != 0 {
            size += scalar::field_size(10, &Sfixed64(self.sfixed64_field));
        }
        if self.bool_field {
            size += scalar::field_size(11, &self.bool_field);
        }
        if self.float_field != 0.0 {
            size += scalar::field_size(12, &self.float_field);
        }
        if self.double_field != 0.0 {
            size += scalar::field_size(13, &self.double_field);
        }
        if !self.string_field.is_empty() {
            size += scalar::field_size(14, &self.string_field);
        }
        if !self.bytes_field.is_empty() {
            size += scalar::field_size(15, &self.bytes_field);
        }
        size += scalar::repeated_packed_size(16, &self.packed_uints);
        size += scalar::repeated_unpacked_size(17, &self.names);
        size + self.unknown.compute_size()
    }

    fn field_set(&self) -> &FieldSet {
        &self.unknown
    }

    fn field_set_mut(&mut self) -> &mut FieldSet {
        &mut self.unknown
    }
}

/// A self-nesting message for recursion-depth tests.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Node {
    pub value: u64,
    pub child: Option<Box<Node>>,
    pub unknown: FieldSet,
}

impl Node {
    /// A chain of `depth` nodes (so `depth - 1` nested message fields).
    pub fn chain(depth: u32) -> Node {
        let mut node = Node { value: u64::from(depth), ..Node::default() };
        for value in (1..depth).rev() {
            node = Node {
                value: u64::from(value),
                child: Some(Box::new(node)),
                ..Node::default()
            };
        }
        node
    }

    pub fn depth(&self) -> u32 {
        1 + self.child.as_ref().map_or(0, |c| c.depth())
    }
}

impl Message for Node {
    const NAME: &'static str = "test.Node";

    fn merge_field(&mut self, key: FieldKey, reader: &mut Reader<'_>) -> Result<bool, DecodeError> {
        match (key.field_number(), key.wire_type()) {
            (1, WireType::Varint) => {
                self.value = u64::read(reader)?;
                Ok(true)
            }
            (2, WireType::LengthDelimited) => {
                let child = self.child.get_or_insert_with(Box::default);
                merge_message_field(&mut **child, reader)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn write_fields(&self, writer: &mut Writer<'_>) -> Result<(), EncodeError> {
        if self.value != 0 {
            scalar::write_field(writer, 1, &self.value)?;
        }
        if let Some(child) = &self.child {
            write_message_field(writer, 2, &**child)?;
        }
        self.unknown.write_to(writer)
    }

    fn compute_size(&self) -> usize {
        let mut size = 0;
        if self.value != 0 {
            size += scalar::field_size(1, &self.value);
        }
        if let Some(child) = &self.child {
            size += message_field_size(2, &**child);
        }
        size + self.unknown.compute_size()
    }

    fn field_set(&self) -> &FieldSet {
        &self.unknown
    }

    fn field_set_mut(&mut self) -> &mut FieldSet {
        &mut self.unknown
    }
}
