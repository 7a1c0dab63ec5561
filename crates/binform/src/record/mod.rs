// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Flat record driver.
//!
//! A [`RecordLayout`] compiles the formulas of one [`TypeSpec`] once and
//! indexes any number of records with it. The resulting [`Record`] is the
//! live object that formulas resolve against, and supports editing and
//! saving on top of the codec.
//!
//! Formulas see the fields indexed so far by name (`len`) or by element
//! (`items.2`). Custom fields are indexed as opaque ranges and are not
//! resolvable.
//!
//! [`TypeSpec`]: crate::catalog::TypeSpec

use crate::catalog::{CatalogError, SpecId, TypeRegistry};
use crate::codec::{
    copy_value, read_index_entry, read_value, stream_len, type_index, write_value, CodecError,
    FieldValue, IndexEntry, SlotBuffer, StreamPair,
};
use crate::expr::{self, CompiledExpr, ExprError, Resolver, Value, VarId};
use crate::type_id::TypeId;
use std::cell::RefCell;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use thiserror::Error;

/// Result type for record operations.
pub type Result<T> = std::result::Result<T, RecordError>;

/// Record errors.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("field '{field}': {source}")]
    Formula {
        field: String,
        #[source]
        source: ExprError,
    },

    #[error("field '{0}' has no size formula")]
    MissingSize(String),

    #[error("field '{field}': {count} elements cannot fit in the {remaining} bytes left")]
    CountExceedsData {
        field: String,
        count: u64,
        remaining: u64,
    },

    #[error("no field named '{0}'")]
    UnknownField(String),

    #[error("field '{0}' is absent from this record")]
    Absent(String),

    #[error("element {index} out of range for field '{field}' ({count} elements)")]
    ElementOutOfRange {
        field: String,
        index: usize,
        count: usize,
    },

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone)]
struct FieldLayout {
    name: String,
    spec: SpecId,
    type_id: TypeId,
    condition: Option<CompiledExpr>,
    count: Option<CompiledExpr>,
    size: Option<CompiledExpr>,
}

fn compile_formula(field: &str, formula: Option<&str>) -> Result<Option<CompiledExpr>> {
    formula
        .map(|text| {
            expr::compile(text).map_err(|source| RecordError::Formula {
                field: field.to_string(),
                source,
            })
        })
        .transpose()
}

fn eval_error(field: &str) -> impl FnOnce(ExprError) -> RecordError + '_ {
    move |source| RecordError::Formula {
        field: field.to_string(),
        source,
    }
}

/// Fewest data bytes one element can occupy, zero-width elements counting
/// as one.
fn min_element_width(type_id: TypeId, size: u64) -> u64 {
    match type_id.scalar_size() {
        Some(width) => width as u64,
        None if type_id == TypeId::StringZ => 1,
        None => size.max(1),
    }
}

/// Compiled field plan of one type spec.
#[derive(Debug, Clone)]
pub struct RecordLayout {
    name: String,
    fields: Vec<FieldLayout>,
}

impl RecordLayout {
    /// Compile every property formula of `spec`.
    pub fn compile(registry: &TypeRegistry, spec: SpecId) -> Result<Self> {
        let type_spec = registry.spec(spec)?;
        let mut fields = Vec::with_capacity(type_spec.properties().len());

        for property in type_spec.properties() {
            let type_id = registry.spec(property.spec)?.type_id();
            if type_id.needs_size() && property.size.is_none() {
                return Err(RecordError::MissingSize(property.name.clone()));
            }
            fields.push(FieldLayout {
                name: property.name.clone(),
                spec: property.spec,
                type_id,
                condition: compile_formula(&property.name, property.condition.as_deref())?,
                count: compile_formula(&property.name, property.count.as_deref())?,
                size: compile_formula(&property.name, property.size.as_deref())?,
            });
        }

        log::debug!(
            "[record] compiled layout '{}' ({} fields)",
            type_spec.name(),
            fields.len()
        );
        Ok(Self {
            name: type_spec.name().to_string(),
            fields,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Index one record starting at the cursor of `data`.
    ///
    /// On success the cursor sits just past the record.
    pub fn index<R: Read + Seek + ?Sized>(&mut self, data: &mut R) -> Result<Record> {
        let mut record = Record {
            name: self.name.clone(),
            fields: Vec::with_capacity(self.fields.len()),
            slots: SlotBuffer::new(),
        };
        // Indexed offsets are never negative, the write side stays empty.
        let mut streams = StreamPair::new(data, Cursor::new(Vec::new()));

        for layout in &mut self.fields {
            let present = match layout.condition.as_mut() {
                Some(condition) => condition
                    .eval_bool(&record.scope(&mut streams))
                    .map_err(eval_error(&layout.name))?,
                None => true,
            };

            let count = match (present, layout.count.as_mut()) {
                (false, _) => 0,
                (true, Some(count)) => count
                    .eval_size(&record.scope(&mut streams))
                    .map_err(eval_error(&layout.name))?,
                (true, None) => 1,
            };

            let size = match layout.size.as_mut() {
                Some(size) if count > 0 && layout.type_id.needs_size() => size
                    .eval_size(&record.scope(&mut streams))
                    .map_err(eval_error(&layout.name))?,
                _ => 0,
            };

            // A single element reports its own overrun through the codec.
            if count > 1 {
                let position = streams.data.stream_position()?;
                let remaining = stream_len(&mut streams.data)?.saturating_sub(position);
                let needed = count.saturating_mul(min_element_width(layout.type_id, size));
                if needed > remaining {
                    return Err(RecordError::CountExceedsData {
                        field: layout.name.clone(),
                        count,
                        remaining,
                    });
                }
            }
            let count = usize::try_from(count).map_err(|_| RecordError::CountExceedsData {
                field: layout.name.clone(),
                count,
                remaining: 0,
            })?;

            let slot = record.slots.len();
            let mut pos = slot;
            for _ in 0..count {
                pos = type_index(
                    layout.type_id,
                    || Ok(size),
                    &mut record.slots,
                    pos,
                    &mut streams.data,
                )?;
            }

            log::trace!(
                "[record] {}.{}: {} x {}{}",
                self.name,
                layout.name,
                count,
                layout.type_id,
                if present { "" } else { " (absent)" }
            );
            record.fields.push(IndexedField {
                name: layout.name.clone(),
                spec: layout.spec,
                type_id: layout.type_id,
                present,
                slot,
                count,
            });
        }

        Ok(record)
    }
}

/// Where one field's slots live in a [`Record`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedField {
    pub name: String,
    pub spec: SpecId,
    pub type_id: TypeId,
    /// False when the condition formula evaluated false.
    pub present: bool,
    /// Position of the first element's slot.
    pub slot: usize,
    pub count: usize,
}

impl IndexedField {
    fn slot_at(&self, index: usize) -> usize {
        self.slot + index * self.type_id.slot_width()
    }
}

/// One indexed record.
#[derive(Debug, Clone)]
pub struct Record {
    name: String,
    fields: Vec<IndexedField>,
    slots: SlotBuffer,
}

impl Record {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[IndexedField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&IndexedField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn slots(&self) -> &SlotBuffer {
        &self.slots
    }

    fn element(&self, name: &str, index: usize) -> Result<(TypeId, usize)> {
        let field = self
            .field(name)
            .ok_or_else(|| RecordError::UnknownField(name.to_string()))?;
        if !field.present {
            return Err(RecordError::Absent(name.to_string()));
        }
        if index >= field.count {
            return Err(RecordError::ElementOutOfRange {
                field: name.to_string(),
                index,
                count: field.count,
            });
        }
        Ok((field.type_id, field.slot_at(index)))
    }

    /// Raw index entry of element `index` of `name`.
    pub fn entry(&self, name: &str, index: usize) -> Result<IndexEntry> {
        let (type_id, pos) = self.element(name, index)?;
        Ok(read_index_entry(type_id, &self.slots, pos)?.0)
    }

    /// Decode element `index` of `name`.
    pub fn get<D, W>(
        &self,
        name: &str,
        index: usize,
        streams: &mut StreamPair<D, W>,
    ) -> Result<FieldValue>
    where
        D: Read + Seek,
        W: Read + Seek,
    {
        let (type_id, pos) = self.element(name, index)?;
        Ok(read_value(type_id, &self.slots, pos, streams)?)
    }

    /// Replace element `index` of `name`.
    ///
    /// Scalars are updated in place; text and bytes are appended to `write`
    /// and the slot is pointed at the new payload.
    pub fn set<W: Write + Seek>(
        &mut self,
        name: &str,
        index: usize,
        value: &FieldValue,
        write: &mut W,
    ) -> Result<()> {
        let (type_id, pos) = self.element(name, index)?;
        write_value(type_id, &mut self.slots, pos, write, value)?;
        log::trace!("[record] {}.{}[{}] = {}", self.name, name, index, value);
        Ok(())
    }

    /// Write the record to `output` in flattened form, field by field.
    ///
    /// Custom elements are copied verbatim from the data stream.
    pub fn save<O, D, W>(&self, output: &mut O, streams: &mut StreamPair<D, W>) -> Result<()>
    where
        O: Write + ?Sized,
        D: Read + Seek,
        W: Read + Seek,
    {
        for field in self.fields.iter().filter(|f| f.present) {
            for index in 0..field.count {
                let pos = field.slot_at(index);
                if field.type_id == TypeId::Custom {
                    self.copy_object(pos, output, &mut streams.data)?;
                } else {
                    copy_value(field.type_id, &self.slots, pos, output, streams)?;
                }
            }
        }
        Ok(())
    }

    fn copy_object<O, D>(&self, pos: usize, output: &mut O, data: &mut D) -> Result<()>
    where
        O: Write + ?Sized,
        D: Read + Seek,
    {
        let IndexEntry::Object { position, size } =
            read_index_entry(TypeId::Custom, &self.slots, pos)?.0
        else {
            return Err(CodecError::IncompatibleType {
                requested: TypeId::Custom,
                codec: "object",
            }
            .into());
        };

        let start = position as u64;
        data.seek(SeekFrom::Start(start))?;
        let copied = io::copy(&mut data.by_ref().take(u64::from(size)), output)?;
        if copied != u64::from(size) {
            return Err(CodecError::UnexpectedEof {
                offset: start + copied,
            }
            .into());
        }
        Ok(())
    }

    /// Resolver over this record's fields, reading payloads from `streams`.
    pub fn scope<'a, D, W>(&'a self, streams: &'a mut StreamPair<D, W>) -> Scope<'a, D, W> {
        Scope {
            record: self,
            streams: RefCell::new(streams),
        }
    }

    fn resolve_path<D, W>(
        &self,
        path: &[String],
        streams: &mut StreamPair<D, W>,
    ) -> std::result::Result<Value, ExprError>
    where
        D: Read + Seek,
        W: Read + Seek,
    {
        let unresolved = || ExprError::UnresolvedVariable(path.join("."));
        let (name, index) = match path {
            [name] => (name, 0),
            [name, index] => (name, index.parse::<usize>().map_err(|_| unresolved())?),
            _ => return Err(unresolved()),
        };

        let field = self
            .field(name)
            .filter(|f| f.present && index < f.count && f.type_id != TypeId::Custom)
            .ok_or_else(unresolved)?;

        read_value(field.type_id, &self.slots, field.slot_at(index), streams)
            .map(|value| value.to_expr())
            .map_err(|e| ExprError::Resolver(format!("{}: {}", path.join("."), e)))
    }
}

/// A [`Record`] paired with its streams, usable as a formula resolver.
pub struct Scope<'a, D, W> {
    record: &'a Record,
    streams: RefCell<&'a mut StreamPair<D, W>>,
}

impl<D, W> Resolver for Scope<'_, D, W>
where
    D: Read + Seek,
    W: Read + Seek,
{
    fn resolve(&self, path: &[String], _var: VarId) -> std::result::Result<Value, ExprError> {
        let mut streams = self.streams.borrow_mut();
        self.record.resolve_path(path, &mut **streams)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Property;
    use std::io::Cursor;

    fn builtin(registry: &TypeRegistry, type_id: TypeId) -> SpecId {
        registry.builtin(type_id).unwrap()
    }

    /// `Chunk { tag: string[4], len: uint16, body: bytes[len], crc: uint32 if len > 2 }`
    fn chunk_registry() -> (TypeRegistry, SpecId) {
        let mut registry = TypeRegistry::new();
        let chunk = registry.create("Chunk");
        let string = builtin(&registry, TypeId::String);
        let u16_id = builtin(&registry, TypeId::UInt16);
        let bytes = builtin(&registry, TypeId::Bytes);
        let u32_id = builtin(&registry, TypeId::UInt32);

        registry
            .append_property(chunk, Property::new("tag", string).with_size("4"))
            .unwrap();
        registry
            .append_property(chunk, Property::new("len", u16_id))
            .unwrap();
        registry
            .append_property(chunk, Property::new("body", bytes).with_size("len"))
            .unwrap();
        registry
            .append_property(chunk, Property::new("crc", u32_id).with_condition("len > 2"))
            .unwrap();
        (registry, chunk)
    }

    fn chunk_bytes(tag: &[u8; 4], body: &[u8], crc: Option<u32>) -> Vec<u8> {
        let mut data = tag.to_vec();
        data.extend_from_slice(&(body.len() as u16).to_ne_bytes());
        data.extend_from_slice(body);
        if let Some(crc) = crc {
            data.extend_from_slice(&crc.to_ne_bytes());
        }
        data
    }

    fn pair(data: Vec<u8>) -> StreamPair<Cursor<Vec<u8>>, Cursor<Vec<u8>>> {
        StreamPair::new(Cursor::new(data), Cursor::new(Vec::new()))
    }

    #[test]
    fn test_index_with_size_and_condition() {
        let (registry, chunk) = chunk_registry();
        let mut layout = RecordLayout::compile(&registry, chunk).unwrap();

        let data = chunk_bytes(b"DATA", b"hello", Some(0xCAFE));
        let mut streams = pair(data.clone());
        let record = layout.index(&mut streams.data).unwrap();
        assert_eq!(streams.data.position() as usize, data.len());

        assert_eq!(
            record.get("tag", 0, &mut streams).unwrap(),
            FieldValue::from("DATA")
        );
        assert_eq!(record.get("len", 0, &mut streams).unwrap(), FieldValue::U16(5));
        assert_eq!(
            record.get("body", 0, &mut streams).unwrap(),
            FieldValue::Bytes(b"hello".to_vec())
        );
        assert_eq!(
            record.get("crc", 0, &mut streams).unwrap(),
            FieldValue::U32(0xCAFE)
        );
    }

    #[test]
    fn test_condition_false_omits_field() {
        let (registry, chunk) = chunk_registry();
        let mut layout = RecordLayout::compile(&registry, chunk).unwrap();

        let data = chunk_bytes(b"AB_1", b"hi", None);
        let mut streams = pair(data.clone());
        let record = layout.index(&mut streams.data).unwrap();

        assert_eq!(streams.data.position() as usize, data.len());
        let crc = record.field("crc").unwrap();
        assert!(!crc.present);
        assert!(matches!(
            record.get("crc", 0, &mut streams),
            Err(RecordError::Absent(_))
        ));
    }

    #[test]
    fn test_corrupt_tag_reported() {
        let (registry, chunk) = chunk_registry();
        let mut layout = RecordLayout::compile(&registry, chunk).unwrap();
        let data = chunk_bytes(b"ab\x01\x02", b"", None);
        assert!(matches!(
            layout.index(&mut Cursor::new(data)),
            Err(RecordError::Codec(CodecError::FormatCorruption { .. }))
        ));
    }

    #[test]
    fn test_count_formula_and_element_paths() {
        let mut registry = TypeRegistry::new();
        let u8_id = builtin(&registry, TypeId::UInt8);
        let i16_id = builtin(&registry, TypeId::Int16);
        let list = registry.create("List");
        registry
            .append_property(list, Property::new("n", u8_id))
            .unwrap();
        registry
            .append_property(list, Property::new("items", i16_id).with_count("n"))
            .unwrap();
        registry
            .append_property(
                list,
                Property::new("last", u8_id).with_condition("items.2 == -3"),
            )
            .unwrap();

        let mut data = vec![3u8];
        for v in [10i16, 20, -3] {
            data.extend_from_slice(&v.to_ne_bytes());
        }
        data.push(0x7F);

        let mut layout = RecordLayout::compile(&registry, list).unwrap();
        let mut streams = pair(data);
        let record = layout.index(&mut streams.data).unwrap();

        assert_eq!(record.field("items").unwrap().count, 3);
        assert_eq!(record.get("items", 1, &mut streams).unwrap(), FieldValue::I16(20));
        assert_eq!(record.get("last", 0, &mut streams).unwrap(), FieldValue::U8(0x7F));
        assert!(matches!(
            record.get("items", 3, &mut streams),
            Err(RecordError::ElementOutOfRange { index: 3, count: 3, .. })
        ));
    }

    #[test]
    fn test_custom_elements_contiguous() {
        let mut registry = TypeRegistry::new();
        let u8_id = builtin(&registry, TypeId::UInt8);
        let inner = registry.create("Inner");
        let outer = registry.create("Outer");
        registry
            .append_property(outer, Property::new("n", u8_id))
            .unwrap();
        registry
            .append_property(
                outer,
                Property::new("objs", inner).with_count("n").with_size("6"),
            )
            .unwrap();

        let mut data = vec![4u8];
        data.extend((0..24).map(|i| i as u8));

        let mut layout = RecordLayout::compile(&registry, outer).unwrap();
        let record = layout.index(&mut Cursor::new(data)).unwrap();

        let ranges: Vec<_> = (0..4)
            .map(|i| record.entry("objs", i).unwrap().data_range().unwrap())
            .collect();
        assert_eq!(ranges, [1u64..7, 7..13, 13..19, 19..25]);
    }

    fn object_list(size: &str) -> (TypeRegistry, SpecId) {
        let mut registry = TypeRegistry::new();
        let u32_id = builtin(&registry, TypeId::UInt32);
        let inner = registry.create("Inner");
        let outer = registry.create("Outer");
        registry
            .append_property(outer, Property::new("n", u32_id))
            .unwrap();
        registry
            .append_property(
                outer,
                Property::new("objs", inner).with_count("n").with_size(size),
            )
            .unwrap();
        (registry, outer)
    }

    #[test]
    fn test_count_bounded_by_remaining_data() {
        let (registry, outer) = object_list("0");
        let mut layout = RecordLayout::compile(&registry, outer).unwrap();

        let data = 5_000_000u32.to_ne_bytes().to_vec();
        match layout.index(&mut Cursor::new(data)) {
            Err(RecordError::CountExceedsData {
                field,
                count,
                remaining,
            }) => {
                assert_eq!(field, "objs");
                assert_eq!(count, 5_000_000);
                assert_eq!(remaining, 0);
            }
            other => panic!("unexpected result {:?}", other),
        }

        // Sized elements that overrun the data are rejected up front too.
        let (registry, outer) = object_list("8");
        let mut layout = RecordLayout::compile(&registry, outer).unwrap();
        let mut data = 3u32.to_ne_bytes().to_vec();
        data.extend_from_slice(&[0u8; 23]);
        assert!(matches!(
            layout.index(&mut Cursor::new(data)),
            Err(RecordError::CountExceedsData { count: 3, remaining: 23, .. })
        ));
    }

    #[test]
    fn test_zero_width_elements_within_bound() {
        let (registry, outer) = object_list("0");
        let mut layout = RecordLayout::compile(&registry, outer).unwrap();

        let mut data = 3u32.to_ne_bytes().to_vec();
        data.extend_from_slice(b"xyz");
        let mut cursor = Cursor::new(data);
        let record = layout.index(&mut cursor).unwrap();
        assert_eq!(record.field("objs").unwrap().count, 3);
        assert_eq!(cursor.position(), 4);

        // One empty element at the end of the stream is still accepted.
        let mut layout = RecordLayout::compile(&registry, outer).unwrap();
        let record = layout
            .index(&mut Cursor::new(1u32.to_ne_bytes().to_vec()))
            .unwrap();
        assert_eq!(record.field("objs").unwrap().count, 1);
    }

    #[test]
    fn test_missing_size_rejected() {
        let mut registry = TypeRegistry::new();
        let bytes = builtin(&registry, TypeId::Bytes);
        let owner = registry.create("Blob");
        registry
            .append_property(owner, Property::new("payload", bytes))
            .unwrap();
        assert!(matches!(
            RecordLayout::compile(&registry, owner),
            Err(RecordError::MissingSize(ref f)) if f == "payload"
        ));
    }

    #[test]
    fn test_unresolved_reference() {
        let mut registry = TypeRegistry::new();
        let bytes = builtin(&registry, TypeId::Bytes);
        let owner = registry.create("Blob");
        registry
            .append_property(owner, Property::new("payload", bytes).with_size("later"))
            .unwrap();
        let mut layout = RecordLayout::compile(&registry, owner).unwrap();
        match layout.index(&mut Cursor::new(vec![0u8; 4])) {
            Err(RecordError::Formula { field, source }) => {
                assert_eq!(field, "payload");
                assert_eq!(source, ExprError::UnresolvedVariable("later".to_string()));
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_edit_and_save() {
        let (registry, chunk) = chunk_registry();
        let mut layout = RecordLayout::compile(&registry, chunk).unwrap();

        let data = chunk_bytes(b"DATA", b"abc", Some(7));
        let mut streams = pair(data);
        let mut record = layout.index(&mut streams.data).unwrap();

        record
            .set("body", 0, &FieldValue::Bytes(b"wxyz".to_vec()), &mut streams.write)
            .unwrap();
        record
            .set("len", 0, &FieldValue::I64(4), &mut streams.write)
            .unwrap();
        record
            .set("crc", 0, &FieldValue::I64(9), &mut streams.write)
            .unwrap();

        assert!(matches!(
            record.entry("body", 0).unwrap(),
            IndexEntry::Sized { offset, size: 4 } if offset < 0
        ));

        let mut out = Vec::new();
        record.save(&mut out, &mut streams).unwrap();
        assert_eq!(out, chunk_bytes(b"DATA", b"wxyz", Some(9)));

        // The saved bytes index back to the edited values.
        let mut reloaded = pair(out);
        let again = layout.index(&mut reloaded.data).unwrap();
        assert_eq!(
            again.get("body", 0, &mut reloaded).unwrap(),
            FieldValue::Bytes(b"wxyz".to_vec())
        );
    }

    #[test]
    fn test_scope_resolves_text() {
        let (registry, chunk) = chunk_registry();
        let mut layout = RecordLayout::compile(&registry, chunk).unwrap();
        let mut streams = pair(chunk_bytes(b"LIST", b"", None));
        let record = layout.index(&mut streams.data).unwrap();

        let mut is_list = expr::compile("tag == \"LIST\" && len == 0").unwrap();
        assert!(is_list.eval_bool(&record.scope(&mut streams)).unwrap());

        let mut nested = expr::compile("tag.name.x").unwrap();
        assert!(matches!(
            nested.evaluate(&record.scope(&mut streams)),
            Err(ExprError::UnresolvedVariable(_))
        ));
    }
}
