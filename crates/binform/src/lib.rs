// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! binform: schema-driven binary format interpreter
//!
//! Reads, edits and writes structured binary data described by a type
//! catalog. Field sizes, presence conditions and element counts are computed
//! by formulas that reference sibling fields already parsed.
//!
//! # Layers
//!
//! - [`catalog`]: [`TypeRegistry`] of named [`TypeSpec`]s, YAML loading
//! - [`expr`]: formula compiler and evaluator
//! - [`codec`]: slot-level reads, writes and indexing over a data/write
//!   stream pair
//! - [`record`]: one-level driver tying the three together
//!
//! # Editing Model
//!
//! The original bytes are never modified. Edited text and byte payloads are
//! appended to a separate write stream and the field's slot stores a
//! negative offset pointing there; unedited payloads keep their positive
//! offset into the data stream.
//!
//! # Quick Start
//!
//! ```rust
//! use binform::catalog::loader::load_catalog_str;
//! use binform::codec::{FieldValue, StreamPair};
//! use binform::record::RecordLayout;
//! use std::io::Cursor;
//!
//! let registry = load_catalog_str(
//!     "types:\n  - name: Msg\n    fields:\n      - { name: len, type: uint8 }\n      - { name: text, type: string, size: len }\n",
//! )
//! .unwrap();
//!
//! let mut layout = RecordLayout::compile(&registry, registry.lookup("Msg").unwrap()).unwrap();
//! let mut streams = StreamPair::new(Cursor::new(b"\x05hello".to_vec()), Cursor::new(Vec::new()));
//! let record = layout.index(&mut streams.data).unwrap();
//!
//! assert_eq!(record.get("text", 0, &mut streams).unwrap(), FieldValue::from("hello"));
//! ```

pub mod catalog;
pub mod codec;
pub mod expr;
pub mod record;
pub mod type_id;

pub use catalog::{Property, SpecId, TypeRegistry, TypeSpec};
pub use codec::{CodecError, FieldValue, SlotBuffer, StreamPair};
pub use expr::{compile, CompiledExpr, ExprError, Value};
pub use record::{Record, RecordError, RecordLayout};
pub use type_id::TypeId;
