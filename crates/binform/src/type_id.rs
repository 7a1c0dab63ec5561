// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wire encoding tags.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Closed tag identifying how a field is laid out on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeId {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    /// NUL-terminated text, referenced by offset.
    StringZ,
    /// Length-prefixed text, referenced by offset + length.
    String,
    /// Raw bytes, referenced by offset + length.
    Bytes,
    /// Nested object, indexed as (position, size) and skipped.
    Custom,
}

impl TypeId {
    /// Every tag, in declaration order.
    pub const ALL: [TypeId; 13] = [
        TypeId::Int8,
        TypeId::Int16,
        TypeId::Int32,
        TypeId::Int64,
        TypeId::UInt8,
        TypeId::UInt16,
        TypeId::UInt32,
        TypeId::UInt64,
        TypeId::Float32,
        TypeId::StringZ,
        TypeId::String,
        TypeId::Bytes,
        TypeId::Custom,
    ];

    /// Canonical lowercase name, as used in catalog files.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::UInt8 => "uint8",
            Self::UInt16 => "uint16",
            Self::UInt32 => "uint32",
            Self::UInt64 => "uint64",
            Self::Float32 => "float32",
            Self::StringZ => "stringz",
            Self::String => "string",
            Self::Bytes => "bytes",
            Self::Custom => "custom",
        }
    }

    /// Size in bytes of a scalar value (None for indirect and custom types).
    pub fn scalar_size(&self) -> Option<usize> {
        match self {
            Self::Int8 | Self::UInt8 => Some(1),
            Self::Int16 | Self::UInt16 => Some(2),
            Self::Int32 | Self::UInt32 | Self::Float32 => Some(4),
            Self::Int64 | Self::UInt64 => Some(8),
            Self::StringZ | Self::String | Self::Bytes | Self::Custom => None,
        }
    }

    pub fn is_scalar(&self) -> bool {
        self.scalar_size().is_some()
    }

    /// Payload lives in one of the two streams, the slot only holds an offset.
    pub fn is_indirect(&self) -> bool {
        matches!(self, Self::StringZ | Self::String | Self::Bytes)
    }

    /// Whether the slot carries a 32-bit length after the offset.
    pub fn has_length_field(&self) -> bool {
        matches!(self, Self::String | Self::Bytes)
    }

    /// Needs a caller-supplied size when indexed.
    pub fn needs_size(&self) -> bool {
        matches!(self, Self::String | Self::Bytes | Self::Custom)
    }

    /// Width of the index slot for this tag.
    ///
    /// Scalars store the value itself, `stringz` an i32 offset, `string` and
    /// `bytes` an i32 offset plus i32 length, `custom` an i64 position plus a
    /// u32 size.
    pub fn slot_width(&self) -> usize {
        match self {
            Self::StringZ => 4,
            Self::String | Self::Bytes => 8,
            Self::Custom => 12,
            scalar => scalar.scalar_size().unwrap_or(0),
        }
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a name does not denote any [`TypeId`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown wire type '{0}'")]
pub struct UnknownTypeId(pub String);

impl FromStr for TypeId {
    type Err = UnknownTypeId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TypeId::ALL
            .iter()
            .copied()
            .find(|t| t.name() == s)
            .ok_or_else(|| UnknownTypeId(s.to_string()))
    }
}
