// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Dynamically typed field access.
//!
//! [`read_value`] and [`write_value`] dispatch on a runtime [`TypeId`] so
//! callers driven by a catalog never name the Rust type of a field.

use super::field::{type_read, type_write};
use super::slots::SlotBuffer;
use super::streams::StreamPair;
use super::{CodecError, Result};
use crate::expr::Value;
use crate::type_id::TypeId;
use std::fmt;
use std::io::{Read, Seek, Write};

/// A decoded field of any wire type.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    Text(String),
    Bytes(Vec<u8>),
}

impl FieldValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::I8(_) => "i8",
            Self::I16(_) => "i16",
            Self::I32(_) => "i32",
            Self::I64(_) => "i64",
            Self::U8(_) => "u8",
            Self::U16(_) => "u16",
            Self::U32(_) => "u32",
            Self::U64(_) => "u64",
            Self::F32(_) => "f32",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
        }
    }

    /// Integer view; text holding a decimal integer counts.
    pub fn as_integer(&self) -> Option<i128> {
        match self {
            Self::I8(v) => Some(i128::from(*v)),
            Self::I16(v) => Some(i128::from(*v)),
            Self::I32(v) => Some(i128::from(*v)),
            Self::I64(v) => Some(i128::from(*v)),
            Self::U8(v) => Some(i128::from(*v)),
            Self::U16(v) => Some(i128::from(*v)),
            Self::U32(v) => Some(i128::from(*v)),
            Self::U64(v) => Some(i128::from(*v)),
            Self::Text(s) => s.trim().parse().ok(),
            Self::F32(_) | Self::Bytes(_) => None,
        }
    }

    /// Convert into the formula value domain.
    ///
    /// Integers become `Int64` (`u64` above `i64::MAX` wraps), `f32`
    /// truncates toward zero.
    pub fn to_expr(&self) -> Value {
        match self {
            Self::I8(v) => Value::Int64(i64::from(*v)),
            Self::I16(v) => Value::Int64(i64::from(*v)),
            Self::I32(v) => Value::Int64(i64::from(*v)),
            Self::I64(v) => Value::Int64(*v),
            Self::U8(v) => Value::Int64(i64::from(*v)),
            Self::U16(v) => Value::Int64(i64::from(*v)),
            Self::U32(v) => Value::Int64(i64::from(*v)),
            Self::U64(v) => Value::Int64(*v as i64),
            Self::F32(v) => Value::Int64(*v as i64),
            Self::Text(s) => Value::Text(s.clone()),
            Self::Bytes(b) => Value::Bytes(b.clone()),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::I8(v) => write!(f, "{}", v),
            Self::I16(v) => write!(f, "{}", v),
            Self::I32(v) => write!(f, "{}", v),
            Self::I64(v) => write!(f, "{}", v),
            Self::U8(v) => write!(f, "{}", v),
            Self::U16(v) => write!(f, "{}", v),
            Self::U32(v) => write!(f, "{}", v),
            Self::U64(v) => write!(f, "{}", v),
            Self::F32(v) => write!(f, "{}", v),
            Self::Text(s) => write!(f, "{:?}", s),
            Self::Bytes(b) => {
                for byte in b {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
        }
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::I64(v)
    }
}

/// Decode a scalar straight from the slot, `None` for non-scalar tags.
pub(crate) fn read_scalar(
    type_id: TypeId,
    slots: &SlotBuffer,
    pos: usize,
) -> Result<Option<FieldValue>> {
    let value = match type_id {
        TypeId::Int8 => FieldValue::I8(slots.read_i8(pos)?),
        TypeId::Int16 => FieldValue::I16(slots.read_i16(pos)?),
        TypeId::Int32 => FieldValue::I32(slots.read_i32(pos)?),
        TypeId::Int64 => FieldValue::I64(slots.read_i64(pos)?),
        TypeId::UInt8 => FieldValue::U8(slots.read_u8(pos)?),
        TypeId::UInt16 => FieldValue::U16(slots.read_u16(pos)?),
        TypeId::UInt32 => FieldValue::U32(slots.read_u32(pos)?),
        TypeId::UInt64 => FieldValue::U64(slots.read_u64(pos)?),
        TypeId::Float32 => FieldValue::F32(slots.read_f32(pos)?),
        TypeId::StringZ | TypeId::String | TypeId::Bytes | TypeId::Custom => return Ok(None),
    };
    Ok(Some(value))
}

/// Read the field at `pos` whatever its wire type.
pub fn read_value<D, W>(
    type_id: TypeId,
    slots: &SlotBuffer,
    pos: usize,
    streams: &mut StreamPair<D, W>,
) -> Result<FieldValue>
where
    D: Read + Seek,
    W: Read + Seek,
{
    if let Some(value) = read_scalar(type_id, slots, pos)? {
        return Ok(value);
    }
    match type_id {
        TypeId::StringZ | TypeId::String => Ok(FieldValue::Text(type_read::<String, _, _>(
            type_id, slots, pos, streams,
        )?)),
        TypeId::Bytes => Ok(FieldValue::Bytes(type_read::<Vec<u8>, _, _>(
            type_id, slots, pos, streams,
        )?)),
        _ => Err(CodecError::IncompatibleType {
            requested: type_id,
            codec: "FieldValue",
        }),
    }
}

fn narrow<T: TryFrom<i128>>(type_id: TypeId, value: &FieldValue) -> Result<T> {
    let wide = value.as_integer().ok_or(CodecError::IncompatibleType {
        requested: type_id,
        codec: value.type_name(),
    })?;
    T::try_from(wide).map_err(|_| CodecError::ValueOutOfRange {
        value: wide,
        target: type_id,
    })
}

/// Convert `value` to `type_id` and store it at `pos`.
///
/// Integer conversions are range checked. Text converts to `bytes` as its
/// UTF-8 encoding, integer-looking text converts to integer tags.
pub fn write_value<W: Write + Seek>(
    type_id: TypeId,
    slots: &mut SlotBuffer,
    pos: usize,
    write: &mut W,
    value: &FieldValue,
) -> Result<usize> {
    let incompatible = || CodecError::IncompatibleType {
        requested: type_id,
        codec: value.type_name(),
    };

    match type_id {
        TypeId::Int8 => type_write(type_id, slots, pos, write, &narrow::<i8>(type_id, value)?),
        TypeId::Int16 => type_write(type_id, slots, pos, write, &narrow::<i16>(type_id, value)?),
        TypeId::Int32 => type_write(type_id, slots, pos, write, &narrow::<i32>(type_id, value)?),
        TypeId::Int64 => type_write(type_id, slots, pos, write, &narrow::<i64>(type_id, value)?),
        TypeId::UInt8 => type_write(type_id, slots, pos, write, &narrow::<u8>(type_id, value)?),
        TypeId::UInt16 => type_write(type_id, slots, pos, write, &narrow::<u16>(type_id, value)?),
        TypeId::UInt32 => type_write(type_id, slots, pos, write, &narrow::<u32>(type_id, value)?),
        TypeId::UInt64 => type_write(type_id, slots, pos, write, &narrow::<u64>(type_id, value)?),
        TypeId::Float32 => {
            let v = match value {
                FieldValue::F32(v) => *v,
                other => other.as_integer().ok_or_else(incompatible)? as f32,
            };
            type_write(type_id, slots, pos, write, &v)
        }
        TypeId::StringZ | TypeId::String => match value {
            FieldValue::Text(s) => type_write(type_id, slots, pos, write, s),
            _ => Err(incompatible()),
        },
        TypeId::Bytes => match value {
            FieldValue::Bytes(b) => type_write(type_id, slots, pos, write, b),
            FieldValue::Text(s) => type_write(type_id, slots, pos, write, &s.as_bytes().to_vec()),
            _ => Err(incompatible()),
        },
        TypeId::Custom => Err(incompatible()),
    }
}

/// Emit the field at `pos` to `output` in flattened wire form.
///
/// Scalars are copied as raw slot bytes, `stringz` gets its terminator back,
/// `string` and `bytes` are written as the bare payload.
pub fn copy_value<O, D, W>(
    type_id: TypeId,
    slots: &SlotBuffer,
    pos: usize,
    output: &mut O,
    streams: &mut StreamPair<D, W>,
) -> Result<()>
where
    O: Write + ?Sized,
    D: Read + Seek,
    W: Read + Seek,
{
    match read_value(type_id, slots, pos, streams)? {
        FieldValue::Text(s) => {
            output.write_all(s.as_bytes())?;
            if type_id == TypeId::StringZ {
                output.write_all(&[0])?;
            }
        }
        FieldValue::Bytes(b) => output.write_all(&b)?,
        _ => output.write_all(slots.read_bytes(pos, type_id.slot_width())?)?,
    }
    Ok(())
}
