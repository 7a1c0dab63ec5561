// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Runtime values produced by expression evaluation.

use super::ExprError;
use std::fmt;

/// Value domain of the expression language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int64(i64),
    Bool(bool),
    Text(String),
    Bytes(Vec<u8>),
}

/// Discriminant of a [`Value`], used by the equality table and in errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Int64,
    Bool,
    Text,
    Bytes,
}

impl ValueKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Int64 => "int64",
            Self::Bool => "bool",
            Self::Text => "text",
            Self::Bytes => "bytes",
        }
    }
}

type Comparator = fn(&Value, &Value) -> bool;

/// Kinds that support `==` / `!=`. Anything else compares unequal.
const COMPARATORS: [(ValueKind, Comparator); 2] =
    [(ValueKind::Int64, int_equal), (ValueKind::Text, text_equal)];

fn int_equal(lhs: &Value, rhs: &Value) -> bool {
    matches!((lhs, rhs), (Value::Int64(a), Value::Int64(b)) if a == b)
}

fn text_equal(lhs: &Value, rhs: &Value) -> bool {
    matches!((lhs, rhs), (Value::Text(a), Value::Text(b)) if a == b)
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Int64(_) => ValueKind::Int64,
            Self::Bool(_) => ValueKind::Bool,
            Self::Text(_) => ValueKind::Text,
            Self::Bytes(_) => ValueKind::Bytes,
        }
    }

    /// Coerce to a signed 64-bit integer.
    ///
    /// Booleans become 0/1 and text must hold a decimal integer.
    pub fn as_i64(&self) -> Result<i64, ExprError> {
        match self {
            Self::Int64(v) => Ok(*v),
            Self::Bool(b) => Ok(i64::from(*b)),
            Self::Text(s) => s.trim().parse().map_err(|_| ExprError::TypeMismatch {
                expected: ValueKind::Int64.name(),
                found: ValueKind::Text.name(),
            }),
            Self::Bytes(_) => Err(ExprError::TypeMismatch {
                expected: ValueKind::Int64.name(),
                found: ValueKind::Bytes.name(),
            }),
        }
    }

    /// Coerce to a boolean. Text and bytes are true when non-empty.
    pub fn as_bool(&self) -> bool {
        match self {
            Self::Int64(v) => *v != 0,
            Self::Bool(b) => *b,
            Self::Text(s) => !s.is_empty(),
            Self::Bytes(b) => !b.is_empty(),
        }
    }

    /// Equality through the comparator table.
    ///
    /// Mismatched kinds, or a kind without a comparator, compare unequal
    /// instead of failing; conditional schema logic relies on this.
    pub fn loose_eq(&self, other: &Value) -> bool {
        if self.kind() != other.kind() {
            log::trace!(
                "[expr] comparing {} with {}, treating as unequal",
                self.kind().name(),
                other.kind().name()
            );
            return false;
        }
        COMPARATORS
            .iter()
            .find(|(kind, _)| *kind == self.kind())
            .map(|(_, cmp)| cmp(self, other))
            .unwrap_or(false)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int64(v) => write!(f, "{}", v),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Text(s) => write!(f, "\"{}\"", s),
            Self::Bytes(b) => {
                for byte in b {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int64(i64::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int64(i64::from(v))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}
