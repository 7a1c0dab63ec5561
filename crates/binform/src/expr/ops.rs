// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Binary operator table.

use super::{ExprError, Value};

/// The eighteen binary operators of the formula language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    Shl,
    Shr,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    BitAnd,
    BitXor,
    BitOr,
    And,
    Or,
}

impl BinaryOp {
    /// Every operator, tightest-binding first.
    pub const ALL: [BinaryOp; 18] = [
        BinaryOp::Mul,
        BinaryOp::Div,
        BinaryOp::Rem,
        BinaryOp::Add,
        BinaryOp::Sub,
        BinaryOp::Shl,
        BinaryOp::Shr,
        BinaryOp::Lt,
        BinaryOp::Gt,
        BinaryOp::Le,
        BinaryOp::Ge,
        BinaryOp::Eq,
        BinaryOp::Ne,
        BinaryOp::BitAnd,
        BinaryOp::BitXor,
        BinaryOp::BitOr,
        BinaryOp::And,
        BinaryOp::Or,
    ];

    /// Longest operator symbol, in characters.
    pub const MAX_SYMBOL_LEN: usize = 2;

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Shl => "<<",
            Self::Shr => ">>",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Ge => ">=",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::BitAnd => "&",
            Self::BitXor => "^",
            Self::BitOr => "|",
            Self::And => "&&",
            Self::Or => "||",
        }
    }

    /// Precedence level; lower binds tighter.
    pub fn precedence(&self) -> u8 {
        match self {
            Self::Mul | Self::Div | Self::Rem => 5,
            Self::Add | Self::Sub => 6,
            Self::Shl | Self::Shr => 7,
            Self::Lt | Self::Gt | Self::Le | Self::Ge => 8,
            Self::Eq | Self::Ne => 9,
            Self::BitAnd => 10,
            Self::BitXor => 11,
            Self::BitOr => 12,
            Self::And => 13,
            Self::Or => 14,
        }
    }

    /// Exact symbol lookup.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| op.symbol() == symbol)
    }

    /// Longest-match tokenization at the start of `input`.
    ///
    /// Takes up to two characters (stopping at whitespace), then shortens the
    /// candidate until it names an operator. Returns the operator and the
    /// number of bytes consumed.
    pub fn match_prefix(input: &str) -> Option<(Self, usize)> {
        let mut end = 0;
        for ch in input.chars().take(Self::MAX_SYMBOL_LEN) {
            if ch.is_whitespace() {
                break;
            }
            end += ch.len_utf8();
        }
        let mut candidate = &input[..end];
        while !candidate.is_empty() {
            if let Some(op) = Self::from_symbol(candidate) {
                return Some((op, candidate.len()));
            }
            let mut chars = candidate.chars();
            chars.next_back();
            candidate = chars.as_str();
        }
        None
    }

    /// Apply the operator to two evaluated operands.
    pub fn apply(&self, lhs: &Value, rhs: &Value) -> Result<Value, ExprError> {
        match self {
            Self::Eq => Ok(Value::Bool(lhs.loose_eq(rhs))),
            Self::Ne => Ok(Value::Bool(!lhs.loose_eq(rhs))),
            Self::And => Ok(Value::Bool(lhs.as_bool() && rhs.as_bool())),
            Self::Or => Ok(Value::Bool(lhs.as_bool() || rhs.as_bool())),
            Self::Mul => int_op(lhs, rhs, |a, b| Ok(Value::Int64(a.wrapping_mul(b)))),
            Self::Div => int_op(lhs, rhs, |a, b| {
                checked_divisor(b).map(|b| Value::Int64(a.wrapping_div(b)))
            }),
            Self::Rem => int_op(lhs, rhs, |a, b| {
                checked_divisor(b).map(|b| Value::Int64(a.wrapping_rem(b)))
            }),
            Self::Add => int_op(lhs, rhs, |a, b| Ok(Value::Int64(a.wrapping_add(b)))),
            Self::Sub => int_op(lhs, rhs, |a, b| Ok(Value::Int64(a.wrapping_sub(b)))),
            Self::Shl => int_op(lhs, rhs, |a, b| Ok(Value::Int64(a.wrapping_shl(b as u32)))),
            Self::Shr => int_op(lhs, rhs, |a, b| Ok(Value::Int64(a.wrapping_shr(b as u32)))),
            Self::Lt => int_op(lhs, rhs, |a, b| Ok(Value::Bool(a < b))),
            Self::Gt => int_op(lhs, rhs, |a, b| Ok(Value::Bool(a > b))),
            Self::Le => int_op(lhs, rhs, |a, b| Ok(Value::Bool(a <= b))),
            Self::Ge => int_op(lhs, rhs, |a, b| Ok(Value::Bool(a >= b))),
            Self::BitAnd => int_op(lhs, rhs, |a, b| Ok(Value::Int64(a & b))),
            Self::BitXor => int_op(lhs, rhs, |a, b| Ok(Value::Int64(a ^ b))),
            Self::BitOr => int_op(lhs, rhs, |a, b| Ok(Value::Int64(a | b))),
        }
    }
}

/// Coerce both operands to Int64 and combine them.
fn int_op<F>(lhs: &Value, rhs: &Value, f: F) -> Result<Value, ExprError>
where
    F: FnOnce(i64, i64) -> Result<Value, ExprError>,
{
    f(lhs.as_i64()?, rhs.as_i64()?)
}

fn checked_divisor(b: i64) -> Result<i64, ExprError> {
    if b == 0 {
        Err(ExprError::DivisionByZero)
    } else {
        Ok(b)
    }
}
