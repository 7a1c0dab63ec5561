// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Formula parser.
//!
//! Recursive descent for atoms, precedence climbing for the operator chain.

use super::{BinaryOp, ExprError};

/// Identity of a variable node, dense from 0 in source order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub u32);

/// Parsed formula AST node.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Decimal literal, optionally signed.
    IntLiteral(i64),
    /// `0x` literal.
    HexLiteral(i64),
    /// Double-quoted literal, quotes stripped, no escapes.
    StringLiteral(String),
    /// Dotted path into the live object tree.
    Variable { id: VarId, path: String },
    Binary {
        op: BinaryOp,
        lhs: Box<Node>,
        rhs: Box<Node>,
    },
}

/// Parse result: the tree plus the number of variable nodes in it.
#[derive(Debug, Clone, PartialEq)]
pub struct Ast {
    pub root: Node,
    pub variable_count: usize,
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    next_var: u32,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            next_var: 0,
        }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn error(&self, message: impl Into<String>) -> ExprError {
        ExprError::Parse {
            position: self.pos,
            message: message.into(),
        }
    }

    /// `Atomic (Operator Atomic)*` where the right operand of `op` only
    /// absorbs operators binding strictly tighter than `op`.
    fn parse_expression(&mut self, loosest: u8) -> Result<Node, ExprError> {
        let mut lhs = self.parse_atomic()?;

        loop {
            self.skip_whitespace();
            let Some((op, len)) = BinaryOp::match_prefix(self.rest()) else {
                break;
            };
            if op.precedence() > loosest {
                break;
            }
            self.pos += len;
            let rhs = self.parse_expression(op.precedence() - 1)?;
            lhs = Node::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }

        Ok(lhs)
    }

    fn parse_atomic(&mut self) -> Result<Node, ExprError> {
        self.skip_whitespace();
        let rest = self.rest();
        let ch = self
            .peek_char()
            .ok_or_else(|| self.error("expected operand, found end of formula"))?;

        if rest.starts_with("0x") && rest[2..].starts_with(|c: char| c.is_ascii_hexdigit()) {
            return self.parse_hex();
        }

        if ch.is_ascii_digit()
            || ((ch == '+' || ch == '-') && rest[1..].starts_with(|c: char| c.is_ascii_digit()))
        {
            return self.parse_number();
        }

        if ch == '"' {
            return self.parse_string();
        }

        if ch.is_ascii_alphabetic() || ch == '_' {
            return Ok(self.parse_variable());
        }

        if ch == '(' {
            self.pos += 1;
            let inner = self.parse_expression(u8::MAX)?;
            self.skip_whitespace();
            if self.peek_char() != Some(')') {
                return Err(self.error("expected ')'"));
            }
            self.pos += 1;
            return Ok(inner);
        }

        Err(self.error(format!("unexpected character '{}'", ch)))
    }

    fn parse_hex(&mut self) -> Result<Node, ExprError> {
        let start = self.pos;
        self.pos += 2;
        let digits = self.take_while(|c| c.is_ascii_hexdigit());
        i64::from_str_radix(digits, 16)
            .map(Node::HexLiteral)
            .map_err(|_| ExprError::Parse {
                position: start,
                message: format!("hex literal 0x{} out of range", digits),
            })
    }

    fn parse_number(&mut self) -> Result<Node, ExprError> {
        let start = self.pos;
        self.pos += 1;
        self.take_while(|c| c.is_ascii_digit());
        let text = &self.input[start..self.pos];
        text.parse::<i64>()
            .map(Node::IntLiteral)
            .map_err(|_| ExprError::Parse {
                position: start,
                message: format!("integer literal {} out of range", text),
            })
    }

    fn parse_string(&mut self) -> Result<Node, ExprError> {
        let start = self.pos;
        self.pos += 1;
        let content = self.take_while(|c| c != '"');
        if self.peek_char() != Some('"') {
            return Err(ExprError::Parse {
                position: start,
                message: "unterminated string literal".to_string(),
            });
        }
        self.pos += 1;
        Ok(Node::StringLiteral(content.to_string()))
    }

    fn parse_variable(&mut self) -> Node {
        let path = self.take_while(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
        let id = VarId(self.next_var);
        self.next_var += 1;
        Node::Variable {
            id,
            path: path.to_string(),
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while let Some(ch) = self.peek_char() {
            if !pred(ch) {
                break;
            }
            self.pos += ch.len_utf8();
        }
        &self.input[start..self.pos]
    }
}

/// Parse a formula into an [`Ast`].
pub fn parse_formula(formula: &str) -> Result<Ast, ExprError> {
    if formula.trim().is_empty() {
        return Err(ExprError::EmptyFormula);
    }

    let mut parser = Parser::new(formula);
    let root = parser.parse_expression(u8::MAX)?;
    parser.skip_whitespace();
    if let Some(ch) = parser.peek_char() {
        return Err(parser.error(format!("unexpected trailing input '{}'", ch)));
    }

    Ok(Ast {
        root,
        variable_count: parser.next_var as usize,
    })
}
