// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Field formula compiler and evaluator.
//!
//! Formulas compute field metadata (sizes, conditions, counts) from sibling
//! values that were already parsed.
//!
//! # Supported Syntax
//!
//! ```text
//! expression ::= atomic (operator atomic)*
//! atomic     ::= hex | number | string | variable | '(' expression ')'
//!
//! hex        ::= '0x' [0-9a-fA-F]+
//! number     ::= ('+' | '-')? [0-9]+
//! string     ::= '"' [^"]* '"'
//! variable   ::= [A-Za-z_] [A-Za-z0-9_.]*
//!
//! operator   ::= '*' '/' '%'             (5, binds tightest)
//!              | '+' '-'                 (6)
//!              | '<<' '>>'               (7)
//!              | '<' '>' '<=' '>='       (8)
//!              | '==' '!='               (9)
//!              | '&' (10) | '^' (11) | '|' (12)
//!              | '&&' (13) | '||' (14)
//! ```
//!
//! Operators of equal precedence associate to the left.
//!
//! # Example
//!
//! ```
//! use binform::expr::{compile, Variables};
//!
//! let mut size = compile("count * 4 + 8").unwrap();
//! let vars = Variables::new().with("count", 3);
//! assert_eq!(size.eval_size(&vars).unwrap(), 20);
//! ```

mod eval;
mod ops;
mod parser;
mod value;

pub use eval::{split_path, Resolver, Variables};
pub use ops::BinaryOp;
pub use parser::{parse_formula, Ast, Node, VarId};
pub use value::{Value, ValueKind};

use eval::PathMemo;
use thiserror::Error;

/// Result type for formula operations.
pub type Result<T> = std::result::Result<T, ExprError>;

/// Formula compilation and evaluation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExprError {
    #[error("formula parse error at byte {position}: {message}")]
    Parse { position: usize, message: String },

    #[error("empty formula")]
    EmptyFormula,

    #[error("unresolved variable '{0}'")]
    UnresolvedVariable(String),

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("negative size {0}")]
    NegativeSize(i64),

    /// The resolver found the variable but could not produce its value.
    #[error("resolver failed: {0}")]
    Resolver(String),
}

#[derive(Debug, Clone)]
enum Body {
    Constant(i64),
    Tree { root: Node, memo: PathMemo },
}

/// A formula compiled once and evaluated many times.
///
/// Evaluation fills a per-node path memo on first use, hence `&mut self`;
/// give each worker its own clone.
#[derive(Debug, Clone)]
pub struct CompiledExpr {
    source: String,
    body: Body,
}

/// Compile a formula.
///
/// A formula consisting of a single decimal integer compiles to a constant
/// without going through the grammar.
pub fn compile(formula: &str) -> Result<CompiledExpr> {
    if let Ok(constant) = formula.parse::<i64>() {
        return Ok(CompiledExpr {
            source: formula.to_string(),
            body: Body::Constant(constant),
        });
    }

    let ast = parse_formula(formula)?;
    log::trace!(
        "[expr] compiled '{}' ({} variable nodes)",
        formula,
        ast.variable_count
    );
    Ok(CompiledExpr {
        source: formula.to_string(),
        body: Body::Tree {
            root: ast.root,
            memo: PathMemo::with_capacity(ast.variable_count),
        },
    })
}

impl CompiledExpr {
    /// Original formula text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// True when the literal fast path was taken.
    pub fn is_constant(&self) -> bool {
        matches!(self.body, Body::Constant(_))
    }

    /// The parsed tree, if any.
    pub fn root(&self) -> Option<&Node> {
        match &self.body {
            Body::Constant(_) => None,
            Body::Tree { root, .. } => Some(root),
        }
    }

    /// How many variable paths have been split so far.
    pub fn path_splits(&self) -> usize {
        match &self.body {
            Body::Constant(_) => 0,
            Body::Tree { memo, .. } => memo.splits(),
        }
    }

    /// Evaluate against a resolver.
    pub fn evaluate<R: Resolver + ?Sized>(&mut self, resolver: &R) -> Result<Value> {
        match &mut self.body {
            Body::Constant(v) => Ok(Value::Int64(*v)),
            Body::Tree { root, memo } => eval::evaluate(root, memo, resolver),
        }
    }

    pub fn eval_i64<R: Resolver + ?Sized>(&mut self, resolver: &R) -> Result<i64> {
        self.evaluate(resolver)?.as_i64()
    }

    pub fn eval_bool<R: Resolver + ?Sized>(&mut self, resolver: &R) -> Result<bool> {
        Ok(self.evaluate(resolver)?.as_bool())
    }

    /// Evaluate as a byte size or element count; negative results fail.
    pub fn eval_size<R: Resolver + ?Sized>(&mut self, resolver: &R) -> Result<u64> {
        let value = self.eval_i64(resolver)?;
        u64::try_from(value).map_err(|_| ExprError::NegativeSize(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn eval(formula: &str) -> Value {
        compile(formula)
            .and_then(|mut e| e.evaluate(&Variables::new()))
            .unwrap()
    }

    #[test]
    fn test_precedence_honoured() {
        assert_eq!(eval("3+4*5"), Value::Int64(23));
        assert_eq!(eval("(3+4)*5"), Value::Int64(35));
        assert_eq!(eval("1 << 2 + 1"), Value::Int64(8));
        assert_eq!(eval("6 & 3 | 8"), Value::Int64(10));
        assert_eq!(eval("1 + 1 == 2 && 3 > 2"), Value::Bool(true));
        assert_eq!(eval("20 - 5 - 5"), Value::Int64(10));
        assert_eq!(eval("64 / 4 / 2"), Value::Int64(8));
    }

    #[test]
    fn test_hex_literal() {
        assert_eq!(eval("0x1F"), Value::Int64(31));
        assert_eq!(eval("0x10 + 1"), Value::Int64(17));
    }

    #[test]
    fn test_string_equality() {
        assert_eq!(eval("\"ab\"==\"ab\""), Value::Bool(true));
        assert_eq!(eval("\"ab\"==\"cd\""), Value::Bool(false));
        assert_eq!(eval("\"ab\"!=\"cd\""), Value::Bool(true));
    }

    #[test]
    fn test_mixed_kind_equality_is_false() {
        assert_eq!(eval("1 == \"1\""), Value::Bool(false));
        assert_eq!(eval("1 != \"1\""), Value::Bool(true));
    }

    #[test]
    fn test_literal_fast_path() {
        let mut expr = compile("-128").unwrap();
        assert!(expr.is_constant());
        assert!(expr.root().is_none());
        assert_eq!(expr.eval_i64(&Variables::new()).unwrap(), -128);

        let expr = compile(" 12").unwrap();
        assert!(!expr.is_constant());
    }

    #[test]
    fn test_parse_error_is_not_a_value() {
        assert!(compile("4 +* 2").is_err());
        assert!(compile("").is_err());
        assert!(compile("size(").is_err());
    }

    #[test]
    fn test_variables() {
        let mut expr = compile("hdr.count * 2").unwrap();
        let vars = Variables::new().with("hdr.count", 21);
        assert_eq!(expr.eval_i64(&vars).unwrap(), 42);

        let mut missing = compile("nope + 1").unwrap();
        assert!(matches!(
            missing.evaluate(&Variables::new()),
            Err(ExprError::UnresolvedVariable(_))
        ));
    }

    #[test]
    fn test_closure_resolver_sees_node_identity() {
        let mut expr = compile("a + b").unwrap();
        let resolver = |path: &[String], var: VarId| -> Result<Value> {
            let base = if path[0] == "a" { 10 } else { 100 };
            Ok(Value::Int64(base + i64::from(var.0)))
        };
        assert_eq!(expr.eval_i64(&resolver).unwrap(), 111);
    }

    #[test]
    fn test_path_memo_splits_once_across_contexts() {
        let mut expr = compile("block.len * entry.count + block.len").unwrap();
        let calls = Cell::new(0usize);

        for i in 0..1000i64 {
            let resolver = |path: &[String], _var: VarId| -> Result<Value> {
                calls.set(calls.get() + 1);
                match path {
                    [a, b] if a == "block" && b == "len" => Ok(Value::Int64(i)),
                    [a, b] if a == "entry" && b == "count" => Ok(Value::Int64(2)),
                    _ => Err(ExprError::UnresolvedVariable(path.join("."))),
                }
            };
            assert_eq!(expr.eval_i64(&resolver).unwrap(), i * 3);
        }

        // Three variable nodes, each split exactly once.
        assert_eq!(expr.path_splits(), 3);
        assert_eq!(calls.get(), 3000);
    }

    #[test]
    fn test_eval_size_rejects_negative() {
        let mut expr = compile("2 - 5").unwrap();
        assert!(matches!(
            expr.eval_size(&Variables::new()),
            Err(ExprError::NegativeSize(-3))
        ));
    }

    #[test]
    fn test_eval_bool_conditions() {
        let mut expr = compile("flags & 0x4").unwrap();
        assert!(expr
            .eval_bool(&Variables::new().with("flags", 0x6))
            .unwrap());
        assert!(!expr
            .eval_bool(&Variables::new().with("flags", 0x2))
            .unwrap());
    }

    #[test]
    fn test_clone_has_independent_memo() {
        let mut first = compile("x + 1").unwrap();
        let mut second = first.clone();
        first.eval_i64(&Variables::new().with("x", 1)).unwrap();
        assert_eq!(first.path_splits(), 1);
        assert_eq!(second.path_splits(), 0);
        second.eval_i64(&Variables::new().with("x", 2)).unwrap();
        assert_eq!(second.path_splits(), 1);
    }
}
