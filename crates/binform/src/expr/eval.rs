// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Tree-walking evaluator and variable path memo.

use super::parser::{Node, VarId};
use super::{ExprError, Value};
use std::collections::HashMap;

/// Bridge from formula variables to the live object tree.
///
/// `path` holds the dotted variable split into segments; `var` identifies the
/// AST node, and stays stable across evaluations of the same compiled formula.
pub trait Resolver {
    fn resolve(&self, path: &[String], var: VarId) -> Result<Value, ExprError>;
}

impl<F> Resolver for F
where
    F: Fn(&[String], VarId) -> Result<Value, ExprError>,
{
    fn resolve(&self, path: &[String], var: VarId) -> Result<Value, ExprError> {
        self(path, var)
    }
}

/// Flat variable bindings keyed by the full dotted path.
#[derive(Debug, Clone, Default)]
pub struct Variables {
    values: HashMap<String, Value>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, path: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.values.insert(path.into(), value.into());
        self
    }

    pub fn with(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(path, value);
        self
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        self.values.get(path)
    }
}

impl Resolver for Variables {
    fn resolve(&self, path: &[String], _var: VarId) -> Result<Value, ExprError> {
        let key = path.join(".");
        self.values
            .get(&key)
            .cloned()
            .ok_or(ExprError::UnresolvedVariable(key))
    }
}

/// Pre-split variable paths, filled on first use of each node.
#[derive(Debug, Clone, Default)]
pub(crate) struct PathMemo {
    segments: Vec<Option<Vec<String>>>,
    splits: usize,
}

impl PathMemo {
    pub(crate) fn with_capacity(variables: usize) -> Self {
        Self {
            segments: vec![None; variables],
            splits: 0,
        }
    }

    /// Number of times a path has been split since compilation.
    pub(crate) fn splits(&self) -> usize {
        self.splits
    }

    fn segments(&mut self, var: VarId, path: &str) -> &[String] {
        let index = var.0 as usize;
        if index >= self.segments.len() {
            self.segments.resize(index + 1, None);
        }
        let slot = &mut self.segments[index];
        if slot.is_none() {
            self.splits += 1;
            *slot = Some(split_path(path));
        }
        slot.as_deref().unwrap_or_default()
    }
}

/// Split a dotted variable path into its segments.
pub fn split_path(path: &str) -> Vec<String> {
    path.split('.').map(str::to_string).collect()
}

pub(crate) fn evaluate<R: Resolver + ?Sized>(
    node: &Node,
    memo: &mut PathMemo,
    resolver: &R,
) -> Result<Value, ExprError> {
    match node {
        Node::IntLiteral(v) | Node::HexLiteral(v) => Ok(Value::Int64(*v)),
        Node::StringLiteral(s) => Ok(Value::Text(s.clone())),
        Node::Variable { id, path } => {
            let segments = memo.segments(*id, path);
            resolver.resolve(segments, *id)
        }
        Node::Binary { op, lhs, rhs } => {
            let lhs = evaluate(lhs, memo, resolver)?;
            let rhs = evaluate(rhs, memo, resolver)?;
            op.apply(&lhs, &rhs)
        }
    }
}
