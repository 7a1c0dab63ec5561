// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type catalog.
//!
//! A [`TypeRegistry`] owns every [`TypeSpec`]; specs reference one another
//! through [`SpecId`] handles, so a spec can contain itself or be shared by
//! many parents.
//!
//! # Example
//!
//! ```rust
//! use binform::catalog::TypeRegistry;
//!
//! let mut registry = TypeRegistry::new();
//! let u32_id = registry.lookup("uint32").unwrap();
//! let chunk = registry.create_with("Chunk", [("len", u32_id), ("crc", u32_id)]).unwrap();
//!
//! assert_eq!(registry.create("Chunk"), chunk);
//! assert_eq!(registry.spec(chunk).unwrap().properties().len(), 2);
//! ```

#[cfg(feature = "catalog-loader")]
pub mod loader;

use crate::expr::ExprError;
use crate::type_id::TypeId;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Initial id table capacity.
pub const INITIAL_CAPACITY: usize = 64;

/// Result type for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Catalog errors.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("unknown type spec id {0}")]
    UnknownSpec(SpecId),

    #[error("unknown type '{0}'")]
    UnknownType(String),

    #[error("type name '{0}' is reserved for a wire type")]
    ReservedName(String),

    #[error("invalid formula '{formula}' on {owner}.{field}: {source}")]
    Formula {
        owner: String,
        field: String,
        formula: String,
        #[source]
        source: ExprError,
    },

    #[cfg(feature = "catalog-loader")]
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "catalog-loader")]
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Registry handle of a [`TypeSpec`]. Ids are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpecId(pub u32);

impl fmt::Display for SpecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A named, typed member of a [`TypeSpec`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub name: String,
    pub spec: SpecId,
    /// Byte size formula (`string`, `bytes`, `custom`).
    pub size: Option<String>,
    /// Presence formula; the field is omitted when it evaluates false.
    pub condition: Option<String>,
    /// Element count formula; absent means exactly one.
    pub count: Option<String>,
}

impl Property {
    pub fn new(name: impl Into<String>, spec: SpecId) -> Self {
        Self {
            name: name.into(),
            spec,
            size: None,
            condition: None,
            count: None,
        }
    }

    pub fn with_size(mut self, formula: impl Into<String>) -> Self {
        self.size = Some(formula.into());
        self
    }

    pub fn with_condition(mut self, formula: impl Into<String>) -> Self {
        self.condition = Some(formula.into());
        self
    }

    pub fn with_count(mut self, formula: impl Into<String>) -> Self {
        self.count = Some(formula.into());
        self
    }

    /// Every formula attached to this property, labelled.
    pub fn formulas(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("size", self.size.as_deref()),
            ("condition", self.condition.as_deref()),
            ("count", self.count.as_deref()),
        ]
        .into_iter()
        .filter_map(|(label, formula)| formula.map(|f| (label, f)))
    }
}

/// Named schema node: a wire type plus an ordered list of properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSpec {
    name: String,
    type_id: TypeId,
    properties: Vec<Property>,
}

impl TypeSpec {
    fn new(name: impl Into<String>, type_id: TypeId) -> Self {
        Self {
            name: name.into(),
            type_id,
            properties: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn is_builtin(&self) -> bool {
        self.type_id != TypeId::Custom
    }
}

/// Name to id map plus a growable id to spec table.
///
/// The twelve wire types are pre-registered under their canonical names
/// (`uint32`, `stringz`, ...); every spec created afterwards is `custom`.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    ids: HashMap<String, SpecId>,
    specs: Vec<Option<TypeSpec>>,
    next_id: u32,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            ids: HashMap::new(),
            specs: vec![None; INITIAL_CAPACITY],
            next_id: 0,
        };
        for type_id in TypeId::ALL {
            if type_id != TypeId::Custom {
                registry.insert(TypeSpec::new(type_id.name(), type_id));
            }
        }
        registry
    }

    fn insert(&mut self, spec: TypeSpec) -> SpecId {
        let id = SpecId(self.next_id);
        self.next_id += 1;

        let index = id.0 as usize;
        while index >= self.specs.len() {
            let capacity = self.specs.len().max(1) * 2;
            log::debug!("[catalog] growing type table to {}", capacity);
            self.specs.resize(capacity, None);
        }

        self.ids.insert(spec.name.clone(), id);
        self.specs[index] = Some(spec);
        id
    }

    /// Get or create the spec named `name`.
    pub fn create(&mut self, name: &str) -> SpecId {
        if let Some(id) = self.ids.get(name) {
            return *id;
        }
        let id = self.insert(TypeSpec::new(name, TypeId::Custom));
        log::trace!("[catalog] registered '{}' as {}", name, id);
        id
    }

    /// Get or create `name`, then append each `(property, spec)` in order.
    pub fn create_with<I, K>(&mut self, name: &str, attributes: I) -> Result<SpecId>
    where
        I: IntoIterator<Item = (K, SpecId)>,
        K: Into<String>,
    {
        let id = self.create(name);
        for (key, spec) in attributes {
            self.append_property(id, Property::new(key, spec))?;
        }
        Ok(id)
    }

    /// Append a property to `owner`. The referenced spec must exist; it may
    /// be `owner` itself.
    pub fn append_property(&mut self, owner: SpecId, property: Property) -> Result<()> {
        if self.get(property.spec).is_none() {
            return Err(CatalogError::UnknownSpec(property.spec));
        }
        self.specs
            .get_mut(owner.0 as usize)
            .and_then(Option::as_mut)
            .ok_or(CatalogError::UnknownSpec(owner))?
            .properties
            .push(property);
        Ok(())
    }

    pub fn get(&self, id: SpecId) -> Option<&TypeSpec> {
        self.specs.get(id.0 as usize).and_then(Option::as_ref)
    }

    pub fn spec(&self, id: SpecId) -> Result<&TypeSpec> {
        self.get(id).ok_or(CatalogError::UnknownSpec(id))
    }

    pub fn lookup(&self, name: &str) -> Option<SpecId> {
        self.ids.get(name).copied()
    }

    /// Id of the pre-registered spec for a wire type (`None` for `custom`).
    pub fn builtin(&self, type_id: TypeId) -> Option<SpecId> {
        if type_id == TypeId::Custom {
            return None;
        }
        self.lookup(type_id.name())
    }

    /// Number of registered specs, builtins included.
    pub fn len(&self) -> usize {
        self.next_id as usize
    }

    pub fn is_empty(&self) -> bool {
        self.next_id == 0
    }

    /// Current size of the id table.
    pub fn capacity(&self) -> usize {
        self.specs.len()
    }

    /// Registered specs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (SpecId, &TypeSpec)> {
        self.specs
            .iter()
            .enumerate()
            .filter_map(|(i, spec)| spec.as_ref().map(|s| (SpecId(i as u32), s)))
    }
}
