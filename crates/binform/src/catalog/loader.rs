// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! YAML catalog loader.
//!
//! # Example YAML
//!
//! ```yaml
//! types:
//!   - name: Chunk
//!     fields:
//!       - { name: len,  type: uint32 }
//!       - { name: body, type: bytes, size: "len" }
//!       - { name: crc,  type: uint32, condition: "len > 0" }
//!
//!   - name: Container
//!     fields:
//!       - { name: count,  type: uint16 }
//!       - { name: chunks, type: Chunk, count: "count", size: 12 }
//! ```
//!
//! Type names are declared before any field is attached, so a field may
//! reference a type defined further down the file, or its own type.

use super::{CatalogError, Property, Result, TypeRegistry};
use crate::expr;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Root YAML document structure.
#[derive(Debug, Deserialize)]
pub struct CatalogDocument {
    #[serde(default)]
    pub types: Vec<TypeDocument>,
}

/// One type definition.
#[derive(Debug, Deserialize)]
pub struct TypeDocument {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldDocument>,
}

/// One field of a type definition.
#[derive(Debug, Deserialize)]
pub struct FieldDocument {
    pub name: String,
    /// Wire type name or the name of a catalog type.
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub size: Option<FormulaDocument>,
    #[serde(default)]
    pub condition: Option<FormulaDocument>,
    #[serde(default)]
    pub count: Option<FormulaDocument>,
}

/// A formula, written either as a bare integer or as text.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FormulaDocument {
    Literal(i64),
    Text(String),
}

impl FormulaDocument {
    pub fn into_source(self) -> String {
        match self {
            Self::Literal(v) => v.to_string(),
            Self::Text(s) => s,
        }
    }
}

/// Parse a catalog document without registering anything.
pub fn parse_catalog(yaml: &str) -> Result<CatalogDocument> {
    Ok(serde_yaml::from_str(yaml)?)
}

/// Load a catalog from YAML text into a fresh registry.
pub fn load_catalog_str(yaml: &str) -> Result<TypeRegistry> {
    let mut registry = TypeRegistry::new();
    load_into(&mut registry, parse_catalog(yaml)?)?;
    Ok(registry)
}

/// Load a catalog file into a fresh registry.
pub fn load_catalog<P: AsRef<Path>>(path: P) -> Result<TypeRegistry> {
    let path = path.as_ref();
    log::debug!("[catalog] loading {}", path.display());
    let yaml = fs::read_to_string(path)?;
    load_catalog_str(&yaml)
}

/// Register every type of `document` in `registry`.
///
/// Formulas are compiled here only to validate them, so a malformed catalog
/// fails at load time. The registry keeps the formula text and
/// [`RecordLayout::compile`] compiles it again for evaluation.
///
/// A type may not reuse the name of a builtin wire type.
///
/// [`RecordLayout::compile`]: crate::record::RecordLayout::compile
pub fn load_into(registry: &mut TypeRegistry, document: CatalogDocument) -> Result<()> {
    for ty in &document.types {
        let builtin = registry
            .lookup(&ty.name)
            .and_then(|id| registry.get(id))
            .is_some_and(|spec| spec.is_builtin());
        if builtin {
            return Err(CatalogError::ReservedName(ty.name.clone()));
        }
        registry.create(&ty.name);
    }

    for ty in document.types {
        let owner = registry.create(&ty.name);
        for field in ty.fields {
            let spec = registry
                .lookup(&field.type_name)
                .ok_or_else(|| CatalogError::UnknownType(field.type_name.clone()))?;

            let mut property = Property::new(field.name, spec);
            property.size = field.size.map(FormulaDocument::into_source);
            property.condition = field.condition.map(FormulaDocument::into_source);
            property.count = field.count.map(FormulaDocument::into_source);

            for (_, formula) in property.formulas() {
                expr::compile(formula).map_err(|source| CatalogError::Formula {
                    owner: ty.name.clone(),
                    field: property.name.clone(),
                    formula: formula.to_string(),
                    source,
                })?;
            }
            registry.append_property(owner, property)?;
        }
    }

    log::debug!("[catalog] {} types registered", registry.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::type_id::TypeId;

    #[test]
    fn test_forward_and_self_references() {
        let registry = load_catalog_str(
            r#"
types:
  - name: List
    fields:
      - { name: head, type: Item, size: 4 }
      - { name: tail, type: List, size: "rest", condition: "more != 0" }
  - name: Item
    fields:
      - { name: value, type: int32 }
"#,
        )
        .unwrap();

        let list = registry.lookup("List").unwrap();
        let item = registry.lookup("Item").unwrap();
        let spec = registry.spec(list).unwrap();
        assert_eq!(spec.property("head").unwrap().spec, item);
        assert_eq!(spec.property("head").unwrap().size.as_deref(), Some("4"));
        assert_eq!(spec.property("tail").unwrap().spec, list);
        assert_eq!(
            spec.property("tail").unwrap().condition.as_deref(),
            Some("more != 0")
        );
        assert_eq!(
            registry.spec(item).unwrap().properties()[0].spec,
            registry.builtin(TypeId::Int32).unwrap()
        );
    }

    #[test]
    fn test_unknown_type() {
        let err = load_catalog_str(
            "types:\n  - name: A\n    fields:\n      - { name: x, type: float64 }\n",
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::UnknownType(ref t) if t == "float64"));
    }

    #[test]
    fn test_bad_formula_reports_field() {
        let err = load_catalog_str(
            "types:\n  - name: A\n    fields:\n      - { name: b, type: bytes, size: \"(1 +\" }\n",
        )
        .unwrap_err();
        match err {
            CatalogError::Formula { owner, field, .. } => {
                assert_eq!(owner, "A");
                assert_eq!(field, "b");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_builtin_name_rejected() {
        let err = load_catalog_str(
            "types:\n  - name: uint32\n    fields:\n      - { name: x, type: uint8 }\n",
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::ReservedName(ref n) if n == "uint32"));

        // Builtins stay untouched in a registry that rejected the document.
        let mut registry = TypeRegistry::new();
        let document = parse_catalog("types:\n  - name: bytes\n").unwrap();
        assert!(load_into(&mut registry, document).is_err());
        let bytes = registry.builtin(TypeId::Bytes).unwrap();
        assert!(registry.spec(bytes).unwrap().properties().is_empty());
    }

    #[test]
    fn test_malformed_yaml() {
        assert!(matches!(
            load_catalog_str("types: [ { name: "),
            Err(CatalogError::Yaml(_))
        ));
    }

    #[test]
    fn test_empty_document() {
        let registry = load_catalog_str("{}").unwrap();
        assert_eq!(registry.len(), 12);
    }
}
