//! Schema definitions for datastore-sync.
//!
//! A schema lists the record kinds that can be imported and the declared type
//! of every field. It is loaded once per run (usually from a YAML file) and is
//! read-only afterwards.
//!
//! ## Type Hierarchy
//!
//! **Declared types** (as written in the schema file):
//! - `FieldDefinition` - Single field with its declared type
//! - `KindDefinition` - Kind with its fields and embedded sub-definitions
//!
//! **Resolved types** (built at load time):
//! - `FieldDescriptor` - What the decoder needs to coerce one column
//! - `ResolvedKind` - Flat field table for one kind, embedded fields included
//! - `Schema` - All resolved kinds
//!
//! ## Embedding
//!
//! A kind may embed other kinds by value. Field lookup first checks the
//! kind's own fields, then each embedded definition depth-first in
//! declaration order; the first match wins. The lookup table is computed once
//! in [`Schema::new`], which also rejects embedding cycles.

use crate::types::FieldType;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

// ============================================================================
// Error Types
// ============================================================================

/// Error type for schema operations.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// Error reading schema file
    #[error("Failed to read schema file: {0}")]
    IoError(#[from] std::io::Error),

    /// Error parsing YAML
    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Kind not found in schema
    #[error("Kind not found: {0}")]
    UnknownKind(String),

    /// Field not declared on the kind or any embedded definition
    #[error("Field '{field}' not found in kind '{kind}' or its embedded definitions")]
    UnknownField { kind: String, field: String },

    /// Kind declared twice
    #[error("Kind '{0}' is declared more than once")]
    DuplicateKind(String),

    /// Embedded reference to an undeclared kind
    #[error("Kind '{kind}' embeds unknown kind '{embedded}'")]
    UnknownEmbedded { kind: String, embedded: String },

    /// Kinds embed each other
    #[error("Embedding cycle: {}", path.join(" -> "))]
    EmbeddingCycle { path: Vec<String> },

    /// Ownership marker on a field that is not a collection
    #[error("Field '{field}' in kind '{kind}' is marked owned but is not a collection")]
    OwnedScalar { kind: String, field: String },
}

// ============================================================================
// Declared Types
// ============================================================================

/// Field definition as declared in the schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldDefinition {
    /// Field name
    pub name: String,

    /// Declared type
    #[serde(rename = "type")]
    pub field_type: FieldType,

    /// Collection of references owned by the record (one-to-many)
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub owned: bool,
}

impl FieldDefinition {
    /// Create a new field definition.
    pub fn new(name: impl Into<String>, field_type: impl Into<FieldType>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            owned: false,
        }
    }

    /// Create an owned one-to-many field. Elements always decode as references.
    pub fn owned(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            owned: true,
        }
    }
}

/// Kind definition as declared in the schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KindDefinition {
    /// Kind name
    pub name: String,

    /// Declared fields, in order
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,

    /// Kinds embedded by value, in lookup order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedded: Vec<String>,

    /// Only used as an embedded definition
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub embeddable: bool,
}

impl KindDefinition {
    /// Create a new kind definition.
    pub fn new(name: impl Into<String>, fields: Vec<FieldDefinition>) -> Self {
        Self {
            name: name.into(),
            fields,
            embedded: Vec::new(),
            embeddable: false,
        }
    }

    /// Embed another kind by value.
    pub fn embed(mut self, kind: impl Into<String>) -> Self {
        self.embedded.push(kind.into());
        self
    }

    /// Get a directly declared field by name.
    pub fn get_field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }
}

fn default_version() -> u32 {
    1
}

/// On-disk schema file layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SchemaFile {
    #[serde(default = "default_version")]
    version: u32,

    kinds: Vec<KindDefinition>,
}

// ============================================================================
// Resolved Types
// ============================================================================

/// Resolved type information for one field of one kind.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    /// Declared type
    pub field_type: FieldType,

    /// Owned one-to-many relationship (reference collection)
    pub owned: bool,

    /// Kind that declares the field (differs from the resolved kind for embedded fields)
    pub declared_in: String,
}

impl FieldDescriptor {
    /// Check if this field is multi-valued.
    pub fn is_collection(&self) -> bool {
        self.field_type.is_collection()
    }
}

/// Flat field table for one kind.
#[derive(Debug, Clone)]
pub struct ResolvedKind {
    name: String,
    field_names: Vec<String>,
    descriptors: HashMap<String, FieldDescriptor>,
}

impl ResolvedKind {
    /// Kind name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All resolvable field names: own fields first, then embedded ones depth-first.
    pub fn field_names(&self) -> &[String] {
        &self.field_names
    }

    /// Resolve a field by name.
    pub fn field(&self, name: &str) -> Result<&FieldDescriptor, SchemaError> {
        self.descriptors
            .get(name)
            .ok_or_else(|| SchemaError::UnknownField {
                kind: self.name.clone(),
                field: name.to_string(),
            })
    }
}

/// Loaded and resolved schema.
#[derive(Debug, Clone)]
pub struct Schema {
    /// Schema version
    pub version: u32,

    /// Kind definitions as declared
    pub kinds: Vec<KindDefinition>,

    resolved: HashMap<String, ResolvedKind>,
}

impl Schema {
    /// Build a schema from kind definitions, resolving embedded fields.
    pub fn new(kinds: Vec<KindDefinition>) -> Result<Self, SchemaError> {
        Self::with_version(default_version(), kinds)
    }

    fn with_version(version: u32, kinds: Vec<KindDefinition>) -> Result<Self, SchemaError> {
        let mut by_name: HashMap<&str, &KindDefinition> = HashMap::with_capacity(kinds.len());
        for kind in &kinds {
            if by_name.insert(kind.name.as_str(), kind).is_some() {
                return Err(SchemaError::DuplicateKind(kind.name.clone()));
            }
            for field in &kind.fields {
                if field.owned && !field.field_type.is_collection() {
                    return Err(SchemaError::OwnedScalar {
                        kind: kind.name.clone(),
                        field: field.name.clone(),
                    });
                }
            }
        }

        let mut resolved = HashMap::with_capacity(kinds.len());
        for kind in &kinds {
            let mut table = ResolvedKind {
                name: kind.name.clone(),
                field_names: Vec::new(),
                descriptors: HashMap::new(),
            };
            let mut path = Vec::new();
            collect_fields(kind, &by_name, &mut path, &mut table)?;
            resolved.insert(kind.name.clone(), table);
        }

        Ok(Self {
            version,
            kinds,
            resolved,
        })
    }

    /// Load schema from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SchemaError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse schema from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, SchemaError> {
        let file: SchemaFile = serde_yaml::from_str(yaml)?;
        Self::with_version(file.version, file.kinds)
    }

    /// Get a resolved kind by name.
    pub fn resolve_kind(&self, kind: &str) -> Option<&ResolvedKind> {
        self.resolved.get(kind)
    }

    /// Resolve the descriptor of a field in a specific kind.
    pub fn resolve_field(&self, kind: &str, field: &str) -> Result<&FieldDescriptor, SchemaError> {
        self.resolve_kind(kind)
            .ok_or_else(|| SchemaError::UnknownKind(kind.to_string()))?
            .field(field)
    }

    /// Get all kind names in declaration order.
    pub fn kind_names(&self) -> Vec<&str> {
        self.kinds.iter().map(|k| k.name.as_str()).collect()
    }
}

/// Depth-first walk over a kind and its embedded definitions.
///
/// `path` holds the kinds currently being walked; meeting one of them again
/// means the definitions embed each other.
fn collect_fields<'a>(
    kind: &'a KindDefinition,
    by_name: &HashMap<&str, &'a KindDefinition>,
    path: &mut Vec<&'a str>,
    table: &mut ResolvedKind,
) -> Result<(), SchemaError> {
    path.push(kind.name.as_str());

    for field in &kind.fields {
        if !table.descriptors.contains_key(&field.name) {
            table.field_names.push(field.name.clone());
            table.descriptors.insert(
                field.name.clone(),
                FieldDescriptor {
                    field_type: field.field_type.clone(),
                    owned: field.owned,
                    declared_in: kind.name.clone(),
                },
            );
        }
    }

    let mut seen_here = HashSet::new();
    for embedded in &kind.embedded {
        if !seen_here.insert(embedded.as_str()) {
            continue;
        }
        if path.contains(&embedded.as_str()) {
            let mut cycle: Vec<String> = path.iter().map(|s| s.to_string()).collect();
            cycle.push(embedded.clone());
            return Err(SchemaError::EmbeddingCycle { path: cycle });
        }
        let sub = by_name
            .get(embedded.as_str())
            .ok_or_else(|| SchemaError::UnknownEmbedded {
                kind: kind.name.clone(),
                embedded: embedded.clone(),
            })?;
        collect_fields(sub, by_name, path, table)?;
    }

    path.pop();
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
