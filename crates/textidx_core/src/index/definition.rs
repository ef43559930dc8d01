//! Index definitions and key extraction.

use crate::error::{IndexError, IndexResult};
use crate::index::{collate_by_name, Collate, DefaultCollate, IndexKey};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Describes which document field an index covers and how keys compare.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDefinition {
    /// Class (record type) the index belongs to.
    pub class_name: String,
    /// Field path for key extraction (e.g., `["address", "city"]`).
    pub field_path: Vec<String>,
    /// Name of the collation applied to keys.
    #[serde(default = "default_collate_name")]
    pub collate: String,
}

fn default_collate_name() -> String {
    DefaultCollate::NAME.to_string()
}

impl IndexDefinition {
    /// Creates a definition over a dotted field path (`"address.city"`).
    pub fn new(class_name: impl Into<String>, field: &str) -> Self {
        Self {
            class_name: class_name.into(),
            field_path: field.split('.').map(str::to_string).collect(),
            collate: default_collate_name(),
        }
    }

    /// Sets the collation by name.
    #[must_use]
    pub fn with_collate(mut self, name: impl Into<String>) -> Self {
        self.collate = name.into();
        self
    }

    /// Creates a deterministic index name from the definition.
    #[must_use]
    pub fn canonical_name(&self) -> String {
        format!("{}.{}", self.class_name, self.field_path.join("."))
    }

    /// Resolves the configured collation.
    pub fn resolve_collate(&self) -> IndexResult<Arc<dyn Collate>> {
        collate_by_name(&self.collate)
    }

    /// Checks that the definition can be used to build an index.
    pub fn validate(&self) -> IndexResult<()> {
        if self.class_name.is_empty() {
            return Err(IndexError::invalid_definition("class name is empty"));
        }
        if self.field_path.is_empty() || self.field_path.iter().any(String::is_empty) {
            return Err(IndexError::invalid_definition(format!(
                "invalid field path: {:?}",
                self.field_path
            )));
        }
        self.resolve_collate().map(|_| ())
    }

    /// Extracts the keys a document contributes to the index.
    ///
    /// A missing or null field yields a single absent key. An array field
    /// yields one key per element, so multi-valued fields index every value.
    #[must_use]
    pub fn extract_keys(&self, document: &Value) -> Vec<Option<IndexKey>> {
        let mut current = document;
        for field in &self.field_path {
            current = match current {
                Value::Object(map) => match map.get(field) {
                    Some(v) => v,
                    None => return vec![None],
                },
                _ => return vec![None],
            };
        }

        match current {
            Value::Array(items) => items.iter().map(IndexKey::from_json).collect(),
            other => vec![IndexKey::from_json(other)],
        }
    }
}
