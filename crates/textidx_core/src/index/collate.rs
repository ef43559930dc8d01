//! Key collation.
//!
//! Every key is collated before it reaches an engine, on the write path and
//! on the removal path alike, so equivalent keys always meet the same entry.

use crate::error::{IndexError, IndexResult};
use crate::index::IndexKey;
use std::fmt;
use std::sync::Arc;

/// Normalizes keys into their canonical comparable form.
pub trait Collate: Send + Sync + fmt::Debug {
    /// Name used in index definitions.
    fn name(&self) -> &'static str;

    /// Returns the collated form of `key`.
    fn collate(&self, key: IndexKey) -> IndexKey;
}

/// Identity collation.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCollate;

impl DefaultCollate {
    /// Name of this collation.
    pub const NAME: &'static str = "default";
}

impl Collate for DefaultCollate {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn collate(&self, key: IndexKey) -> IndexKey {
        key
    }
}

/// Case-insensitive collation: text is lowercased, composites recursively.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaseInsensitiveCollate;

impl CaseInsensitiveCollate {
    /// Name of this collation.
    pub const NAME: &'static str = "ci";
}

impl Collate for CaseInsensitiveCollate {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn collate(&self, key: IndexKey) -> IndexKey {
        match key {
            IndexKey::Text(s) => IndexKey::Text(s.to_lowercase()),
            IndexKey::Composite(parts) => {
                IndexKey::Composite(parts.into_iter().map(|p| self.collate(p)).collect())
            }
            other => other,
        }
    }
}

/// Resolves a collation by its definition name.
pub fn collate_by_name(name: &str) -> IndexResult<Arc<dyn Collate>> {
    match name {
        DefaultCollate::NAME => Ok(Arc::new(DefaultCollate)),
        CaseInsensitiveCollate::NAME => Ok(Arc::new(CaseInsensitiveCollate)),
        other => Err(IndexError::invalid_definition(format!(
            "unknown collate: {other}"
        ))),
    }
}
