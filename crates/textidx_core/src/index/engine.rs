//! Engine-side contracts.
//!
//! An [`IndexEngine`] owns the entry storage behind an index. A
//! [`SearchEngine`] is an engine that analyzes keys as text and exposes the
//! extra hooks the full-text adapter drives: a metadata slot, a managed-index
//! slot, targeted removal and a rebuilding flag.

use crate::error::IndexResult;
use crate::index::{Collate, IndexDefinition, IndexKey};
use crate::record::{RecordId, RecordSet};
use crate::types::IndexId;
use std::fmt;
use std::sync::Arc;

/// Opaque configuration document handed to a search engine.
pub type IndexMetadata = serde_json::Value;

/// Storage behind a multi-value index.
///
/// Implementations use interior mutability: one engine is shared by every
/// caller of the index that owns it.
pub trait IndexEngine: Send + Sync {
    /// Allocates storage for a newly created index.
    fn create(
        &self,
        name: &str,
        definition: &IndexDefinition,
        cluster_index_name: &str,
        value_container_algorithm: &str,
    ) -> IndexResult<()>;

    /// Associates every reference in `refs` with `key`.
    fn put(&self, key: &IndexKey, refs: RecordSet) -> IndexResult<()>;

    /// Looks up the references stored under `key`.
    fn get(&self, key: &IndexKey) -> IndexResult<Vec<RecordId>>;

    /// Checks if the engine holds any reference under `key`.
    fn contains(&self, key: &IndexKey) -> IndexResult<bool> {
        Ok(!self.get(key)?.is_empty())
    }

    /// Removes every entry.
    fn clear(&self) -> IndexResult<()>;

    /// Returns the number of distinct keys stored.
    fn size(&self) -> usize;
}

/// Engine with full-text semantics, driven by [`FullTextIndex`].
///
/// [`FullTextIndex`]: crate::FullTextIndex
pub trait SearchEngine: IndexEngine {
    /// Applies the index metadata. Called once, before any mutation.
    fn set_index_metadata(&self, metadata: IndexMetadata);

    /// Records the index that manages this engine. Called once, before the
    /// engine is populated.
    fn set_managed_index(&self, index: ManagedIndex);

    /// Removes `rid` from the entry under `key`.
    ///
    /// Returns `true` if the association existed.
    fn remove(&self, key: &IndexKey, rid: RecordId) -> IndexResult<bool>;

    /// Switches bulk-repopulation mode on or off.
    fn set_rebuilding(&self, rebuilding: bool);

    /// Returns whether the engine is in bulk-repopulation mode.
    fn is_rebuilding(&self) -> bool;

    /// Whether [`SearchEngine::remove`] is supported.
    fn supports_targeted_remove(&self) -> bool {
        true
    }
}

/// Handle a search engine keeps on the index that manages it.
///
/// It carries the owner's identity and the behavior the engine cannot
/// compute on its own (collation). It does not keep the index alive.
#[derive(Clone)]
pub struct ManagedIndex {
    id: IndexId,
    name: String,
    collate: Arc<dyn Collate>,
}

impl ManagedIndex {
    /// Creates a handle.
    pub fn new(id: IndexId, name: impl Into<String>, collate: Arc<dyn Collate>) -> Self {
        Self {
            id,
            name: name.into(),
            collate,
        }
    }

    /// Identity of the managing index.
    #[must_use]
    pub fn id(&self) -> IndexId {
        self.id
    }

    /// Name of the managing index.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Collates a key the way the managing index does.
    #[must_use]
    pub fn collate(&self, key: IndexKey) -> IndexKey {
        self.collate.collate(key)
    }
}

impl fmt::Debug for ManagedIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedIndex")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("collate", &self.collate.name())
            .finish()
    }
}
