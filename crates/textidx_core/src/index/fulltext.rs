//! Full-text index adapter.
//!
//! [`FullTextIndex`] exposes the multi-value index contract on top of a
//! [`SearchEngine`]. It owns the protocol, not the storage: every key is
//! collated, every mutation runs under the modification permit and then the
//! exclusive instance lock, and rebuilds run with the engine in rebuilding
//! mode.
//!
//! # Example
//!
//! ```rust,ignore
//! let index = FullTextIndex::new(
//!     FullTextIndex::<MemorySearchEngine>::TYPE_ID,
//!     "MEMORY",
//!     MemorySearchEngine::new(),
//!     "NONE",
//!     json!({"analyzer": "standard"}),
//! );
//! index.create(db, "Article.title", definition, "Article.title", ["articles"], true, &NoopProgress)?;
//! index.put(Some("Hello".into()), rid)?;
//! assert!(index.remove(Some("HELLO".into()), rid)?);
//! ```

use crate::config::IndexConfig;
use crate::error::IndexResult;
use crate::index::{
    IndexBase, IndexDefinition, IndexKey, IndexMetadata, ManagedIndex, MultiValueIndex,
    ProgressListener, SearchEngine,
};
use crate::record::{RecordId, RecordSet, RecordSource};
use std::sync::Arc;
use tracing::{debug, trace};

/// Multi-value index backed by a search engine.
pub struct FullTextIndex<E: SearchEngine> {
    base: IndexBase<E>,
}

impl<E: SearchEngine> FullTextIndex<E> {
    /// Type identifier of full-text indexes.
    pub const TYPE_ID: &'static str = "FULLTEXT";

    /// Creates the adapter and hands `metadata` to the engine.
    pub fn new(
        type_id: impl Into<String>,
        algorithm: impl Into<String>,
        engine: E,
        value_container_algorithm: impl Into<String>,
        metadata: IndexMetadata,
    ) -> Self {
        let base = IndexBase::new(type_id, algorithm, engine, value_container_algorithm);
        base.engine().set_index_metadata(metadata);
        Self { base }
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn with_config(self, config: IndexConfig) -> Self {
        Self {
            base: self.base.with_config(config),
        }
    }

    /// Creates the index and optionally populates it.
    ///
    /// The engine learns which index manages it before any storage is
    /// allocated or entry written. Definition errors and repeated creates
    /// leave the engine untouched.
    #[allow(clippy::too_many_arguments)]
    pub fn create<I, S>(
        &self,
        database: Arc<dyn RecordSource>,
        name: &str,
        definition: IndexDefinition,
        cluster_index_name: &str,
        clusters_to_index: I,
        rebuild: bool,
        listener: &dyn ProgressListener,
    ) -> IndexResult<&Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let engine = self.base.engine();
        self.base.create(
            database,
            name,
            definition,
            cluster_index_name,
            clusters_to_index,
            rebuild,
            listener,
            |collate| engine.set_managed_index(ManagedIndex::new(self.base.id(), name, collate)),
            |listener| self.rebuild(listener),
        )?;
        Ok(self)
    }

    /// The generic skeleton this adapter specializes.
    pub fn base(&self) -> &IndexBase<E> {
        &self.base
    }

    /// The engine owned by this index.
    pub fn engine(&self) -> &E {
        self.base.engine()
    }

    /// Returns whether the engine is in rebuilding mode.
    pub fn is_rebuilding(&self) -> bool {
        self.base.engine().is_rebuilding()
    }
}

impl<E: SearchEngine> MultiValueIndex for FullTextIndex<E> {
    fn put(&self, key: Option<IndexKey>, rid: RecordId) -> IndexResult<&Self> {
        // No key means the record has nothing to index.
        let Some(key) = key else {
            return Ok(self);
        };
        let key = self.base.collating_value(key);

        let _permit = self.base.request_modification();
        let _exclusive = self.base.acquire_exclusive();

        let mut refs = RecordSet::with_capacity(1);
        refs.insert(rid);

        trace!(key = %key, rid = %rid, "full-text put");
        self.base.engine().put(&key, refs)?;
        Ok(self)
    }

    fn remove(&self, key: Option<IndexKey>, rid: RecordId) -> IndexResult<bool> {
        let Some(key) = key else {
            return Ok(false);
        };
        let key = self.base.collating_value(key);

        let _permit = self.base.request_modification();
        let _exclusive = self.base.acquire_exclusive();

        let engine = self.base.engine();
        if !engine.supports_targeted_remove() {
            return Ok(false);
        }
        trace!(key = %key, rid = %rid, "full-text remove");
        engine.remove(&key, rid)
    }

    fn rebuild(&self, listener: &dyn ProgressListener) -> IndexResult<u64> {
        let _barrier = self.base.prohibit_modifications()?;
        let _rebuilding = RebuildGuard::enter(self.base.engine());

        self.base
            .rebuild(listener, |key, rid| self.put(key, rid).map(|_| ()))
    }

    fn get(&self, key: IndexKey) -> IndexResult<Vec<RecordId>> {
        self.base.get(key)
    }

    fn size(&self) -> usize {
        self.base.size()
    }

    fn supports_ordered_iterations(&self) -> bool {
        false
    }

    fn can_be_used_in_equality_operators(&self) -> bool {
        true
    }
}

impl<E: SearchEngine> std::fmt::Debug for FullTextIndex<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FullTextIndex")
            .field("base", &self.base)
            .field("rebuilding", &self.is_rebuilding())
            .finish()
    }
}

/// Keeps a search engine in rebuilding mode for its lifetime.
///
/// Dropping the guard, on any exit path including unwinding, switches the
/// mode off again.
#[must_use = "rebuilding mode ends as soon as the guard is dropped"]
pub struct RebuildGuard<'a, E: SearchEngine + ?Sized> {
    engine: &'a E,
}

impl<'a, E: SearchEngine + ?Sized> RebuildGuard<'a, E> {
    /// Switches `engine` into rebuilding mode.
    pub fn enter(engine: &'a E) -> Self {
        engine.set_rebuilding(true);
        debug!("search engine entered rebuilding mode");
        Self { engine }
    }
}

impl<E: SearchEngine + ?Sized> Drop for RebuildGuard<'_, E> {
    fn drop(&mut self) {
        self.engine.set_rebuilding(false);
        debug!("search engine left rebuilding mode");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IndexError;
    use crate::index::{IndexEngine, MemorySearchEngine, NoopProgress};
    use crate::record::Record;
    use crate::types::CollectionId;
    use serde_json::json;

    struct Articles(Vec<Record>);

    impl RecordSource for Articles {
        fn count(&self, _collection: &str) -> IndexResult<u64> {
            Ok(self.0.len() as u64)
        }

        fn scan(&self, _collection: &str) -> IndexResult<Vec<Record>> {
            Ok(self.0.clone())
        }
    }

    fn index_over(records: Vec<Record>) -> FullTextIndex<MemorySearchEngine> {
        let index = FullTextIndex::new(
            FullTextIndex::<MemorySearchEngine>::TYPE_ID,
            "MEMORY",
            MemorySearchEngine::new(),
            "NONE",
            json!({"analyzer": "standard"}),
        );
        index
            .create(
                Arc::new(Articles(records)),
                "Article.title",
                IndexDefinition::new("Article", "title").with_collate("ci"),
                "Article.title",
                ["articles"],
                false,
                &NoopProgress,
            )
            .unwrap();
        index
    }

    fn rid() -> RecordId {
        RecordId::random(CollectionId::new(3))
    }

    #[test]
    fn capability_constants() {
        let index = index_over(vec![]);
        assert!(!index.supports_ordered_iterations());
        assert!(index.can_be_used_in_equality_operators());
    }

    #[test]
    fn metadata_reaches_engine_at_construction() {
        let index = index_over(vec![]);
        assert_eq!(index.engine().metadata(), json!({"analyzer": "standard"}));
    }

    #[test]
    fn create_registers_managed_index() {
        let index = index_over(vec![]);
        let managed = index.engine().managed_index().unwrap();
        assert_eq!(managed.id(), index.base().id());
        assert_eq!(managed.name(), "Article.title");
    }

    #[test]
    fn absent_key_is_skipped() {
        let index = index_over(vec![]);
        index.put(None, rid()).unwrap();
        assert_eq!(index.size(), 0);
        assert_eq!(index.engine().commit_count(), 0);
        assert!(!index.remove(None, rid()).unwrap());
    }

    #[test]
    fn put_is_chainable() {
        let index = index_over(vec![]);
        let (a, b) = (rid(), rid());
        index
            .put(Some("alpha".into()), a)
            .unwrap()
            .put(Some("beta".into()), b)
            .unwrap();
        assert_eq!(index.get("ALPHA".into()).unwrap(), vec![a]);
        assert_eq!(index.get("beta".into()).unwrap(), vec![b]);
    }

    #[test]
    fn put_then_remove_with_other_casing() {
        let index = index_over(vec![]);
        let r = rid();
        index.put(Some("Hello".into()), r).unwrap();
        assert!(index.engine().contains(&IndexKey::from("hello")).unwrap());

        assert!(index.remove(Some("HELLO".into()), r).unwrap());
        assert!(index.get("hello".into()).unwrap().is_empty());
        assert!(!index.remove(Some("hello".into()), r).unwrap());
    }

    #[test]
    fn rebuild_repopulates_and_leaves_rebuilding_mode() {
        let col = CollectionId::new(3);
        let records = vec![
            Record::new(RecordId::random(col), json!({"title": "Rust in Action"})),
            Record::new(RecordId::random(col), json!({"title": "Programming Rust"})),
            Record::new(RecordId::random(col), json!({"subtitle": "none"})),
        ];
        let index = index_over(records);
        let stale = rid();
        index.put(Some("stale".into()), stale).unwrap();

        let count = index.rebuild(&NoopProgress).unwrap();

        assert_eq!(count, 3);
        assert!(!index.is_rebuilding());
        assert_eq!(index.get("rust".into()).unwrap().len(), 2);
        assert!(index.get("stale".into()).unwrap().is_empty());
        assert_eq!(index.engine().pending_changes(), 0);
    }

    #[test]
    fn create_twice_fails_without_touching_engine() {
        let index = index_over(vec![]);
        let first = index.engine().managed_index().unwrap().id();
        let again = index.create(
            Arc::new(Articles(vec![])),
            "Other",
            IndexDefinition::new("Other", "x"),
            "Other",
            ["other"],
            false,
            &NoopProgress,
        );
        assert!(matches!(again, Err(IndexError::InvalidOperation { .. })));
        assert_eq!(index.engine().managed_index().unwrap().id(), first);
    }

    #[test]
    fn rebuild_guard_resets_flag_on_drop() {
        let engine = MemorySearchEngine::new();
        {
            let _guard = RebuildGuard::enter(&engine);
            assert!(engine.is_rebuilding());
        }
        assert!(!engine.is_rebuilding());
    }
}
