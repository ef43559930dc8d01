//! Test fixtures and index helpers.
//!
//! Provides an in-memory record source and ready-made index scenarios.

use parking_lot::RwLock;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use textidx_core::{
    CollectionId, EntityId, IndexError, IndexResult, Record, RecordId, RecordSource,
};

#[derive(Debug)]
struct Collection {
    id: CollectionId,
    records: Vec<Record>,
}

/// In-memory stand-in for the host database.
#[derive(Debug)]
pub struct MemoryDatabase {
    collections: RwLock<BTreeMap<String, Collection>>,
    next_collection: AtomicU32,
    fail_scans: AtomicBool,
}

impl Default for MemoryDatabase {
    fn default() -> Self {
        Self {
            collections: RwLock::new(BTreeMap::new()),
            next_collection: AtomicU32::new(1),
            fail_scans: AtomicBool::new(false),
        }
    }
}

impl MemoryDatabase {
    /// Creates an empty database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the ID of a collection, creating it if needed.
    pub fn collection(&self, name: &str) -> CollectionId {
        self.collection_mut(&mut self.collections.write(), name).id
    }

    fn collection_mut<'a>(
        &self,
        collections: &'a mut BTreeMap<String, Collection>,
        name: &str,
    ) -> &'a mut Collection {
        collections
            .entry(name.to_string())
            .or_insert_with(|| Collection {
                id: CollectionId::new(self.next_collection.fetch_add(1, Ordering::SeqCst)),
                records: Vec::new(),
            })
    }

    /// Stores a document and returns its record ID.
    pub fn insert(&self, collection: &str, document: Value) -> RecordId {
        let mut collections = self.collections.write();
        let target = self.collection_mut(&mut collections, collection);
        let rid = RecordId::new(target.id, EntityId::new());
        target.records.push(Record::new(rid, document));
        rid
    }

    /// Deletes a record. Returns `true` if it existed.
    pub fn delete(&self, rid: RecordId) -> bool {
        let mut collections = self.collections.write();
        for collection in collections.values_mut() {
            if let Some(pos) = collection.records.iter().position(|r| r.id == rid) {
                collection.records.remove(pos);
                return true;
            }
        }
        false
    }

    /// Makes subsequent scans fail with a storage error.
    pub fn fail_scans(&self, fail: bool) {
        self.fail_scans.store(fail, Ordering::SeqCst);
    }
}

impl RecordSource for MemoryDatabase {
    fn count(&self, collection: &str) -> IndexResult<u64> {
        self.collections
            .read()
            .get(collection)
            .map(|c| c.records.len() as u64)
            .ok_or_else(|| IndexError::collection_not_found(collection))
    }

    fn scan(&self, collection: &str) -> IndexResult<Vec<Record>> {
        if self.fail_scans.load(Ordering::SeqCst) {
            return Err(IndexError::storage(format!("scan of '{collection}' failed")));
        }
        self.collections
            .read()
            .get(collection)
            .map(|c| c.records.clone())
            .ok_or_else(|| IndexError::collection_not_found(collection))
    }
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use textidx_core::{
        FullTextIndex, IndexConfig, IndexDefinition, IndexMetadata, NoopProgress, SearchEngine,
    };

    /// Collection holding article documents.
    pub const ARTICLES: &str = "articles";

    /// Name of the title index.
    pub const TITLE_INDEX: &str = "Article.title";

    const WORDS: [&str; 8] = [
        "rust", "index", "search", "engine", "lock", "rebuild", "token", "query",
    ];

    /// Metadata selecting the standard analyzer.
    pub fn standard_metadata() -> IndexMetadata {
        json!({"analyzer": "standard"})
    }

    /// Case-insensitive definition over `Article.title`.
    pub fn title_definition() -> IndexDefinition {
        IndexDefinition::new("Article", "title").with_collate("ci")
    }

    /// Database with `count` articles whose titles cycle through a small
    /// vocabulary.
    pub fn articles(count: usize) -> Arc<MemoryDatabase> {
        let db = MemoryDatabase::new();
        db.collection(ARTICLES);
        for i in 0..count {
            let title = format!("{} {}", WORDS[i % WORDS.len()], WORDS[(i + 3) % WORDS.len()]);
            db.insert(ARTICLES, json!({"title": title, "number": i}));
        }
        Arc::new(db)
    }

    /// Creates a full-text index over article titles.
    pub fn title_index<E: SearchEngine>(
        engine: E,
        db: Arc<MemoryDatabase>,
        rebuild: bool,
    ) -> FullTextIndex<E> {
        title_index_with_config(engine, db, rebuild, IndexConfig::default())
    }

    /// Creates a full-text index over article titles with `config`.
    pub fn title_index_with_config<E: SearchEngine>(
        engine: E,
        db: Arc<MemoryDatabase>,
        rebuild: bool,
        config: IndexConfig,
    ) -> FullTextIndex<E> {
        let index = FullTextIndex::new(
            FullTextIndex::<E>::TYPE_ID,
            "TEST",
            engine,
            "NONE",
            standard_metadata(),
        )
        .with_config(config);
        index
            .create(
                db,
                TITLE_INDEX,
                title_definition(),
                TITLE_INDEX,
                [ARTICLES],
                rebuild,
                &NoopProgress,
            )
            .expect("failed to create title index");
        index
    }
}
