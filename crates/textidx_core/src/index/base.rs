//! Generic multi-value index skeleton.
//!
//! `IndexBase` carries what every multi-value index shares regardless of
//! engine: identity and algorithm names, the two locks writers go through,
//! the state established by `create`, and the rebuild skeleton that rescans
//! source records and re-derives their keys. Concrete indexes supply the
//! per-entry write path as a callback.

use crate::config::IndexConfig;
use crate::error::{IndexError, IndexResult};
use crate::index::{
    Collate, DefaultCollate, IndexDefinition, IndexEngine, IndexKey, ModificationBarrier,
    ModificationLock, ModificationPermit, ProgressListener,
};
use crate::record::{RecordId, RecordSource};
use crate::types::IndexId;
use parking_lot::{Mutex, MutexGuard, RwLock};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// State established by a successful `create`.
struct CreatedState {
    name: String,
    definition: IndexDefinition,
    collate: Arc<dyn Collate>,
    cluster_index_name: String,
    clusters_to_index: BTreeSet<String>,
    database: Arc<dyn RecordSource>,
}

/// Shared skeleton of multi-value indexes.
pub struct IndexBase<E> {
    id: IndexId,
    type_id: String,
    algorithm: String,
    value_container_algorithm: String,
    config: IndexConfig,
    engine: E,
    /// Tier 1: writers vs. structural operations.
    modification_lock: ModificationLock,
    /// Tier 2: one mutation at a time against the engine.
    exclusive: Mutex<()>,
    state: RwLock<Option<Arc<CreatedState>>>,
}

impl<E: IndexEngine> IndexBase<E> {
    /// Creates an index skeleton over `engine`.
    pub fn new(
        type_id: impl Into<String>,
        algorithm: impl Into<String>,
        engine: E,
        value_container_algorithm: impl Into<String>,
    ) -> Self {
        Self {
            id: IndexId::next(),
            type_id: type_id.into(),
            algorithm: algorithm.into(),
            value_container_algorithm: value_container_algorithm.into(),
            config: IndexConfig::default(),
            engine,
            modification_lock: ModificationLock::new(),
            exclusive: Mutex::new(()),
            state: RwLock::new(None),
        }
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn with_config(mut self, config: IndexConfig) -> Self {
        self.config = config;
        self
    }

    /// Identity of this index instance.
    pub fn id(&self) -> IndexId {
        self.id
    }

    /// Index type (e.g. `FULLTEXT`).
    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    /// Engine algorithm name.
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// Value container algorithm name.
    pub fn value_container_algorithm(&self) -> &str {
        &self.value_container_algorithm
    }

    /// Current configuration.
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// The engine owned by this index.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// The modification gate.
    pub fn modification_lock(&self) -> &ModificationLock {
        &self.modification_lock
    }

    /// Returns whether `create` has completed.
    pub fn is_created(&self) -> bool {
        self.state.read().is_some()
    }

    /// Index name, once created.
    pub fn name(&self) -> Option<String> {
        self.state.read().as_ref().map(|s| s.name.clone())
    }

    /// Index definition, once created.
    pub fn definition(&self) -> Option<IndexDefinition> {
        self.state.read().as_ref().map(|s| s.definition.clone())
    }

    /// Name of the storage cluster backing the index, once created.
    pub fn cluster_index_name(&self) -> Option<String> {
        self.state.read().as_ref().map(|s| s.cluster_index_name.clone())
    }

    /// Collections whose records feed the index.
    pub fn clusters_to_index(&self) -> Vec<String> {
        self.state
            .read()
            .as_ref()
            .map(|s| s.clusters_to_index.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Collates a key with the definition's collation (identity before
    /// `create`).
    pub fn collating_value(&self, key: IndexKey) -> IndexKey {
        match self.state.read().as_ref() {
            Some(state) => state.collate.collate(key),
            None => DefaultCollate.collate(key),
        }
    }

    /// Registers the caller as a writer.
    pub fn request_modification(&self) -> ModificationPermit<'_> {
        self.modification_lock.request_modification()
    }

    /// Keeps writers from other threads out until the barrier is dropped.
    pub fn prohibit_modifications(&self) -> IndexResult<ModificationBarrier<'_>> {
        self.modification_lock.prohibit_modifications()
    }

    /// Acquires the per-instance exclusive lock.
    pub fn acquire_exclusive(&self) -> MutexGuard<'_, ()> {
        self.exclusive.lock()
    }

    /// Allocates engine storage and records the index layout.
    ///
    /// `attach` runs after validation, while the create is exclusive and
    /// before storage is allocated; it receives the resolved collation. When
    /// `rebuild` is set, `populate` is invoked afterwards to fill the index;
    /// concrete indexes pass their own rebuild so that population goes
    /// through the same bracketing as any later rebuild.
    #[allow(clippy::too_many_arguments)]
    pub fn create<I, S, A, P>(
        &self,
        database: Arc<dyn RecordSource>,
        name: &str,
        definition: IndexDefinition,
        cluster_index_name: &str,
        clusters_to_index: I,
        rebuild: bool,
        listener: &dyn ProgressListener,
        attach: A,
        populate: P,
    ) -> IndexResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        A: FnOnce(Arc<dyn Collate>),
        P: FnOnce(&dyn ProgressListener) -> IndexResult<u64>,
    {
        definition.validate()?;
        let collate = definition.resolve_collate()?;

        {
            let mut state = self.state.write();
            if state.is_some() {
                return Err(IndexError::invalid_operation(format!(
                    "index '{name}' already created"
                )));
            }

            attach(Arc::clone(&collate));
            self.engine.create(
                name,
                &definition,
                cluster_index_name,
                &self.value_container_algorithm,
            )?;

            *state = Some(Arc::new(CreatedState {
                name: name.to_string(),
                definition,
                collate,
                cluster_index_name: cluster_index_name.to_string(),
                clusters_to_index: clusters_to_index.into_iter().map(Into::into).collect(),
                database,
            }));
        }

        info!(index = name, id = %self.id, type_id = %self.type_id, "index created");

        if rebuild {
            populate(listener)?;
        }
        Ok(())
    }

    /// Rescans every covered collection and feeds each derived entry to
    /// `put`.
    ///
    /// Holds the modification barrier for the whole pass. Returns the
    /// number of documents processed.
    pub fn rebuild<F>(&self, listener: &dyn ProgressListener, mut put: F) -> IndexResult<u64>
    where
        F: FnMut(Option<IndexKey>, RecordId) -> IndexResult<()>,
    {
        let state = self.created_state()?;
        let _barrier = self.prohibit_modifications()?;

        if self.config.clear_before_rebuild {
            let _exclusive = self.acquire_exclusive();
            self.engine.clear()?;
        }

        let result = self.populate(&state, listener, &mut put);
        listener.on_completion(&state.name, result.is_ok());

        match &result {
            Ok(documents) => info!(index = %state.name, documents, "index rebuilt"),
            Err(e) => warn!(index = %state.name, error = %e, "index rebuild failed"),
        }
        result
    }

    /// Looks up the references stored under the collated `key`.
    pub fn get(&self, key: IndexKey) -> IndexResult<Vec<RecordId>> {
        self.engine.get(&self.collating_value(key))
    }

    /// Checks if any reference is stored under the collated `key`.
    pub fn contains(&self, key: IndexKey) -> IndexResult<bool> {
        self.engine.contains(&self.collating_value(key))
    }

    /// Number of distinct keys in the engine.
    pub fn size(&self) -> usize {
        self.engine.size()
    }

    fn created_state(&self) -> IndexResult<Arc<CreatedState>> {
        self.state.read().as_ref().cloned().ok_or(IndexError::NotCreated)
    }

    fn populate<F>(
        &self,
        state: &CreatedState,
        listener: &dyn ProgressListener,
        put: &mut F,
    ) -> IndexResult<u64>
    where
        F: FnMut(Option<IndexKey>, RecordId) -> IndexResult<()>,
    {
        let mut total = 0u64;
        for collection in &state.clusters_to_index {
            total += state.database.count(collection)?;
        }
        listener.on_begin(&state.name, total, true);

        let interval = self.config.progress_interval;
        let mut processed = 0u64;

        for collection in &state.clusters_to_index {
            debug!(index = %state.name, collection = %collection, "scanning collection");
            for record in state.database.scan(collection)? {
                for key in state.definition.extract_keys(&record.document) {
                    put(key, record.id)?;
                }
                processed += 1;

                if interval > 0 && processed % interval == 0 {
                    listener.on_progress(&state.name, processed, percent(processed, total));
                }
            }
        }

        Ok(processed)
    }
}

fn percent(processed: u64, total: u64) -> f32 {
    if total == 0 {
        100.0
    } else {
        (processed as f64 * 100.0 / total as f64) as f32
    }
}

impl<E> std::fmt::Debug for IndexBase<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = self.state.read().as_ref().map(|s| s.name.clone());
        f.debug_struct("IndexBase")
            .field("id", &self.id)
            .field("name", &name)
            .field("type_id", &self.type_id)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}
