//! Instrumented collaborators.
//!
//! [`RecordingEngine`] stores entries by exact key and logs every call it
//! receives, so tests can check what reached the engine, in which order and
//! how many calls overlapped. [`RecordingProgress`] does the same for
//! progress events.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use textidx_core::{
    IndexDefinition, IndexEngine, IndexError, IndexId, IndexKey, IndexMetadata, IndexResult,
    ManagedIndex, ProgressListener, RecordId, RecordSet, SearchEngine,
};

/// A call observed by [`RecordingEngine`].
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// `set_index_metadata`.
    MetadataSet(IndexMetadata),
    /// `set_managed_index`.
    ManagedIndexSet {
        /// Identity of the managing index.
        id: IndexId,
        /// Name of the managing index.
        name: String,
    },
    /// `create`.
    Created {
        /// Index name.
        name: String,
    },
    /// `put` entered.
    PutStarted {
        /// Key as received.
        key: IndexKey,
        /// References as received.
        refs: RecordSet,
    },
    /// `put` about to return.
    PutFinished {
        /// Key as received.
        key: IndexKey,
    },
    /// `remove`.
    Removed {
        /// Key as received.
        key: IndexKey,
        /// Reference to remove.
        rid: RecordId,
        /// Whether the association existed.
        existed: bool,
    },
    /// `clear`.
    Cleared,
    /// `set_rebuilding`.
    Rebuilding(bool),
}

/// Search engine that records every call.
pub struct RecordingEngine {
    events: Mutex<Vec<EngineEvent>>,
    entries: Mutex<HashMap<IndexKey, RecordSet>>,
    rebuilding: AtomicBool,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    puts_seen: AtomicUsize,
    /// Puts numbered at or above this value fail.
    fail_from: AtomicUsize,
    fail_removes: AtomicBool,
    put_delay: Duration,
    attach_delay: Duration,
    targeted_remove: bool,
}

impl Default for RecordingEngine {
    fn default() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            entries: Mutex::new(HashMap::new()),
            rebuilding: AtomicBool::new(false),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            puts_seen: AtomicUsize::new(0),
            fail_from: AtomicUsize::new(usize::MAX),
            fail_removes: AtomicBool::new(false),
            put_delay: Duration::ZERO,
            attach_delay: Duration::ZERO,
            targeted_remove: true,
        }
    }
}

impl RecordingEngine {
    /// Creates an engine that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every put sleep, widening race windows.
    #[must_use]
    pub fn with_put_delay(mut self, delay: Duration) -> Self {
        self.put_delay = delay;
        self
    }

    /// Makes `set_managed_index` sleep before recording the handle.
    #[must_use]
    pub fn with_attach_delay(mut self, delay: Duration) -> Self {
        self.attach_delay = delay;
        self
    }

    /// Reports targeted removal as unsupported.
    #[must_use]
    pub fn without_targeted_remove(mut self) -> Self {
        self.targeted_remove = false;
        self
    }

    /// Makes every put from now on fail with a storage error.
    pub fn fail_puts(&self) {
        self.fail_from
            .store(self.puts_seen.load(Ordering::SeqCst), Ordering::SeqCst);
    }

    /// Makes puts fail once `count` more have succeeded.
    pub fn fail_puts_after(&self, count: usize) {
        self.fail_from.store(
            self.puts_seen.load(Ordering::SeqCst) + count,
            Ordering::SeqCst,
        );
    }

    /// Makes every remove from now on fail with a storage error.
    pub fn fail_removes(&self) {
        self.fail_removes.store(true, Ordering::SeqCst);
    }

    /// Lets puts and removes succeed again.
    pub fn heal(&self) {
        self.fail_from.store(usize::MAX, Ordering::SeqCst);
        self.fail_removes.store(false, Ordering::SeqCst);
    }

    /// Name of the index most recently attached with `set_managed_index`.
    pub fn managed_name(&self) -> Option<String> {
        self.events.lock().iter().rev().find_map(|e| match e {
            EngineEvent::ManagedIndexSet { name, .. } => Some(name.clone()),
            _ => None,
        })
    }

    /// Every event so far, in order.
    pub fn events(&self) -> Vec<EngineEvent> {
        self.events.lock().clone()
    }

    /// Every put received, in order.
    pub fn puts(&self) -> Vec<(IndexKey, RecordSet)> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                EngineEvent::PutStarted { key, refs } => Some((key.clone(), refs.clone())),
                _ => None,
            })
            .collect()
    }

    /// Every rebuilding flag change, in order.
    pub fn rebuilding_transitions(&self) -> Vec<bool> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                EngineEvent::Rebuilding(flag) => Some(*flag),
                _ => None,
            })
            .collect()
    }

    /// Highest number of puts that were running at the same time.
    pub fn max_concurrent_puts(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Checks that every put finished before the next one started.
    pub fn puts_serialized(&self) -> bool {
        let mut open: Option<IndexKey> = None;
        for event in self.events.lock().iter() {
            match event {
                EngineEvent::PutStarted { key, .. } => {
                    if open.is_some() {
                        return false;
                    }
                    open = Some(key.clone());
                }
                EngineEvent::PutFinished { key } => {
                    if open.as_ref() != Some(key) {
                        return false;
                    }
                    open = None;
                }
                _ => {}
            }
        }
        open.is_none()
    }

    /// References currently stored under the exact `key`.
    pub fn stored(&self, key: &IndexKey) -> RecordSet {
        self.entries.lock().get(key).cloned().unwrap_or_default()
    }

    fn record(&self, event: EngineEvent) {
        self.events.lock().push(event);
    }
}

impl IndexEngine for RecordingEngine {
    fn create(
        &self,
        name: &str,
        _definition: &IndexDefinition,
        _cluster_index_name: &str,
        _value_container_algorithm: &str,
    ) -> IndexResult<()> {
        self.record(EngineEvent::Created {
            name: name.to_string(),
        });
        Ok(())
    }

    fn put(&self, key: &IndexKey, refs: RecordSet) -> IndexResult<()> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        self.record(EngineEvent::PutStarted {
            key: key.clone(),
            refs: refs.clone(),
        });

        if !self.put_delay.is_zero() {
            std::thread::sleep(self.put_delay);
        }

        let seq = self.puts_seen.fetch_add(1, Ordering::SeqCst);
        let result = if seq >= self.fail_from.load(Ordering::SeqCst) {
            Err(IndexError::storage(format!("injected failure on put #{seq}")))
        } else {
            self.entries
                .lock()
                .entry(key.clone())
                .or_default()
                .extend(refs);
            Ok(())
        };

        self.record(EngineEvent::PutFinished { key: key.clone() });
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn get(&self, key: &IndexKey) -> IndexResult<Vec<RecordId>> {
        Ok(self.stored(key).into_iter().collect())
    }

    fn clear(&self) -> IndexResult<()> {
        self.entries.lock().clear();
        self.record(EngineEvent::Cleared);
        Ok(())
    }

    fn size(&self) -> usize {
        self.entries.lock().len()
    }
}

impl SearchEngine for RecordingEngine {
    fn set_index_metadata(&self, metadata: IndexMetadata) {
        self.record(EngineEvent::MetadataSet(metadata));
    }

    fn set_managed_index(&self, index: ManagedIndex) {
        if !self.attach_delay.is_zero() {
            std::thread::sleep(self.attach_delay);
        }
        self.record(EngineEvent::ManagedIndexSet {
            id: index.id(),
            name: index.name().to_string(),
        });
    }

    fn remove(&self, key: &IndexKey, rid: RecordId) -> IndexResult<bool> {
        if self.fail_removes.load(Ordering::SeqCst) {
            return Err(IndexError::storage(format!("injected failure removing {rid}")));
        }
        let existed = {
            let mut entries = self.entries.lock();
            match entries.get_mut(key) {
                Some(refs) => {
                    let existed = refs.remove(&rid);
                    if refs.is_empty() {
                        entries.remove(key);
                    }
                    existed
                }
                None => false,
            }
        };
        self.record(EngineEvent::Removed {
            key: key.clone(),
            rid,
            existed,
        });
        Ok(existed)
    }

    fn set_rebuilding(&self, rebuilding: bool) {
        self.rebuilding.store(rebuilding, Ordering::SeqCst);
        self.record(EngineEvent::Rebuilding(rebuilding));
    }

    fn is_rebuilding(&self) -> bool {
        self.rebuilding.load(Ordering::SeqCst)
    }

    fn supports_targeted_remove(&self) -> bool {
        self.targeted_remove
    }
}

/// A progress event observed by [`RecordingProgress`].
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// `on_begin`.
    Begin {
        /// Documents to scan.
        total: u64,
    },
    /// `on_progress`.
    Progress {
        /// Documents processed so far.
        processed: u64,
    },
    /// `on_completion`.
    Completed {
        /// Whether the work succeeded.
        succeeded: bool,
    },
}

/// Progress listener that records every event.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingProgress {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every event so far, in order.
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().clone()
    }
}

impl ProgressListener for RecordingProgress {
    fn on_begin(&self, _task: &str, total: u64, _rebuild: bool) {
        self.events.lock().push(ProgressEvent::Begin { total });
    }

    fn on_progress(&self, _task: &str, processed: u64, _percent: f32) {
        self.events.lock().push(ProgressEvent::Progress { processed });
    }

    fn on_completion(&self, _task: &str, succeeded: bool) {
        self.events.lock().push(ProgressEvent::Completed { succeeded });
    }
}
