//! Modification gate shared by writers and structural operations.
//!
//! Ordinary writers hold a [`ModificationPermit`] while they mutate an index;
//! any number of permits may be held at once. A structural operation such as
//! a rebuild takes the [`ModificationBarrier`]: it waits until every permit is
//! released and keeps new writers out until it is dropped. Writers arriving
//! while a barrier is waiting queue behind it, so a steady stream of writers
//! cannot starve a structural operation. The barrier
//! holder's own thread still obtains permits, so a rebuild can repopulate
//! the index through the regular write path.

use crate::error::{IndexError, IndexResult};
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::thread::{self, ThreadId};

#[derive(Debug, Default)]
struct GateState {
    /// Permits held, per thread.
    writers: HashMap<ThreadId, usize>,
    /// Barrier owner and its re-entry depth.
    barrier: Option<(ThreadId, usize)>,
    /// Threads waiting to take the barrier.
    barriers_waiting: usize,
}

impl GateState {
    fn writer_must_wait(&self, me: ThreadId) -> bool {
        match self.barrier {
            Some((owner, _)) => owner != me,
            // A thread already holding a permit must not queue behind a
            // barrier that is waiting for that permit.
            None => self.barriers_waiting > 0 && !self.writers.contains_key(&me),
        }
    }
}

/// Cooperative gate between live writers and structural operations.
#[derive(Debug, Default)]
pub struct ModificationLock {
    state: Mutex<GateState>,
    released: Condvar,
}

impl ModificationLock {
    /// Creates an open gate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until no structural operation owned by another thread is in
    /// progress or waiting, then registers the caller as a writer.
    pub fn request_modification(&self) -> ModificationPermit<'_> {
        let me = thread::current().id();
        let mut state = self.state.lock();
        while state.writer_must_wait(me) {
            self.released.wait(&mut state);
        }
        *state.writers.entry(me).or_insert(0) += 1;
        ModificationPermit {
            lock: self,
            thread: me,
        }
    }

    /// Blocks until every writer is gone, then keeps new writers out.
    ///
    /// Re-entrant for the owning thread. Fails if the calling thread holds a
    /// permit itself, since waiting for it to drain would never finish.
    pub fn prohibit_modifications(&self) -> IndexResult<ModificationBarrier<'_>> {
        let me = thread::current().id();
        let mut state = self.state.lock();

        if let Some((owner, depth)) = state.barrier.as_mut() {
            if *owner == me {
                *depth += 1;
                return Ok(ModificationBarrier { lock: self });
            }
        }
        if state.writers.contains_key(&me) {
            return Err(IndexError::lock_conflict(
                "structural operation requested while holding a modification permit",
            ));
        }

        state.barriers_waiting += 1;
        while state.barrier.is_some() || !state.writers.is_empty() {
            self.released.wait(&mut state);
        }
        state.barriers_waiting -= 1;
        state.barrier = Some((me, 1));
        Ok(ModificationBarrier { lock: self })
    }

    /// Returns whether a structural operation currently holds the barrier.
    #[must_use]
    pub fn is_prohibited(&self) -> bool {
        self.state.lock().barrier.is_some()
    }

    /// Returns whether a structural operation is waiting for writers to
    /// drain.
    #[must_use]
    pub fn has_waiting_barrier(&self) -> bool {
        self.state.lock().barriers_waiting > 0
    }

    /// Returns the number of permits currently held.
    #[must_use]
    pub fn active_writers(&self) -> usize {
        self.state.lock().writers.values().sum()
    }

    fn release_permit(&self, thread: ThreadId) {
        let mut state = self.state.lock();
        if let Some(count) = state.writers.get_mut(&thread) {
            *count -= 1;
            if *count == 0 {
                state.writers.remove(&thread);
            }
        }
        if state.writers.is_empty() {
            self.released.notify_all();
        }
    }

    fn release_barrier(&self) {
        let mut state = self.state.lock();
        if let Some((_, depth)) = state.barrier.as_mut() {
            *depth -= 1;
            if *depth == 0 {
                state.barrier = None;
                self.released.notify_all();
            }
        }
    }
}

/// Writer registration; released on drop.
#[must_use = "the permit is released as soon as it is dropped"]
pub struct ModificationPermit<'a> {
    lock: &'a ModificationLock,
    thread: ThreadId,
}

impl Drop for ModificationPermit<'_> {
    fn drop(&mut self) {
        self.lock.release_permit(self.thread);
    }
}

/// Exclusive hold on the gate; released on drop.
#[must_use = "the barrier is released as soon as it is dropped"]
pub struct ModificationBarrier<'a> {
    lock: &'a ModificationLock,
}

impl Drop for ModificationBarrier<'_> {
    fn drop(&mut self) {
        self.lock.release_barrier();
    }
}
