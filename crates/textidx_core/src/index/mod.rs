//! Multi-value index machinery.
//!
//! # Layers
//!
//! - [`FullTextIndex`]: the adapter callers use; collates keys, serializes
//!   mutations, brackets rebuilds
//! - [`IndexBase`]: generic create/rebuild skeleton and the two locks
//! - [`SearchEngine`] / [`IndexEngine`]: storage behind the index
//! - [`MemorySearchEngine`]: in-process inverted index
//!
//! # Locking
//!
//! Every mutation takes the [`ModificationLock`] permit first and the
//! per-instance exclusive lock second, and releases them in reverse order.
//! Rebuilds hold the modification barrier for their whole pass.

mod base;
mod collate;
mod definition;
mod engine;
mod fulltext;
mod key;
mod lock;
mod memory;
mod progress;
mod traits;

pub use base::IndexBase;
pub use collate::{collate_by_name, CaseInsensitiveCollate, Collate, DefaultCollate};
pub use definition::IndexDefinition;
pub use engine::{IndexEngine, IndexMetadata, ManagedIndex, SearchEngine};
pub use fulltext::{FullTextIndex, RebuildGuard};
pub use key::IndexKey;
pub use lock::{ModificationBarrier, ModificationLock, ModificationPermit};
pub use memory::{Analyzer, MemorySearchEngine, TokenizerConfig};
pub use progress::{LoggingProgress, NoopProgress, ProgressListener};
pub use traits::MultiValueIndex;
