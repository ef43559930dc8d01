//! # textidx core
//!
//! Bridges the generic multi-value index contract of a host database to a
//! full-text search engine.
//!
//! This crate provides:
//! - [`FullTextIndex`], the adapter that serializes every mutation against
//!   the engine and collates keys before they reach it
//! - [`IndexBase`], the generic create/rebuild skeleton
//! - [`SearchEngine`] and [`IndexEngine`], the engine-side contracts
//! - [`MemorySearchEngine`], an in-process inverted index implementing them
//! - Collation, key extraction and progress reporting helpers

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
pub mod index;
pub mod record;
mod types;

pub use config::IndexConfig;
pub use error::{IndexError, IndexResult};
pub use index::{
    collate_by_name, Analyzer, CaseInsensitiveCollate, Collate, DefaultCollate, FullTextIndex,
    IndexBase, IndexDefinition, IndexEngine, IndexKey, IndexMetadata, LoggingProgress,
    ManagedIndex, MemorySearchEngine, ModificationBarrier, ModificationLock, ModificationPermit,
    MultiValueIndex, NoopProgress, ProgressListener, RebuildGuard, SearchEngine, TokenizerConfig,
};
pub use record::{EntityId, Record, RecordId, RecordSet, RecordSource};
pub use types::{CollectionId, IndexId};
