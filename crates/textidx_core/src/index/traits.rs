//! The multi-value index contract.

use crate::error::IndexResult;
use crate::index::{IndexKey, ProgressListener};
use crate::record::RecordId;

/// Contract every multi-value index exposes to the host database.
///
/// One key maps to a set of record references.
pub trait MultiValueIndex: Send + Sync {
    /// Associates `rid` with `key`. An absent key is skipped.
    ///
    /// Returns the index itself so calls can be chained.
    fn put(&self, key: Option<IndexKey>, rid: RecordId) -> IndexResult<&Self>;

    /// Removes the association between `key` and `rid`.
    ///
    /// Returns `true` if it existed and was removed.
    fn remove(&self, key: Option<IndexKey>, rid: RecordId) -> IndexResult<bool>;

    /// Re-derives every entry from the source records.
    ///
    /// Returns the number of documents processed.
    fn rebuild(&self, listener: &dyn ProgressListener) -> IndexResult<u64>;

    /// Looks up the references stored under `key`.
    fn get(&self, key: IndexKey) -> IndexResult<Vec<RecordId>>;

    /// Number of distinct keys.
    fn size(&self) -> usize;

    /// Whether the key space can be iterated in order.
    fn supports_ordered_iterations(&self) -> bool;

    /// Whether the index can answer equality predicates.
    fn can_be_used_in_equality_operators(&self) -> bool;
}
