//! Host-database record access used by index rebuilds.

use crate::error::IndexResult;
use crate::record::RecordId;
use serde_json::Value;

/// A record as seen by key extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Identity of the record.
    pub id: RecordId,
    /// Document body keys are extracted from.
    pub document: Value,
}

impl Record {
    /// Creates a record.
    pub fn new(id: RecordId, document: Value) -> Self {
        Self { id, document }
    }
}

/// Read access to the records an index is derived from.
///
/// Rebuilds rescan every collection the index covers through this trait.
pub trait RecordSource: Send + Sync {
    /// Returns the number of records in a collection.
    fn count(&self, collection: &str) -> IndexResult<u64>;

    /// Returns every record in a collection.
    fn scan(&self, collection: &str) -> IndexResult<Vec<Record>>;
}
