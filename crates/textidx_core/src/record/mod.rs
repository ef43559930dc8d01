//! Record references and the host-database record source.
//!
//! The index never interprets record payloads beyond key extraction; it only
//! stores stable references to them.

mod id;
mod source;

pub use id::{EntityId, RecordId, RecordSet};
pub use source::{Record, RecordSource};
