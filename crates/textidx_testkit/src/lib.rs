//! # textidx testkit
//!
//! Test utilities for textidx.
//!
//! This crate provides:
//! - [`RecordingEngine`], a search engine that logs every call and can be
//!   told to fail or to slow down
//! - [`MemoryDatabase`], an in-memory record source, and ready-made scenarios
//! - Property-based test generators using proptest
//! - Stress helpers driving many writers against one index
//!
//! ## Usage
//!
//! ```rust,ignore
//! use textidx_testkit::prelude::*;
//!
//! #[test]
//! fn puts_are_recorded() {
//!     let db = scenarios::articles(3);
//!     let index = scenarios::title_index(RecordingEngine::new(), db, false);
//!     index.put(Some("Hello".into()), rid).unwrap();
//!     assert_eq!(index.engine().puts().len(), 1);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod recording;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::init_tracing;
    pub use crate::recording::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use recording::*;

/// Installs a `tracing` subscriber honoring `RUST_LOG`, once per process.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
