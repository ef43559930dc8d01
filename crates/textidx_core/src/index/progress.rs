//! Progress reporting for long-running index operations.

use tracing::{info, warn};

/// Receives progress of index creation and rebuilds.
pub trait ProgressListener: Send + Sync {
    /// Called once before work starts. `total` is the number of documents
    /// that will be scanned.
    fn on_begin(&self, task: &str, total: u64, rebuild: bool);

    /// Called periodically with the documents processed so far.
    fn on_progress(&self, task: &str, processed: u64, percent: f32);

    /// Called once when work ends.
    fn on_completion(&self, task: &str, succeeded: bool);
}

/// Listener that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressListener for NoopProgress {
    fn on_begin(&self, _task: &str, _total: u64, _rebuild: bool) {}

    fn on_progress(&self, _task: &str, _processed: u64, _percent: f32) {}

    fn on_completion(&self, _task: &str, _succeeded: bool) {}
}

/// Listener that emits `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingProgress;

impl ProgressListener for LoggingProgress {
    fn on_begin(&self, task: &str, total: u64, rebuild: bool) {
        info!(index = task, total, rebuild, "index population started");
    }

    fn on_progress(&self, task: &str, processed: u64, percent: f32) {
        info!(index = task, processed, "index population {percent:.1}% complete");
    }

    fn on_completion(&self, task: &str, succeeded: bool) {
        if succeeded {
            info!(index = task, "index population finished");
        } else {
            warn!(index = task, "index population failed");
        }
    }
}
