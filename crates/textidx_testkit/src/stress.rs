//! Stress helpers.
//!
//! Drive many writers against one index and report throughput.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use textidx_core::{
    CollectionId, FullTextIndex, MultiValueIndex, ProgressListener, RecordId, SearchEngine,
};

/// Result of a stress run.
#[derive(Debug, Clone)]
pub struct StressResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            duration,
            ops_per_second,
        }
    }

    /// Prints a summary of the run.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {name} ===");
        println!("Total operations: {}", self.total_ops);
        println!("Successful: {}", self.successful_ops);
        println!("Failed: {}", self.failed_ops);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} ops/sec", self.ops_per_second);
    }
}

/// Configuration for stress runs.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Puts per writer thread.
    pub operations: usize,
    /// Number of writer threads.
    pub threads: usize,
    /// Number of distinct keys written.
    pub distinct_keys: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 1_000,
            threads: 4,
            distinct_keys: 64,
        }
    }
}

/// Key written by operation `i` of a stress run.
pub fn stress_key(i: usize, config: &StressConfig) -> String {
    format!("Key{}", i % config.distinct_keys.max(1))
}

fn spawn_writers<E: SearchEngine + 'static>(
    index: &Arc<FullTextIndex<E>>,
    config: &StressConfig,
    successful: &Arc<AtomicUsize>,
    failed: &Arc<AtomicUsize>,
) -> Vec<thread::JoinHandle<()>> {
    (0..config.threads)
        .map(|t| {
            let index = Arc::clone(index);
            let successful = Arc::clone(successful);
            let failed = Arc::clone(failed);
            let config = config.clone();
            let collection = CollectionId::new(t as u32 + 1);

            thread::spawn(move || {
                for i in 0..config.operations {
                    let key = stress_key(i, &config);
                    match index.put(Some(key.into()), RecordId::random(collection)) {
                        Ok(_) => successful.fetch_add(1, Ordering::Relaxed),
                        Err(_) => failed.fetch_add(1, Ordering::Relaxed),
                    };
                }
            })
        })
        .collect()
}

/// Runs `config.threads` writers against `index` concurrently.
pub fn concurrent_puts<E: SearchEngine + 'static>(
    index: Arc<FullTextIndex<E>>,
    config: &StressConfig,
) -> StressResult {
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));

    let start = Instant::now();
    for handle in spawn_writers(&index, config, &successful, &failed) {
        handle.join().expect("Thread panicked");
    }

    StressResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}

/// Runs concurrent writers while the calling thread rebuilds `index`.
///
/// Returns the writers' result and the rebuild's document count.
pub fn puts_during_rebuild<E: SearchEngine + 'static>(
    index: Arc<FullTextIndex<E>>,
    config: &StressConfig,
    listener: &dyn ProgressListener,
) -> (StressResult, u64) {
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));

    let start = Instant::now();
    let handles = spawn_writers(&index, config, &successful, &failed);
    let rebuilt = index.rebuild(listener).expect("rebuild failed");
    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    let result = StressResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    );
    (result, rebuilt)
}
