use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Run-wide counters shared by the source and sink threads.
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    pub fetched: AtomicU64,
    pub reached_sink: AtomicU64,
    pub persisted: AtomicU64,
    persist_error: Mutex<Option<String>>,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_persist_error(&self, error: String) {
        *self.persist_error.lock() = Some(error);
    }

    pub fn persist_error(&self) -> Option<String> {
        self.persist_error.lock().clone()
    }

    pub fn load(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}

/// Counters for one worker pool.
#[derive(Debug, Default)]
pub struct PoolStats {
    pub received: AtomicU64,
    pub forwarded: AtomicU64,
    /// Rejected by the transformation (`None`).
    pub dropped: AtomicU64,
    /// Transformation returned an error or panicked.
    pub failed: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolSnapshot {
    pub received: u64,
    pub forwarded: u64,
    pub dropped: u64,
    pub failed: u64,
}

impl PoolStats {
    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            received: self.received.load(Ordering::Relaxed),
            forwarded: self.forwarded.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}
