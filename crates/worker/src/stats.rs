//! Process-wide job counters.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use serde::Serialize;

/// Counters shared by the submission handlers and the workers.
#[derive(Debug, Default)]
pub struct JobCounters {
    submitted: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    active_workers: AtomicUsize,
}

/// Point-in-time copy of [`JobCounters`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CountersSnapshot {
    pub submitted: u64,
    pub completed: u64,
    pub failed: u64,
    #[serde(rename = "workers")]
    pub active_workers: usize,
}

impl JobCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn active_workers(&self) -> usize {
        self.active_workers.load(Ordering::Acquire)
    }

    /// Mark a worker as live until the returned guard is dropped.
    pub fn worker_started(self: &Arc<Self>) -> ActiveWorkerGuard {
        self.active_workers.fetch_add(1, Ordering::AcqRel);
        ActiveWorkerGuard {
            counters: Arc::clone(self),
        }
    }

    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            active_workers: self.active_workers(),
        }
    }
}

/// Decrements the active-worker count when dropped, including when the
/// worker task unwinds.
#[derive(Debug)]
pub struct ActiveWorkerGuard {
    counters: Arc<JobCounters>,
}

impl Drop for ActiveWorkerGuard {
    fn drop(&mut self) {
        self.counters.active_workers.fetch_sub(1, Ordering::AcqRel);
    }
}
