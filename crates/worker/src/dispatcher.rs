//! Owns the fixed worker pool.
//!
//! [`Dispatcher::run`] starts `worker_count` [`Worker`]s on the shared
//! queue and returns immediately. There is no scaling and no restart:
//! each worker contains job failures itself, so a worker only stops on
//! shutdown.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::processor::JobProcessor;
use crate::queue::JobConsumer;
use crate::stats::JobCounters;
use crate::worker::Worker;

pub struct Dispatcher {
    worker_count: usize,
    consumer: JobConsumer,
    processor: Arc<dyn JobProcessor>,
    counters: Arc<JobCounters>,
}

impl Dispatcher {
    pub fn new(
        worker_count: usize,
        consumer: JobConsumer,
        processor: Arc<dyn JobProcessor>,
        counters: Arc<JobCounters>,
    ) -> Self {
        Self {
            worker_count,
            consumer,
            processor,
            counters,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Worker loops currently running.
    pub fn active_workers(&self) -> usize {
        self.counters.active_workers()
    }

    /// Spawn the pool. All workers are counted as active by the time this
    /// returns.
    ///
    /// Workers stop once `cancel` fires, after finishing their current job.
    /// The returned tracker is already closed; `tracker.wait()` resolves
    /// when every worker has exited.
    pub fn run(&self, cancel: CancellationToken) -> TaskTracker {
        let tracker = TaskTracker::new();

        for id in 0..self.worker_count {
            let worker = Worker::new(
                id,
                self.consumer.clone(),
                Arc::clone(&self.processor),
                Arc::clone(&self.counters),
            );
            let guard = self.counters.worker_started();
            let cancel = cancel.clone();
            tracker.spawn(async move {
                let _guard = guard;
                worker.run(cancel).await;
            });
        }
        tracker.close();

        tracing::info!(workers = self.worker_count, "Dispatcher started");
        tracker
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
