//! A single consume loop.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::Utc;
use detectq_pipeline::pipeline::panic_message;
use detectq_pipeline::PipelineError;
use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::job::{Job, JobResult};
use crate::processor::JobProcessor;
use crate::queue::JobConsumer;
use crate::stats::JobCounters;

/// One member of the pool. Holds only shared, read-only handles.
pub struct Worker {
    id: usize,
    consumer: JobConsumer,
    processor: Arc<dyn JobProcessor>,
    counters: Arc<JobCounters>,
}

impl Worker {
    pub fn new(
        id: usize,
        consumer: JobConsumer,
        processor: Arc<dyn JobProcessor>,
        counters: Arc<JobCounters>,
    ) -> Self {
        Self {
            id,
            consumer,
            processor,
            counters,
        }
    }

    /// Pull and process jobs until cancelled or the queue closes.
    ///
    /// Cancellation is only observed between jobs; a job that has been
    /// dequeued always runs to completion.
    pub async fn run(self, cancel: CancellationToken) {
        tracing::debug!(worker_id = self.id, "Worker started");

        loop {
            let job = tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!(worker_id = self.id, "Worker shutting down");
                    break;
                }
                job = self.consumer.dequeue() => match job {
                    Some(job) => job,
                    None => {
                        tracing::debug!(worker_id = self.id, "Queue closed, worker exiting");
                        break;
                    }
                },
            };

            self.handle(job).await;
        }
    }

    async fn handle(&self, job: Job) {
        let (input, sink) = job.into_parts();
        let queued_ms = (Utc::now() - input.submitted_at).num_milliseconds();
        tracing::info!(
            worker_id = self.id,
            job_id = %input.id,
            queued_ms,
            "Job dequeued",
        );

        let result: JobResult = AssertUnwindSafe(self.processor.process(&input))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(PipelineError::Panicked(panic_message(payload))));

        match &result {
            Ok(report) => {
                self.counters.record_completed();
                tracing::info!(
                    worker_id = self.id,
                    job_id = %input.id,
                    detections = report.detections.len(),
                    "Job completed",
                );
            }
            Err(e) => {
                self.counters.record_failed();
                tracing::error!(
                    worker_id = self.id,
                    job_id = %input.id,
                    stage = e.stage(),
                    error = %e,
                    "Job failed",
                );
            }
        }

        sink.deliver(&input.id, result);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
