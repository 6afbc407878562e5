//! Jobs and where their outcome goes.

use detectq_core::correlation::CorrelationId;
use detectq_core::job::JobInput;
use detectq_pipeline::{JobReport, PipelineError};
use tokio::sync::oneshot;

/// Outcome of processing one job.
pub type JobResult = Result<JobReport, PipelineError>;

/// Destination for a job's outcome.
#[derive(Debug)]
pub enum ResponseSink {
    /// A handler is waiting on the other end (sync mode).
    Reply(oneshot::Sender<JobResult>),
    /// The client was already acknowledged; the output artifact is the
    /// only result (queued mode).
    Artifact,
}

impl ResponseSink {
    /// Hand `result` to its destination. Consumes the sink, so a job's
    /// outcome is delivered at most once.
    pub fn deliver(self, id: &CorrelationId, result: JobResult) {
        match self {
            Self::Reply(tx) => {
                if tx.send(result).is_err() {
                    tracing::warn!(job_id = %id, "Reply receiver gone; result dropped");
                }
            }
            Self::Artifact => {}
        }
    }
}

/// One unit of work on the queue.
///
/// Fields are private: a job is built once by the submitter and taken
/// apart only by the worker that dequeues it.
#[derive(Debug)]
pub struct Job {
    input: JobInput,
    sink: ResponseSink,
}

impl Job {
    /// A job whose result is only written to disk.
    pub fn queued(input: JobInput) -> Self {
        Self {
            input,
            sink: ResponseSink::Artifact,
        }
    }

    /// A job whose outcome is sent back on the returned receiver.
    pub fn awaiting_reply(input: JobInput) -> (Self, oneshot::Receiver<JobResult>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                input,
                sink: ResponseSink::Reply(tx),
            },
            rx,
        )
    }

    pub fn id(&self) -> &CorrelationId {
        &self.input.id
    }

    pub fn into_parts(self) -> (JobInput, ResponseSink) {
        (self.input, self.sink)
    }
}
