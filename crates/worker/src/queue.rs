//! Bounded FIFO between the submission handlers and the worker pool.
//!
//! Built on a bounded `tokio::sync::mpsc` channel. Producers clone the
//! [`JobQueue`] handle; workers share one [`JobConsumer`] whose receiver is
//! guarded by a mutex, so each job is handed to exactly one worker.

use std::str::FromStr;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use crate::job::Job;

/// What `enqueue` does when the queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueuePolicy {
    /// Wait for a free slot.
    #[default]
    Block,
    /// Fail immediately with [`EnqueueError::Full`].
    Reject,
}

impl FromStr for QueuePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "block" => Ok(Self::Block),
            "reject" => Ok(Self::Reject),
            other => Err(format!("unknown queue policy '{other}', expected block or reject")),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EnqueueError {
    #[error("Job queue is full ({capacity} jobs)")]
    Full { capacity: usize },

    #[error("Job queue is closed")]
    Closed,
}

/// Producer side of the queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct JobQueue {
    tx: mpsc::Sender<Job>,
    policy: QueuePolicy,
}

/// Consumer side of the queue, shared by all workers. Cheap to clone.
#[derive(Debug, Clone)]
pub struct JobConsumer {
    rx: Arc<Mutex<mpsc::Receiver<Job>>>,
}

impl JobQueue {
    /// Create a queue holding at most `capacity` jobs.
    ///
    /// # Panics
    ///
    /// If `capacity` is zero.
    pub fn bounded(capacity: usize, policy: QueuePolicy) -> (Self, JobConsumer) {
        let (tx, rx) = mpsc::channel(capacity);
        (
            Self { tx, policy },
            JobConsumer {
                rx: Arc::new(Mutex::new(rx)),
            },
        )
    }

    /// Add a job at the back of the queue, applying the queue's policy
    /// when it is full.
    pub async fn enqueue(&self, job: Job) -> Result<(), EnqueueError> {
        match self.policy {
            QueuePolicy::Block => self.tx.send(job).await.map_err(|_| EnqueueError::Closed),
            QueuePolicy::Reject => self.tx.try_send(job).map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => EnqueueError::Full {
                    capacity: self.capacity(),
                },
                mpsc::error::TrySendError::Closed(_) => EnqueueError::Closed,
            }),
        }
    }

    /// Jobs currently waiting.
    pub fn len(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    pub fn policy(&self) -> QueuePolicy {
        self.policy
    }
}

impl JobConsumer {
    /// Wait for the next job. Returns `None` once every producer is gone
    /// and the queue is drained.
    pub async fn dequeue(&self) -> Option<Job> {
        self.rx.lock().await.recv().await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
