//! Job dispatch: the bounded queue, the worker pool and the jobs they
//! carry.
//!
//! Submission handlers build a [`Job`] and [`JobQueue::enqueue`] it; one of
//! the [`Dispatcher`]'s workers dequeues it, runs the [`JobProcessor`] and
//! hands the outcome to the job's [`ResponseSink`].

pub mod dispatcher;
pub mod job;
pub mod processor;
pub mod queue;
pub mod stats;
pub mod worker;

pub use dispatcher::Dispatcher;
pub use job::{Job, JobResult, ResponseSink};
pub use processor::JobProcessor;
pub use queue::{EnqueueError, JobConsumer, JobQueue, QueuePolicy};
pub use stats::{CountersSnapshot, JobCounters};
pub use worker::Worker;
