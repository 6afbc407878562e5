use std::sync::Arc;

use detectq_core::artifacts::ArtifactLayout;
use detectq_core::correlation::IdGenerator;
use detectq_worker::{JobCounters, JobQueue};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Producer side of the job queue.
    pub queue: JobQueue,
    /// Correlation id source for new jobs.
    pub ids: Arc<IdGenerator>,
    /// Job counters shared with the worker pool.
    pub counters: Arc<JobCounters>,
    /// Where job artifacts live (read by the results endpoint).
    pub layout: Arc<ArtifactLayout>,
}
