use axum::extract::State;
use axum::{routing::get, Json, Router};
use detectq_worker::CountersSnapshot;
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok` while the whole worker pool is live, `degraded` otherwise.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Jobs waiting in the queue.
    pub queue_depth: usize,
    pub queue_capacity: usize,
    /// Job totals and live worker loops.
    #[serde(flatten)]
    pub counters: CountersSnapshot,
}

/// GET /health -- returns queue and worker pool status.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let counters = state.counters.snapshot();
    let status = if counters.active_workers == state.config.max_workers {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        queue_depth: state.queue.len(),
        queue_capacity: state.queue.capacity(),
        counters,
    })
}

/// Mount health check routes at root level.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
