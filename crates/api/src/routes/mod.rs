pub mod health;

use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the job route tree.
///
/// Route hierarchy:
///
/// ```text
/// /predict                 submit an image (POST)
/// /recognize               submit an image (POST), same handler
/// /results/{id}            annotated output for a job (GET)
/// ```
///
/// Other methods on these paths get `405 Method Not Allowed`.
pub fn job_routes() -> Router<AppState> {
    Router::new()
        .route("/predict", post(handlers::submit::submit_image))
        .route("/recognize", post(handlers::submit::submit_image))
        .route("/results/{id}", get(handlers::results::get_result))
}
