use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use detectq_core::correlation::CorrelationId;
use detectq_core::error::CoreError;
use detectq_pipeline::PipelineError;
use detectq_worker::EnqueueError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `detectq_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The upload exceeded the configured body limit.
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// The job queue is full and the reject policy is in effect.
    #[error("Job queue is full ({capacity} jobs)")]
    QueueFull { capacity: usize },

    /// A synchronous job failed inside the worker.
    #[error("Job {id} failed: {error}")]
    Processing {
        id: CorrelationId,
        #[source]
        error: PipelineError,
    },

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                    )
                }
            },

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::PayloadTooLarge(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE", msg.clone())
            }
            AppError::QueueFull { capacity } => (
                StatusCode::SERVICE_UNAVAILABLE,
                "QUEUE_FULL",
                format!("Job queue is full ({capacity} jobs), retry later"),
            ),

            // --- Job failures ---
            AppError::Processing { id, error } if error.is_bad_input() => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "UNPROCESSABLE_IMAGE",
                format!("Job {id}: uploaded file is not a decodable image"),
            ),
            AppError::Processing { id, error } => {
                tracing::error!(job_id = %id, stage = error.stage(), error = %error, "Job failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "PROCESSING_FAILED",
                    format!("Job {id} failed during {}", error.stage()),
                )
            }

            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<EnqueueError> for AppError {
    fn from(err: EnqueueError) -> Self {
        match err {
            EnqueueError::Full { capacity } => AppError::QueueFull { capacity },
            EnqueueError::Closed => AppError::InternalError(err.to_string()),
        }
    }
}
