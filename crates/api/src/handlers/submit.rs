//! Handler for image submission (`POST /predict`, `POST /recognize`).

use axum::body::Bytes;
use axum::extract::multipart::{Multipart, MultipartError, MultipartRejection};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use detectq_core::artifacts::sanitize_stem;
use detectq_core::correlation::CorrelationId;
use detectq_core::job::JobInput;
use detectq_worker::Job;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Multipart field names accepted for the image.
const UPLOAD_FIELDS: [&str; 2] = ["file", "image"];

/// Response body for an accepted submission.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub id: CorrelationId,
}

/// The image part of a submission.
struct Upload {
    filename: Option<String>,
    data: Bytes,
}

/// POST /predict, POST /recognize
///
/// Accepts a multipart form with the image in a `file` or `image` field.
/// In queued mode the job id is returned as soon as the job is on the
/// queue; otherwise the handler waits for the worker and returns the id
/// once the annotated image has been written.
pub async fn submit_image(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<SubmitResponse>> {
    let mut multipart = multipart.map_err(|e| {
        tracing::warn!(error = %e, "Rejected submission without a multipart body");
        AppError::BadRequest(e.body_text())
    })?;

    let upload = read_upload(&mut multipart).await?;
    if upload.data.is_empty() {
        tracing::warn!("Rejected submission with an empty upload");
        return Err(AppError::BadRequest("Uploaded file is empty".into()));
    }

    let id = state.ids.next_id();
    let stem = sanitize_stem(upload.filename.as_deref().unwrap_or_default());
    let input = JobInput::new(id.clone(), stem, upload.data);
    let size = input.payload.len();

    if state.config.queued_result {
        state.queue.enqueue(Job::queued(input)).await?;
        state.counters.record_submitted();
        tracing::info!(job_id = %id, size, "Job queued");
        return Ok(Json(SubmitResponse { id }));
    }

    let (job, reply) = Job::awaiting_reply(input);
    state.queue.enqueue(job).await?;
    state.counters.record_submitted();
    tracing::info!(job_id = %id, size, "Job queued, awaiting result");

    match reply.await {
        Ok(Ok(report)) => Ok(Json(SubmitResponse { id: report.id })),
        Ok(Err(error)) => Err(AppError::Processing { id, error }),
        Err(_) => Err(AppError::InternalError(format!(
            "Job {id} was dropped before it produced a result"
        ))),
    }
}

/// Pull the first `file`/`image` field out of the form, ignoring others.
async fn read_upload(multipart: &mut Multipart) -> AppResult<Upload> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or("").to_string();
        if !UPLOAD_FIELDS.contains(&name.as_str()) {
            continue;
        }

        let filename = field.file_name().map(str::to_string);
        let data = field.bytes().await.map_err(multipart_error)?;
        return Ok(Upload { filename, data });
    }

    tracing::warn!("Rejected submission without a 'file' or 'image' field");
    Err(AppError::BadRequest(
        "Missing required 'file' or 'image' field".into(),
    ))
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        tracing::warn!(error = %e, "Failed to read multipart body");
        AppError::BadRequest(e.body_text())
    }
}
