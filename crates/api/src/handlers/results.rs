//! Handler for fetching annotated output by job id.

use axum::extract::{Path, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use detectq_core::artifacts::ArtifactLayout;
use detectq_core::correlation::CorrelationId;
use detectq_core::error::CoreError;

use crate::error::AppResult;
use crate::state::AppState;

/// GET /results/{id}
///
/// Returns the annotated JPEG for a finished job. Responds 404 while the
/// job is still queued or processing, and for jobs that failed.
pub async fn get_result(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let id = CorrelationId::parse(&id)?;

    let output_dir = state.layout.output_dir();
    let mut entries = tokio::fs::read_dir(output_dir)
        .await
        .map_err(|e| CoreError::Internal(format!("{}: {e}", output_dir.display())))?;

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| CoreError::Internal(e.to_string()))?
    {
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        if !ArtifactLayout::is_output_for(name, &id) {
            continue;
        }

        let data = tokio::fs::read(entry.path())
            .await
            .map_err(|e| CoreError::Internal(e.to_string()))?;
        tracing::debug!(job_id = %id, file = name, "Serving result");
        return Ok(([(CONTENT_TYPE, "image/jpeg")], data));
    }

    Err(CoreError::NotFound {
        entity: "Result",
        id: id.to_string(),
    }
    .into())
}
