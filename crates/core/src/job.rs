//! The transport-independent part of a job.

use bytes::Bytes;

use crate::correlation::CorrelationId;
use crate::types::Timestamp;

/// What a worker needs to process one submission.
///
/// Cloning is cheap: the payload is reference-counted.
#[derive(Debug, Clone)]
pub struct JobInput {
    pub id: CorrelationId,
    /// Sanitised original filename stem, see [`crate::artifacts::sanitize_stem`].
    pub stem: String,
    /// Raw uploaded image bytes.
    pub payload: Bytes,
    pub submitted_at: Timestamp,
}

impl JobInput {
    pub fn new(id: CorrelationId, stem: impl Into<String>, payload: Bytes) -> Self {
        Self {
            id,
            stem: stem.into(),
            payload,
            submitted_at: chrono::Utc::now(),
        }
    }
}
