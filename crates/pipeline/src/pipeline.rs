//! The per-job processing pipeline.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use detectq_core::artifacts::ArtifactLayout;
use detectq_core::correlation::CorrelationId;
use detectq_core::detection::{
    is_sorted_by_confidence, retain_confident, DEFAULT_CONFIDENCE_THRESHOLD,
};
use detectq_core::job::JobInput;
use detectq_core::labels::LabelSet;
use detectq_inference::{DecodedImage, InferenceEngine};

use crate::annotate::{annotate, Annotation};
use crate::codec::{self, DEFAULT_JPEG_QUALITY};
use crate::error::PipelineError;

/// Tunables for [`Pipeline`].
#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    /// Detections must score strictly above this to be drawn.
    pub confidence_threshold: f32,
    pub jpeg_quality: u8,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

/// Outcome of a successful job.
#[derive(Debug, Clone)]
pub struct JobReport {
    pub id: CorrelationId,
    pub output_path: PathBuf,
    /// Retained detections, in engine order.
    pub detections: Vec<Annotation>,
    pub width: u32,
    pub height: u32,
}

/// Runs one job end to end. Shared by all workers; holds no per-job state.
pub struct Pipeline {
    engine: Arc<dyn InferenceEngine>,
    labels: Arc<LabelSet>,
    layout: ArtifactLayout,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(
        engine: Arc<dyn InferenceEngine>,
        labels: Arc<LabelSet>,
        layout: ArtifactLayout,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            engine,
            labels,
            layout,
            settings,
        }
    }

    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    /// Persist the input, detect, annotate and write the result.
    ///
    /// The output file only appears once it is complete.
    pub async fn process(&self, job: &JobInput) -> Result<JobReport, PipelineError> {
        let input_path = self.layout.input_path(&job.stem, &job.id);
        tokio::fs::write(&input_path, &job.payload)
            .await
            .map_err(|e| PipelineError::io(&input_path, e))?;
        tracing::debug!(job_id = %job.id, path = %input_path.display(), "Input persisted");

        let payload = job.payload.clone();
        let pixels = blocking(move || codec::decode(&payload)).await??;
        let image = DecodedImage::new(job.payload.clone(), pixels);
        let (width, height) = (image.width(), image.height());
        tracing::debug!(job_id = %job.id, width, height, "Input decoded");

        let detections = self.engine.infer(&image).await?.into_detections()?;
        if !is_sorted_by_confidence(&detections) {
            tracing::warn!(
                job_id = %job.id,
                "Engine returned detections out of score order; filtering may drop some"
            );
        }
        let retained = retain_confident(&detections, self.settings.confidence_threshold).to_vec();
        tracing::debug!(
            job_id = %job.id,
            total = detections.len(),
            retained = retained.len(),
            "Inference complete"
        );

        let labels = Arc::clone(&self.labels);
        let quality = self.settings.jpeg_quality;
        let mut pixels = image.pixels;
        let (annotations, encoded) = blocking(move || {
            let annotations = annotate(&mut pixels, &retained, &labels);
            codec::encode_jpeg(&pixels, quality).map(|bytes| (annotations, bytes))
        })
        .await??;

        let output_path = self.layout.output_path(&job.stem, &job.id);
        write_atomically(&output_path, &encoded).await?;
        tracing::info!(
            job_id = %job.id,
            path = %output_path.display(),
            detections = annotations.len(),
            "Annotated image written"
        );

        Ok(JobReport {
            id: job.id.clone(),
            output_path,
            detections: annotations,
            width,
            height,
        })
    }
}

/// Run CPU-bound work on the blocking pool, turning a panic into
/// [`PipelineError::Panicked`].
async fn blocking<T, F>(f: F) -> Result<T, PipelineError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        if e.is_panic() {
            PipelineError::Panicked(panic_message(e.into_panic()))
        } else {
            PipelineError::Panicked(e.to_string())
        }
    })
}

/// Best-effort text of a panic payload.
pub fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Write to a hidden sibling then rename into place, so readers never see
/// a partial file.
async fn write_atomically(path: &Path, contents: &[u8]) -> Result<(), PipelineError> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp = path.with_file_name(format!(".{file_name}.part"));

    tokio::fs::write(&temp, contents)
        .await
        .map_err(|e| PipelineError::io(&temp, e))?;
    tokio::fs::rename(&temp, path)
        .await
        .map_err(|e| PipelineError::io(path, e))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
