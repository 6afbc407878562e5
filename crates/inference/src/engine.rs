//! The inference engine contract.

use async_trait::async_trait;
use bytes::Bytes;
use detectq_core::detection::{Detection, NormalizedBox};
use image::RgbImage;

/// A decoded input image, kept alongside the bytes it was decoded from.
///
/// Engines that accept encoded images (e.g. a model exported with a JPEG
/// string input) send `encoded`; engines that take a pixel tensor read
/// `pixels`.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub encoded: Bytes,
    pub pixels: RgbImage,
}

impl DecodedImage {
    pub fn new(encoded: Bytes, pixels: RgbImage) -> Self {
        Self { encoded, pixels }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}

/// Parallel engine output arrays, aligned by index.
///
/// Engines must report detections in descending score order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawDetections {
    pub boxes: Vec<NormalizedBox>,
    pub scores: Vec<f32>,
    pub class_ids: Vec<u32>,
}

impl RawDetections {
    /// Zip the three arrays into [`Detection`]s.
    ///
    /// Fails with [`InferenceError::Misaligned`] when the lengths differ.
    pub fn into_detections(self) -> Result<Vec<Detection>, InferenceError> {
        let (boxes, scores, classes) = (self.boxes.len(), self.scores.len(), self.class_ids.len());
        if boxes != scores || boxes != classes {
            return Err(InferenceError::Misaligned {
                boxes,
                scores,
                classes,
            });
        }

        Ok(self
            .boxes
            .into_iter()
            .zip(self.scores)
            .zip(self.class_ids)
            .map(|((bbox, score), class_id)| Detection {
                bbox,
                class_id,
                score,
            })
            .collect())
    }
}

/// Errors from an inference engine.
#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The model server returned a non-2xx status code.
    #[error("Model server error ({status}): {body}")]
    ApiError { status: u16, body: String },

    /// The model is not loaded or not serving.
    #[error("Model unavailable: {0}")]
    Unavailable(String),

    /// The response could not be interpreted as detections.
    #[error("Malformed model output: {0}")]
    Malformed(String),

    #[error("Misaligned model output: {boxes} boxes, {scores} scores, {classes} classes")]
    Misaligned {
        boxes: usize,
        scores: usize,
        classes: usize,
    },

    /// Any other engine-specific failure.
    #[error("Inference failed: {0}")]
    Engine(String),
}

/// Runs a detection model over one image.
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    /// Detect objects in `image`.
    async fn infer(&self, image: &DecodedImage) -> Result<RawDetections, InferenceError>;

    /// Confirm the model is loaded and serving. Called once at startup;
    /// a failure there stops the process.
    async fn ensure_ready(&self) -> Result<(), InferenceError> {
        Ok(())
    }
}
