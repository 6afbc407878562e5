//! REST client for a TensorFlow-Serving style model server.
//!
//! Targets object-detection models exported with the standard detection
//! signature (`detection_boxes`, `detection_scores`, `detection_classes`,
//! `num_detections`). Boxes come back as `[ymin, xmin, ymax, xmax]` and are
//! re-ordered into [`NormalizedBox`] corners here.

use std::str::FromStr;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use detectq_core::detection::NormalizedBox;
use serde::Deserialize;

use crate::engine::{DecodedImage, InferenceEngine, InferenceError, RawDetections};

/// Model version state reported by a serving model.
const STATE_AVAILABLE: &str = "AVAILABLE";

/// How the image is handed to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// Base64 of the original encoded image (`{"b64": ...}`).
    Encoded,
    /// `[height][width][3]` uint8 pixel array.
    Tensor,
}

impl FromStr for InputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "encoded" => Ok(Self::Encoded),
            "tensor" => Ok(Self::Tensor),
            other => Err(format!("unknown model input format '{other}'")),
        }
    }
}

/// Where and how to reach the model.
#[derive(Debug, Clone)]
pub struct TfServingConfig {
    /// Base HTTP URL, e.g. `http://localhost:8501`.
    pub base_url: String,
    pub model_name: String,
    pub signature_name: String,
    pub input_format: InputFormat,
}

/// HTTP client for a single served model.
pub struct TfServingEngine {
    client: reqwest::Client,
    config: TfServingConfig,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    detection_boxes: Vec<[f32; 4]>,
    detection_scores: Vec<f32>,
    detection_classes: Vec<f32>,
    #[serde(default)]
    num_detections: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ModelStatusResponse {
    #[serde(default)]
    model_version_status: Vec<ModelVersionStatus>,
}

#[derive(Debug, Deserialize)]
struct ModelVersionStatus {
    version: String,
    state: String,
}

impl TfServingEngine {
    pub fn new(config: TfServingConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn status_url(&self) -> String {
        format!(
            "{}/v1/models/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.model_name
        )
    }

    fn predict_url(&self) -> String {
        format!("{}:predict", self.status_url())
    }

    /// Build the `:predict` request body for one image.
    fn request_body(&self, image: &DecodedImage) -> serde_json::Value {
        let instance = match self.config.input_format {
            InputFormat::Encoded => serde_json::json!({ "b64": BASE64.encode(&image.encoded) }),
            InputFormat::Tensor => {
                let rows: Vec<Vec<[u8; 3]>> = image
                    .pixels
                    .rows()
                    .map(|row| row.map(|pixel| pixel.0).collect())
                    .collect();
                serde_json::json!(rows)
            }
        };

        serde_json::json!({
            "signature_name": self.config.signature_name,
            "instances": [instance],
        })
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code, capturing the body
    /// of failed responses for the error.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, InferenceError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(InferenceError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, InferenceError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

/// Convert the first prediction of a response into parallel arrays.
fn into_raw_detections(response: PredictResponse) -> Result<RawDetections, InferenceError> {
    let prediction = response
        .predictions
        .into_iter()
        .next()
        .ok_or_else(|| InferenceError::Malformed("response has no predictions".into()))?;

    let (boxes, scores, classes) = (
        prediction.detection_boxes.len(),
        prediction.detection_scores.len(),
        prediction.detection_classes.len(),
    );
    if boxes != scores || boxes != classes {
        return Err(InferenceError::Misaligned {
            boxes,
            scores,
            classes,
        });
    }
    let count = match prediction.num_detections {
        None => boxes,
        Some(n) if n < 0.0 => {
            return Err(InferenceError::Malformed(format!(
                "negative num_detections {n}"
            )))
        }
        Some(n) if n as usize > boxes => {
            return Err(InferenceError::Malformed(format!(
                "num_detections {n} exceeds {boxes} returned detections"
            )))
        }
        Some(n) => n as usize,
    };

    Ok(RawDetections {
        boxes: prediction.detection_boxes[..count].iter().map(to_box).collect(),
        scores: prediction.detection_scores[..count].to_vec(),
        class_ids: prediction.detection_classes[..count]
            .iter()
            .map(to_class_id)
            .collect(),
    })
}

fn to_box(b: &[f32; 4]) -> NormalizedBox {
    let [ymin, xmin, ymax, xmax] = *b;
    NormalizedBox::new(xmin, ymin, xmax, ymax)
}

fn to_class_id(class: &f32) -> u32 {
    class.max(0.0) as u32
}

#[async_trait]
impl InferenceEngine for TfServingEngine {
    async fn infer(&self, image: &DecodedImage) -> Result<RawDetections, InferenceError> {
        let response = self
            .client
            .post(self.predict_url())
            .json(&self.request_body(image))
            .send()
            .await?;

        let parsed: PredictResponse = Self::parse_response(response).await?;
        into_raw_detections(parsed)
    }

    async fn ensure_ready(&self) -> Result<(), InferenceError> {
        let response = self.client.get(self.status_url()).send().await?;
        let status: ModelStatusResponse = Self::parse_response(response).await?;

        match status
            .model_version_status
            .iter()
            .find(|v| v.state == STATE_AVAILABLE)
        {
            Some(version) => {
                tracing::info!(
                    model = %self.config.model_name,
                    version = %version.version,
                    "Model server ready",
                );
                Ok(())
            }
            None => Err(InferenceError::Unavailable(format!(
                "model '{}' has no version in state {STATE_AVAILABLE}",
                self.config.model_name
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
