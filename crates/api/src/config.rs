use std::path::PathBuf;
use std::str::FromStr;

use detectq_core::detection::DEFAULT_CONFIDENCE_THRESHOLD;
use detectq_inference::{InputFormat, TfServingConfig};
use detectq_pipeline::codec::DEFAULT_JPEG_QUALITY;
use detectq_pipeline::PipelineSettings;
use detectq_worker::QueuePolicy;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development against a
/// model server on `localhost:8501`.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3002`).
    pub port: u16,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long to wait for workers to finish their current job after the
    /// listener stops (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Size of the worker pool (default: `16`).
    pub max_workers: usize,
    /// Job queue capacity (default: `50`).
    pub max_queue: usize,
    /// What a submission does when the queue is full (default: `block`).
    pub queue_policy: QueuePolicy,
    /// Acknowledge submissions before processing instead of waiting for the
    /// result (default: `false`).
    pub queued_result: bool,
    /// Largest accepted request body in bytes (default: 32 MiB).
    pub max_upload_bytes: usize,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub labels_path: PathBuf,
    pub model: TfServingConfig,
    pub pipeline: PipelineSettings,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                 |
    /// |-------------------------|-------------------------|
    /// | `HOST`                  | `0.0.0.0`               |
    /// | `PORT`                  | `3002`                  |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `30`                    |
    /// | `MAX_WORKERS`           | `16`                    |
    /// | `MAX_QUEUE`             | `50`                    |
    /// | `QUEUE_POLICY`          | `block`                 |
    /// | `QUEUED_RESULT`         | `false`                 |
    /// | `MAX_UPLOAD_BYTES`      | `33554432`              |
    /// | `INPUT_DIR`             | `input`                 |
    /// | `OUTPUT_DIR`            | `output`                |
    /// | `LABELS_PATH`           | `labels.txt`            |
    /// | `MODEL_URL`             | `http://localhost:8501` |
    /// | `MODEL_NAME`            | `detector`              |
    /// | `MODEL_SIGNATURE`       | `serving_default`       |
    /// | `MODEL_INPUT_FORMAT`    | `encoded`               |
    /// | `CONFIDENCE_THRESHOLD`  | `0.4`                   |
    /// | `JPEG_QUALITY`          | `80`                    |
    ///
    /// Panics with the variable name if a value does not parse.
    pub fn from_env() -> Self {
        let max_workers: usize = parse_var("MAX_WORKERS", "16");
        assert!(max_workers > 0, "MAX_WORKERS must be at least 1");
        let max_queue: usize = parse_var("MAX_QUEUE", "50");
        assert!(max_queue > 0, "MAX_QUEUE must be at least 1");

        let confidence_threshold: f32 =
            parse_var("CONFIDENCE_THRESHOLD", &DEFAULT_CONFIDENCE_THRESHOLD.to_string());
        assert!(
            (0.0..=1.0).contains(&confidence_threshold),
            "CONFIDENCE_THRESHOLD must be between 0 and 1"
        );

        Self {
            host: var_or("HOST", "0.0.0.0"),
            port: parse_var("PORT", "3002"),
            request_timeout_secs: parse_var("REQUEST_TIMEOUT_SECS", "30"),
            shutdown_timeout_secs: parse_var("SHUTDOWN_TIMEOUT_SECS", "30"),
            max_workers,
            max_queue,
            queue_policy: parse_var("QUEUE_POLICY", "block"),
            queued_result: parse_var("QUEUED_RESULT", "false"),
            max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", "33554432"),
            input_dir: var_or("INPUT_DIR", "input").into(),
            output_dir: var_or("OUTPUT_DIR", "output").into(),
            labels_path: var_or("LABELS_PATH", "labels.txt").into(),
            model: TfServingConfig {
                base_url: var_or("MODEL_URL", "http://localhost:8501"),
                model_name: var_or("MODEL_NAME", "detector"),
                signature_name: var_or("MODEL_SIGNATURE", "serving_default"),
                input_format: parse_var::<InputFormat>("MODEL_INPUT_FORMAT", "encoded"),
            },
            pipeline: PipelineSettings {
                confidence_threshold,
                jpeg_quality: parse_var("JPEG_QUALITY", &DEFAULT_JPEG_QUALITY.to_string()),
            },
        }
    }
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.into())
}

fn parse_var<T>(name: &str, default: &str) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = var_or(name, default);
    raw.parse()
        .unwrap_or_else(|e| panic!("{name} has invalid value '{raw}': {e}"))
}
