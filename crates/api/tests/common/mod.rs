#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use detectq_core::artifacts::ArtifactLayout;
use detectq_core::correlation::IdGenerator;
use detectq_core::detection::NormalizedBox;
use detectq_core::labels::LabelSet;
use detectq_inference::{DecodedImage, InferenceEngine, InferenceError, RawDetections};
use detectq_pipeline::{Pipeline, PipelineSettings};
use detectq_worker::{Dispatcher, JobCounters, JobQueue, QueuePolicy};
use http_body_util::BodyExt;
use image::{Rgb, RgbImage};
use tempfile::TempDir;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tower::ServiceExt;

use detectq_api::config::ServerConfig;
use detectq_api::router::build_app_router;
use detectq_api::state::AppState;

// ---------------------------------------------------------------------------
// Fake inference engine
// ---------------------------------------------------------------------------

/// What the fake engine does for one call.
#[derive(Debug, Clone)]
pub enum Behavior {
    Detect(RawDetections),
    Fail,
    Panic,
}

/// In-process stand-in for the model server.
///
/// Scripted behaviours are used first, in order; after that every call uses
/// the default. When a gate is set, each call waits for a permit first.
pub struct FakeEngine {
    default: Behavior,
    script: Mutex<VecDeque<Behavior>>,
    gate: Option<Arc<Semaphore>>,
    calls: AtomicUsize,
}

impl FakeEngine {
    pub fn new(default: Behavior) -> Self {
        Self {
            default,
            script: Mutex::new(VecDeque::new()),
            gate: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Detects one `person` (class 1) at `(0.1, 0.1)`–`(0.5, 0.5)`.
    pub fn person() -> Self {
        Self::new(Behavior::Detect(person_detection(0.95)))
    }

    pub fn scripted(mut self, behaviors: impl IntoIterator<Item = Behavior>) -> Self {
        self.script = Mutex::new(behaviors.into_iter().collect());
        self
    }

    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InferenceEngine for FakeEngine {
    async fn infer(&self, _image: &DecodedImage) -> Result<RawDetections, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await.expect("gate closed");
        }

        let behavior = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.default.clone());
        match behavior {
            Behavior::Detect(raw) => Ok(raw),
            Behavior::Fail => Err(InferenceError::Engine("model crashed".into())),
            Behavior::Panic => panic!("fake engine panicked"),
        }
    }
}

pub fn person_detection(score: f32) -> RawDetections {
    RawDetections {
        boxes: vec![NormalizedBox::new(0.1, 0.1, 0.5, 0.5)],
        scores: vec![score],
        class_ids: vec![1],
    }
}

// ---------------------------------------------------------------------------
// Test application
// ---------------------------------------------------------------------------

/// Options for [`spawn_app`].
#[derive(Debug, Clone, Copy)]
pub struct TestOptions {
    pub workers: usize,
    pub queue: usize,
    pub policy: QueuePolicy,
    pub queued_result: bool,
    pub max_upload_bytes: usize,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            workers: 4,
            queue: 50,
            policy: QueuePolicy::Block,
            queued_result: false,
            max_upload_bytes: 32 * 1024 * 1024,
        }
    }
}

/// A running app: router, its state, and the worker pool behind it.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub engine: Arc<FakeEngine>,
    cancel: CancellationToken,
    tracker: TaskTracker,
    dir: TempDir,
}

impl TestApp {
    pub fn input_dir(&self) -> &Path {
        self.state.layout.input_dir()
    }

    pub fn output_dir(&self) -> &Path {
        self.state.layout.output_dir()
    }

    pub async fn shutdown(self) {
        self.cancel.cancel();
        self.tracker.wait().await;
        drop(self.dir);
    }
}

/// Build a test `ServerConfig` with artifact directories under `dir`.
pub fn test_config(dir: &Path, options: TestOptions) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        max_workers: options.workers,
        max_queue: options.queue,
        queue_policy: options.policy,
        queued_result: options.queued_result,
        max_upload_bytes: options.max_upload_bytes,
        input_dir: dir.join("input"),
        output_dir: dir.join("output"),
        labels_path: dir.join("labels.txt"),
        model: detectq_inference::TfServingConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            model_name: "detector".to_string(),
            signature_name: "serving_default".to_string(),
            input_format: detectq_inference::InputFormat::Encoded,
        },
        pipeline: PipelineSettings::default(),
    }
}

/// Build the full application with the production middleware stack and a
/// running worker pool backed by `engine`.
pub async fn spawn_app(engine: FakeEngine, options: TestOptions) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), options);

    let layout = ArtifactLayout::new(&config.input_dir, &config.output_dir);
    layout.ensure_dirs().unwrap();

    let engine = Arc::new(engine);
    let pipeline = Pipeline::new(
        Arc::clone(&engine) as Arc<dyn InferenceEngine>,
        Arc::new(LabelSet::parse("???\nperson\nbicycle\ncar")),
        layout.clone(),
        config.pipeline,
    );

    let counters = Arc::new(JobCounters::new());
    let (queue, consumer) = JobQueue::bounded(config.max_queue, config.queue_policy);
    let cancel = CancellationToken::new();
    let tracker = Dispatcher::new(
        config.max_workers,
        consumer,
        Arc::new(pipeline),
        Arc::clone(&counters),
    )
    .run(cancel.clone());

    let state = AppState {
        config: Arc::new(config.clone()),
        queue,
        ids: Arc::new(IdGenerator::new()),
        counters,
        layout: Arc::new(layout),
    };

    TestApp {
        router: build_app_router(state.clone(), &config),
        state,
        engine,
        cancel,
        tracker,
        dir,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub const BOUNDARY: &str = "detectq-test-boundary";

/// A `multipart/form-data` body with a single file field.
pub fn multipart_body(field: &str, filename: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: image/jpeg\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// A `multipart/form-data` body with a single text field.
pub fn multipart_text(field: &str, value: &str) -> Vec<u8> {
    format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"\r\n\r\n{value}\r\n--{BOUNDARY}--\r\n"
    )
    .into_bytes()
}

pub fn multipart_request(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

/// POST an image under field `file` to `uri`.
pub async fn post_image(app: &TestApp, uri: &str, filename: &str, data: &[u8]) -> Response<Body> {
    send(app, multipart_request(uri, multipart_body("file", filename, data))).await
}

pub async fn get(app: &TestApp, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn send(app: &TestApp, request: Request<Body>) -> Response<Body> {
    app.router.clone().oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

/// A dark grey JPEG of the given size.
pub fn jpeg(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, Rgb([20, 20, 20]));
    detectq_pipeline::codec::encode_jpeg(&image, 95).unwrap()
}
