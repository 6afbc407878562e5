use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use detectq_core::artifacts::ArtifactLayout;
use detectq_core::correlation::IdGenerator;
use detectq_core::labels::LabelSet;
use detectq_inference::{InferenceEngine, TfServingEngine};
use detectq_pipeline::Pipeline;
use detectq_worker::{Dispatcher, JobCounters, JobQueue};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use detectq_api::config::ServerConfig;
use detectq_api::router::build_app_router;
use detectq_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "detectq_api=debug,detectq_worker=debug,detectq_pipeline=debug,tower_http=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        workers = config.max_workers,
        queue = config.max_queue,
        queued_result = config.queued_result,
        "Loaded server configuration",
    );

    // --- Labels ---
    let labels = LabelSet::from_file(&config.labels_path).expect("Failed to load label file");
    tracing::info!(path = %config.labels_path.display(), count = labels.len(), "Labels loaded");

    // --- Artifact directories ---
    let layout = ArtifactLayout::new(&config.input_dir, &config.output_dir);
    layout
        .ensure_dirs()
        .expect("Failed to create input/output directories");

    let last_id = layout
        .latest_id()
        .expect("Failed to scan artifact directories");
    tracing::info!(last_id = ?last_id.as_ref().map(|id| id.as_str()), "Resuming correlation ids");
    let ids = IdGenerator::resume_after(last_id.as_ref());

    // --- Model server ---
    let engine = TfServingEngine::new(config.model.clone());
    engine
        .ensure_ready()
        .await
        .expect("Model server is not ready");
    tracing::info!(
        url = %config.model.base_url,
        model = %config.model.model_name,
        "Model server ready",
    );

    // --- Worker pool ---
    let pipeline = Pipeline::new(
        Arc::new(engine),
        Arc::new(labels),
        layout.clone(),
        config.pipeline,
    );
    let counters = Arc::new(JobCounters::new());
    let (queue, consumer) = JobQueue::bounded(config.max_queue, config.queue_policy);
    let dispatcher = Dispatcher::new(
        config.max_workers,
        consumer,
        Arc::new(pipeline),
        Arc::clone(&counters),
    );
    let worker_cancel = CancellationToken::new();
    let workers = dispatcher.run(worker_cancel.clone());
    tracing::info!(
        workers = dispatcher.worker_count(),
        capacity = queue.capacity(),
        policy = ?queue.policy(),
        "Worker pool running",
    );

    // --- App state ---
    let state = AppState {
        config: Arc::new(config.clone()),
        queue,
        ids: Arc::new(ids),
        counters,
        layout: Arc::new(layout),
    };

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, stopping workers");

    worker_cancel.cancel();
    if tokio::time::timeout(
        Duration::from_secs(config.shutdown_timeout_secs),
        workers.wait(),
    )
    .await
    .is_err()
    {
        tracing::warn!("Workers did not finish their current jobs in time");
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager (e.g. systemd, Docker, Kubernetes).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
