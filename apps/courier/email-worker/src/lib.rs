//! Email Worker Service
//!
//! A background worker that delivers email jobs from Redis lists.
//!
//! ## Architecture
//!
//! ```text
//! Redis list (email:send)
//!   ↓ BLMOVE
//! Redis list (email:processing)
//!   ↓
//! QueueWorker<EmailJob, EmailProcessor>
//!   ↓ (renders templates)
//! HandlebarsRenderer
//!   ↓ (sends emails)
//! MailTransport (SMTP, or console when SMTP_HOST is unset)
//!
//! failures → Redis list (email:error) → retried on the next start
//! ```
//!
//! ## Features
//!
//! - Jobs are never lost: a claimed job stays in `email:processing` until it
//!   is delivered or parked
//! - Jobs left behind by a crashed worker are recovered on start
//! - Failed jobs are retried on start, up to `EMAIL_MAX_RETRIES` times
//! - Graceful shutdown handling
//! - Health check endpoint for Kubernetes probes

pub mod config;

use axum::Router;
use config::WorkerSettings;
use core_config::{Environment, FromEnv, app_info};
use domain_notifications::{EmailJob, EmailProcessor, MailerConfig};
use eyre::{Result, WrapErr};
use queue_worker::{
    HealthState, QueueStore, QueueWorker, RedisQueueStore, RetryConfig, health_router,
    init_metrics,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

/// Start the health HTTP server
///
/// Provides endpoints for:
/// - Liveness probes: `/health`, `/healthz`
/// - Readiness probes: `/ready`, `/readyz`
/// - Queue lengths: `/queues`
/// - Prometheus metrics: `/metrics`
async fn start_health_server(health_state: HealthState, port: u16) -> Result<()> {
    let app: Router = health_router(health_state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr)
        .await
        .wrap_err_with(|| format!("Failed to bind health server to {}", addr))?;

    info!(port = %port, "Health server listening");

    axum::serve(listener, app)
        .await
        .wrap_err("Health server failed")?;

    Ok(())
}

/// Run the email worker
///
/// This is the main entry point for the worker. It:
/// 1. Sets up structured logging (env-aware: JSON for prod, pretty for dev)
/// 2. Loads templates and selects the mail transport
/// 3. Connects to Redis with retry logic
/// 4. Runs recovery, retry, then the dispatch loop until SIGINT/SIGTERM
///
/// # Errors
///
/// Returns an error if:
/// - Configuration is invalid
/// - The template directory cannot be read
/// - Redis cannot be reached at startup
pub async fn run() -> Result<()> {
    let environment = Environment::from_env();
    core_config::tracing::init_tracing(&environment);

    init_metrics();

    let app_info = app_info!();

    info!(name = %app_info.name, version = %app_info.version, "Starting email worker service");
    info!("Environment: {:?}", environment);

    let settings = WorkerSettings::from_env().wrap_err("Failed to load worker settings")?;
    let mailer = MailerConfig::from_env().wrap_err("Failed to load mailer settings")?;

    let renderer = mailer.build_renderer().wrap_err_with(|| {
        format!(
            "Failed to load templates from {}",
            mailer.template_dir.display()
        )
    })?;
    info!(templates = ?renderer.template_names(), "Template renderer initialized");

    let transport = mailer
        .build_transport()
        .wrap_err("Failed to create mail transport")?;

    info!(url = %settings.redis_url, "Connecting to Redis...");
    let store = RedisQueueStore::connect_with_retry(&settings.redis_url, RetryConfig::default())
        .await
        .wrap_err("Failed to connect to Redis")?;
    let store: Arc<dyn QueueStore> = Arc::new(store);

    let worker_config = settings.worker_config();
    info!(
        pending = %worker_config.pending_queue,
        in_flight = %worker_config.in_flight_queue,
        error = %worker_config.error_queue,
        worker_id = %worker_config.worker_id,
        "Worker configuration loaded"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        if let Err(e) = shutdown_signal().await {
            error!("Error waiting for shutdown signal: {}", e);
        }
        let _ = shutdown_tx.send(true);
    });

    let health_state = HealthState::new(
        Arc::clone(&store),
        worker_config.clone(),
        app_info.name,
        app_info.version,
    );
    let health_port = settings.health_port;
    tokio::spawn(async move {
        if let Err(e) = start_health_server(health_state, health_port).await {
            error!(error = %e, "Health server failed");
        }
    });

    let processor = EmailProcessor::new(Arc::new(renderer), transport);
    let worker = QueueWorker::<EmailJob, _>::new(store, processor, worker_config);
    worker
        .run(shutdown_rx)
        .await
        .wrap_err("Email worker failed")?;

    info!("Email worker service stopped");
    Ok(())
}

/// Wait for a shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal() -> Result<()> {
    let ctrl_c = async { signal::ctrl_c().await.wrap_err("Failed to install Ctrl+C handler") };

    #[cfg(unix)]
    let terminate = async {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .wrap_err("Failed to install SIGTERM handler")?;
        sigterm.recv().await;
        Ok::<(), eyre::Report>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Result<()>>();

    tokio::select! {
        result = ctrl_c => {
            result?;
            info!("Received Ctrl+C, initiating shutdown...");
        },
        result = terminate => {
            result?;
            info!("Received SIGTERM, initiating shutdown...");
        },
    }

    Ok(())
}
