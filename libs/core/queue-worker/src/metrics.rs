//! Prometheus metrics for queue workers
//!
//! Provides observability into dispatch outcomes and queue depth.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use std::time::Duration;
use tracing::{info, warn};

use crate::store::QueueStatus;

static PROMETHEUS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Initialize Prometheus metrics
///
/// Call this once at startup. Subsequent calls are no-ops.
pub fn init_metrics() {
    let installed = PROMETHEUS_HANDLE.get_or_try_init(|| {
        let handle = PrometheusBuilder::new().install_recorder()?;
        info!("Prometheus metrics initialized");
        Ok::<_, BuildError>(handle)
    });

    if let Err(e) = installed {
        warn!(error = %e, "Failed to install Prometheus recorder, metrics disabled");
    }
}

/// Get the Prometheus handle, if metrics were initialized
pub fn get_metrics_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

/// Render metrics in Prometheus format
pub fn render_metrics() -> String {
    get_metrics_handle().map(|h| h.render()).unwrap_or_default()
}

/// Terminal outcome of one dispatched job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Delivered,
    ParkedAsError,
}

impl JobOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobOutcome::Delivered => "delivered",
            JobOutcome::ParkedAsError => "error",
        }
    }
}

/// Record the outcome of a dispatched job
pub fn record_job(queue: &str, outcome: JobOutcome, duration: Duration) {
    counter!(
        "queue_worker_jobs_total",
        "queue" => queue.to_string(),
        "outcome" => outcome.as_str()
    )
    .increment(1);

    histogram!(
        "queue_worker_job_duration_seconds",
        "queue" => queue.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Record the reason a job failed
pub fn record_failure(queue: &str, reason: &'static str) {
    counter!(
        "queue_worker_job_failures_total",
        "queue" => queue.to_string(),
        "reason" => reason
    )
    .increment(1);
}

/// Record jobs re-enqueued by the retry stage
pub fn record_requeued(queue: &str, count: usize) {
    counter!("queue_worker_jobs_requeued_total", "queue" => queue.to_string())
        .increment(count as u64);
}

/// Record entries left parked in the error queue
pub fn record_parked(queue: &str, count: usize) {
    counter!("queue_worker_jobs_parked_total", "queue" => queue.to_string())
        .increment(count as u64);
}

/// Record jobs returned to pending by the recovery stage
pub fn record_recovered(queue: &str, count: usize) {
    counter!("queue_worker_jobs_recovered_total", "queue" => queue.to_string())
        .increment(count as u64);
}

/// Record a store fault seen by the loop
pub fn record_store_error(queue: &str) {
    counter!("queue_worker_store_errors_total", "queue" => queue.to_string()).increment(1);
}

/// Update the queue length gauges
pub fn record_queue_status(pending_queue: &str, status: &QueueStatus) {
    gauge!("queue_worker_queue_length", "queue" => pending_queue.to_string(), "list" => "pending")
        .set(status.pending as f64);
    gauge!("queue_worker_queue_length", "queue" => pending_queue.to_string(), "list" => "in_flight")
        .set(status.in_flight as f64);
    gauge!("queue_worker_queue_length", "queue" => pending_queue.to_string(), "list" => "error")
        .set(status.error as f64);
}
