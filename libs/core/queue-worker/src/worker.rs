//! Generic QueueWorker implementation.
//!
//! The worker runs the recovery stage, then the retry stage, then the
//! dispatch loop until the shutdown signal is raised. Each job moves through
//! the lists with one atomic store step per transition:
//!
//! ```text
//! pending --blocking_move--> in-flight --remove---> (delivered)
//!                                      \--transfer-> error (envelope)
//! ```

use crate::config::WorkerConfig;
use crate::envelope::ErrorEnvelope;
use crate::error::{ErrorScope, WorkerError};
use crate::metrics::{self, JobOutcome};
use crate::recovery::{RecoveryReport, recover_in_flight};
use crate::registry::{JobProcessor, QueueJob, parse_job};
use crate::retry::{RetryReport, retry_failed};
use crate::store::{QueueStatus, QueueStore, queue_status};
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Generic queue worker that dispatches jobs to a processor.
///
/// # Type Parameters
///
/// * `J` - The job type (must implement `QueueJob`)
/// * `P` - The processor type (must implement `JobProcessor<J>`)
///
/// # Example
///
/// ```rust,ignore
/// let store = Arc::new(RedisQueueStore::connect("redis://localhost").await?);
/// let config = WorkerConfig::from_queue_def::<EmailQueues>();
/// let worker = QueueWorker::new(store, processor, config);
///
/// let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
/// worker.run(shutdown_rx).await?;
/// ```
pub struct QueueWorker<J, P>
where
    J: QueueJob,
    P: JobProcessor<J>,
{
    store: Arc<dyn QueueStore>,
    processor: Arc<P>,
    config: WorkerConfig,
    _phantom: PhantomData<J>,
}

impl<J, P> QueueWorker<J, P>
where
    J: QueueJob + 'static,
    P: JobProcessor<J> + 'static,
{
    /// Create a new queue worker.
    pub fn new(store: Arc<dyn QueueStore>, processor: P, config: WorkerConfig) -> Self {
        Self::with_arc_processor(store, Arc::new(processor), config)
    }

    /// Create a new queue worker with an Arc processor.
    pub fn with_arc_processor(
        store: Arc<dyn QueueStore>,
        processor: Arc<P>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            store,
            processor,
            config,
            _phantom: PhantomData,
        }
    }

    /// Get the queue store.
    pub fn store(&self) -> Arc<dyn QueueStore> {
        Arc::clone(&self.store)
    }

    /// Get the worker configuration.
    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Run the worker until the shutdown signal is raised.
    ///
    /// Store faults never end the loop: they are logged and retried after
    /// `config.backoff`. The current job always reaches a terminal state
    /// before the loop exits.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), WorkerError> {
        info!(
            worker_id = %self.config.worker_id,
            store = %self.store.name(),
            processor = %self.processor.name(),
            pending = %self.config.pending_queue,
            in_flight = %self.config.in_flight_queue,
            error = %self.config.error_queue,
            max_retries = self.config.max_retries,
            "Starting queue worker"
        );

        match self.processor.health_check().await {
            Ok(true) => {}
            Ok(false) => warn!(processor = %self.processor.name(), "Processor reports unhealthy"),
            Err(e) => warn!(error = %e, "Processor health check failed"),
        }

        if !self.startup(&mut shutdown).await {
            info!("Shutdown requested during startup, worker stopped");
            return Ok(());
        }

        loop {
            if *shutdown.borrow() {
                info!("Received shutdown signal, stopping worker");
                break;
            }

            match self.dispatch_next(&mut shutdown).await {
                Ok(_) => {}
                Err(e) if e.scope() == ErrorScope::Loop => {
                    metrics::record_store_error(&self.config.pending_queue);
                    warn!(
                        error = %e,
                        backoff_secs = self.config.backoff.as_secs_f64(),
                        "Queue store error, backing off"
                    );
                    if !self.pause(&mut shutdown).await {
                        info!("Received shutdown signal, stopping worker");
                        break;
                    }
                }
                Err(e) => error!(error = %e, "Unexpected error in dispatch loop"),
            }
        }

        info!(worker_id = %self.config.worker_id, "Queue worker stopped");
        Ok(())
    }

    /// Run the recovery and retry stages, retrying each on store faults.
    ///
    /// Returns `false` if shutdown was requested before both finished.
    async fn startup(&self, shutdown: &mut watch::Receiver<bool>) -> bool {
        let recovery: Option<RecoveryReport> = self
            .settle("recover in-flight jobs", shutdown, || {
                recover_in_flight(self.store.as_ref(), &self.config)
            })
            .await;
        if recovery.is_none() {
            return false;
        }

        let retry: Option<RetryReport> = self
            .settle("retry failed jobs", shutdown, || {
                retry_failed::<J>(self.store.as_ref(), &self.config)
            })
            .await;
        if retry.is_none() {
            return false;
        }

        if let Some(status) = self.status().await {
            info!(
                pending = status.pending,
                in_flight = status.in_flight,
                error = status.error,
                "Startup stages complete"
            );
        }
        true
    }

    /// Dispatch a single job, if one arrives within the block timeout.
    ///
    /// Returns the terminal outcome of the job, or `None` when no job arrived
    /// (or the job could not be settled because shutdown was requested; it is
    /// then left in flight for the next recovery stage).
    pub async fn dispatch_next(
        &self,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<Option<JobOutcome>, WorkerError> {
        let Some(raw) = self
            .store
            .blocking_move(
                &self.config.pending_queue,
                &self.config.in_flight_queue,
                self.config.block_timeout,
            )
            .await?
        else {
            debug!(queue = %self.config.pending_queue, "No job within block timeout");
            return Ok(None);
        };

        let start = Instant::now();
        let (description, retry_count, result) = match parse_job::<J>(&raw) {
            Ok(job) => {
                debug!(job = %job.describe(), retry_count = job.retry_count(), "Dispatching job");
                let result = self.processor.process(&job).await;
                (job.describe(), job.retry_count(), result)
            }
            Err(e) => ("<malformed>".to_string(), 0, Err(e)),
        };

        let outcome = match result {
            Ok(()) => {
                let settled = self
                    .settle("clear delivered job", shutdown, || {
                        self.store.remove(&self.config.in_flight_queue, &raw)
                    })
                    .await;
                match settled {
                    None => return Ok(None),
                    Some(0) => warn!(job = %description, "Delivered job was no longer in flight"),
                    Some(_) => {}
                }
                JobOutcome::Delivered
            }
            Err(e) => {
                metrics::record_failure(&self.config.pending_queue, e.reason());
                let envelope = ErrorEnvelope::new(raw.as_str(), e.to_string(), retry_count);
                let payload = envelope.to_json();

                let settled = self
                    .settle("park failed job", shutdown, || {
                        self.store.transfer(
                            &self.config.in_flight_queue,
                            &raw,
                            &self.config.error_queue,
                            &payload,
                        )
                    })
                    .await;
                match settled {
                    None => return Ok(None),
                    Some(false) => {
                        warn!(job = %description, "Failed job was no longer in flight")
                    }
                    Some(true) => {}
                }

                let status = self.status().await;
                warn!(
                    job = %description,
                    error = %e,
                    retry_count = retry_count,
                    pending = ?status.map(|s| s.pending),
                    in_flight = ?status.map(|s| s.in_flight),
                    errors = ?status.map(|s| s.error),
                    "Job failed, parked in error queue"
                );
                metrics::record_job(
                    &self.config.pending_queue,
                    JobOutcome::ParkedAsError,
                    start.elapsed(),
                );
                return Ok(Some(JobOutcome::ParkedAsError));
            }
        };

        let status = self.status().await;
        info!(
            job = %description,
            duration_ms = start.elapsed().as_millis() as u64,
            pending = ?status.map(|s| s.pending),
            in_flight = ?status.map(|s| s.in_flight),
            errors = ?status.map(|s| s.error),
            "Job delivered"
        );
        metrics::record_job(&self.config.pending_queue, outcome, start.elapsed());
        Ok(Some(outcome))
    }

    /// Read queue lengths and update the gauges. Failures are only logged.
    async fn status(&self) -> Option<QueueStatus> {
        match queue_status(self.store.as_ref(), &self.config).await {
            Ok(status) => {
                metrics::record_queue_status(&self.config.pending_queue, &status);
                Some(status)
            }
            Err(e) => {
                debug!(error = %e, "Could not read queue lengths");
                None
            }
        }
    }

    /// Retry a store operation with the fixed backoff until it succeeds.
    ///
    /// Returns `None` if shutdown is requested first.
    async fn settle<T, F, Fut>(
        &self,
        what: &str,
        shutdown: &mut watch::Receiver<bool>,
        op: F,
    ) -> Option<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, WorkerError>>,
    {
        loop {
            match op().await {
                Ok(value) => return Some(value),
                Err(e) => {
                    metrics::record_store_error(&self.config.pending_queue);
                    warn!(
                        error = %e,
                        operation = what,
                        backoff_secs = self.config.backoff.as_secs_f64(),
                        "Store operation failed, retrying"
                    );
                    if !self.pause(shutdown).await {
                        warn!(
                            operation = what,
                            "Shutdown requested before store operation succeeded"
                        );
                        return None;
                    }
                }
            }
        }
    }

    /// Sleep for the backoff interval. Returns `false` if shutdown was
    /// requested before or during the sleep.
    async fn pause(&self, shutdown: &mut watch::Receiver<bool>) -> bool {
        if *shutdown.borrow() {
            return false;
        }

        let deadline = tokio::time::Instant::now() + self.config.backoff;

        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => return !*shutdown.borrow(),
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        // Sender gone, nobody can request shutdown any more
                        tokio::time::sleep_until(deadline).await;
                        return true;
                    }
                    if *shutdown.borrow() {
                        return false;
                    }
                }
            }
        }
    }
}
