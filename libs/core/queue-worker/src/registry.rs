//! Queue and job registry traits.
//!
//! This module defines the traits that domain crates implement to plug into
//! the worker:
//!
//! - `QueueDef`: names of the pending, in-flight and error lists
//! - `QueueJob`: the job payload stored in the lists
//! - `JobProcessor`: the handler that processes a parsed job

use crate::error::WorkerError;
use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};

/// Static queue definition.
///
/// # Example
///
/// ```rust
/// use queue_worker::QueueDef;
///
/// struct ReportQueues;
///
/// impl QueueDef for ReportQueues {
///     const PENDING_QUEUE: &'static str = "reports:send";
///     const IN_FLIGHT_QUEUE: &'static str = "reports:processing";
///     const ERROR_QUEUE: &'static str = "reports:error";
/// }
///
/// assert_eq!(ReportQueues::MAX_RETRIES, 3);
/// ```
pub trait QueueDef {
    /// List holding jobs awaiting dispatch
    const PENDING_QUEUE: &'static str;

    /// List holding jobs currently owned by some worker
    const IN_FLIGHT_QUEUE: &'static str;

    /// List holding error envelopes of failed jobs
    const ERROR_QUEUE: &'static str;

    /// Retry budget per job
    const MAX_RETRIES: u32 = 3;

    /// Backoff after a store fault, in seconds
    const BACKOFF_SECS: u64 = 5;

    /// Blocking move timeout, in seconds (0 blocks forever)
    const BLOCK_TIMEOUT_SECS: u64 = 1;
}

/// Trait for job payloads stored in the queues.
///
/// The retry count travels inside the payload so that a job re-enqueued by
/// the retry stage keeps its budget across further failures. The retry stage
/// writes it to the top-level `retry_count` and `last_retry` fields and leaves
/// every other field of the payload untouched.
pub trait QueueJob: Serialize + DeserializeOwned + Send + Sync {
    /// Short description for logs (e.g. destination and subject).
    fn describe(&self) -> String;

    /// Number of retries already spent on this job.
    fn retry_count(&self) -> u32;

    /// Validate a parsed job. Failures are treated as malformed payloads.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Trait for job processors.
///
/// Return `Ok(())` once the job is fully handled. Any job-scoped `Err` parks
/// the job in the error queue; a `StoreUnavailable` error is treated the same
/// way since the processor does not own the queues.
#[async_trait]
pub trait JobProcessor<J: QueueJob>: Send + Sync {
    /// Process a single job.
    async fn process(&self, job: &J) -> Result<(), WorkerError>;

    /// Get the processor name for logging.
    fn name(&self) -> &'static str;

    /// Health check for the processor's collaborators.
    async fn health_check(&self) -> Result<bool, WorkerError> {
        Ok(true)
    }
}

/// Parse and validate a raw payload.
pub fn parse_job<J: QueueJob>(raw: &str) -> Result<J, WorkerError> {
    let job: J = serde_json::from_str(raw).map_err(|e| WorkerError::malformed(e.to_string()))?;
    job.validate().map_err(WorkerError::malformed)?;
    Ok(job)
}
