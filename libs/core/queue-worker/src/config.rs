//! Worker configuration
//!
//! This module provides `WorkerConfig` for configuring the queue worker.

use crate::registry::QueueDef;
use std::time::Duration;
use uuid::Uuid;

/// Configuration for the queue worker
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Pending list name
    pub pending_queue: String,

    /// In-flight list name
    pub in_flight_queue: String,

    /// Error list name
    pub error_queue: String,

    /// Unique worker ID (auto-generated, used in logs)
    pub worker_id: String,

    /// Retry budget per job
    pub max_retries: u32,

    /// Blocking move timeout (zero blocks until a job arrives)
    pub block_timeout: Duration,

    /// Fixed backoff after a store fault
    pub backoff: Duration,
}

impl WorkerConfig {
    /// Create a new WorkerConfig from a QueueDef
    pub fn from_queue_def<Q: QueueDef>() -> Self {
        Self {
            pending_queue: Q::PENDING_QUEUE.to_string(),
            in_flight_queue: Q::IN_FLIGHT_QUEUE.to_string(),
            error_queue: Q::ERROR_QUEUE.to_string(),
            worker_id: format!("worker-{}", Uuid::new_v4()),
            max_retries: Q::MAX_RETRIES,
            block_timeout: Duration::from_secs(Q::BLOCK_TIMEOUT_SECS),
            backoff: Duration::from_secs(Q::BACKOFF_SECS),
        }
    }

    /// Create a new WorkerConfig with explicit queue names
    pub fn new(
        pending_queue: impl Into<String>,
        in_flight_queue: impl Into<String>,
        error_queue: impl Into<String>,
    ) -> Self {
        Self {
            pending_queue: pending_queue.into(),
            in_flight_queue: in_flight_queue.into(),
            error_queue: error_queue.into(),
            worker_id: format!("worker-{}", Uuid::new_v4()),
            max_retries: 3,
            block_timeout: Duration::from_secs(1),
            backoff: Duration::from_secs(5),
        }
    }

    /// Set the worker ID
    pub fn with_worker_id(mut self, id: impl Into<String>) -> Self {
        self.worker_id = id.into();
        self
    }

    /// Set the pending queue name
    pub fn with_pending_queue(mut self, queue: impl Into<String>) -> Self {
        self.pending_queue = queue.into();
        self
    }

    /// Set the in-flight queue name
    pub fn with_in_flight_queue(mut self, queue: impl Into<String>) -> Self {
        self.in_flight_queue = queue.into();
        self
    }

    /// Set the error queue name
    pub fn with_error_queue(mut self, queue: impl Into<String>) -> Self {
        self.error_queue = queue.into();
        self
    }

    /// Set the retry budget
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the blocking move timeout
    pub fn with_block_timeout(mut self, timeout: Duration) -> Self {
        self.block_timeout = timeout;
        self
    }

    /// Set the store fault backoff
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self::new("jobs:pending", "jobs:processing", "jobs:error")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestQueues;

    impl QueueDef for TestQueues {
        const PENDING_QUEUE: &'static str = "test:send";
        const IN_FLIGHT_QUEUE: &'static str = "test:processing";
        const ERROR_QUEUE: &'static str = "test:error";
        const BACKOFF_SECS: u64 = 2;
    }

    #[test]
    fn test_from_queue_def() {
        let config = WorkerConfig::from_queue_def::<TestQueues>();

        assert_eq!(config.pending_queue, "test:send");
        assert_eq!(config.in_flight_queue, "test:processing");
        assert_eq!(config.error_queue, "test:error");
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.backoff, Duration::from_secs(2));
        assert!(config.worker_id.starts_with("worker-"));
    }

    #[test]
    fn test_builder_pattern() {
        let config = WorkerConfig::default()
            .with_worker_id("worker-1")
            .with_error_queue("jobs:dead")
            .with_max_retries(7)
            .with_block_timeout(Duration::ZERO)
            .with_backoff(Duration::from_millis(10));

        assert_eq!(config.worker_id, "worker-1");
        assert_eq!(config.pending_queue, "jobs:pending");
        assert_eq!(config.error_queue, "jobs:dead");
        assert_eq!(config.max_retries, 7);
        assert_eq!(config.block_timeout, Duration::ZERO);
        assert_eq!(config.backoff, Duration::from_millis(10));
    }
}
