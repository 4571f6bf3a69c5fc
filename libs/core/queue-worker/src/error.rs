//! Worker error types and error scoping
//!
//! Errors fall into two scopes that decide how the dispatch loop reacts:
//! - **Job-scoped**: the job itself cannot be processed. It is wrapped in an
//!   error envelope and parked in the error queue; the loop moves on.
//! - **Loop-scoped**: the queue store cannot be reached. Nothing is recorded
//!   against the job; the loop backs off and tries again.

use thiserror::Error;

/// Scope of an error, used to route it in the dispatch loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorScope {
    /// Failure belongs to one job - record an error envelope
    Job,
    /// Failure of the infrastructure - back off and retry the loop
    Loop,
}

/// Queue worker errors
#[derive(Error, Debug)]
pub enum WorkerError {
    /// The queue store could not be reached or rejected a command
    #[error("Queue store unavailable: {0}")]
    StoreUnavailable(String),

    /// Payload is not valid JSON for the job type, or fails validation
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// Job processing failed (rendering, delivery, ...)
    #[error("{0}")]
    Processing(String),

    /// Serialization of a value produced by the worker failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl WorkerError {
    /// Create a processing error
    pub fn processing(message: impl Into<String>) -> Self {
        WorkerError::Processing(message.into())
    }

    /// Create a malformed payload error
    pub fn malformed(message: impl Into<String>) -> Self {
        WorkerError::MalformedPayload(message.into())
    }

    /// Create a store error
    pub fn store(message: impl Into<String>) -> Self {
        WorkerError::StoreUnavailable(message.into())
    }

    /// Get the error scope
    pub fn scope(&self) -> ErrorScope {
        match self {
            WorkerError::StoreUnavailable(_) => ErrorScope::Loop,
            WorkerError::MalformedPayload(_) => ErrorScope::Job,
            WorkerError::Processing(_) => ErrorScope::Job,
            WorkerError::Serialization(_) => ErrorScope::Job,
            WorkerError::Config(_) => ErrorScope::Loop,
        }
    }

    /// Check if this error belongs to a single job
    pub fn is_job_scoped(&self) -> bool {
        self.scope() == ErrorScope::Job
    }

    /// Short label used for metrics
    pub fn reason(&self) -> &'static str {
        match self {
            WorkerError::StoreUnavailable(_) => "store_unavailable",
            WorkerError::MalformedPayload(_) => "malformed_payload",
            WorkerError::Processing(_) => "processing",
            WorkerError::Serialization(_) => "serialization",
            WorkerError::Config(_) => "config",
        }
    }
}

impl From<redis::RedisError> for WorkerError {
    fn from(err: redis::RedisError) -> Self {
        WorkerError::StoreUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for WorkerError {
    fn from(err: serde_json::Error) -> Self {
        WorkerError::Serialization(err.to_string())
    }
}

impl From<tokio::task::JoinError> for WorkerError {
    fn from(err: tokio::task::JoinError) -> Self {
        WorkerError::StoreUnavailable(format!("blocking store task failed: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_scopes() {
        assert_eq!(WorkerError::store("down").scope(), ErrorScope::Loop);
        assert_eq!(WorkerError::malformed("bad json").scope(), ErrorScope::Job);
        assert_eq!(WorkerError::processing("smtp 550").scope(), ErrorScope::Job);
        assert!(!WorkerError::Config("missing".into()).is_job_scoped());
    }

    #[test]
    fn test_processing_error_displays_message_only() {
        let err = WorkerError::processing("Template not found: ghost");
        assert_eq!(err.to_string(), "Template not found: ghost");
    }

    #[test]
    fn test_serde_error_converts_to_serialization() {
        let err: WorkerError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert_eq!(err.reason(), "serialization");
    }
}
