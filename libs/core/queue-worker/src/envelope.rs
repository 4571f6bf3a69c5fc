//! Error envelope
//!
//! Wraps the raw payload of a failed job together with the failure reason and
//! its retry bookkeeping. Envelopes are the only entries of the error queue.

use crate::error::WorkerError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

/// Error queue entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Verbatim payload that failed
    pub original_data: String,

    /// Description of the failure
    pub error: String,

    /// When this error record was created
    pub timestamp: DateTime<Utc>,

    /// Retries already spent
    #[serde(default)]
    pub retry_count: u32,

    /// When the last retry was scheduled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_retry: Option<DateTime<Utc>>,
}

impl ErrorEnvelope {
    /// Create an envelope for a payload that just failed
    pub fn new(original_data: impl Into<String>, error: impl Into<String>, retry_count: u32) -> Self {
        Self {
            original_data: original_data.into(),
            error: error.into(),
            timestamp: Utc::now(),
            retry_count,
            last_retry: None,
        }
    }

    /// Parse an envelope from its JSON form
    pub fn from_json(raw: &str) -> Result<Self, WorkerError> {
        serde_json::from_str(raw).map_err(|e| WorkerError::malformed(e.to_string()))
    }

    /// Serialize to the JSON form stored in the error queue
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            error!(error = %e, "Failed to serialize error envelope, storing fields by hand");
            json!({
                "original_data": self.original_data,
                "error": self.error,
                "timestamp": self.timestamp.to_rfc3339(),
                "retry_count": self.retry_count,
                "last_retry": self.last_retry.map(|at| at.to_rfc3339()),
            })
            .to_string()
        })
    }

    /// Whether the retry budget is spent
    pub fn is_exhausted(&self, max_retries: u32) -> bool {
        self.retry_count >= max_retries
    }

    /// Record a retry attempt
    pub fn record_retry(mut self, at: DateTime<Utc>) -> Self {
        self.retry_count = self.retry_count.saturating_add(1);
        self.last_retry = Some(at);
        self
    }
}
