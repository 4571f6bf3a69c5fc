//! Email job payload.

use chrono::{DateTime, Utc};
use queue_worker::QueueJob;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A request to render `template` with `variables` and mail it to `to`.
///
/// Wire form, as pushed by producers:
///
/// ```json
/// {"to": "a@x.com", "subject": "Hi", "template": "welcome", "variables": {"name": "Ana"}}
/// ```
///
/// `retry_count` and `last_retry` are only written when the job is sent back
/// to pending by the retry stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailJob {
    /// Recipient address
    pub to: String,

    /// Subject line
    pub subject: String,

    /// Template name, without the `.html` extension
    pub template: String,

    /// Values available to the template
    #[serde(default)]
    pub variables: Map<String, Value>,

    /// Retries already spent on this job
    #[serde(default, skip_serializing_if = "is_zero")]
    pub retry_count: u32,

    /// When the job was last sent back for retry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_retry: Option<DateTime<Utc>>,
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

impl EmailJob {
    /// Create a new job with no variables.
    pub fn new(
        to: impl Into<String>,
        subject: impl Into<String>,
        template: impl Into<String>,
    ) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            template: template.into(),
            variables: Map::new(),
            retry_count: 0,
            last_retry: None,
        }
    }

    /// Add a template variable.
    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }
}

impl QueueJob for EmailJob {
    fn describe(&self) -> String {
        format!("{} ({})", self.to, self.subject)
    }

    fn retry_count(&self) -> u32 {
        self.retry_count
    }

    fn validate(&self) -> Result<(), String> {
        if self.to.trim().is_empty() {
            return Err("'to' must not be empty".to_string());
        }
        if self.subject.trim().is_empty() {
            return Err("'subject' must not be empty".to_string());
        }
        if self.template.trim().is_empty() {
            return Err("'template' must not be empty".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use queue_worker::{WorkerError, parse_job};

    #[test]
    fn test_parses_producer_payload() {
        let raw = r#"{"to":"a@x.com","subject":"Hi","template":"welcome","variables":{"name":"Ana"}}"#;
        let job: EmailJob = parse_job(raw).unwrap();

        assert_eq!(job.to, "a@x.com");
        assert_eq!(job.template, "welcome");
        assert_eq!(job.variables["name"], "Ana");
        assert_eq!(job.retry_count, 0);
        assert_eq!(job.describe(), "a@x.com (Hi)");
    }

    #[test]
    fn test_variables_default_to_empty() {
        let job: EmailJob =
            parse_job(r#"{"to":"a@x.com","subject":"Hi","template":"plain"}"#).unwrap();
        assert!(job.variables.is_empty());
    }

    #[test]
    fn test_fresh_job_serializes_to_four_fields() {
        let job = EmailJob::new("a@x.com", "Hi", "welcome").with_variable("name", "Ana");
        let value = serde_json::to_value(&job).unwrap();

        assert_eq!(
            value,
            serde_json::json!({
                "to": "a@x.com",
                "subject": "Hi",
                "template": "welcome",
                "variables": {"name": "Ana"}
            })
        );
    }

    #[test]
    fn test_retried_job_carries_bookkeeping() {
        let raw = r#"{"to":"a@x.com","subject":"Hi","template":"welcome","retry_count":2,"last_retry":"2024-01-01T11:00:00Z"}"#;
        let job: EmailJob = parse_job(raw).unwrap();

        assert_eq!(job.retry_count(), 2);
        assert!(job.last_retry.is_some());

        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["retry_count"], 2);
        assert_eq!(value["last_retry"], "2024-01-01T11:00:00Z");
    }

    #[test]
    fn test_rejects_missing_or_blank_fields() {
        let missing = parse_job::<EmailJob>(r#"{"to":"a@x.com","subject":"Hi"}"#).unwrap_err();
        assert!(matches!(missing, WorkerError::MalformedPayload(_)));

        let blank =
            parse_job::<EmailJob>(r#"{"to":"  ","subject":"Hi","template":"welcome"}"#).unwrap_err();
        assert!(blank.to_string().contains("'to' must not be empty"));
    }
}
