//! Retry stage
//!
//! Walks the error list once. Envelopes with budget left send their original
//! job back to pending with the retry count bumped; the rest stay parked.
//! Only the `retry_count` and `last_retry` fields of the job are rewritten.
//!
//! Entries are inspected by rotating the list (`try_move(error, error)`), so
//! an entry is never outside the store while it is being looked at. The pass
//! visits at most as many entries as the list held when it started.

use crate::config::WorkerConfig;
use crate::envelope::ErrorEnvelope;
use crate::error::WorkerError;
use crate::metrics;
use crate::registry::{QueueJob, parse_job};
use crate::store::QueueStore;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};

/// Result of a retry pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryReport {
    /// Jobs sent back to pending
    pub requeued: usize,
    /// Envelopes left in the error list (budget spent or corrupt job)
    pub parked: usize,
    /// Entries that are not error envelopes at all
    pub malformed: usize,
    /// Entries removed by someone else while the pass was running
    pub skipped: usize,
}

impl RetryReport {
    /// Number of entries visited
    pub fn visited(&self) -> usize {
        self.requeued + self.parked + self.malformed + self.skipped
    }
}

/// Re-enqueue failed jobs that still have retry budget.
///
/// Safe to call repeatedly, e.g. on a timer: parked entries are left exactly
/// as they were.
pub async fn retry_failed<J: QueueJob>(
    store: &dyn QueueStore,
    config: &WorkerConfig,
) -> Result<RetryReport, WorkerError> {
    let mut report = RetryReport::default();
    let budget = store.len(&config.error_queue).await?;

    for _ in 0..budget {
        let Some(raw) = store
            .try_move(&config.error_queue, &config.error_queue)
            .await?
        else {
            break;
        };

        let envelope = match ErrorEnvelope::from_json(&raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                report.malformed += 1;
                warn!(
                    queue = %config.error_queue,
                    error = %e,
                    "Skipping error queue entry that is not an error envelope"
                );
                continue;
            }
        };

        if envelope.is_exhausted(config.max_retries) {
            report.parked += 1;
            debug!(
                retry_count = envelope.retry_count,
                max_retries = config.max_retries,
                error = %envelope.error,
                "Retry budget spent, leaving job parked"
            );
            continue;
        }

        let job = match parse_job::<J>(&envelope.original_data) {
            Ok(job) => job,
            Err(e) => {
                report.parked += 1;
                warn!(
                    queue = %config.error_queue,
                    error = %e,
                    "Parking envelope whose job cannot be parsed"
                );
                continue;
            }
        };

        let now = Utc::now();
        let retried = envelope.record_retry(now);
        let description = job.describe();
        let payload = match stamp_retry(&retried.original_data, retried.retry_count, now) {
            Ok(payload) => payload,
            Err(e) => {
                report.parked += 1;
                warn!(
                    queue = %config.error_queue,
                    job = %description,
                    error = %e,
                    "Parking envelope whose job is not a JSON object"
                );
                continue;
            }
        };

        if store
            .transfer(&config.error_queue, &raw, &config.pending_queue, &payload)
            .await?
        {
            report.requeued += 1;
            info!(
                job = %description,
                retry_count = retried.retry_count,
                max_retries = config.max_retries,
                "Requeued failed job for retry"
            );
        } else {
            report.skipped += 1;
            debug!(job = %description, "Error entry vanished before it could be requeued");
        }
    }

    if report.requeued > 0 {
        metrics::record_requeued(&config.pending_queue, report.requeued);
    }
    if report.parked > 0 {
        metrics::record_parked(&config.pending_queue, report.parked);
    }

    info!(
        queue = %config.error_queue,
        requeued = report.requeued,
        parked = report.parked,
        malformed = report.malformed,
        skipped = report.skipped,
        "Retry pass finished"
    );

    Ok(report)
}

/// Write the retry bookkeeping into a job payload, keeping every other field.
fn stamp_retry(
    original: &str,
    retry_count: u32,
    at: DateTime<Utc>,
) -> Result<String, WorkerError> {
    let Value::Object(mut fields) = serde_json::from_str::<Value>(original)? else {
        return Err(WorkerError::malformed("job payload is not a JSON object"));
    };
    fields.insert("retry_count".to_string(), Value::from(retry_count));
    fields.insert("last_retry".to_string(), serde_json::to_value(at)?);
    Ok(serde_json::to_string(&fields)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryQueueStore;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize)]
    struct TestJob {
        to: String,
        #[serde(default)]
        retry_count: u32,
        #[serde(default)]
        last_retry: Option<DateTime<Utc>>,
    }

    impl QueueJob for TestJob {
        fn describe(&self) -> String {
            self.to.clone()
        }

        fn retry_count(&self) -> u32 {
            self.retry_count
        }
    }

    fn config() -> WorkerConfig {
        WorkerConfig::new("t:send", "t:processing", "t:error").with_max_retries(3)
    }

    fn envelope(retry_count: u32) -> String {
        ErrorEnvelope::new(r#"{"to":"a@x.com"}"#, "smtp down", retry_count)
            .to_json()
    }

    #[tokio::test]
    async fn test_requeues_job_with_budget() {
        let store = InMemoryQueueStore::new();
        let config = config();
        store.push("t:error", &envelope(2)).await.unwrap();

        let report = retry_failed::<TestJob>(&store, &config).await.unwrap();

        assert_eq!(report.requeued, 1);
        assert_eq!(store.len("t:error").await.unwrap(), 0);

        let pending = store.items("t:send").await;
        assert_eq!(pending.len(), 1);
        let job: TestJob = serde_json::from_str(&pending[0]).unwrap();
        assert_eq!(job.to, "a@x.com");
        assert_eq!(job.retry_count, 3);
        assert!(job.last_retry.is_some());
    }

    #[tokio::test]
    async fn test_requeued_job_keeps_unknown_fields_and_key_order() {
        let store = InMemoryQueueStore::new();
        let config = config();
        let original = r#"{"to":"a@x.com","variables":{"z":1,"a":2},"reply_to":"b@x.com","retry_count":1}"#;
        store
            .push("t:error", &ErrorEnvelope::new(original, "smtp down", 1).to_json())
            .await
            .unwrap();

        retry_failed::<TestJob>(&store, &config).await.unwrap();

        let pending = store.items("t:send").await;
        assert!(
            pending[0].starts_with(r#"{"to":"a@x.com","variables":{"z":1,"a":2},"reply_to":"b@x.com","retry_count":2,"last_retry":"#),
            "unexpected payload: {}",
            pending[0]
        );
    }

    #[tokio::test]
    async fn test_parks_exhausted_envelope_unchanged() {
        let store = InMemoryQueueStore::new();
        let config = config();
        let parked = envelope(3);
        store.push("t:error", &parked).await.unwrap();

        let report = retry_failed::<TestJob>(&store, &config).await.unwrap();

        assert_eq!(report.parked, 1);
        assert_eq!(store.items("t:error").await, vec![parked]);
        assert_eq!(store.len("t:send").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_mixed_entries_keep_their_order() {
        let store = InMemoryQueueStore::new();
        let config = config();
        let exhausted = envelope(5);
        let garbage = "not an envelope".to_string();
        store.push("t:error", &exhausted).await.unwrap();
        store.push("t:error", &envelope(0)).await.unwrap();
        store.push("t:error", &garbage).await.unwrap();

        let report = retry_failed::<TestJob>(&store, &config).await.unwrap();

        assert_eq!(
            report,
            RetryReport {
                requeued: 1,
                parked: 1,
                malformed: 1,
                skipped: 0
            }
        );
        assert_eq!(store.items("t:error").await, vec![garbage, exhausted]);
        assert_eq!(store.len("t:send").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_original_data_is_parked() {
        let store = InMemoryQueueStore::new();
        let config = config();
        let corrupt = ErrorEnvelope::new("{broken", "Malformed payload", 0)
            .to_json();
        store.push("t:error", &corrupt).await.unwrap();

        let report = retry_failed::<TestJob>(&store, &config).await.unwrap();

        assert_eq!(report.parked, 1);
        assert_eq!(store.items("t:error").await, vec![corrupt]);
    }

    #[tokio::test]
    async fn test_non_object_job_is_parked() {
        let store = InMemoryQueueStore::new();
        let config = config();
        let entry = ErrorEnvelope::new(r#"["a@x.com"]"#, "smtp down", 0).to_json();
        store.push("t:error", &entry).await.unwrap();

        let report = retry_failed::<TestJob>(&store, &config).await.unwrap();

        assert_eq!(report.parked, 1);
        assert_eq!(store.items("t:error").await, vec![entry]);
        assert_eq!(store.len("t:send").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_second_pass_leaves_parked_entries_alone() {
        let store = InMemoryQueueStore::new();
        let config = config();
        store.push("t:error", &envelope(3)).await.unwrap();
        store.push("t:error", &envelope(3)).await.unwrap();
        let before = store.items("t:error").await;

        retry_failed::<TestJob>(&store, &config).await.unwrap();
        let report = retry_failed::<TestJob>(&store, &config).await.unwrap();

        assert_eq!(report.parked, 2);
        assert_eq!(report.visited(), 2);
        assert_eq!(store.items("t:error").await, before);
    }

    #[tokio::test]
    async fn test_empty_error_queue() {
        let store = InMemoryQueueStore::new();
        let report = retry_failed::<TestJob>(&store, &config()).await.unwrap();
        assert_eq!(report, RetryReport::default());
    }
}
