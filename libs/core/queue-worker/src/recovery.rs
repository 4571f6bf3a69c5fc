//! Recovery stage
//!
//! Runs once at startup. Any job left in the in-flight list was claimed by an
//! instance that died before settling it, so it goes back to pending.

use crate::config::WorkerConfig;
use crate::error::WorkerError;
use crate::metrics;
use crate::store::QueueStore;
use tracing::{debug, info};

/// Result of a recovery pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Jobs moved from in-flight back to pending
    pub recovered: usize,
}

/// Move every in-flight job back to the pending list.
///
/// Each job is moved with a single atomic store operation, so a crash in the
/// middle of recovery leaves every job in exactly one list. Retry bookkeeping
/// is not touched.
pub async fn recover_in_flight(
    store: &dyn QueueStore,
    config: &WorkerConfig,
) -> Result<RecoveryReport, WorkerError> {
    let mut report = RecoveryReport::default();

    while let Some(raw) = store
        .try_move(&config.in_flight_queue, &config.pending_queue)
        .await?
    {
        report.recovered += 1;
        debug!(
            queue = %config.in_flight_queue,
            payload_len = raw.len(),
            "Recovered in-flight job"
        );
    }

    if report.recovered > 0 {
        metrics::record_recovered(&config.pending_queue, report.recovered);
        info!(
            recovered = report.recovered,
            from = %config.in_flight_queue,
            to = %config.pending_queue,
            "Requeued jobs left in flight by a previous instance"
        );
    } else {
        debug!(queue = %config.in_flight_queue, "No in-flight jobs to recover");
    }

    Ok(report)
}
