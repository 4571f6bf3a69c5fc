//! Queue producer for job enqueuing
//!
//! Any service can push jobs onto a worker's pending list with it.
//!
//! # Example
//!
//! ```rust,ignore
//! use queue_worker::QueueProducer;
//!
//! let producer = QueueProducer::from_queue_def::<EmailQueues>(store);
//! producer.send(&job).await?;
//! ```

use crate::error::WorkerError;
use crate::registry::QueueDef;
use crate::store::QueueStore;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Pushes serialized jobs onto a pending list.
#[derive(Clone)]
pub struct QueueProducer {
    store: Arc<dyn QueueStore>,
    queue: String,
}

impl QueueProducer {
    /// Create a producer for a specific pending list.
    pub fn new(store: Arc<dyn QueueStore>, queue: impl Into<String>) -> Self {
        Self {
            store,
            queue: queue.into(),
        }
    }

    /// Create a producer from a `QueueDef` implementation.
    pub fn from_queue_def<Q: QueueDef>(store: Arc<dyn QueueStore>) -> Self {
        Self::new(store, Q::PENDING_QUEUE)
    }

    /// Get the pending list name.
    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// Enqueue a job.
    pub async fn send<J: Serialize>(&self, job: &J) -> Result<(), WorkerError> {
        let payload = serde_json::to_string(job)?;
        self.send_raw(&payload).await
    }

    /// Enqueue an already serialized payload as-is.
    pub async fn send_raw(&self, payload: &str) -> Result<(), WorkerError> {
        self.store.push(&self.queue, payload).await?;
        debug!(queue = %self.queue, payload_len = payload.len(), "Enqueued job");
        Ok(())
    }
}
