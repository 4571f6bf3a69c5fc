//! Queue store abstraction.
//!
//! A queue store is a durable, process-external set of named ordered lists.
//! `push` inserts at the head of a list and consumers take from the tail, so
//! each list is FIFO. Every operation that moves an item between lists is a
//! single atomic step in the store: an item is never observable in neither or
//! both lists, which is what makes the worker crash safe.

mod memory;
mod redis_store;

pub use memory::InMemoryQueueStore;
pub use redis_store::{RedisQueueStore, RetryConfig};

use crate::config::WorkerConfig;
use crate::error::WorkerError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Durable ordered-list primitive shared by all workers.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Append an item at the head of `queue`.
    async fn push(&self, queue: &str, item: &str) -> Result<(), WorkerError>;

    /// Atomically move the tail of `source` to the head of `dest`, blocking
    /// until an item is available or `timeout` elapses (zero blocks forever).
    async fn blocking_move(
        &self,
        source: &str,
        dest: &str,
        timeout: Duration,
    ) -> Result<Option<String>, WorkerError>;

    /// Atomically move the tail of `source` to the head of `dest` without
    /// blocking. With `source == dest` this rotates the list.
    async fn try_move(&self, source: &str, dest: &str) -> Result<Option<String>, WorkerError>;

    /// Pop the tail of `queue` without blocking.
    async fn pop(&self, queue: &str) -> Result<Option<String>, WorkerError>;

    /// Remove one entry equal to `item`, returning how many were removed.
    async fn remove(&self, queue: &str, item: &str) -> Result<usize, WorkerError>;

    /// Atomically remove one `item` from `source` and, only if it was there,
    /// push `replacement` to `dest`. Returns whether the transfer happened.
    async fn transfer(
        &self,
        source: &str,
        item: &str,
        dest: &str,
        replacement: &str,
    ) -> Result<bool, WorkerError>;

    /// Current length of `queue`.
    async fn len(&self, queue: &str) -> Result<usize, WorkerError>;

    /// Check the store is reachable.
    async fn ping(&self) -> Result<(), WorkerError>;

    /// Get the store name for logging.
    fn name(&self) -> &'static str;
}

/// Length of each worker queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatus {
    pub pending: usize,
    pub in_flight: usize,
    pub error: usize,
}

/// Read the length of the pending, in-flight and error queues.
pub async fn queue_status(
    store: &dyn QueueStore,
    config: &WorkerConfig,
) -> Result<QueueStatus, WorkerError> {
    Ok(QueueStatus {
        pending: store.len(&config.pending_queue).await?,
        in_flight: store.len(&config.in_flight_queue).await?,
        error: store.len(&config.error_queue).await?,
    })
}
