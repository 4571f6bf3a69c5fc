//! Queue Worker Framework
//!
//! A generic reliable-list worker for processing background jobs with
//! at-least-once delivery.
//!
//! ## Features
//!
//! - **Three lists per worker**: pending, in-flight and error
//! - **Atomic hand-off**: every transition is a single store operation
//! - **Crash recovery**: jobs left in flight are requeued on startup
//! - **Bounded retry**: failed jobs are retried up to `max_retries`, then parked
//! - **Prometheus metrics**: Built-in observability
//! - **Health endpoints**: K8s-ready liveness and readiness probes
//!
//! ## Example
//!
//! ```ignore
//! use queue_worker::{QueueDef, QueueJob, JobProcessor, QueueWorker, RedisQueueStore, WorkerConfig};
//!
//! struct MyQueues;
//! impl QueueDef for MyQueues {
//!     const PENDING_QUEUE: &'static str = "my:send";
//!     const IN_FLIGHT_QUEUE: &'static str = "my:processing";
//!     const ERROR_QUEUE: &'static str = "my:error";
//! }
//!
//! let store = Arc::new(RedisQueueStore::connect(&redis_url).await?);
//! let config = WorkerConfig::from_queue_def::<MyQueues>();
//! let worker = QueueWorker::new(store, processor, config);
//! worker.run(shutdown_rx).await?;
//! ```

mod config;
mod envelope;
mod error;
mod health;
pub mod metrics;
mod producer;
mod recovery;
mod registry;
mod retry;
mod store;
mod worker;

// Re-export main types
pub use config::WorkerConfig;
pub use envelope::ErrorEnvelope;
pub use error::{ErrorScope, WorkerError};
pub use health::{HealthState, health_router};
pub use metrics::{JobOutcome, init_metrics};
pub use producer::QueueProducer;
pub use recovery::{RecoveryReport, recover_in_flight};
pub use registry::{JobProcessor, QueueDef, QueueJob, parse_job};
pub use retry::{RetryReport, retry_failed};
pub use store::{
    InMemoryQueueStore, QueueStatus, QueueStore, RedisQueueStore, RetryConfig, queue_status,
};
pub use worker::QueueWorker;
