//! Notifications Domain
//!
//! Email delivery on top of the `queue-worker` protocol:
//!
//! - **Models**: `EmailJob`, the payload producers push onto `email:send`
//! - **Templates**: Handlebars rendering from a template directory
//! - **Transports**: SMTP via lettre, or a console transport for local runs
//! - **Processor**: `EmailProcessor`, the `JobProcessor` the worker drives
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_notifications::{EmailProcessor, EmailQueues, MailerConfig};
//! use queue_worker::{QueueWorker, WorkerConfig};
//!
//! let mailer = MailerConfig::from_env()?;
//! let processor = EmailProcessor::new(Arc::new(mailer.build_renderer()?), mailer.build_transport()?);
//! let worker = QueueWorker::new(store, processor, WorkerConfig::from_queue_def::<EmailQueues>());
//! worker.run(shutdown_rx).await?;
//! ```

pub mod config;
pub mod error;
pub mod models;
pub mod processor;
pub mod queues;
pub mod templates;
pub mod transport;

pub use config::MailerConfig;
pub use error::{NotificationError, NotificationResult};
pub use models::EmailJob;
pub use processor::EmailProcessor;
pub use queues::EmailQueues;
pub use templates::{DEFAULT_NOW_FORMAT, HandlebarsRenderer, TemplateRenderer};
pub use transport::{
    ConsoleTransport, MailTransport, OutgoingEmail, SentMessage, SmtpConfig, SmtpTransport,
};
