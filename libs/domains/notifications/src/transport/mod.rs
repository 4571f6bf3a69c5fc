//! Mail transport implementations.
//!
//! This module contains the `MailTransport` trait and its implementations:
//! SMTP for real delivery and a console transport for local runs.

mod console;
mod smtp;

pub use console::{ConsoleTransport, SentMessage};
pub use smtp::{SmtpConfig, SmtpTransport};

use crate::error::NotificationResult;
use async_trait::async_trait;

/// Rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// HTML body.
    pub html: String,
}

impl OutgoingEmail {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            html: html.into(),
        }
    }
}

/// Trait for outbound mail transports.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Deliver a message. An `Ok` means the transport accepted it.
    async fn deliver(&self, email: &OutgoingEmail) -> NotificationResult<()>;

    /// Get the transport name for logging.
    fn name(&self) -> &'static str;

    /// Check if the transport can reach its server.
    async fn health_check(&self) -> NotificationResult<bool> {
        Ok(true)
    }
}
