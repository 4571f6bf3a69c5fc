//! Console mail transport for local runs and tests.
//!
//! Does no network I/O: every message is logged and kept in memory.

use super::{MailTransport, OutgoingEmail};
use crate::error::{NotificationError, NotificationResult};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// A message recorded by the console transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Logs messages instead of sending them.
#[derive(Clone)]
pub struct ConsoleTransport {
    from: String,
    sent: Arc<Mutex<Vec<SentMessage>>>,
    failure: Option<String>,
}

impl ConsoleTransport {
    /// Create a console transport that reports `from` as the sender.
    pub fn new(from: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            sent: Arc::new(Mutex::new(Vec::new())),
            failure: None,
        }
    }

    /// Create a console transport that rejects every message.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// Get all recorded messages
    pub async fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().await.clone()
    }

    /// Get the count of recorded messages
    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    /// Check if a message was sent to a specific address
    pub async fn was_sent_to(&self, to: &str) -> bool {
        self.sent.lock().await.iter().any(|m| m.to == to)
    }

    /// Clear all recorded messages
    pub async fn clear(&self) {
        self.sent.lock().await.clear();
    }
}

impl Default for ConsoleTransport {
    fn default() -> Self {
        Self::new("Emailer <noreply@localhost>")
    }
}

#[async_trait]
impl MailTransport for ConsoleTransport {
    async fn deliver(&self, email: &OutgoingEmail) -> NotificationResult<()> {
        if let Some(message) = &self.failure {
            return Err(NotificationError::Transport(message.clone()));
        }

        info!(
            to = %email.to,
            subject = %email.subject,
            from = %self.from,
            "[DEV EMAIL] To: {}\nSubject: {}\nFrom: {}\n\n{}",
            email.to,
            email.subject,
            self.from,
            email.html
        );

        self.sent.lock().await.push(SentMessage {
            from: self.from.clone(),
            to: email.to.clone(),
            subject: email.subject.clone(),
            html: email.html.clone(),
        });
        Ok(())
    }

    fn name(&self) -> &'static str {
        "console"
    }
}
