//! SMTP mail transport using lettre.
//!
//! Connects with STARTTLS and authenticates with the configured account. The
//! account address is also the envelope sender and the `From` address.

use super::{MailTransport, OutgoingEmail};
use crate::error::{NotificationError, NotificationResult};
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, SinglePart, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use std::fmt;
use tracing::{debug, error, info};

/// SMTP configuration.
#[derive(Clone)]
pub struct SmtpConfig {
    /// SMTP server host.
    pub host: String,
    /// SMTP server port (STARTTLS submission, usually 587).
    pub port: u16,
    /// Login name, also used as the sender address.
    pub username: String,
    /// Login password.
    pub password: String,
    /// Display name of the sender.
    pub sender_name: String,
}

impl SmtpConfig {
    /// Create a new SMTP configuration.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            password: password.into(),
            sender_name: "Emailer".to_string(),
        }
    }

    /// Builder method to set the sender display name.
    pub fn with_sender_name(mut self, name: impl Into<String>) -> Self {
        self.sender_name = name.into();
        self
    }

    /// `From` header value, e.g. `Emailer <noreply@example.com>`.
    pub fn from_header(&self) -> String {
        format!("{} <{}>", self.sender_name, self.username)
    }
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("sender_name", &self.sender_name)
            .finish()
    }
}

/// SMTP mail transport.
pub struct SmtpTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    config: SmtpConfig,
    from: Mailbox,
}

impl SmtpTransport {
    /// Create a new SMTP transport. No connection is made until the first send.
    pub fn new(config: SmtpConfig) -> NotificationResult<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| NotificationError::Config(format!("Failed to create SMTP relay: {}", e)))?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        let from = config.from_header().parse().map_err(|e| {
            NotificationError::Config(format!("Invalid sender address '{}': {}", config.username, e))
        })?;

        Ok(Self {
            transport,
            config,
            from,
        })
    }

    /// Build a lettre Message with a single HTML part.
    pub fn build_message(&self, email: &OutgoingEmail) -> NotificationResult<Message> {
        let to: Mailbox = email.to.parse().map_err(|e| {
            NotificationError::Transport(format!("Invalid recipient '{}': {}", email.to, e))
        })?;

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(&email.subject)
            .singlepart(
                SinglePart::builder()
                    .header(ContentType::TEXT_HTML)
                    .body(email.html.clone()),
            )
            .map_err(|e| NotificationError::Transport(format!("Failed to build message: {}", e)))
    }
}

#[async_trait]
impl MailTransport for SmtpTransport {
    async fn deliver(&self, email: &OutgoingEmail) -> NotificationResult<()> {
        debug!(
            to = %email.to,
            subject = %email.subject,
            host = %self.config.host,
            port = self.config.port,
            "Sending email via SMTP"
        );

        let message = self.build_message(email)?;

        let response = self.transport.send(message).await.map_err(|e| {
            error!(to = %email.to, error = %e, "Failed to send email via SMTP");
            NotificationError::Transport(format!("SMTP send failed: {}", e))
        })?;

        info!(
            to = %email.to,
            code = %response.code(),
            "Email accepted by SMTP server"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "smtp"
    }

    async fn health_check(&self) -> NotificationResult<bool> {
        Ok(self.transport.test_connection().await?)
    }
}
