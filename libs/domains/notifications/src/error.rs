//! Error types for the notifications domain.

use queue_worker::WorkerError;
use thiserror::Error;

/// Result type for notification operations.
pub type NotificationResult<T> = Result<T, NotificationError>;

/// Errors that can occur while rendering or delivering an email.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// No template is registered under the requested name.
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    /// Template failed to render, e.g. an unresolved variable.
    #[error("Template rendering error: {0}")]
    Render(String),

    /// Mail transport rejected or failed to send the message.
    #[error("Mail transport error: {0}")]
    Transport(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Template directory could not be read.
    #[error("IO error: {0}")]
    Io(String),
}

impl From<handlebars::RenderError> for NotificationError {
    fn from(err: handlebars::RenderError) -> Self {
        NotificationError::Render(err.to_string())
    }
}

impl From<handlebars::TemplateError> for NotificationError {
    fn from(err: handlebars::TemplateError) -> Self {
        NotificationError::Render(err.to_string())
    }
}

impl From<std::io::Error> for NotificationError {
    fn from(err: std::io::Error) -> Self {
        NotificationError::Io(err.to_string())
    }
}

impl From<lettre::transport::smtp::Error> for NotificationError {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        NotificationError::Transport(err.to_string())
    }
}

impl From<core_config::ConfigError> for NotificationError {
    fn from(err: core_config::ConfigError) -> Self {
        NotificationError::Config(err.to_string())
    }
}

/// Every notification failure belongs to the job being processed.
impl From<NotificationError> for WorkerError {
    fn from(err: NotificationError) -> Self {
        WorkerError::Processing(err.to_string())
    }
}
