//! Mailer configuration loaded from the environment.

use crate::error::NotificationResult;
use crate::templates::HandlebarsRenderer;
use crate::transport::{ConsoleTransport, MailTransport, SmtpConfig, SmtpTransport};
use core_config::{ConfigError, FromEnv, env_optional, env_or_default, env_parse, env_required};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

const DEFAULT_SENDER_NAME: &str = "Emailer";
const DEFAULT_TEMPLATE_DIR: &str = "./templates";
const CONSOLE_SENDER: &str = "noreply@localhost";

/// Mail settings.
///
/// | Variable       | Default       |
/// |----------------|---------------|
/// | `SMTP_HOST`    | unset: console transport |
/// | `SMTP_PORT`    | `587`         |
/// | `SMTP_USER`    | required with `SMTP_HOST`; also the console sender |
/// | `SMTP_PASS`    | required with `SMTP_HOST` |
/// | `TITLE`        | `Emailer`     |
/// | `TEMPLATE_DIR` | `./templates` |
#[derive(Clone, Debug)]
pub struct MailerConfig {
    /// SMTP settings; `None` selects the console transport
    pub smtp: Option<SmtpConfig>,
    pub sender_name: String,
    /// `SMTP_USER`, or a placeholder when unset
    pub sender_address: String,
    pub template_dir: PathBuf,
}

impl Default for MailerConfig {
    fn default() -> Self {
        Self {
            smtp: None,
            sender_name: DEFAULT_SENDER_NAME.to_string(),
            sender_address: CONSOLE_SENDER.to_string(),
            template_dir: PathBuf::from(DEFAULT_TEMPLATE_DIR),
        }
    }
}

impl FromEnv for MailerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let sender_name = env_or_default("TITLE", DEFAULT_SENDER_NAME);
        let template_dir = PathBuf::from(env_or_default("TEMPLATE_DIR", DEFAULT_TEMPLATE_DIR));
        let sender_address = env_optional("SMTP_USER").unwrap_or_else(|| CONSOLE_SENDER.to_string());

        let smtp = match env_optional("SMTP_HOST") {
            Some(host) => Some(
                SmtpConfig::new(
                    host,
                    env_parse("SMTP_PORT", 587u16)?,
                    env_required("SMTP_USER")?,
                    env_required("SMTP_PASS")?,
                )
                .with_sender_name(sender_name.clone()),
            ),
            None => None,
        };

        Ok(Self {
            smtp,
            sender_name,
            sender_address,
            template_dir,
        })
    }
}

impl MailerConfig {
    /// Build the configured transport.
    pub fn build_transport(&self) -> NotificationResult<Arc<dyn MailTransport>> {
        match &self.smtp {
            Some(smtp) => {
                info!(host = %smtp.host, port = smtp.port, "Using SMTP mail transport");
                Ok(Arc::new(SmtpTransport::new(smtp.clone())?))
            }
            None => {
                warn!("SMTP_HOST not set, emails will be logged instead of sent");
                Ok(Arc::new(ConsoleTransport::new(format!(
                    "{} <{}>",
                    self.sender_name, self.sender_address
                ))))
            }
        }
    }

    /// Load the templates from `template_dir`.
    pub fn build_renderer(&self) -> NotificationResult<HandlebarsRenderer> {
        HandlebarsRenderer::from_directory(&self.template_dir)
    }
}
