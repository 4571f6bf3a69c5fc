//! Email job processor.

use crate::models::EmailJob;
use crate::templates::TemplateRenderer;
use crate::transport::{MailTransport, OutgoingEmail};
use async_trait::async_trait;
use queue_worker::{JobProcessor, WorkerError};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Renders the job's template and hands the result to a mail transport.
pub struct EmailProcessor {
    renderer: Arc<dyn TemplateRenderer>,
    transport: Arc<dyn MailTransport>,
}

impl EmailProcessor {
    pub fn new(renderer: Arc<dyn TemplateRenderer>, transport: Arc<dyn MailTransport>) -> Self {
        Self {
            renderer,
            transport,
        }
    }

    /// Render a job into the message that would be delivered.
    pub fn prepare(&self, job: &EmailJob) -> Result<OutgoingEmail, WorkerError> {
        let html = self.renderer.render(&job.template, &job.variables)?;
        Ok(OutgoingEmail::new(&job.to, &job.subject, html))
    }
}

#[async_trait]
impl JobProcessor<EmailJob> for EmailProcessor {
    #[instrument(skip(self, job), fields(to = %job.to, template = %job.template))]
    async fn process(&self, job: &EmailJob) -> Result<(), WorkerError> {
        let email = self.prepare(job)?;
        debug!(bytes = email.html.len(), "Rendered email body");

        self.transport.deliver(&email).await?;

        info!(
            subject = %job.subject,
            transport = self.transport.name(),
            retry_count = job.retry_count,
            "Email sent"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "email"
    }

    async fn health_check(&self) -> Result<bool, WorkerError> {
        Ok(self.transport.health_check().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NotificationError;
    use crate::templates::MockTemplateRenderer;
    use crate::transport::MockMailTransport;
    use queue_worker::ErrorScope;

    fn job() -> EmailJob {
        EmailJob::new("a@x.com", "Hi", "welcome").with_variable("name", "Ana")
    }

    #[tokio::test]
    async fn test_renders_then_delivers() {
        let mut renderer = MockTemplateRenderer::new();
        renderer
            .expect_render()
            .withf(|template, vars| template == "welcome" && vars["name"] == "Ana")
            .times(1)
            .returning(|_, _| Ok("<p>Hello Ana</p>".to_string()));

        let mut transport = MockMailTransport::new();
        transport
            .expect_deliver()
            .withf(|email| {
                email.to == "a@x.com" && email.subject == "Hi" && email.html == "<p>Hello Ana</p>"
            })
            .times(1)
            .returning(|_| Ok(()));
        transport.expect_name().return_const("mock");

        let processor = EmailProcessor::new(Arc::new(renderer), Arc::new(transport));
        processor.process(&job()).await.unwrap();
    }

    #[tokio::test]
    async fn test_render_failure_skips_delivery() {
        let mut renderer = MockTemplateRenderer::new();
        renderer
            .expect_render()
            .returning(|name, _| Err(NotificationError::TemplateNotFound(name.to_string())));

        let mut transport = MockMailTransport::new();
        transport.expect_deliver().never();

        let processor = EmailProcessor::new(Arc::new(renderer), Arc::new(transport));
        let err = processor.process(&job()).await.unwrap_err();

        assert_eq!(err.scope(), ErrorScope::Job);
        assert_eq!(err.to_string(), "Template not found: welcome");
    }

    #[tokio::test]
    async fn test_transport_failure_is_job_scoped() {
        let mut renderer = MockTemplateRenderer::new();
        renderer
            .expect_render()
            .returning(|_, _| Ok("body".to_string()));

        let mut transport = MockMailTransport::new();
        transport
            .expect_deliver()
            .returning(|_| Err(NotificationError::Transport("connection refused".into())));

        let processor = EmailProcessor::new(Arc::new(renderer), Arc::new(transport));
        let err = processor.process(&job()).await.unwrap_err();

        assert!(err.is_job_scoped());
        assert!(err.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_health_check_asks_transport() {
        let mut transport = MockMailTransport::new();
        transport.expect_health_check().returning(|| Ok(false));

        let processor =
            EmailProcessor::new(Arc::new(MockTemplateRenderer::new()), Arc::new(transport));
        assert!(!processor.health_check().await.unwrap());
    }
}
