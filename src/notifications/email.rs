//! Outgoing email.
//!
//! Handlers talk to a [`Mailer`]; production uses [`SmtpMailer`], tests use
//! [`MemoryMailer`] to inspect what would have been sent.

use anyhow::Result;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use parking_lot::Mutex;

use crate::config::EmailConfig;

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send a plain text email
    async fn send(&self, to_email: &str, subject: &str, body: &str) -> Result<()>;
}

/// Delivers mail through the configured SMTP relay
pub struct SmtpMailer {
    config: EmailConfig,
}

impl SmtpMailer {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    /// Check if email sending is configured and enabled
    pub fn is_enabled(&self) -> bool {
        self.config.is_configured()
    }

    fn build_message(&self, to_email: &str, subject: &str, body: &str) -> Result<Message> {
        let from_mailbox = format!("{} <{}>", self.config.from_name, self.config.from_address);
        let from: Mailbox = from_mailbox.parse()?;
        let to: Mailbox = to_email.parse()?;

        let email = Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())?;
        Ok(email)
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to_email: &str, subject: &str, body: &str) -> Result<()> {
        let Some(smtp_host) = self.config.smtp_host.as_deref().filter(|_| self.is_enabled())
        else {
            tracing::warn!(
                to = %to_email,
                subject = %subject,
                "Email not configured, skipping"
            );
            return Ok(());
        };

        let email = self.build_message(to_email, subject, body)?;

        let mailer = if self.config.smtp_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(smtp_host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(smtp_host)
        }
        .port(self.config.smtp_port);

        let mailer = if let (Some(username), Some(password)) =
            (&self.config.smtp_username, &self.config.smtp_password)
        {
            mailer.credentials(Credentials::new(username.clone(), password.clone()))
        } else {
            mailer
        };

        mailer.build().send(email).await?;

        tracing::info!(
            to = %to_email,
            subject = %subject,
            "Email sent successfully"
        );

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Keeps sent mail in memory instead of delivering it
#[derive(Debug, Default)]
pub struct MemoryMailer {
    outbox: Mutex<Vec<SentEmail>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn outbox(&self) -> Vec<SentEmail> {
        self.outbox.lock().clone()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, to_email: &str, subject: &str, body: &str) -> Result<()> {
        self.outbox.lock().push(SentEmail {
            to: to_email.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}
