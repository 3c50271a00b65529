// src/services/notifier.rs

//! Notification delivery.
//!
//! A failed send is an expected outcome and is reported through `Result`;
//! the caller decides what it means for cooldown state.

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::error::{AppError, Result};
use crate::models::EmailConfig;

const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Delivers a message to a recipient.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, subject: &str, body: &str, to: &str) -> Result<()>;
}

/// SMTP notifier using STARTTLS and username/password authentication.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpNotifier {
    /// Build a notifier from email settings.
    pub fn new(config: &EmailConfig) -> Result<Self> {
        let from = parse_mailbox(config.sender())?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .map_err(|e| AppError::config(format!("SMTP relay {}: {e}", config.smtp_host)))?
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .timeout(Some(SMTP_TIMEOUT))
            .build();

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, subject: &str, body: &str, to: &str) -> Result<()> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(parse_mailbox(to).map_err(AppError::notify)?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(AppError::notify)?;

        self.transport
            .send(message)
            .await
            .map_err(AppError::notify)?;

        log::debug!("Mail accepted for {}", to);
        Ok(())
    }
}

/// Dry-run notifier: logs the message instead of sending it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, subject: &str, body: &str, to: &str) -> Result<()> {
        log::info!("[dry-run] would send to {}: {}", to, subject);
        for line in body.lines() {
            log::info!("    {}", line);
        }
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox> {
    address
        .parse()
        .map_err(|e| AppError::config(format!("invalid email address {address:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mailbox() {
        assert!(parse_mailbox("alerts@example.com").is_ok());
        assert!(parse_mailbox("Job Watch <alerts@example.com>").is_ok());
        assert!(matches!(
            parse_mailbox("not an address"),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_smtp_notifier_rejects_bad_sender() {
        let config = EmailConfig {
            username: "nobody".to_string(),
            password: "secret".to_string(),
            to: "me@example.com".to_string(),
            ..EmailConfig::default()
        };
        assert!(SmtpNotifier::new(&config).is_err());
    }

    #[tokio::test]
    async fn test_log_notifier_always_succeeds() {
        assert!(LogNotifier.send("subject", "a\nb", "me@example.com").await.is_ok());
    }
}
