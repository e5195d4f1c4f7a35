//! Outgoing email.
//!
//! With SMTP configured, mail goes out through lettre's async transport.
//! Without it, messages are written to the log so local development works.

use std::sync::Arc;

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::config::{Config, SmtpSettings, OTP_TTL_SECONDS};
use crate::errors::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// A plain-text email ready to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl OutgoingEmail {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// Verification code sent after signup
    pub fn signup_code(to: &str, code: &str) -> Self {
        Self::new(
            to,
            "Verify your EventEase account",
            format!(
                "Your EventEase verification code is {}.\n\nIt expires in {} minutes.",
                code,
                OTP_TTL_SECONDS / 60
            ),
        )
    }

    /// Code sent for a password reset
    pub fn reset_code(to: &str, code: &str) -> Self {
        Self::new(
            to,
            "Reset your EventEase password",
            format!(
                "Use the code {} to reset your EventEase password.\n\n\
                 It expires in {} minutes. If you did not ask for a reset, ignore this email.",
                code,
                OTP_TTL_SECONDS / 60
            ),
        )
    }
}

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> AppResult<()>;
}

/// SMTP delivery via lettre
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(settings: &SmtpSettings) -> AppResult<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
            .map_err(|e| AppError::internal(format!("SMTP relay error: {}", e)))?
            .port(settings.port);

        if let (Some(user), Some(pass)) = (&settings.username, &settings.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        let from = settings
            .from
            .parse::<Mailbox>()
            .map_err(|e| AppError::internal(format!("Invalid SMTP_FROM: {}", e)))?;

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: OutgoingEmail) -> AppResult<()> {
        let to = email
            .to
            .parse::<Mailbox>()
            .map_err(|e| AppError::internal(format!("Invalid recipient: {}", e)))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(&email.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(email.body)
            .map_err(|e| AppError::internal(format!("Email build error: {}", e)))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::internal(format!("SMTP send error: {}", e)))?;

        tracing::info!(to = %email.to, subject = %email.subject, "Email sent");
        Ok(())
    }
}

/// Development mailer: logs instead of sending
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutgoingEmail) -> AppResult<()> {
        tracing::warn!("SMTP not configured - logging email instead of sending");
        tracing::info!(
            "=== EMAIL (not sent) ===\n\
             To: {}\n\
             Subject: {}\n\
             Body:\n{}\n\
             ========================",
            email.to,
            email.subject,
            email.body
        );
        Ok(())
    }
}

/// Pick the SMTP mailer when configured, the log mailer otherwise.
pub fn mailer_from_config(config: &Config) -> AppResult<Arc<dyn Mailer>> {
    match &config.smtp {
        Some(settings) => Ok(Arc::new(SmtpMailer::new(settings)?)),
        None => Ok(Arc::new(LogMailer)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signup_code_email_contains_code() {
        let email = OutgoingEmail::signup_code("a@b.io", "123456");
        assert_eq!(email.to, "a@b.io");
        assert!(email.body.contains("123456"));
        assert!(email.body.contains("10 minutes"));
    }

    #[test]
    fn test_reset_code_email_subject() {
        let email = OutgoingEmail::reset_code("a@b.io", "654321");
        assert!(email.subject.contains("Reset"));
        assert!(email.body.contains("654321"));
    }

    #[tokio::test]
    async fn test_log_mailer_never_fails() {
        let result = LogMailer
            .send(OutgoingEmail::new("a@b.io", "Hi", "Body"))
            .await;
        assert!(result.is_ok());
    }
}
