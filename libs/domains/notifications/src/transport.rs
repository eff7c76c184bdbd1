//! Mail transports.
//!
//! [`SmtpMailTransport`] delivers through an SMTP relay using lettre.
//! [`RecordingMailTransport`] keeps messages in memory and can be told to fail,
//! which is what local runs and tests use.

use async_trait::async_trait;
use core_config::{ConfigError, FromEnv, env_or_default, env_parse, env_required};
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::composer::MailMessage;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Invalid mail address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Failed to build mail message: {0}")]
    Message(String),

    #[error("Mail transport failed: {0}")]
    Transport(String),
}

/// Delivers a composed [`MailMessage`]
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Transport name used in logs
    fn name(&self) -> &'static str;

    async fn send(&self, message: &MailMessage) -> Result<(), MailError>;
}

/// SMTP relay settings. `username` doubles as the From address.
#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub starttls: bool,
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"***")
            .field("starttls", &self.starttls)
            .finish()
    }
}

impl FromEnv for SmtpConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env_or_default("MAIL_HOST", "smtp.gmail.com"),
            port: env_parse("MAIL_PORT", 587)?,
            username: env_required("MAIL_USERNAME")?,
            password: env_required("MAIL_PASSWORD")?,
            starttls: env_parse("MAIL_STARTTLS", true)?,
        })
    }
}

pub struct SmtpMailTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    host: String,
}

impl SmtpMailTransport {
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        let credentials = Credentials::new(config.username.clone(), config.password.clone());

        let transport = if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(|e| MailError::Transport(format!("Failed to create SMTP relay: {}", e)))?
                .port(config.port)
                .credentials(credentials)
                .build()
        } else {
            // plain connection, for local relays such as Mailpit
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
                .port(config.port)
                .credentials(credentials)
                .build()
        };

        info!(host = %config.host, port = config.port, starttls = config.starttls, "SMTP transport configured");

        Ok(Self {
            transport,
            host: config.host.clone(),
        })
    }

    fn build_message(message: &MailMessage) -> Result<Message, MailError> {
        Message::builder()
            .from(mailbox(&message.from)?)
            .to(mailbox(&message.to)?)
            .subject(&message.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(message.body.clone())
            .map_err(|e| MailError::Message(e.to_string()))
    }
}

fn mailbox(address: &str) -> Result<Mailbox, MailError> {
    address.parse().map_err(|e: lettre::address::AddressError| MailError::InvalidAddress {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    fn name(&self) -> &'static str {
        "smtp"
    }

    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        debug!(to = %message.to, subject = %message.subject, host = %self.host, "Sending email via SMTP");

        let email = Self::build_message(message)?;
        self.transport.send(email).await.map_err(|e| {
            error!(to = %message.to, error = %e, "SMTP send failed");
            MailError::Transport(e.to_string())
        })?;

        Ok(())
    }
}

/// In-memory transport that records every message it accepts
#[derive(Debug, Default, Clone)]
pub struct RecordingMailTransport {
    sent: Arc<Mutex<Vec<MailMessage>>>,
    attempts: Arc<AtomicUsize>,
    failing: Arc<AtomicBool>,
}

impl RecordingMailTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport whose every send fails with [`MailError::Transport`].
    pub fn failing() -> Self {
        let transport = Self::default();
        transport.set_failing(true);
        transport
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Send calls seen so far, failed ones included
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub async fn sent(&self) -> Vec<MailMessage> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl MailTransport for RecordingMailTransport {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(MailError::Transport("mail server unavailable".to_string()));
        }
        debug!(to = %message.to, subject = %message.subject, "Recorded email");
        self.sent.lock().await.push(message.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAIL_VARS: [&str; 5] = [
        "MAIL_HOST",
        "MAIL_PORT",
        "MAIL_USERNAME",
        "MAIL_PASSWORD",
        "MAIL_STARTTLS",
    ];

    fn message(to: &str) -> MailMessage {
        MailMessage {
            from: "noreply@example.com".into(),
            to: to.into(),
            subject: "User created".into(),
            body: "User with email a@b.com created.".into(),
        }
    }

    #[test]
    fn test_smtp_config_defaults() {
        temp_env::with_vars_unset(MAIL_VARS, || {
            temp_env::with_vars(
                [
                    ("MAIL_USERNAME", Some("noreply@example.com")),
                    ("MAIL_PASSWORD", Some("secret")),
                ],
                || {
                    let config = SmtpConfig::from_env().unwrap();
                    assert_eq!(config.host, "smtp.gmail.com");
                    assert_eq!(config.port, 587);
                    assert!(config.starttls);
                    assert!(!format!("{:?}", config).contains("secret"));
                },
            );
        });
    }

    #[test]
    fn test_smtp_config_requires_credentials() {
        temp_env::with_vars_unset(MAIL_VARS, || {
            assert!(matches!(
                SmtpConfig::from_env(),
                Err(ConfigError::MissingEnvVar(key)) if key == "MAIL_USERNAME"
            ));
        });
    }

    #[test]
    fn test_build_message_rejects_bad_recipient() {
        let err = SmtpMailTransport::build_message(&message("not an address")).unwrap_err();
        assert!(matches!(err, MailError::InvalidAddress { .. }));
    }

    #[test]
    fn test_build_message_plain_text() {
        let email = SmtpMailTransport::build_message(&message("a@b.com")).unwrap();
        let raw = String::from_utf8(email.formatted()).unwrap();
        assert!(raw.contains("Subject: User created"));
        assert!(raw.contains("text/plain"));
    }

    #[tokio::test]
    async fn test_recording_transport_records_and_fails_on_demand() {
        let transport = RecordingMailTransport::new();
        transport.send(&message("a@b.com")).await.unwrap();

        transport.set_failing(true);
        assert!(transport.send(&message("c@d.com")).await.is_err());

        assert_eq!(transport.attempts(), 2);
        assert_eq!(transport.sent().await, vec![message("a@b.com")]);
    }
}
