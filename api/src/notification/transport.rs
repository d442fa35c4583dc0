//! Outbound mail transports
//!
//! The dispatcher talks to a [`MailTransport`]. Production uses
//! [`SmtpMailer`], which keeps one STARTTLS relay connection pool per sender
//! identity. [`LogTransport`] backs the `MAIL_DRY_RUN` mode and only logs
//! what would have been sent. [`MemoryTransport`] records messages for tests.

use std::fmt;
use std::sync::Mutex;

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;

use crate::config::{MailConfig, SmtpCredentials};

/// Which configured identity a message is sent as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SenderRole {
    /// Relay account that notifies the site owner
    Admin,
    /// No-reply account that confirms receipt to the submitter
    NoReply,
}

impl SenderRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            SenderRole::Admin => "admin",
            SenderRole::NoReply => "no-reply",
        }
    }
}

impl fmt::Display for SenderRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailBody {
    Text(String),
    /// `multipart/alternative` with a plain-text fallback and an HTML part
    Alternative { text: String, html: String },
}

/// Everything needed to build and route one outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailEnvelope {
    pub role: SenderRole,
    pub from: Mailbox,
    pub to: Mailbox,
    pub subject: String,
    pub body: MailBody,
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("SMTP delivery of {role} message failed")]
    Smtp {
        role: SenderRole,
        #[source]
        source: lettre::transport::smtp::Error,
    },
    #[error("transport rejected {role} message: {reason}")]
    Rejected { role: SenderRole, reason: String },
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Deliver a built message as the identity named by `envelope.role`.
    async fn send(&self, envelope: &MailEnvelope, message: Message) -> Result<(), DeliveryError>;
}

/// SMTP relay transport with one authenticated connection pool per identity.
pub struct SmtpMailer {
    admin: AsyncSmtpTransport<Tokio1Executor>,
    no_reply: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn from_config(config: &MailConfig) -> Result<Self, lettre::transport::smtp::Error> {
        Ok(Self {
            admin: relay(config, &config.admin_credentials)?,
            no_reply: relay(config, &config.no_reply_credentials)?,
        })
    }

    fn transport_for(&self, role: SenderRole) -> &AsyncSmtpTransport<Tokio1Executor> {
        match role {
            SenderRole::Admin => &self.admin,
            SenderRole::NoReply => &self.no_reply,
        }
    }
}

fn relay(
    config: &MailConfig,
    credentials: &SmtpCredentials,
) -> Result<AsyncSmtpTransport<Tokio1Executor>, lettre::transport::smtp::Error> {
    Ok(AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
        .port(config.smtp_port)
        .credentials(Credentials::new(
            credentials.username.clone(),
            credentials.password.clone(),
        ))
        .timeout(Some(config.timeout))
        .build())
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, envelope: &MailEnvelope, message: Message) -> Result<(), DeliveryError> {
        self.transport_for(envelope.role)
            .send(message)
            .await
            .map(|_| ())
            .map_err(|source| DeliveryError::Smtp {
                role: envelope.role,
                source,
            })
    }
}

/// Dry-run transport: logs each message and keeps nothing.
#[derive(Debug, Default)]
pub struct LogTransport;

#[async_trait]
impl MailTransport for LogTransport {
    async fn send(&self, envelope: &MailEnvelope, message: Message) -> Result<(), DeliveryError> {
        tracing::info!(
            role = %envelope.role,
            to = %envelope.to.email,
            subject = %envelope.subject,
            bytes = message.formatted().len(),
            "Skipped outbound message (dry run)"
        );
        Ok(())
    }
}

/// A message accepted by [`MemoryTransport`]
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub envelope: MailEnvelope,
    /// RFC 5322 rendering of the message
    pub raw: String,
}

/// In-memory transport. Records every message it accepts, or rejects all of
/// them when built with [`MemoryTransport::rejecting`].
#[derive(Debug, Default)]
pub struct MemoryTransport {
    outbox: Mutex<Vec<SentMessage>>,
    reject_reason: Option<String>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting(reason: impl Into<String>) -> Self {
        Self {
            outbox: Mutex::new(Vec::new()),
            reject_reason: Some(reason.into()),
        }
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.outbox.lock().expect("mail outbox mutex poisoned").clone()
    }
}

#[async_trait]
impl MailTransport for MemoryTransport {
    async fn send(&self, envelope: &MailEnvelope, message: Message) -> Result<(), DeliveryError> {
        if let Some(reason) = &self.reject_reason {
            return Err(DeliveryError::Rejected {
                role: envelope.role,
                reason: reason.clone(),
            });
        }

        tracing::debug!(role = %envelope.role, to = %envelope.to.email, "Recorded outbound message");

        let raw = String::from_utf8_lossy(&message.formatted()).into_owned();
        self.outbox
            .lock()
            .expect("mail outbox mutex poisoned")
            .push(SentMessage {
                envelope: envelope.clone(),
                raw,
            });
        Ok(())
    }
}
