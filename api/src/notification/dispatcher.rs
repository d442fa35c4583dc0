use std::sync::Arc;

use lettre::address::AddressError;
use lettre::message::header::ContentType;
use lettre::message::{Mailbox, MultiPart};
use lettre::Message;
use thiserror::Error;

use super::template::{TemplateRenderError, TemplateRenderer};
use super::transport::{DeliveryError, MailBody, MailEnvelope, MailTransport, SenderRole};
use crate::config::MailConfig;
use crate::metrics;
use crate::models::Submission;

const CONFIRMATION_FALLBACK_TEXT: &str = "Thanks for your message!";

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("failed to render confirmation email")]
    Template(#[from] TemplateRenderError),
    #[error("invalid {field} address '{value}'")]
    Address {
        field: &'static str,
        value: String,
        #[source]
        source: AddressError,
    },
    #[error("failed to build {role} message")]
    Build {
        role: SenderRole,
        #[source]
        source: lettre::error::Error,
    },
    #[error("failed to deliver notification")]
    Delivery(#[from] DeliveryError),
}

/// Sender and recipient identities resolved once at startup
#[derive(Debug, Clone)]
pub struct Identities {
    pub admin_sender: Mailbox,
    pub admin_recipient: Mailbox,
    pub no_reply_sender: Mailbox,
    pub sender_name: String,
}

impl Identities {
    pub fn from_config(config: &MailConfig) -> Result<Self, DispatchError> {
        let sender_name = config.sender_name.clone();
        Ok(Self {
            admin_sender: Mailbox::new(
                Some(sender_name.clone()),
                parse_address("admin sender", &config.admin_sender_email)?,
            ),
            admin_recipient: Mailbox::new(None, parse_address("admin", &config.admin_email)?),
            no_reply_sender: Mailbox::new(
                Some(sender_name.clone()),
                parse_address("no-reply", &config.no_reply_email)?,
            ),
            sender_name,
        })
    }
}

fn parse_address(field: &'static str, value: &str) -> Result<lettre::Address, DispatchError> {
    value.parse().map_err(|source| DispatchError::Address {
        field,
        value: value.to_string(),
        source,
    })
}

/// Sends the admin notification and the submitter confirmation.
pub struct Dispatcher {
    transport: Arc<dyn MailTransport>,
    renderer: TemplateRenderer,
    identities: Identities,
}

impl Dispatcher {
    pub fn new(
        transport: Arc<dyn MailTransport>,
        renderer: TemplateRenderer,
        identities: Identities,
    ) -> Self {
        Self {
            transport,
            renderer,
            identities,
        }
    }

    /// Notify the admin, then confirm to the submitter.
    ///
    /// The submitter address is resolved first so an unusable address fails
    /// before anything is sent. The two sends are not atomic: if the
    /// confirmation fails the admin notification has already gone out.
    pub async fn dispatch(&self, submission: &Submission) -> Result<(), DispatchError> {
        let recipient = self.submitter_mailbox(submission)?;
        self.notify_admin(submission).await?;
        self.confirm(submission, recipient).await
    }

    pub async fn notify_admin(&self, submission: &Submission) -> Result<(), DispatchError> {
        let envelope = self.admin_envelope(submission);
        let result = self.send_message(&envelope).await;
        metrics::record_email("admin", result.is_ok());
        result
    }

    pub async fn notify_user(&self, submission: &Submission) -> Result<(), DispatchError> {
        let recipient = self.submitter_mailbox(submission)?;
        self.confirm(submission, recipient).await
    }

    async fn confirm(&self, submission: &Submission, to: Mailbox) -> Result<(), DispatchError> {
        let result = match self.user_envelope(submission, to) {
            Ok(envelope) => self.send_message(&envelope).await,
            Err(err) => Err(err),
        };
        metrics::record_email("user", result.is_ok());
        result
    }

    fn submitter_mailbox(&self, submission: &Submission) -> Result<Mailbox, DispatchError> {
        parse_address("submitter", &submission.email)
            .map(|address| Mailbox::new(None, address))
            .map_err(|err| {
                metrics::record_email("user", false);
                err
            })
    }

    fn admin_envelope(&self, submission: &Submission) -> MailEnvelope {
        let body = format!(
            "You received a new message from the website contact form:\n\n\
             Name: {}\nEmail: {}\nCompany: {}\nMessage:\n{}\n",
            submission.name, submission.email, submission.company, submission.message
        );

        MailEnvelope {
            role: SenderRole::Admin,
            from: self.identities.admin_sender.clone(),
            to: self.identities.admin_recipient.clone(),
            subject: format!("[Contact Form] New message from {}", submission.name),
            body: MailBody::Text(body),
        }
    }

    fn user_envelope(&self, submission: &Submission, to: Mailbox) -> Result<MailEnvelope, DispatchError> {
        let html = self.renderer.render(submission)?;

        Ok(MailEnvelope {
            role: SenderRole::NoReply,
            from: self.identities.no_reply_sender.clone(),
            to,
            subject: format!("Thanks for contacting {}", self.identities.sender_name),
            body: MailBody::Alternative {
                text: CONFIRMATION_FALLBACK_TEXT.to_string(),
                html,
            },
        })
    }

    /// Build one message from an envelope and hand it to the transport.
    pub async fn send_message(&self, envelope: &MailEnvelope) -> Result<(), DispatchError> {
        let builder = Message::builder()
            .from(envelope.from.clone())
            .to(envelope.to.clone())
            .subject(envelope.subject.clone());

        let message = match &envelope.body {
            MailBody::Text(text) => builder.header(ContentType::TEXT_PLAIN).body(text.clone()),
            MailBody::Alternative { text, html } => {
                builder.multipart(MultiPart::alternative_plain_html(text.clone(), html.clone()))
            }
        }
        .map_err(|source| DispatchError::Build {
            role: envelope.role,
            source,
        })?;

        self.transport.send(envelope, message).await?;

        tracing::info!(
            role = %envelope.role,
            to = %envelope.to.email,
            "Notification sent"
        );
        Ok(())
    }
}
