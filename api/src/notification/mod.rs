//! Contact notifications: template rendering, dispatch and mail transports.

pub mod dispatcher;
pub mod template;
pub mod transport;

pub use dispatcher::{DispatchError, Dispatcher, Identities};
pub use template::{TemplateRenderError, TemplateRenderer, TemplateSource};
pub use transport::{
    DeliveryError, LogTransport, MailBody, MailEnvelope, MailTransport, MemoryTransport, SenderRole,
    SentMessage, SmtpMailer,
};
