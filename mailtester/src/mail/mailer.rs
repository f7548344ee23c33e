use std::fmt;

use async_trait::async_trait;
use lettre::message::{Mailbox, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::{MailError, OutgoingEmail};

/// SMTP parameters after merging inline values with environment defaults.
#[derive(Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub from: String,
    /// Implicit TLS when true, opportunistic STARTTLS otherwise.
    pub secure: bool,
}

impl fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("pass", &"<redacted>")
            .field("from", &self.from)
            .field("secure", &self.secure)
            .finish()
    }
}

/// Builds a transport for one request.
///
/// Implement this trait to plug in another delivery backend.
pub trait Connector: Send + Sync + 'static {
    fn build(&self, settings: &SmtpSettings) -> Result<Box<dyn Mailer>, MailError>;
}

/// A configured transport able to send one message.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError>;
}

/// [`Connector`] opening a lettre SMTP transport per request.
#[derive(Debug, Clone, Copy, Default)]
pub struct SmtpConnector;

impl Connector for SmtpConnector {
    fn build(&self, settings: &SmtpSettings) -> Result<Box<dyn Mailer>, MailError> {
        let builder = if settings.secure {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
                .map_err(|e| MailError::Transport(e.to_string()))?
        } else {
            let tls = TlsParameters::new(settings.host.clone())
                .map_err(|e| MailError::Transport(e.to_string()))?;
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host)
                .tls(Tls::Opportunistic(tls))
        };

        let transport = builder
            .port(settings.port)
            .credentials(Credentials::new(settings.user.clone(), settings.pass.clone()))
            .build();

        Ok(Box::new(SmtpMailer { transport }))
    }
}

/// SMTP-backed [`Mailer`] built by [`SmtpConnector`].
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    fn build_message(email: &OutgoingEmail) -> Result<Message, MailError> {
        let from: Mailbox = email
            .from
            .parse()
            .map_err(|_| MailError::InvalidAddress(email.from.clone()))?;
        let to: Mailbox = email
            .to
            .parse()
            .map_err(|_| MailError::InvalidAddress(email.to.clone()))?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(&email.subject)
            .singlepart(SinglePart::html(email.html.clone()))
            .map_err(|e| MailError::Build(e.to_string()))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        let message = Self::build_message(email)?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Smtp(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(secure: bool) -> SmtpSettings {
        SmtpSettings {
            host: "smtp.example.com".into(),
            port: if secure { 465 } else { 587 },
            user: "user@example.com".into(),
            pass: "app-password".into(),
            from: "Tester <user@example.com>".into(),
            secure,
        }
    }

    #[test]
    fn settings_debug_hides_password() {
        let debug = format!("{:?}", settings(true));
        assert!(!debug.contains("app-password"));
        assert!(debug.contains("smtp.example.com"));
    }

    #[tokio::test]
    async fn builds_transport_for_both_security_modes() {
        assert!(SmtpConnector.build(&settings(true)).is_ok());
        assert!(SmtpConnector.build(&settings(false)).is_ok());
    }

    #[test]
    fn message_accepts_display_name_sender() {
        let email = OutgoingEmail::compose(
            "Tester <user@example.com>",
            "rcpt@example.com",
            "Subject",
            "Body",
        );
        assert!(SmtpMailer::build_message(&email).is_ok());
    }

    #[test]
    fn message_rejects_malformed_recipient() {
        let email = OutgoingEmail::compose("user@example.com", "not an address", "Subject", "Body");
        let err = SmtpMailer::build_message(&email).unwrap_err();
        assert!(matches!(err, MailError::InvalidAddress(addr) if addr == "not an address"));
    }
}
