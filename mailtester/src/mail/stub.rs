use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::{Connector, MailError, Mailer, OutgoingEmail, SmtpSettings};

/// What a [`StubConnector`] does with each request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StubOutcome {
    /// Accept the message.
    #[default]
    Deliver,
    /// Fail while building the transport with the given message.
    FailBuild(String),
    /// Build fine, then fail while sending with the given message.
    FailSend(String),
}

/// In-memory [`Connector`] that records what it was asked to do.
///
/// Clones share the same records.
#[derive(Debug, Clone, Default)]
pub struct StubConnector {
    inner: Arc<StubState>,
}

#[derive(Debug, Default)]
struct StubState {
    outcome: StubOutcome,
    built: Mutex<Vec<SmtpSettings>>,
    sent: Mutex<Vec<OutgoingEmail>>,
}

impl StubConnector {
    pub fn new(outcome: StubOutcome) -> Self {
        StubConnector {
            inner: Arc::new(StubState {
                outcome,
                ..Default::default()
            }),
        }
    }

    /// Settings of every transport built so far.
    pub fn built(&self) -> Vec<SmtpSettings> {
        lock(&self.inner.built).clone()
    }

    /// Every message accepted so far.
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        lock(&self.inner.sent).clone()
    }
}

impl Connector for StubConnector {
    fn build(&self, settings: &SmtpSettings) -> Result<Box<dyn Mailer>, MailError> {
        if let StubOutcome::FailBuild(msg) = &self.inner.outcome {
            return Err(MailError::Transport(msg.clone()));
        }
        lock(&self.inner.built).push(settings.clone());
        Ok(Box::new(StubMailer {
            state: Arc::clone(&self.inner),
        }))
    }
}

struct StubMailer {
    state: Arc<StubState>,
}

#[async_trait]
impl Mailer for StubMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        if let StubOutcome::FailSend(msg) = &self.state.outcome {
            return Err(MailError::Smtp(msg.clone()));
        }
        tracing::info!(to = %email.to, subject = %email.subject, "stub accepted message");
        lock(&self.state.sent).push(email.clone());
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> SmtpSettings {
        SmtpSettings {
            host: "localhost".into(),
            port: 2525,
            user: "u".into(),
            pass: "p".into(),
            from: "f@example.com".into(),
            secure: false,
        }
    }

    #[tokio::test]
    async fn records_built_settings_and_sent_messages() {
        let stub = StubConnector::default();
        let mailer = stub.build(&settings()).unwrap();
        let email = OutgoingEmail::compose("f@example.com", "t@example.com", "s", "m");
        mailer.send(&email).await.unwrap();

        assert_eq!(stub.built(), vec![settings()]);
        assert_eq!(stub.sent(), vec![email]);
    }

    #[tokio::test]
    async fn scripted_failures() {
        let stub = StubConnector::new(StubOutcome::FailBuild("no tls".into()));
        assert_eq!(stub.build(&settings()).err().unwrap().to_string(), "no tls");
        assert!(stub.built().is_empty());

        let stub = StubConnector::new(StubOutcome::FailSend("Invalid login".into()));
        let mailer = stub.build(&settings()).unwrap();
        let email = OutgoingEmail::compose("f@example.com", "t@example.com", "s", "m");
        let err = mailer.send(&email).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid login");
        assert!(stub.sent().is_empty());
    }
}
