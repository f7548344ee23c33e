//! The form controller: local validation, step bookkeeping and the single
//! request to the relay.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::client::RelayClient;
use crate::protocol::{SendEmailRequest, SmtpOverrides};
use crate::step::{StepKey, StepList, StepStatus};

static EMAIL_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

const INVALID_EMAIL_DETAIL: &str = "Invalid email format.";
const INCOMPLETE_SMTP_DETAIL: &str = "Fill in host, port, user, password and from.";
const PREPARING_DETAIL: &str = "Preparing request to the server...";
const ABORTED_DETAIL: &str = "Aborted.";
const GENERIC_SEND_ERROR: &str = "Error sending email";

/// Loose shape check: something, `@`, something, `.`, something, no whitespace.
pub fn is_valid_email(value: &str) -> bool {
    EMAIL_SHAPE.is_match(value)
}

/// An editable form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    To,
    Subject,
    Message,
    Host,
    Port,
    User,
    Pass,
    From,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailFields {
    pub to: String,
    pub subject: String,
    pub message: String,
}

/// SMTP credentials as typed into the form; the port stays text until sent.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CredentialFields {
    pub host: String,
    pub port: String,
    pub user: String,
    pub pass: String,
    pub from: String,
    pub secure: bool,
}

impl CredentialFields {
    /// True when none of host, port, user, pass and from is blank.
    pub fn is_complete(&self) -> bool {
        [&self.host, &self.port, &self.user, &self.pass, &self.from]
            .iter()
            .all(|v| !v.trim().is_empty())
    }

    fn to_overrides(&self) -> SmtpOverrides {
        SmtpOverrides {
            host: Some(self.host.clone()),
            port: self.port.trim().parse().ok(),
            user: Some(self.user.clone()),
            pass: Some(self.pass.clone()),
            from: Some(self.from.clone()),
            secure: Some(self.secure),
        }
    }
}

impl std::fmt::Debug for CredentialFields {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialFields")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("pass", &"<redacted>")
            .field("from", &self.from)
            .field("secure", &self.secure)
            .finish()
    }
}

/// How a call to [`FormController::send`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    /// The attempt stopped at this step.
    Failed(StepKey),
}

type Observer = Box<dyn FnMut(&StepList) + Send>;

pub struct FormController<C> {
    client: C,
    email: EmailFields,
    smtp: CredentialFields,
    steps: StepList,
    status: String,
    observer: Option<Observer>,
}

impl<C: RelayClient> FormController<C> {
    pub fn new(client: C) -> Self {
        FormController {
            client,
            email: EmailFields::default(),
            smtp: CredentialFields::default(),
            steps: StepList::new(),
            status: String::new(),
            observer: None,
        }
    }

    /// Calls `observer` with the step list after every step change.
    pub fn with_observer(mut self, observer: impl FnMut(&StepList) + Send + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn set_field(&mut self, field: Field, value: impl Into<String>) {
        let value = value.into();
        match field {
            Field::To => self.email.to = value,
            Field::Subject => self.email.subject = value,
            Field::Message => self.email.message = value,
            Field::Host => self.smtp.host = value,
            Field::Port => self.smtp.port = value,
            Field::User => self.smtp.user = value,
            Field::Pass => self.smtp.pass = value,
            Field::From => self.smtp.from = value,
        }
    }

    pub fn set_secure(&mut self, secure: bool) {
        self.smtp.secure = secure;
    }

    /// Whether sending makes sense at all: every field filled in.
    pub fn can_send(&self) -> bool {
        !self.email.to.is_empty()
            && !self.email.subject.is_empty()
            && !self.email.message.is_empty()
            && self.smtp.is_complete()
    }

    pub fn email(&self) -> &EmailFields {
        &self.email
    }

    pub fn credentials(&self) -> &CredentialFields {
        &self.smtp
    }

    pub fn steps(&self) -> &StepList {
        &self.steps
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Runs one send attempt.
    ///
    /// Local validation failures stop before any request is made. Otherwise one
    /// request is sent and its reply, or the transport failure, is reflected
    /// into the steps and the status line.
    pub async fn send(&mut self) -> SendOutcome {
        self.status.clear();
        self.update(StepList::reset);

        self.update(|s| s.set(StepKey::ValidateEmail, StepStatus::Running));
        if !is_valid_email(&self.email.to) {
            self.update(|s| {
                s.set_with_detail(StepKey::ValidateEmail, StepStatus::Error, INVALID_EMAIL_DETAIL)
            });
            self.status = "❌ Invalid email.".to_string();
            return SendOutcome::Failed(StepKey::ValidateEmail);
        }
        self.update(|s| s.set(StepKey::ValidateEmail, StepStatus::Done));

        self.update(|s| s.set(StepKey::ValidateService, StepStatus::Running));
        if !self.smtp.is_complete() {
            self.update(|s| {
                s.set_with_detail(StepKey::ValidateService, StepStatus::Error, INCOMPLETE_SMTP_DETAIL)
            });
            self.status = "❌ Incomplete SMTP credentials.".to_string();
            return SendOutcome::Failed(StepKey::ValidateService);
        }
        self.update(|s| s.set(StepKey::ValidateService, StepStatus::Done));

        // Client side, this stage only prepares the request.
        self.update(|s| {
            s.set_with_detail(StepKey::BuildTransporter, StepStatus::Running, PREPARING_DETAIL)
        });
        self.status = "Sending...".to_string();
        let request = self.request();
        self.update(|s| s.set(StepKey::BuildTransporter, StepStatus::Done));
        self.update(|s| s.set(StepKey::SendEmail, StepStatus::Running));

        tracing::debug!(to = %request.to, "sending request to relay");
        match self.client.send(&request).await {
            Ok(reply) if reply.is_success() => {
                self.update(|s| {
                    s.set(StepKey::SendEmail, StepStatus::Done);
                    s.set(StepKey::Success, StepStatus::Done);
                });
                self.status = "✅ Email sent!".to_string();
                SendOutcome::Sent
            }
            Ok(reply) => {
                let failed = reply.body.step.unwrap_or(StepKey::SendEmail);
                let error = reply
                    .body
                    .error
                    .unwrap_or_else(|| GENERIC_SEND_ERROR.to_string());
                tracing::debug!(step = %failed, %error, "relay rejected request");

                self.update(|s| {
                    s.set_with_detail(failed, StepStatus::Error, error.clone());
                    if failed != StepKey::SendEmail {
                        s.set_with_detail(StepKey::SendEmail, StepStatus::Error, ABORTED_DETAIL);
                    }
                });
                self.status = format!("❌ {error}");
                SendOutcome::Failed(failed)
            }
            Err(err) => {
                tracing::debug!(error = %err, "relay request failed");
                let message = err.to_string();
                self.update(|s| s.set_with_detail(StepKey::SendEmail, StepStatus::Error, message.clone()));
                self.status = format!("❌ Network failure: {message}");
                SendOutcome::Failed(StepKey::SendEmail)
            }
        }
    }

    /// Empties every field, the status line and the steps.
    pub fn clear(&mut self) {
        self.email = EmailFields::default();
        self.smtp = CredentialFields::default();
        self.status.clear();
        self.update(StepList::reset);
    }

    fn request(&self) -> SendEmailRequest {
        SendEmailRequest {
            to: self.email.to.clone(),
            subject: self.email.subject.clone(),
            message: self.email.message.clone(),
            smtp: Some(self.smtp.to_overrides()),
        }
    }

    fn update(&mut self, change: impl FnOnce(&mut StepList)) {
        change(&mut self.steps);
        if let Some(observer) = self.observer.as_mut() {
            observer(&self.steps);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::*;
    use crate::client::ClientError;
    use crate::protocol::{RelayReply, ReplyBody};

    /// Replies with a canned result and records every request.
    struct FakeClient {
        reply: Result<RelayReply, String>,
        calls: Mutex<Vec<SendEmailRequest>>,
    }

    impl FakeClient {
        fn replying(ok: bool, body: ReplyBody) -> Self {
            FakeClient {
                reply: Ok(RelayReply { ok, body }),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn success() -> Self {
            Self::replying(
                true,
                ReplyBody {
                    success: true,
                    ..Default::default()
                },
            )
        }

        fn unreachable(message: &str) -> Self {
            FakeClient {
                reply: Err(message.to_string()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<SendEmailRequest> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RelayClient for FakeClient {
        async fn send(&self, request: &SendEmailRequest) -> Result<RelayReply, ClientError> {
            self.calls.lock().unwrap().push(request.clone());
            self.reply.clone().map_err(ClientError::Other)
        }
    }

    fn filled(client: FakeClient) -> FormController<FakeClient> {
        let mut form = FormController::new(client);
        form.set_field(Field::To, "you@example.com");
        form.set_field(Field::Subject, "Hello");
        form.set_field(Field::Message, "Hi there");
        form.set_field(Field::Host, "smtp.gmail.com");
        form.set_field(Field::Port, "587");
        form.set_field(Field::User, "me@gmail.com");
        form.set_field(Field::Pass, "app-password");
        form.set_field(Field::From, "Me <me@gmail.com>");
        form
    }

    fn status_of(form: &FormController<FakeClient>, key: StepKey) -> StepStatus {
        form.steps().get(key).status
    }

    #[test]
    fn email_shape() {
        for good in ["a@b.co", "first.last@mail.example.org", "x+tag@d.io"] {
            assert!(is_valid_email(good), "{good}");
        }
        for bad in [
            "", "plain", "a@b", "@b.co", "a@.", "a b@c.de", "a@b.c ", "a@@b.co", "a@b.", " a@b.co",
        ] {
            assert!(!is_valid_email(bad), "{bad}");
        }
    }

    #[tokio::test]
    async fn invalid_recipient_stops_before_request() {
        for bad in ["", "nobody", "x@y", "a b@c.de", "a@b."] {
            let mut form = filled(FakeClient::success());
            form.set_field(Field::To, bad);

            assert_eq!(form.send().await, SendOutcome::Failed(StepKey::ValidateEmail));
            assert_eq!(status_of(&form, StepKey::ValidateEmail), StepStatus::Error);
            assert_eq!(
                form.steps().get(StepKey::ValidateEmail).detail.as_deref(),
                Some(INVALID_EMAIL_DETAIL)
            );
            for later in &StepKey::ALL[1..] {
                assert_eq!(status_of(&form, *later), StepStatus::Pending);
            }
            assert!(form.client().calls().is_empty());
            assert_eq!(form.status(), "❌ Invalid email.");
        }
    }

    #[tokio::test]
    async fn blank_credential_stops_before_request() {
        for field in [Field::Host, Field::Port, Field::User, Field::Pass, Field::From] {
            let mut form = filled(FakeClient::success());
            form.set_field(field, "   ");

            assert_eq!(form.send().await, SendOutcome::Failed(StepKey::ValidateService));
            assert_eq!(status_of(&form, StepKey::ValidateEmail), StepStatus::Done);
            assert_eq!(status_of(&form, StepKey::ValidateService), StepStatus::Error);
            assert_eq!(status_of(&form, StepKey::BuildTransporter), StepStatus::Pending);
            assert!(form.client().calls().is_empty(), "{field:?}");
        }
    }

    #[tokio::test]
    async fn success_marks_every_step_done() {
        let mut form = filled(FakeClient::success());
        form.set_secure(true);

        assert_eq!(form.send().await, SendOutcome::Sent);
        assert!(form
            .steps()
            .iter()
            .all(|s| s.status == StepStatus::Done));
        assert_eq!(form.steps().progress(), 100);
        assert_eq!(form.status(), "✅ Email sent!");

        let calls = form.client().calls();
        assert_eq!(calls.len(), 1);
        let smtp = calls[0].smtp.clone().unwrap();
        assert_eq!(smtp.port, Some(587));
        assert_eq!(smtp.secure, Some(true));
        assert_eq!(smtp.from.as_deref(), Some("Me <me@gmail.com>"));
    }

    #[tokio::test]
    async fn unparsable_port_is_sent_as_absent() {
        let mut form = filled(FakeClient::success());
        form.set_field(Field::Port, "five-eight-seven");

        form.send().await;
        assert_eq!(form.client().calls()[0].smtp.as_ref().unwrap().port, None);
    }

    #[tokio::test]
    async fn send_failure_is_attributed_to_send_step() {
        let mut form = filled(FakeClient::replying(
            false,
            ReplyBody {
                error: Some("failed to send: Invalid login".into()),
                step: Some(StepKey::SendEmail),
                ..Default::default()
            },
        ));

        assert_eq!(form.send().await, SendOutcome::Failed(StepKey::SendEmail));
        let send = form.steps().get(StepKey::SendEmail);
        assert_eq!(send.status, StepStatus::Error);
        assert!(send.detail.as_deref().unwrap().contains("Invalid login"));
        assert_eq!(status_of(&form, StepKey::Success), StepStatus::Pending);
        assert_eq!(form.status(), "❌ failed to send: Invalid login");
    }

    #[tokio::test]
    async fn earlier_server_stage_aborts_send_step() {
        let mut form = filled(FakeClient::replying(
            false,
            ReplyBody {
                error: Some("incomplete SMTP configuration".into()),
                step: Some(StepKey::ValidateService),
                ..Default::default()
            },
        ));

        assert_eq!(form.send().await, SendOutcome::Failed(StepKey::ValidateService));
        let service = form.steps().get(StepKey::ValidateService);
        assert_eq!(service.status, StepStatus::Error);
        assert_eq!(service.detail.as_deref(), Some("incomplete SMTP configuration"));
        let send = form.steps().get(StepKey::SendEmail);
        assert_eq!(send.status, StepStatus::Error);
        assert_eq!(send.detail.as_deref(), Some(ABORTED_DETAIL));
        assert_eq!(status_of(&form, StepKey::Success), StepStatus::Pending);
    }

    #[tokio::test]
    async fn untagged_failure_defaults_to_send_step() {
        let mut form = filled(FakeClient::replying(false, ReplyBody::default()));

        assert_eq!(form.send().await, SendOutcome::Failed(StepKey::SendEmail));
        assert_eq!(
            form.steps().get(StepKey::SendEmail).detail.as_deref(),
            Some(GENERIC_SEND_ERROR)
        );
        assert_eq!(form.status(), format!("❌ {GENERIC_SEND_ERROR}"));
    }

    #[tokio::test]
    async fn ok_status_without_success_flag_is_a_failure() {
        let mut form = filled(FakeClient::replying(true, ReplyBody::default()));
        assert_eq!(form.send().await, SendOutcome::Failed(StepKey::SendEmail));
    }

    #[tokio::test]
    async fn network_failure_marks_send_step() {
        let mut form = filled(FakeClient::unreachable("connection refused"));

        assert_eq!(form.send().await, SendOutcome::Failed(StepKey::SendEmail));
        assert_eq!(
            form.steps().get(StepKey::SendEmail).detail.as_deref(),
            Some("connection refused")
        );
        assert_eq!(form.status(), "❌ Network failure: connection refused");
    }

    #[tokio::test]
    async fn each_attempt_starts_from_pending() {
        let mut form = filled(FakeClient::success());
        form.set_field(Field::To, "broken");
        form.send().await;
        assert_eq!(status_of(&form, StepKey::ValidateEmail), StepStatus::Error);

        form.set_field(Field::To, "you@example.com");
        assert_eq!(form.send().await, SendOutcome::Sent);
        assert!(form.steps().get(StepKey::ValidateEmail).detail.is_none());
    }

    #[tokio::test]
    async fn observer_sees_monotonic_transitions() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut form = filled(FakeClient::success())
            .with_observer(move |steps| sink.lock().unwrap().push(steps.clone()));

        form.send().await;

        let rank = |status: StepStatus| match status {
            StepStatus::Pending => 0,
            StepStatus::Running => 1,
            StepStatus::Done | StepStatus::Error => 2,
        };
        let seen = seen.lock().unwrap();
        // The first snapshot is the reset.
        assert_eq!(seen[0], StepList::new());
        for pair in seen[1..].windows(2) {
            for key in StepKey::ALL {
                assert!(rank(pair[0].get(key).status) <= rank(pair[1].get(key).status));
            }
        }
    }

    #[tokio::test]
    async fn clear_resets_everything() {
        let mut form = filled(FakeClient::unreachable("down"));
        form.set_secure(true);
        form.send().await;
        assert!(!form.status().is_empty());

        form.clear();

        assert_eq!(form.email(), &EmailFields::default());
        assert_eq!(form.credentials(), &CredentialFields::default());
        assert_eq!(form.status(), "");
        assert_eq!(form.steps(), &StepList::new());
        assert!(!form.can_send());
    }

    #[test]
    fn can_send_requires_every_field() {
        let form = filled(FakeClient::success());
        assert!(form.can_send());

        let mut form = filled(FakeClient::success());
        form.set_field(Field::Message, "");
        assert!(!form.can_send());
    }
}
