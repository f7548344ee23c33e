//! The mail relay endpoint.
//!
//! `POST /api/send-email` takes a [`SendEmailRequest`], validates it, resolves
//! SMTP parameters, builds a transport and sends one HTML email. Each failure
//! is reported as an [`ErrorReply`](crate::protocol::ErrorReply) tagged with the
//! stage that produced it.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::config::{MergePolicy, SmtpDefaults};
use crate::error::RelayError;
use crate::mail::{Connector, OutgoingEmail, SmtpConnector, SmtpSettings};
use crate::protocol::{SendEmailRequest, SmtpOverrides, SuccessReply};

pub const SEND_EMAIL_PATH: &str = "/api/send-email";

/// Shared, read-only state of the relay. Nothing here changes per request.
#[derive(Clone)]
pub struct RelayState {
    pub defaults: Arc<SmtpDefaults>,
    pub policy: MergePolicy,
    pub connector: Arc<dyn Connector>,
}

impl RelayState {
    pub fn new(defaults: SmtpDefaults, policy: MergePolicy, connector: impl Connector) -> Self {
        RelayState {
            defaults: Arc::new(defaults),
            policy,
            connector: Arc::new(connector),
        }
    }

    /// Relay backed by a real SMTP connection.
    pub fn smtp(defaults: SmtpDefaults, policy: MergePolicy) -> Self {
        Self::new(defaults, policy, SmtpConnector)
    }
}

pub fn router(state: RelayState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(SEND_EMAIL_PATH, post(send_email))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

/// Handler for `POST /api/send-email`.
///
/// The body is decoded here rather than by an extractor so that malformed JSON
/// is reported in the same error shape as every other failure.
pub async fn send_email(State(state): State<RelayState>, body: Bytes) -> Response {
    match relay(&state, &body).await {
        Ok(()) => Json(SuccessReply::OK).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn relay(state: &RelayState, body: &[u8]) -> Result<(), RelayError> {
    let request: SendEmailRequest = serde_json::from_slice(body)?;

    if request.to.is_empty() || request.subject.is_empty() || request.message.is_empty() {
        return Err(RelayError::MissingFields);
    }

    let settings = resolve_settings(request.smtp.as_ref(), &state.defaults, state.policy)?;

    let mailer = state
        .connector
        .build(&settings)
        .map_err(RelayError::BuildTransport)?;

    let email = OutgoingEmail::compose(&settings.from, request.to, request.subject, &request.message);
    mailer.send(&email).await.map_err(RelayError::Send)?;

    tracing::info!(
        host = %settings.host,
        port = settings.port,
        secure = settings.secure,
        to = %email.to,
        "email sent"
    );
    Ok(())
}

/// Merges inline SMTP values with the environment defaults under `policy`.
///
/// An inline value that is present wins even when empty; emptiness is then
/// reported as an incomplete configuration. `secure` defaults to implicit TLS
/// exactly when the resolved port is 465.
pub fn resolve_settings(
    inline: Option<&SmtpOverrides>,
    defaults: &SmtpDefaults,
    policy: MergePolicy,
) -> Result<SmtpSettings, RelayError> {
    let fallback = match (policy, inline) {
        (MergePolicy::Strict, None) => return Err(RelayError::MissingSmtp),
        (MergePolicy::Strict, Some(_)) => None,
        (MergePolicy::Lenient, _) => Some(defaults),
    };
    let empty = SmtpOverrides::default();
    let inline = inline.unwrap_or(&empty);

    let pick = |value: &Option<String>, default: Option<&Option<String>>| {
        value
            .clone()
            .or_else(|| default.and_then(|d| d.clone()))
            .unwrap_or_default()
    };

    let host = pick(&inline.host, fallback.map(|d| &d.host));
    let user = pick(&inline.user, fallback.map(|d| &d.user));
    let pass = pick(&inline.pass, fallback.map(|d| &d.pass));
    let from = pick(&inline.from, fallback.map(|d| &d.from));
    let port = inline
        .port
        .or_else(|| fallback.and_then(|d| d.port))
        .unwrap_or(0);

    if host.is_empty() || port == 0 || user.is_empty() || pass.is_empty() || from.is_empty() {
        return Err(RelayError::IncompleteSmtp);
    }

    let secure = inline.secure.unwrap_or(port == 465);

    Ok(SmtpSettings {
        host,
        port,
        user,
        pass,
        from,
        secure,
    })
}
