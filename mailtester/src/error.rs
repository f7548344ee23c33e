use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::mail::MailError;
use crate::protocol::ErrorReply;
use crate::step::StepKey;

/// Everything that can stop the relay, tagged with the stage it belongs to.
#[derive(Debug, thiserror::Error, crate::StagedError)]
pub enum RelayError {
    #[error("missing required fields: to, subject, message")]
    #[http_error(BAD_REQUEST)]
    #[stage(ValidateEmail)]
    MissingFields,

    #[error("SMTP credentials are required in the request")]
    #[http_error(BAD_REQUEST)]
    #[stage(ValidateService)]
    MissingSmtp,

    #[error("incomplete SMTP configuration (environment or supplied credentials)")]
    #[http_error(BAD_REQUEST)]
    #[stage(ValidateService)]
    IncompleteSmtp,

    #[error("failed to build transport: {0}")]
    #[http_error(INTERNAL_SERVER_ERROR)]
    #[stage(BuildTransporter)]
    BuildTransport(#[source] MailError),

    #[error("failed to send: {0}")]
    #[http_error(INTERNAL_SERVER_ERROR)]
    #[stage(SendEmail)]
    Send(#[source] MailError),

    #[error("{0}")]
    #[http_error(INTERNAL_SERVER_ERROR)]
    #[stage(SendEmail)]
    Unexpected(#[from] anyhow::Error),
}

crate::anyhow_from!(RelayError: serde_json::Error);

impl RelayError {
    pub fn reply(&self) -> ErrorReply {
        ErrorReply {
            error: self.http_message(),
            step: self.stage(),
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let code = self.http_code();
        if code.is_server_error() {
            tracing::error!("Error Status {}: {}", code, self);
        } else {
            tracing::warn!("rejected send request: {}", self);
        }

        (code, Json(self.reply())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use http::StatusCode;

    use super::*;

    #[test]
    fn validation_errors_are_client_errors() {
        for err in [
            RelayError::MissingFields,
            RelayError::MissingSmtp,
            RelayError::IncompleteSmtp,
        ] {
            assert_eq!(err.http_code(), StatusCode::BAD_REQUEST);
        }
        assert_eq!(RelayError::MissingFields.stage(), Some(StepKey::ValidateEmail));
        assert_eq!(RelayError::IncompleteSmtp.stage(), Some(StepKey::ValidateService));
    }

    #[test]
    fn downstream_errors_carry_underlying_message() {
        let err = RelayError::Send(MailError::Smtp("Invalid login".into()));
        assert_eq!(err.http_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            err.reply(),
            ErrorReply {
                error: "failed to send: Invalid login".into(),
                step: Some(StepKey::SendEmail),
            }
        );

        let err = RelayError::BuildTransport(MailError::Transport("bad host".into()));
        assert_eq!(err.reply().error, "failed to build transport: bad host");
        assert_eq!(err.reply().step, Some(StepKey::BuildTransporter));
    }

    #[test]
    fn malformed_json_is_unexpected() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = RelayError::from(parse_err);
        assert!(matches!(err, RelayError::Unexpected(_)));
        assert_eq!(err.http_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.stage(), Some(StepKey::SendEmail));
    }
}
