//! JSON payloads exchanged between the form controller and the relay endpoint.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::step::StepKey;

/// Body of `POST /api/send-email`.
///
/// Missing or `null` strings decode to empty strings so the endpoint can report
/// them as missing fields instead of failing to decode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendEmailRequest {
    #[serde(default, deserialize_with = "null_as_default")]
    pub to: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub subject: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smtp: Option<SmtpOverrides>,
}

/// SMTP parameters supplied inline with a request.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmtpOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pass: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
}

impl fmt::Debug for SmtpOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpOverrides")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("pass", &self.pass.as_ref().map(|_| "<redacted>"))
            .field("from", &self.from)
            .field("secure", &self.secure)
            .finish()
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// `{ "success": true }`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessReply {
    pub success: bool,
}

impl SuccessReply {
    pub const OK: SuccessReply = SuccessReply { success: true };
}

/// `{ "error": "...", "step": "..." }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReply {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<StepKey>,
}

/// Any reply body, decoded leniently on the client side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReplyBody {
    pub success: bool,
    pub error: Option<String>,
    pub step: Option<StepKey>,
}

impl ReplyBody {
    /// Decodes a reply body; anything that is not a recognizable reply becomes
    /// the empty body.
    pub fn decode(bytes: &[u8]) -> Self {
        serde_json::from_slice(bytes).unwrap_or_default()
    }
}

/// What the client observed from one exchange with the endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayReply {
    /// Whether the HTTP status was a success status.
    pub ok: bool,
    pub body: ReplyBody,
}

impl RelayReply {
    pub fn is_success(&self) -> bool {
        self.ok && self.body.success
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn missing_and_null_fields_decode_empty() {
        let req: SendEmailRequest =
            serde_json::from_value(json!({ "to": null, "subject": "Hi" })).unwrap();
        assert_eq!(req.to, "");
        assert_eq!(req.subject, "Hi");
        assert_eq!(req.message, "");
        assert!(req.smtp.is_none());
    }

    #[test]
    fn request_omits_absent_smtp_fields() {
        let req = SendEmailRequest {
            to: "a@b.co".into(),
            subject: "s".into(),
            message: "m".into(),
            smtp: Some(SmtpOverrides {
                host: Some("smtp.example.com".into()),
                port: Some(587),
                ..Default::default()
            }),
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(
            value,
            json!({
                "to": "a@b.co",
                "subject": "s",
                "message": "m",
                "smtp": { "host": "smtp.example.com", "port": 587 }
            })
        );
    }

    #[test]
    fn overrides_debug_hides_password() {
        let smtp = SmtpOverrides {
            pass: Some("hunter2".into()),
            ..Default::default()
        };
        let debug = format!("{smtp:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn error_reply_omits_missing_step() {
        let reply = ErrorReply {
            error: "boom".into(),
            step: None,
        };
        assert_eq!(serde_json::to_value(&reply).unwrap(), json!({ "error": "boom" }));
    }

    #[test]
    fn reply_body_decodes_leniently() {
        let body = ReplyBody::decode(br#"{"error":"Invalid login","step":"sendEmail"}"#);
        assert!(!body.success);
        assert_eq!(body.error.as_deref(), Some("Invalid login"));
        assert_eq!(body.step, Some(StepKey::SendEmail));

        assert_eq!(ReplyBody::decode(b"<html>502</html>"), ReplyBody::default());
        assert!(ReplyBody::decode(br#"{"success":true}"#).success);
    }
}
