//! Client side of the relay exchange.

use async_trait::async_trait;

use crate::protocol::{RelayReply, ReplyBody, SendEmailRequest};
use crate::relay::SEND_EMAIL_PATH;

/// The request could not be completed, so no reply is available.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("{0}")]
    Http(#[from] reqwest::Error),

    /// For [`RelayClient`] implementations that do not speak HTTP through
    /// reqwest. The form reports the text as a network failure.
    #[error("{0}")]
    Other(String),
}

/// Issues one send request to the relay endpoint.
#[async_trait]
pub trait RelayClient: Send + Sync {
    async fn send(&self, request: &SendEmailRequest) -> Result<RelayReply, ClientError>;
}

/// [`RelayClient`] speaking HTTP to a running relay.
#[derive(Debug, Clone)]
pub struct HttpRelayClient {
    http: reqwest::Client,
    url: String,
}

impl HttpRelayClient {
    /// `base_url` is the relay origin, e.g. `http://localhost:3000`.
    pub fn new(base_url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: &str) -> Self {
        HttpRelayClient {
            http,
            url: format!("{}{}", base_url.trim_end_matches('/'), SEND_EMAIL_PATH),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RelayClient for HttpRelayClient {
    async fn send(&self, request: &SendEmailRequest) -> Result<RelayReply, ClientError> {
        let response = self.http.post(&self.url).json(request).send().await?;
        let ok = response.status().is_success();
        let bytes = response.bytes().await?;

        Ok(RelayReply {
            ok,
            body: ReplyBody::decode(&bytes),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_base_url_and_path() {
        assert_eq!(
            HttpRelayClient::new("http://localhost:3000/").url(),
            "http://localhost:3000/api/send-email"
        );
        assert_eq!(
            HttpRelayClient::new("http://relay.internal").url(),
            "http://relay.internal/api/send-email"
        );
    }

    #[test]
    fn other_error_displays_its_text() {
        let err = ClientError::Other("socket closed".into());
        assert_eq!(err.to_string(), "socket closed");
    }
}
