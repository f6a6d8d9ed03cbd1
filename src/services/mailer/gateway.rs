//! HTTP Mail Gateway Transport
//!
//! Sends mail by POSTing the JSON message envelope to an HTTP mail
//! gateway endpoint, authenticated with an optional bearer token.

use async_trait::async_trait;

use super::{MailError, MailTransport, OutboundEmail};

/// Mail transport backed by an HTTP gateway.
pub struct HttpMailGateway {
    client: reqwest::Client,
    endpoint: String,
    api_token: Option<String>,
}

impl HttpMailGateway {
    pub fn new(endpoint: impl Into<String>, api_token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_token,
        }
    }
}

#[async_trait]
impl MailTransport for HttpMailGateway {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError> {
        let mut request = self.client.post(&self.endpoint).json(email);

        if let Some(ref token) = self.api_token {
            if !token.is_empty() {
                request = request.bearer_auth(token);
            }
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Rejected(format!(
                "mail gateway returned HTTP {}: {}",
                status, body
            )));
        }

        Ok(())
    }
}

impl std::fmt::Debug for HttpMailGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpMailGateway")
            .field("endpoint", &self.endpoint)
            .field("authenticated", &self.api_token.is_some())
            .finish()
    }
}
