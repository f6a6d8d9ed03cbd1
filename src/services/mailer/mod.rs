//! Mail Transport
//!
//! Defines the async trait the dispatch controller sends through, plus the
//! outbound message envelope and transport errors.

pub mod gateway;

pub use gateway::HttpMailGateway;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A fully rendered outbound email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html_body: String,
    /// Plain-text fallback for clients that refuse HTML.
    pub text_body: String,
}

/// Mail transport errors
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Mail gateway rejected message: {0}")]
    Rejected(String),

    #[error("Invalid transport configuration: {0}")]
    InvalidConfig(String),
}

impl From<reqwest::Error> for MailError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.to_string())
    }
}

/// Async trait for outbound mail transports.
///
/// A send either fully succeeds or fails; there is no partial delivery and
/// no retry at this layer. Implementations are expected to bound their own
/// request time.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Deliver one message.
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError>;
}
