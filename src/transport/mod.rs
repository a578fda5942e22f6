//! Transport abstraction: "request in, status plus byte stream out".
//!
//! The consumer only depends on [`Transport`]; [`HttpTransport`] is the reqwest-backed
//! production implementation. Tests plug in their own implementations.

pub mod auth;
pub mod http;

pub use auth::{EnvToken, NoToken, StaticToken, TokenProvider};
pub use http::HttpTransport;

use crate::types::request::RequestSpec;
use crate::{BoxStream, Result};
use bytes::Bytes;

/// Response head plus the (optional) body stream.
pub struct TransportResponse {
    pub status: u16,
    /// Reason phrase, e.g. "Internal Server Error". May be empty.
    pub reason: String,
    /// `None` when the response carried no body at all.
    pub body: Option<BoxStream<'static, Bytes>>,
}

impl TransportResponse {
    pub fn new(status: u16, reason: impl Into<String>, body: Option<BoxStream<'static, Bytes>>) -> Self {
        Self {
            status,
            reason: reason.into(),
            body,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl std::fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("reason", &self.reason)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

/// Issues a send and hands back the response body as a byte stream.
///
/// Implementations must not interpret `request.conversation_id`; `0` is a valid
/// "create on first send" value.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn open(&self, request: &RequestSpec, request_id: &str) -> Result<TransportResponse>;
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Other(String),
}
