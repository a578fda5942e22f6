use crate::config::StreamConfig;
use crate::transport::auth::{NoToken, TokenProvider};
use crate::transport::{Transport, TransportError, TransportResponse};
use crate::types::request::RequestSpec;
use crate::{Error, Result};
use futures::TryStreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Proxy;
use std::sync::Arc;

/// Header carrying our per-send correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

pub struct HttpTransport {
    client: reqwest::Client,
    config: StreamConfig,
    tokens: Arc<dyn TokenProvider>,
}

impl HttpTransport {
    pub fn new(config: &StreamConfig) -> Result<Self> {
        Self::with_token_provider(config, Arc::new(NoToken))
    }

    pub fn with_token_provider(
        config: &StreamConfig,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self> {
        // No whole-request timeout: it would cut off long-running streams.
        // Stalls are detected by the session's heartbeat window instead.
        let mut builder = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(Some(config.pool_idle_timeout));

        if let Some(proxy_url) = &config.proxy_url {
            match Proxy::all(proxy_url) {
                Ok(proxy) => builder = builder.proxy(proxy),
                Err(e) => tracing::warn!(proxy = %proxy_url, error = %e, "ignoring invalid proxy url"),
            }
        }

        let client = builder
            .build()
            .map_err(|e| Error::Transport(TransportError::Other(e.to_string())))?;

        Ok(Self {
            client,
            config: config.clone(),
            tokens,
        })
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn open(&self, request: &RequestSpec, request_id: &str) -> Result<TransportResponse> {
        let url = self.config.endpoint_url(request.conversation_id);
        let accept = if request.stream {
            "text/event-stream"
        } else {
            "application/json"
        };

        let mut req = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, accept)
            .header(REQUEST_ID_HEADER, request_id)
            .json(&request.to_body());

        if let Some(token) = self.tokens.bearer_token() {
            req = req.bearer_auth(token);
        }

        tracing::debug!(%url, stream = request.stream, "sending chat request");

        let resp = req
            .send()
            .await
            .map_err(|e| Error::Transport(TransportError::Http(e)))?;

        let status = resp.status();
        tracing::debug!(status = status.as_u16(), "chat response head received");

        let body = resp
            .bytes_stream()
            .map_err(|e| Error::Transport(TransportError::Http(e)));

        Ok(TransportResponse::new(
            status.as_u16(),
            status.canonical_reason().unwrap_or_default(),
            Some(Box::pin(body)),
        ))
    }
}
