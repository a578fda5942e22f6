use crate::client::consumer::StreamingReplyConsumer;
use crate::config::StreamConfig;
use crate::transport::{HttpTransport, NoToken, TokenProvider, Transport};
use crate::Result;
use std::sync::Arc;
use std::time::Duration;

/// Builder for [`StreamingReplyConsumer`].
///
/// Without an explicit config the builder reads `CHAT_STREAM_*` from the environment.
/// Without an explicit transport it builds an [`HttpTransport`] from the config.
#[derive(Default)]
pub struct StreamingReplyConsumerBuilder {
    config: Option<StreamConfig>,
    heartbeat_timeout: Option<Duration>,
    transport: Option<Arc<dyn Transport>>,
    tokens: Option<Arc<dyn TokenProvider>>,
}

impl StreamingReplyConsumerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: StreamConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Override the stall window (takes precedence over the config's value).
    pub fn heartbeat_timeout(mut self, window: Duration) -> Self {
        self.heartbeat_timeout = Some(window);
        self
    }

    /// Use a custom transport instead of HTTP. The token provider is then ignored.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn token_provider(mut self, tokens: Arc<dyn TokenProvider>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    pub fn build(self) -> Result<StreamingReplyConsumer> {
        let mut config = self.config.unwrap_or_else(StreamConfig::from_env);
        if let Some(window) = self.heartbeat_timeout {
            config.heartbeat_timeout = window;
        }
        config.validate()?;

        let transport: Arc<dyn Transport> = match self.transport {
            Some(t) => t,
            None => {
                let tokens = self.tokens.unwrap_or_else(|| Arc::new(NoToken));
                Arc::new(HttpTransport::with_token_provider(&config, tokens)?)
            }
        };

        Ok(StreamingReplyConsumer::new(transport, config.heartbeat_timeout))
    }
}
