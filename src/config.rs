//! Consumer and transport configuration.
//!
//! Defaults are production-friendly and every knob can be overridden from the
//! environment (`CHAT_STREAM_*`) or a YAML file. Durations are written in seconds.
//!
//! ```yaml
//! base_url: https://chat.example.com/api
//! path_template: /conversations/{conversation_id}/messages
//! heartbeat_timeout_secs: 15
//! connect_timeout_secs: 10
//! ```

use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Placeholder interpolated with the request's conversation id.
pub const CONVERSATION_PLACEHOLDER: &str = "{conversation_id}";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub base_url: String,
    pub path_template: String,
    /// Longest allowed gap between liveness signals before a session fails.
    #[serde(rename = "heartbeat_timeout_secs", with = "duration_secs")]
    pub heartbeat_timeout: Duration,
    #[serde(rename = "connect_timeout_secs", with = "duration_secs")]
    pub connect_timeout: Duration,
    #[serde(rename = "pool_idle_timeout_secs", with = "duration_secs")]
    pub pool_idle_timeout: Duration,
    pub pool_max_idle_per_host: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<String>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            path_template: format!("/conversations/{}/messages", CONVERSATION_PLACEHOLDER),
            heartbeat_timeout: Duration::from_secs(15),
            connect_timeout: Duration::from_secs(10),
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 32,
            proxy_url: None,
        }
    }
}

impl StreamConfig {
    /// Defaults overlaid with `CHAT_STREAM_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Overlay `CHAT_STREAM_*` environment variables onto `self`.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("CHAT_STREAM_BASE_URL") {
            self.base_url = v;
        }
        if let Ok(v) = env::var("CHAT_STREAM_PATH_TEMPLATE") {
            self.path_template = v;
        }
        if let Some(secs) = env_secs("CHAT_STREAM_HEARTBEAT_SECS") {
            self.heartbeat_timeout = secs;
        }
        if let Some(secs) = env_secs("CHAT_STREAM_CONNECT_TIMEOUT_SECS") {
            self.connect_timeout = secs;
        }
        if let Ok(v) = env::var("CHAT_STREAM_PROXY_URL") {
            self.proxy_url = Some(v);
        }
        self
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let cfg: StreamConfig = serde_yaml::from_str(yaml)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration_with_context(
                format!("failed to read config file: {}", e),
                ErrorContext::new()
                    .with_details(path.display().to_string())
                    .with_source("config_loader"),
            )
        })?;
        Self::from_yaml_str(&text)
    }

    pub fn heartbeat_timeout(mut self, window: Duration) -> Self {
        self.heartbeat_timeout = window;
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.heartbeat_timeout.is_zero() {
            return Err(Error::configuration_with_context(
                "heartbeat timeout must be non-zero",
                ErrorContext::new()
                    .with_field_path("heartbeat_timeout_secs")
                    .with_source("config_loader"),
            ));
        }
        if !self.path_template.contains(CONVERSATION_PLACEHOLDER) {
            return Err(Error::configuration_with_context(
                format!("path template must contain {}", CONVERSATION_PLACEHOLDER),
                ErrorContext::new()
                    .with_field_path("path_template")
                    .with_details(self.path_template.clone())
                    .with_source("config_loader"),
            ));
        }
        url::Url::parse(&self.base_url).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid base url: {}", e),
                ErrorContext::new()
                    .with_field_path("base_url")
                    .with_details(self.base_url.clone())
                    .with_source("config_loader"),
            )
        })?;
        Ok(())
    }

    /// Full URL for a conversation's message endpoint.
    pub fn endpoint_url(&self, conversation_id: u64) -> String {
        let path = self
            .path_template
            .replace(CONVERSATION_PLACEHOLDER, &conversation_id.to_string());
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

fn env_secs(var: &str) -> Option<Duration> {
    let raw = env::var(var).ok()?;
    match raw.trim().parse::<f64>().ok().map(Duration::try_from_secs_f64) {
        Some(Ok(duration)) => Some(duration),
        _ => {
            tracing::warn!(var, value = %raw, "ignoring unparseable duration override");
            None
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom("duration must be a non-negative, representable number of seconds")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = StreamConfig::default();
        assert_eq!(cfg.heartbeat_timeout, Duration::from_secs(15));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn yaml_partial_overrides_keep_defaults() {
        let cfg = StreamConfig::from_yaml_str(
            "base_url: https://chat.example.com/api/\nheartbeat_timeout_secs: 2.5\n",
        )
        .unwrap();
        assert_eq!(cfg.heartbeat_timeout, Duration::from_millis(2500));
        assert_eq!(cfg.connect_timeout, Duration::from_secs(10));
        assert_eq!(
            cfg.endpoint_url(7),
            "https://chat.example.com/api/conversations/7/messages"
        );
    }

    #[test]
    fn zero_heartbeat_is_rejected() {
        let err = StreamConfig::from_yaml_str("heartbeat_timeout_secs: 0").unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn template_without_placeholder_is_rejected() {
        let err = StreamConfig::from_yaml_str("path_template: /chat").unwrap_err();
        assert_eq!(
            err.context().and_then(|c| c.field_path.as_deref()),
            Some("path_template")
        );
    }

    #[test]
    fn negative_duration_is_a_yaml_error() {
        let err = StreamConfig::from_yaml_str("connect_timeout_secs: -1").unwrap_err();
        assert!(matches!(err, Error::Yaml(_)));
    }

    #[test]
    fn unrepresentable_duration_is_a_yaml_error() {
        let err = StreamConfig::from_yaml_str("heartbeat_timeout_secs: 1e20").unwrap_err();
        assert!(matches!(err, Error::Yaml(_)));
    }

    #[test]
    fn conversation_zero_is_interpolated_verbatim() {
        let cfg = StreamConfig::default().base_url("http://h/api");
        assert_eq!(cfg.endpoint_url(0), "http://h/api/conversations/0/messages");
    }

    #[test]
    fn env_overrides_apply() {
        std::env::set_var("CHAT_STREAM_HEARTBEAT_SECS", "3");
        std::env::set_var("CHAT_STREAM_CONNECT_TIMEOUT_SECS", "not-a-number");
        let cfg = StreamConfig::from_env();
        std::env::set_var("CHAT_STREAM_CONNECT_TIMEOUT_SECS", "1e30");
        let huge = StreamConfig::from_env();
        std::env::remove_var("CHAT_STREAM_HEARTBEAT_SECS");
        std::env::remove_var("CHAT_STREAM_CONNECT_TIMEOUT_SECS");
        assert_eq!(cfg.heartbeat_timeout, Duration::from_secs(3));
        assert_eq!(cfg.connect_timeout, Duration::from_secs(10));
        assert_eq!(huge.connect_timeout, Duration::from_secs(10));
    }
}
