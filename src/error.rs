use crate::transport::TransportError;
use std::time::Duration;
use thiserror::Error;

/// Structured error context for configuration and runtime errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field path or configuration key that caused the error (e.g., "heartbeat_timeout_secs")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected format, actual value)
    pub details: Option<String>,
    /// Source of the error (e.g., "config_loader", "stream_session")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Unified error type for the streaming reply consumer.
///
/// Every fatal condition of a session is reported to the observer as exactly one of these.
/// Malformed records and cancellation are never turned into an `Error`.
#[derive(Debug, Error)]
pub enum Error {
    /// The request did not yield a usable byte stream (bad status or missing body).
    #[error("Failed to open stream: {status} {reason}{}", format_message(.message))]
    Open {
        status: u16,
        reason: String,
        message: String,
    },

    /// The byte stream failed mid-flight, or the request could not be sent at all.
    #[error("Network transport error: {0}")]
    Transport(#[from] TransportError),

    /// No liveness was observed within the heartbeat window.
    #[error("SSE heartbeat timeout: no data within {}ms", .window.as_millis())]
    StallTimeout { window: Duration },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Runtime error: {message}{}", format_context(.context))]
    Runtime {
        message: String,
        context: ErrorContext,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

fn format_message(message: &str) -> String {
    if message.is_empty() {
        String::new()
    } else {
        format!(": {}", message)
    }
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    /// Create a new runtime error with structured context
    pub fn runtime_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Runtime {
            message: msg.into(),
            context,
        }
    }

    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. } | Error::Runtime { context, .. } => Some(context),
            _ => None,
        }
    }

    /// True when the session died because the heartbeat window elapsed.
    pub fn is_stall(&self) -> bool {
        matches!(self, Error::StallTimeout { .. })
    }

    /// HTTP status of an open failure, if that is what this is.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Open { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether a caller-side retry is reasonable.
    ///
    /// Advisory only: the consumer itself never retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::StallTimeout { .. } | Error::Transport(_) => true,
            Error::Open { status, .. } => matches!(*status, 408 | 429 | 500..=599),
            _ => false,
        }
    }
}
