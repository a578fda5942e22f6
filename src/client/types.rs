use std::time::Duration;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// Handle used to abort an in-flight streamed exchange.
///
/// Cloning is cheap and every clone controls the same session. `abort()` is
/// idempotent and a no-op once the session has already terminated.
#[derive(Clone, Debug, Default)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Request cancellation. The pending transport read observes this right away;
    /// no `on_done`/`on_error` is delivered afterwards.
    pub fn abort(&self) {
        self.token.cancel();
    }

    pub fn is_aborted(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once `abort()` has been called on any clone.
    pub fn aborted(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }
}

/// Per-session counters, reported alongside the outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Correlation id sent with the request.
    pub request_id: String,
    /// HTTP status of the response, when one was received.
    pub status: Option<u16>,
    pub bytes: u64,
    pub deltas: u64,
    pub heartbeats: u64,
    pub malformed: u64,
    pub duration: Duration,
}
