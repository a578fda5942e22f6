//! One in-flight streamed exchange: state machine, liveness tracking and the read loop.

use crate::client::observer::StreamObserver;
use crate::client::types::{CancelHandle, SessionStats};
use crate::pipeline::EventPipeline;
use crate::transport::{Transport, TransportResponse};
use crate::types::chunk::{ChatCompletion, ChatCompletionChunk};
use crate::types::events::StreamEvent;
use crate::types::request::RequestSpec;
use crate::{BoxStream, Error};
use bytes::Bytes;
use futures::StreamExt;
use std::time::Duration;
use tokio::time::Instant;

/// Most bytes of an error body read to build an open-failure message.
const ERROR_BODY_LIMIT: usize = 8 * 1024;

/// Stand-in deadline for windows too large to add to an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// `Idle → Opening → Streaming → {Completed | Cancelled | Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Opening,
    Streaming,
    Completed,
    Cancelled,
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::Completed | SessionState::Cancelled | SessionState::Failed
        )
    }

    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        match (self, next) {
            (Idle, Opening) => true,
            (Opening, Streaming) | (Opening, Failed) | (Opening, Cancelled) => true,
            (Streaming, Completed) | (Streaming, Failed) | (Streaming, Cancelled) => true,
            _ => false,
        }
    }
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Completed,
    Failed,
    Cancelled,
}

/// Per-call mutable state. Owned by exactly one running session; never shared.
pub struct StreamSession {
    pipeline: EventPipeline,
    state: SessionState,
    last_liveness: Instant,
    heartbeat_timeout: Duration,
    cancel: CancelHandle,
    started: Instant,
    stats: SessionStats,
}

impl StreamSession {
    pub fn new(heartbeat_timeout: Duration, cancel: CancelHandle, request_id: String) -> Self {
        let now = Instant::now();
        Self {
            pipeline: EventPipeline::new(),
            state: SessionState::Idle,
            last_liveness: now,
            heartbeat_timeout,
            cancel,
            started: now,
            stats: SessionStats {
                request_id,
                ..SessionStats::default()
            },
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Apply a transition; returns `false` (and changes nothing) if it is not allowed.
    pub fn transition(&mut self, next: SessionState) -> bool {
        if !self.state.can_transition_to(next) {
            tracing::trace!(from = ?self.state, to = ?next, "rejected session transition");
            return false;
        }
        self.state = next;
        true
    }

    /// Refresh the liveness timestamp.
    pub fn touch(&mut self) {
        self.last_liveness = Instant::now();
    }

    /// First instant at which the session counts as stalled.
    ///
    /// Silence of exactly the window is still live; only a longer gap stalls.
    pub fn deadline(&self) -> Instant {
        deadline_after(self.last_liveness, self.heartbeat_timeout)
    }

    pub fn is_stalled(&self) -> bool {
        self.last_liveness.elapsed() > self.heartbeat_timeout
    }

    /// Drive the session to a terminal state, notifying `observer` along the way.
    pub async fn run<O>(
        mut self,
        transport: &dyn Transport,
        request: &RequestSpec,
        observer: &mut O,
    ) -> (SessionOutcome, SessionStats)
    where
        O: StreamObserver + ?Sized,
    {
        let outcome = self.drive(transport, request, observer).await;
        self.stats.duration = self.started.elapsed();
        tracing::debug!(
            outcome = ?outcome,
            deltas = self.stats.deltas,
            malformed = self.stats.malformed,
            bytes = self.stats.bytes,
            "stream session finished"
        );
        (outcome, self.stats)
    }

    async fn drive<O>(
        &mut self,
        transport: &dyn Transport,
        request: &RequestSpec,
        observer: &mut O,
    ) -> SessionOutcome
    where
        O: StreamObserver + ?Sized,
    {
        self.transition(SessionState::Opening);
        if self.cancel.is_aborted() {
            return self.cancelled(observer);
        }

        // A server that accepts the connection but never answers stalls like a silent body.
        self.touch();
        let deadline = self.deadline();
        let cancel = self.cancel.clone();
        let request_id = self.stats.request_id.clone();
        let opened = tokio::select! {
            biased;
            _ = cancel.aborted() => return self.cancelled(observer),
            _ = tokio::time::sleep_until(deadline) => return self.stalled(observer),
            res = transport.open(request, &request_id) => res,
        };

        let response = match opened {
            Err(e) => return self.fail(observer, e),
            Ok(response) => response,
        };
        self.stats.status = Some(response.status);

        let body = match response {
            TransportResponse {
                status,
                body: Some(body),
                ..
            } if (200..300).contains(&status) => body,
            TransportResponse {
                status,
                reason,
                body,
            } => {
                return match self.open_failure(status, reason, body).await {
                    Some(err) => self.fail(observer, err),
                    None => self.cancelled(observer),
                };
            }
        };

        self.transition(SessionState::Streaming);
        self.touch();

        if request.stream {
            self.read_stream(body, observer).await
        } else {
            self.read_whole(body, observer).await
        }
    }

    async fn read_stream<O>(
        &mut self,
        mut body: BoxStream<'static, Bytes>,
        observer: &mut O,
    ) -> SessionOutcome
    where
        O: StreamObserver + ?Sized,
    {
        let cancel = self.cancel.clone();
        loop {
            let deadline = self.deadline();
            let next = tokio::select! {
                biased;
                _ = cancel.aborted() => return self.cancelled(observer),
                _ = tokio::time::sleep_until(deadline) => return self.stalled(observer),
                item = body.next() => item,
            };

            match next {
                Some(Ok(bytes)) => {
                    if self.is_stalled() {
                        return self.stalled(observer);
                    }
                    self.stats.bytes += bytes.len() as u64;
                    self.pipeline.push_bytes(&bytes);
                    if let Some(outcome) = self.dispatch(observer) {
                        return outcome;
                    }
                }
                Some(Err(e)) => return self.fail(observer, e),
                None => {
                    tracing::debug!("stream ended without sentinel");
                    self.pipeline.finish();
                    if let Some(outcome) = self.dispatch(observer) {
                        return outcome;
                    }
                    return self.complete(observer);
                }
            }
        }
    }

    /// Deliver every event decoded so far. `Some` once the session reached a terminal state.
    fn dispatch<O>(&mut self, observer: &mut O) -> Option<SessionOutcome>
    where
        O: StreamObserver + ?Sized,
    {
        while let Some(event) = self.pipeline.next_event() {
            // An observer callback may have aborted the session.
            if self.cancel.is_aborted() {
                return Some(self.cancelled(observer));
            }

            if event.is_liveness() {
                self.touch();
            }
            match event {
                StreamEvent::Delta { content, chunk } => {
                    self.stats.deltas += 1;
                    observer.on_delta(&content, &chunk);
                }
                StreamEvent::Empty { chunk } => observer.on_metadata(&chunk),
                StreamEvent::Heartbeat => self.stats.heartbeats += 1,
                StreamEvent::Malformed { payload, reason } => {
                    self.stats.malformed += 1;
                    if payload.trim().is_empty() {
                        tracing::debug!("skipping empty sse payload");
                    } else {
                        tracing::warn!(
                            payload = %truncate(&payload, 256),
                            %reason,
                            "failed to parse sse chunk"
                        );
                    }
                }
                StreamEvent::Done => return Some(self.complete(observer)),
            }
        }
        None
    }

    async fn read_whole<O>(
        &mut self,
        mut body: BoxStream<'static, Bytes>,
        observer: &mut O,
    ) -> SessionOutcome
    where
        O: StreamObserver + ?Sized,
    {
        let cancel = self.cancel.clone();
        let mut buf = Vec::new();
        loop {
            let deadline = self.deadline();
            let next = tokio::select! {
                biased;
                _ = cancel.aborted() => return self.cancelled(observer),
                _ = tokio::time::sleep_until(deadline) => return self.stalled(observer),
                item = body.next() => item,
            };
            match next {
                Some(Ok(bytes)) => {
                    self.touch();
                    self.stats.bytes += bytes.len() as u64;
                    buf.extend_from_slice(&bytes);
                }
                Some(Err(e)) => return self.fail(observer, e),
                None => break,
            }
        }
        drop(body);

        let chunk = match serde_json::from_slice::<ChatCompletion>(&buf) {
            Ok(completion) => ChatCompletionChunk::from(completion),
            Err(e) => return self.fail(observer, Error::Serialization(e)),
        };
        match chunk.content_fragment() {
            Some(fragment) => {
                self.stats.deltas += 1;
                observer.on_delta(fragment, &chunk);
            }
            None => observer.on_metadata(&chunk),
        }
        self.complete(observer)
    }

    /// Build the error for an unusable response. `None` if aborted meanwhile.
    async fn open_failure(
        &mut self,
        status: u16,
        reason: String,
        body: Option<BoxStream<'static, Bytes>>,
    ) -> Option<Error> {
        let Some(mut body) = body else {
            let message = if (200..300).contains(&status) {
                "response has no body".to_string()
            } else {
                String::new()
            };
            return Some(Error::Open {
                status,
                reason,
                message,
            });
        };

        // The error body is best effort: bounded in size and by the heartbeat window.
        let cancel = self.cancel.clone();
        let deadline = deadline_after(Instant::now(), self.heartbeat_timeout);
        let mut buf = Vec::new();
        while buf.len() < ERROR_BODY_LIMIT {
            let next = tokio::select! {
                biased;
                _ = cancel.aborted() => return None,
                _ = tokio::time::sleep_until(deadline) => break,
                item = body.next() => item,
            };
            match next {
                Some(Ok(bytes)) => buf.extend_from_slice(&bytes),
                _ => break,
            }
        }
        buf.truncate(ERROR_BODY_LIMIT);

        Some(Error::Open {
            status,
            reason,
            message: error_body_message(&buf),
        })
    }

    fn complete<O: StreamObserver + ?Sized>(&mut self, observer: &mut O) -> SessionOutcome {
        // The last on_delta may have aborted the session.
        if self.cancel.is_aborted() {
            return self.cancelled(observer);
        }
        if self.transition(SessionState::Completed) {
            observer.on_done();
        }
        SessionOutcome::Completed
    }

    fn fail<O: StreamObserver + ?Sized>(&mut self, observer: &mut O, error: Error) -> SessionOutcome {
        if self.transition(SessionState::Failed) {
            tracing::debug!(error = %error, "stream session failed");
            observer.on_error(error);
        }
        SessionOutcome::Failed
    }

    fn stalled<O: StreamObserver + ?Sized>(&mut self, observer: &mut O) -> SessionOutcome {
        tracing::warn!(
            window_ms = self.heartbeat_timeout.as_millis() as u64,
            "sse heartbeat timeout"
        );
        let window = self.heartbeat_timeout;
        self.fail(observer, Error::StallTimeout { window })
    }

    fn cancelled<O: StreamObserver + ?Sized>(&mut self, observer: &mut O) -> SessionOutcome {
        if self.transition(SessionState::Cancelled) {
            tracing::debug!("stream session cancelled");
            observer.on_cancelled();
        }
        SessionOutcome::Cancelled
    }
}

fn deadline_after(from: Instant, window: Duration) -> Instant {
    window
        .checked_add(Duration::from_millis(1))
        .and_then(|w| from.checked_add(w))
        .unwrap_or_else(|| Instant::now() + FAR_FUTURE)
}

/// Pull a human-readable message out of an error body.
///
/// Accepts `{"error": "..."}`, `{"error": {"message": "..."}}` and `{"message": "..."}`,
/// otherwise falls back to the trimmed text.
pub(crate) fn error_body_message(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(&text) {
        let found = value
            .get("error")
            .and_then(|e| e.as_str().or_else(|| e.get("message").and_then(|m| m.as_str())))
            .or_else(|| value.get("message").and_then(|m| m.as_str()));
        if let Some(msg) = found {
            return msg.to_string();
        }
    }
    truncate(text.trim(), 512).to_string()
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
