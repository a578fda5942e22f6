//! Decoded stream events

use crate::types::chunk::ChatCompletionChunk;

/// A unit decoded from one event-stream record, in byte-receipt order.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Content fragment plus the chunk it came from.
    Delta {
        content: String,
        chunk: ChatCompletionChunk,
    },

    /// Parsed chunk without content (role announcement, finish reason, ...).
    Empty { chunk: ChatCompletionChunk },

    /// `[DONE]` sentinel or a `done` event: terminal success.
    Done,

    /// `:` comment record. Keeps the session alive, carries nothing.
    Heartbeat,

    /// Payload that did not parse as a chunk. Skipped, never fatal.
    Malformed { payload: String, reason: String },
}

impl StreamEvent {
    /// Whether this event refreshes the session's liveness timestamp.
    pub fn is_liveness(&self) -> bool {
        matches!(
            self,
            StreamEvent::Delta { .. } | StreamEvent::Empty { .. } | StreamEvent::Heartbeat
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done)
    }
}
