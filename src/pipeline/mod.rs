//! # Event Pipeline
//!
//! Turns the raw bytes of a `text/event-stream` body into [`StreamEvent`]s.
//!
//! ## Pipeline Stages
//!
//! ```text
//! Bytes → Utf8Decoder → SseFramer → SseRecord::parse → event_map → StreamEvent
//!   │          │             │               │               │
//!  HTTP   split chars   blank-line     data/event/     Delta, Done,
//!         carried over  separated      comment lines   Heartbeat, ...
//! ```
//!
//! The pipeline is push-based: the session feeds it one transport chunk at a time
//! and drains events until none are left. Events are produced lazily, so once a
//! terminal event has been taken the records behind it are never parsed.
//!
//! ## Submodules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`decode`] | Incremental UTF-8 decoding and record framing |
//! | [`event_map`] | Record classification into events |
//!
//! ## Example
//!
//! ```rust
//! use chat_stream::pipeline::EventPipeline;
//! use chat_stream::types::StreamEvent;
//!
//! let mut pipeline = EventPipeline::new();
//! pipeline.push_bytes(b"data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\ndata: [DO");
//! assert!(matches!(pipeline.next_event(), Some(StreamEvent::Delta { .. })));
//! assert_eq!(pipeline.next_event(), None);
//!
//! pipeline.push_bytes(b"NE]\n\n");
//! assert_eq!(pipeline.next_event(), Some(StreamEvent::Done));
//! ```

pub mod decode;
pub mod event_map;

use crate::types::events::StreamEvent;
use decode::{SseFramer, SseRecord, Utf8Decoder};
use std::collections::VecDeque;

/// Per-session decoding state: the carried-over bytes and the unframed text buffer.
#[derive(Debug, Default)]
pub struct EventPipeline {
    utf8: Utf8Decoder,
    framer: SseFramer,
    ready: VecDeque<StreamEvent>,
    scratch: String,
}

impl EventPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one transport chunk.
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.scratch.clear();
        self.utf8.decode_into(bytes, &mut self.scratch);
        self.framer.push(&self.scratch);
    }

    /// Next decoded event, or `None` when no complete record is buffered.
    pub fn next_event(&mut self) -> Option<StreamEvent> {
        loop {
            if let Some(ev) = self.ready.pop_front() {
                return Some(ev);
            }
            let raw = self.framer.next_record()?;
            self.map_raw(&raw);
        }
    }

    /// End of input: flush the UTF-8 tail and frame any unterminated record.
    pub fn finish(&mut self) {
        let tail = self.utf8.finish();
        if !tail.is_empty() {
            self.framer.push(&tail);
        }
        while let Some(raw) = self.framer.next_record() {
            self.map_raw(&raw);
        }
        if let Some(raw) = self.framer.finish() {
            self.map_raw(&raw);
        }
    }

    /// Text buffered but not yet framed into a record.
    pub fn buffered(&self) -> &str {
        self.framer.buffered()
    }

    fn map_raw(&mut self, raw: &str) {
        let record = SseRecord::parse(raw);
        tracing::trace!(
            comments = record.comments,
            event_name = record.event.as_deref().unwrap_or(""),
            data_len = record.data.as_ref().map(|d| d.len()).unwrap_or(0),
            "sse record"
        );
        event_map::map_record(&record, &mut self.ready);
    }
}
