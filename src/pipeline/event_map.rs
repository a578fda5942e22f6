//! Record classification: framed SSE records -> [`StreamEvent`]s.

use crate::pipeline::decode::SseRecord;
use crate::types::chunk::ChatCompletionChunk;
use crate::types::events::StreamEvent;

/// Literal payload that marks successful completion.
pub const DONE_SENTINEL: &str = "[DONE]";

/// `event:` name some backends use instead of the sentinel payload.
pub const DONE_EVENT: &str = "done";

/// Append the events carried by one record to `out`, in order.
///
/// A record with both a comment line and a payload yields a `Heartbeat`
/// followed by the payload's event.
pub fn map_record(record: &SseRecord, out: &mut impl Extend<StreamEvent>) {
    if record.comments > 0 {
        out.extend(Some(StreamEvent::Heartbeat));
    }

    if record.event.as_deref() == Some(DONE_EVENT) {
        out.extend(Some(StreamEvent::Done));
        return;
    }

    if let Some(payload) = record.data.as_deref() {
        out.extend(Some(map_payload(payload)));
    }
}

/// Classify a single `data:` payload.
pub fn map_payload(payload: &str) -> StreamEvent {
    if payload == DONE_SENTINEL {
        return StreamEvent::Done;
    }

    match serde_json::from_str::<ChatCompletionChunk>(payload) {
        Ok(chunk) => match chunk.content_fragment() {
            Some(fragment) => StreamEvent::Delta {
                content: fragment.to_string(),
                chunk,
            },
            None => StreamEvent::Empty { chunk },
        },
        Err(e) => StreamEvent::Malformed {
            payload: payload.to_string(),
            reason: e.to_string(),
        },
    }
}
