//! # Types Module
//!
//! Core data types shared by the transport, the decoder and the consumer.
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`RequestSpec`] | Outbound send intent (conversation, payload, stream flag) |
//! | [`SendMessagePayload`] | JSON body fields of a send |
//! | [`ChatCompletionChunk`] | One parsed `data:` payload of a streamed reply |
//! | [`ChatCompletion`] | Full body of a non-streamed reply |
//! | [`StreamEvent`] | Decoded unit extracted from the byte stream |
//!
//! ## Example
//!
//! ```rust
//! use chat_stream::types::{RequestSpec, SendMessagePayload};
//!
//! // Conversation 0 means "create on first send"; it is passed through as-is.
//! let request = RequestSpec::streamed(0, SendMessagePayload::new("Hello").model("gpt-4o-mini"));
//! assert!(request.stream);
//! ```

pub mod chunk;
pub mod events;
pub mod request;

pub use chunk::{ChatCompletion, ChatCompletionChunk, ChunkChoice, ChunkDelta};
pub use events::StreamEvent;
pub use request::{ConversationId, RequestSpec, SendMessagePayload};
