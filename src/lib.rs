//! # chat-stream
//!
//! Streaming reply consumer for conversational-AI chat backends.
//!
//! ## Overview
//!
//! A chat send is turned into a sequence of observer notifications: the consumer
//! opens a streamed HTTP response, decodes the `text/event-stream` body into
//! events, and delivers content fragments as they arrive.
//!
//! - **Streaming-First**: incremental UTF-8 decoding and SSE framing that tolerate
//!   arbitrary chunk boundaries
//! - **Definitive Termination**: every non-cancelled session ends in exactly one
//!   `on_done` or `on_error`
//! - **Stall Detection**: a configurable heartbeat window fails silent streams
//! - **Cooperative Cancellation**: [`CancelHandle::abort`] unblocks the pending read
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chat_stream::{CallbackObserver, RequestSpec, SendMessagePayload, StreamingReplyConsumer};
//!
//! #[tokio::main]
//! async fn main() -> chat_stream::Result<()> {
//!     let consumer = StreamingReplyConsumer::builder().build()?;
//!
//!     let request = RequestSpec::streamed(0, SendMessagePayload::new("Hello!"));
//!     let observer = CallbackObserver::new(|fragment, _chunk| print!("{fragment}"), || println!())
//!         .with_on_error(|e| eprintln!("error: {e}"));
//!
//!     let handle = consumer.start_stream(request, observer);
//!     // ... later, e.g. when the user presses "stop":
//!     handle.abort();
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | Consumer, session state machine, observers, cancel handle |
//! | [`pipeline`] | Byte → text → record → event decoding |
//! | [`transport`] | Transport trait, reqwest implementation, token providers |
//! | [`types`] | Requests, reply chunks, stream events |
//! | [`config`] | Configuration (defaults, env, YAML) |

pub mod client;
pub mod config;
pub mod pipeline;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use client::{
    CallbackObserver, CancelHandle, CollectedReply, ReplyAccumulator, SessionOutcome,
    SessionStats, StreamObserver, StreamTask, StreamingReplyConsumer,
};
pub use config::StreamConfig;
pub use transport::{HttpTransport, Transport, TransportResponse};
pub use types::{
    events::StreamEvent,
    request::{RequestSpec, SendMessagePayload},
    ChatCompletionChunk,
};

use futures::Stream;
use std::pin::Pin;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// A unified pinned, boxed stream that emits `Result<T>`
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = Result<T>> + Send + 'a>>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
