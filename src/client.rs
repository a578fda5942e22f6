//! Streaming reply consumer.
//!
//! Implementation details are split into submodules under `src/client/`.

pub mod builder;
pub mod consumer;
pub mod observer;
pub mod session;
pub mod types;

pub use builder::StreamingReplyConsumerBuilder;
pub use consumer::{StreamTask, StreamingReplyConsumer};
pub use observer::{CallbackObserver, CollectedReply, ReplyAccumulator, StreamObserver};
pub use session::{SessionOutcome, SessionState, StreamSession};
pub use types::{CancelHandle, SessionStats};
