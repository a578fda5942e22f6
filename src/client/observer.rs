//! Observer side of a streamed exchange.

use crate::types::chunk::ChatCompletionChunk;
use crate::{Error, ErrorContext, Result};

/// Receives the notifications of one session.
///
/// All callbacks of a session run one at a time, in stream order, on the task
/// that drives it. `on_done`, `on_error` and `on_cancelled` are mutually
/// exclusive and delivered at most once; nothing follows them.
pub trait StreamObserver: Send {
    /// A non-empty content fragment and the chunk it was taken from.
    fn on_delta(&mut self, fragment: &str, chunk: &ChatCompletionChunk);

    fn on_done(&mut self);

    fn on_error(&mut self, error: Error);

    /// Parsed chunk without content (role announcement, finish reason, ...).
    fn on_metadata(&mut self, _chunk: &ChatCompletionChunk) {}

    /// The session was aborted through its `CancelHandle`. Not an error.
    fn on_cancelled(&mut self) {}
}

impl<T: StreamObserver + ?Sized> StreamObserver for Box<T> {
    fn on_delta(&mut self, fragment: &str, chunk: &ChatCompletionChunk) {
        (**self).on_delta(fragment, chunk)
    }

    fn on_done(&mut self) {
        (**self).on_done()
    }

    fn on_error(&mut self, error: Error) {
        (**self).on_error(error)
    }

    fn on_metadata(&mut self, chunk: &ChatCompletionChunk) {
        (**self).on_metadata(chunk)
    }

    fn on_cancelled(&mut self) {
        (**self).on_cancelled()
    }
}

type DeltaFn = Box<dyn FnMut(&str, &ChatCompletionChunk) + Send>;
type DoneFn = Box<dyn FnMut() + Send>;
type ErrorFn = Box<dyn FnMut(Error) + Send>;

/// Closure-backed observer for callers that don't want their own type.
///
/// ```rust
/// use chat_stream::client::CallbackObserver;
///
/// let observer = CallbackObserver::new(|fragment, _chunk| print!("{fragment}"), || println!())
///     .with_on_error(|e| eprintln!("stream failed: {e}"));
/// # drop(observer);
/// ```
pub struct CallbackObserver {
    on_delta: DeltaFn,
    on_done: DoneFn,
    on_error: Option<ErrorFn>,
    on_cancelled: Option<DoneFn>,
}

impl CallbackObserver {
    pub fn new(
        on_delta: impl FnMut(&str, &ChatCompletionChunk) + Send + 'static,
        on_done: impl FnMut() + Send + 'static,
    ) -> Self {
        Self {
            on_delta: Box::new(on_delta),
            on_done: Box::new(on_done),
            on_error: None,
            on_cancelled: None,
        }
    }

    pub fn with_on_error(mut self, on_error: impl FnMut(Error) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(on_error));
        self
    }

    pub fn with_on_cancelled(mut self, on_cancelled: impl FnMut() + Send + 'static) -> Self {
        self.on_cancelled = Some(Box::new(on_cancelled));
        self
    }
}

impl StreamObserver for CallbackObserver {
    fn on_delta(&mut self, fragment: &str, chunk: &ChatCompletionChunk) {
        (self.on_delta)(fragment, chunk)
    }

    fn on_done(&mut self) {
        (self.on_done)()
    }

    fn on_error(&mut self, error: Error) {
        match self.on_error.as_mut() {
            Some(f) => f(error),
            None => tracing::warn!(error = %error, "stream failed with no error callback installed"),
        }
    }

    fn on_cancelled(&mut self) {
        if let Some(f) = self.on_cancelled.as_mut() {
            f()
        }
    }
}

/// Complete reply assembled from a session's deltas.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectedReply {
    pub content: String,
    pub finish_reason: Option<String>,
    pub model: Option<String>,
    pub id: Option<String>,
}

#[derive(Debug)]
enum Terminal {
    Done,
    Failed(Error),
    Cancelled,
}

/// Observer that appends every delta into one growing reply (the "draft message").
#[derive(Debug, Default)]
pub struct ReplyAccumulator {
    reply: CollectedReply,
    deltas: usize,
    terminal: Option<Terminal>,
}

impl ReplyAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text received so far.
    pub fn content(&self) -> &str {
        &self.reply.content
    }

    pub fn delta_count(&self) -> usize {
        self.deltas
    }

    pub fn is_finished(&self) -> bool {
        self.terminal.is_some()
    }

    /// The reply if the session completed, its error if it failed.
    pub fn into_result(self) -> Result<CollectedReply> {
        match self.terminal {
            Some(Terminal::Done) => Ok(self.reply),
            Some(Terminal::Failed(e)) => Err(e),
            Some(Terminal::Cancelled) => Err(Error::runtime_with_context(
                "stream was cancelled before completion",
                ErrorContext::new().with_source("reply_accumulator"),
            )),
            None => Err(Error::runtime_with_context(
                "stream ended without a terminal signal",
                ErrorContext::new().with_source("reply_accumulator"),
            )),
        }
    }

    fn absorb_chunk(&mut self, chunk: &ChatCompletionChunk) {
        if let Some(reason) = chunk.finish_reason() {
            self.reply.finish_reason = Some(reason.to_string());
        }
        if self.reply.model.is_none() {
            self.reply.model = chunk.model.clone();
        }
        if self.reply.id.is_none() {
            self.reply.id = chunk.id.clone();
        }
    }
}

impl StreamObserver for ReplyAccumulator {
    fn on_delta(&mut self, fragment: &str, chunk: &ChatCompletionChunk) {
        self.deltas += 1;
        self.reply.content.push_str(fragment);
        self.absorb_chunk(chunk);
    }

    fn on_done(&mut self) {
        self.terminal = Some(Terminal::Done);
    }

    fn on_error(&mut self, error: Error) {
        self.terminal = Some(Terminal::Failed(error));
    }

    fn on_metadata(&mut self, chunk: &ChatCompletionChunk) {
        self.absorb_chunk(chunk);
    }

    fn on_cancelled(&mut self) {
        self.terminal = Some(Terminal::Cancelled);
    }
}
