use crate::client::builder::StreamingReplyConsumerBuilder;
use crate::client::observer::{CollectedReply, ReplyAccumulator, StreamObserver};
use crate::client::session::{SessionOutcome, StreamSession};
use crate::client::types::{CancelHandle, SessionStats};
use crate::transport::Transport;
use crate::types::request::RequestSpec;
use crate::{Error, ErrorContext, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;

/// Turns chat sends into observer notifications.
///
/// Cheap to clone; every send gets its own [`StreamSession`], so concurrent
/// streams (e.g. two conversations) share nothing mutable.
#[derive(Clone)]
pub struct StreamingReplyConsumer {
    transport: Arc<dyn Transport>,
    heartbeat_timeout: Duration,
}

impl StreamingReplyConsumer {
    pub fn new(transport: Arc<dyn Transport>, heartbeat_timeout: Duration) -> Self {
        Self {
            transport,
            heartbeat_timeout,
        }
    }

    pub fn builder() -> StreamingReplyConsumerBuilder {
        StreamingReplyConsumerBuilder::new()
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        self.heartbeat_timeout
    }

    /// Start a send and return immediately with its cancel handle.
    ///
    /// The session runs on a spawned tokio task that owns `observer`; all
    /// notifications arrive from there. Must be called within a tokio runtime.
    pub fn start_stream<O>(&self, request: RequestSpec, observer: O) -> CancelHandle
    where
        O: StreamObserver + 'static,
    {
        self.spawn(request, observer).cancel
    }

    /// Like [`start_stream`](Self::start_stream), but also hands back the task so
    /// the caller can await the outcome.
    pub fn spawn<O>(&self, request: RequestSpec, observer: O) -> StreamTask
    where
        O: StreamObserver + 'static,
    {
        let cancel = CancelHandle::new();
        let this = self.clone();
        let task_cancel = cancel.clone();
        let join = tokio::spawn(async move {
            let mut observer = observer;
            this.run(&request, &mut observer, &task_cancel).await
        });
        StreamTask { cancel, join }
    }

    /// Drive one session on the current task until it reaches a terminal state.
    pub async fn run<O>(
        &self,
        request: &RequestSpec,
        observer: &mut O,
        cancel: &CancelHandle,
    ) -> (SessionOutcome, SessionStats)
    where
        O: StreamObserver + ?Sized,
    {
        let request_id = Uuid::new_v4().to_string();
        let span = tracing::info_span!(
            "stream_session",
            conversation_id = request.conversation_id,
            request_id = %request_id,
            stream = request.stream,
        );
        let session = StreamSession::new(self.heartbeat_timeout, cancel.clone(), request_id);
        session
            .run(self.transport.as_ref(), request, observer)
            .instrument(span)
            .await
    }

    /// Run a send to completion and return the assembled reply.
    pub async fn collect(&self, request: &RequestSpec) -> Result<CollectedReply> {
        let mut acc = ReplyAccumulator::new();
        self.run(request, &mut acc, &CancelHandle::new()).await;
        acc.into_result()
    }
}

/// A spawned session: its cancel handle plus the task driving it.
pub struct StreamTask {
    pub cancel: CancelHandle,
    join: JoinHandle<(SessionOutcome, SessionStats)>,
}

impl StreamTask {
    pub fn abort(&self) {
        self.cancel.abort();
    }

    /// Wait for the session to finish.
    pub async fn wait(self) -> Result<(SessionOutcome, SessionStats)> {
        self.join.await.map_err(|e| {
            Error::runtime_with_context(
                format!("stream task failed: {}", e),
                ErrorContext::new().with_source("stream_session"),
            )
        })
    }
}
