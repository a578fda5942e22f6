//! Shared fixtures: in-memory transports and a recording observer.

#![allow(dead_code)]

use bytes::Bytes;
use chat_stream::transport::{Transport, TransportError, TransportResponse};
use chat_stream::types::{ChatCompletionChunk, RequestSpec};
use chat_stream::{BoxStream, Error, Result, StreamObserver};
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// One observer notification, as recorded.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Delta(String),
    Metadata,
    Done,
    Error(String),
    Cancelled,
}

/// Records every notification and mirrors it onto a channel for awaiting.
#[derive(Clone)]
pub struct RecordingObserver {
    calls: Arc<Mutex<Vec<Call>>>,
    errors: Arc<Mutex<Vec<Error>>>,
    notify: mpsc::UnboundedSender<Call>,
}

impl RecordingObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Call>) {
        let (notify, rx) = mpsc::unbounded_channel();
        (
            Self {
                calls: Arc::new(Mutex::new(Vec::new())),
                errors: Arc::new(Mutex::new(Vec::new())),
                notify,
            },
            rx,
        )
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call.clone());
        let _ = self.notify.send(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn deltas(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Delta(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    /// Number of `on_done` + `on_error` calls.
    pub fn terminal_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Done | Call::Error(_)))
            .count()
    }

    pub fn take_error(&self) -> Option<Error> {
        self.errors.lock().unwrap().pop()
    }
}

impl StreamObserver for RecordingObserver {
    fn on_delta(&mut self, fragment: &str, _chunk: &ChatCompletionChunk) {
        self.record(Call::Delta(fragment.to_string()));
    }

    fn on_done(&mut self) {
        self.record(Call::Done);
    }

    fn on_error(&mut self, error: Error) {
        self.record(Call::Error(error.to_string()));
        self.errors.lock().unwrap().push(error);
    }

    fn on_metadata(&mut self, _chunk: &ChatCompletionChunk) {
        self.record(Call::Metadata);
    }

    fn on_cancelled(&mut self) {
        self.record(Call::Cancelled);
    }
}

/// `data: {"choices":[{"delta":{"content":...}}]}` plus the blank-line separator.
pub fn delta_record(content: &str) -> String {
    let payload = serde_json::json!({ "choices": [ { "delta": { "content": content } } ] });
    format!("data: {}\n\n", payload)
}

/// Replies with a fixed status and a fixed list of body chunks.
pub struct ScriptedTransport {
    status: u16,
    reason: String,
    chunks: Option<Vec<Vec<u8>>>,
    fail_after: Option<String>,
    pub requests: Mutex<Vec<RequestSpec>>,
}

impl ScriptedTransport {
    pub fn ok<I, C>(chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: AsRef<[u8]>,
    {
        Self {
            status: 200,
            reason: "OK".to_string(),
            chunks: Some(chunks.into_iter().map(|c| c.as_ref().to_vec()).collect()),
            fail_after: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn status(status: u16, reason: &str, body: Option<&str>) -> Self {
        Self {
            status,
            reason: reason.to_string(),
            chunks: body.map(|b| vec![b.as_bytes().to_vec()]),
            fail_after: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// After the scripted chunks, the body yields a transport error.
    pub fn then_fail(mut self, message: &str) -> Self {
        self.fail_after = Some(message.to_string());
        self
    }
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn open(&self, request: &RequestSpec, _request_id: &str) -> Result<TransportResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let body = self.chunks.as_ref().map(|chunks| {
            let mut items: Vec<Result<Bytes>> = chunks
                .iter()
                .map(|c| Ok(Bytes::from(c.clone())))
                .collect();
            if let Some(msg) = &self.fail_after {
                items.push(Err(Error::Transport(TransportError::Other(msg.clone()))));
            }
            let stream: BoxStream<'static, Bytes> = Box::pin(futures::stream::iter(items));
            stream
        });
        Ok(TransportResponse::new(self.status, self.reason.clone(), body))
    }
}

/// Body chunks are pushed by the test through a channel, so timing is under test control.
pub struct ChannelTransport {
    rx: Mutex<Option<mpsc::Receiver<Result<Bytes>>>>,
}

impl ChannelTransport {
    pub fn new() -> (Self, mpsc::Sender<Result<Bytes>>) {
        let (tx, rx) = mpsc::channel(64);
        (
            Self {
                rx: Mutex::new(Some(rx)),
            },
            tx,
        )
    }
}

#[async_trait::async_trait]
impl Transport for ChannelTransport {
    async fn open(&self, _request: &RequestSpec, _request_id: &str) -> Result<TransportResponse> {
        let rx = self
            .rx
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| Error::Transport(TransportError::Other("already opened".into())))?;
        Ok(TransportResponse::new(
            200,
            "OK",
            Some(Box::pin(ReceiverStream::new(rx))),
        ))
    }
}

/// Fails before any response is received.
pub struct FailingTransport(pub String);

#[async_trait::async_trait]
impl Transport for FailingTransport {
    async fn open(&self, _request: &RequestSpec, _request_id: &str) -> Result<TransportResponse> {
        Err(Error::Transport(TransportError::Other(self.0.clone())))
    }
}

/// Never produces a response.
pub struct HangingTransport;

#[async_trait::async_trait]
impl Transport for HangingTransport {
    async fn open(&self, _request: &RequestSpec, _request_id: &str) -> Result<TransportResponse> {
        futures::future::pending::<Result<TransportResponse>>().await
    }
}

/// Serves a different body per conversation id, in small chunks that yield in between.
pub struct PerConversationTransport {
    pub bodies: HashMap<u64, String>,
}

#[async_trait::async_trait]
impl Transport for PerConversationTransport {
    async fn open(&self, request: &RequestSpec, _request_id: &str) -> Result<TransportResponse> {
        let body = self
            .bodies
            .get(&request.conversation_id)
            .cloned()
            .unwrap_or_default();
        let chunks: Vec<Bytes> = body
            .as_bytes()
            .chunks(7)
            .map(Bytes::copy_from_slice)
            .collect();
        let stream = futures::stream::iter(chunks).then(|c| async move {
            tokio::task::yield_now().await;
            Ok::<Bytes, Error>(c)
        });
        Ok(TransportResponse::new(200, "OK", Some(Box::pin(stream))))
    }
}
