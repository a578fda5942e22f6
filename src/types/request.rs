//! Outbound request types

use serde::{Deserialize, Serialize};

/// Conversation identifier as the backend knows it.
///
/// `0` means "create the conversation on first send" and is forwarded untouched.
pub type ConversationId = u64;

/// JSON body fields of a chat send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMessagePayload {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_thinking: Option<bool>,
}

impl SendMessagePayload {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            model_id: None,
            enable_thinking: None,
        }
    }

    pub fn model(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }

    pub fn thinking(mut self, enable: bool) -> Self {
        self.enable_thinking = Some(enable);
        self
    }
}

/// The outbound intent of one send. Immutable once handed to the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSpec {
    pub conversation_id: ConversationId,
    pub payload: SendMessagePayload,
    /// Streamed (`text/event-stream`) vs. single JSON body reply.
    pub stream: bool,
}

impl RequestSpec {
    pub fn streamed(conversation_id: ConversationId, payload: SendMessagePayload) -> Self {
        Self {
            conversation_id,
            payload,
            stream: true,
        }
    }

    pub fn unstreamed(conversation_id: ConversationId, payload: SendMessagePayload) -> Self {
        Self {
            conversation_id,
            payload,
            stream: false,
        }
    }

    /// Wire body: the payload fields plus `conversation_id` and `stream`.
    pub fn to_body(&self) -> serde_json::Value {
        #[derive(Serialize)]
        struct Body<'a> {
            conversation_id: ConversationId,
            #[serde(flatten)]
            payload: &'a SendMessagePayload,
            stream: bool,
        }

        // Serializing plain structs into a Value cannot fail.
        serde_json::to_value(Body {
            conversation_id: self.conversation_id,
            payload: &self.payload,
            stream: self.stream,
        })
        .unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn body_flattens_payload_and_keeps_zero_conversation() {
        let req = RequestSpec::streamed(0, SendMessagePayload::new("hi").thinking(true));
        assert_eq!(
            req.to_body(),
            json!({
                "conversation_id": 0,
                "message": "hi",
                "enable_thinking": true,
                "stream": true
            })
        );
    }

    #[test]
    fn unstreamed_body_has_stream_false() {
        let req = RequestSpec::unstreamed(42, SendMessagePayload::new("x").model("mock-mini"));
        let body = req.to_body();
        assert_eq!(body["stream"], json!(false));
        assert_eq!(body["model_id"], json!("mock-mini"));
        assert_eq!(body["conversation_id"], json!(42));
    }
}
