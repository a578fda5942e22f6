//! OpenAI-compatible reply payloads

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

/// One streamed `data:` payload: `{ choices: [ { delta: { content? } } ] }`.
///
/// Unknown fields are ignored, and so are known fields of an unexpected type or
/// `null`: a backend that sends `"id": 42` or `"delta": null` still gets its
/// content through. Only `choices`, when present, must be an array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub created: Option<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkChoice {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub delta: ChunkDelta,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkDelta {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

// A field of the wrong type reads as absent instead of failing the whole chunk.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl ChatCompletionChunk {
    /// Non-empty `content` of the first choice.
    pub fn content_fragment(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.delta.content.as_deref())
            .filter(|s| !s.is_empty())
    }

    pub fn finish_reason(&self) -> Option<&str> {
        self.choices.first().and_then(|c| c.finish_reason.as_deref())
    }
}

/// Full body of a non-streamed reply: `{ choices: [ { message: { content } } ] }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletion {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub created: Option<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub choices: Vec<CompletionChoice>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionChoice {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: ChunkDelta,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

impl From<ChatCompletion> for ChatCompletionChunk {
    /// Re-shape a complete reply as a single chunk so observers see one code path.
    fn from(completion: ChatCompletion) -> Self {
        ChatCompletionChunk {
            id: completion.id,
            object: Some("chat.completion".to_string()),
            model: completion.model,
            created: completion.created,
            choices: completion
                .choices
                .into_iter()
                .map(|c| ChunkChoice {
                    index: c.index,
                    delta: c.message,
                    finish_reason: c.finish_reason,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_openai_chunk_with_extra_fields() {
        let raw = r#"{"id":"chatcmpl-1","object":"chat.completion.chunk","created":1694268190,"model":"gpt-4o","system_fingerprint":"fp","choices":[{"index":0,"delta":{"content":"Hi"},"finish_reason":null,"logprobs":null}]}"#;
        let chunk: ChatCompletionChunk = serde_json::from_str(raw).unwrap();
        assert_eq!(chunk.content_fragment(), Some("Hi"));
        assert_eq!(chunk.model.as_deref(), Some("gpt-4o"));
        assert_eq!(chunk.finish_reason(), None);
    }

    #[test]
    fn empty_or_missing_content_is_not_a_fragment() {
        let role_only: ChatCompletionChunk =
            serde_json::from_str(r#"{"choices":[{"delta":{"role":"assistant","content":""}}]}"#)
                .unwrap();
        assert_eq!(role_only.content_fragment(), None);

        let finish: ChatCompletionChunk =
            serde_json::from_str(r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#).unwrap();
        assert_eq!(finish.content_fragment(), None);
        assert_eq!(finish.finish_reason(), Some("stop"));

        let none: ChatCompletionChunk = serde_json::from_str("{}").unwrap();
        assert!(none.choices.is_empty());
    }

    #[test]
    fn mistyped_or_null_fields_do_not_lose_content() {
        let chunk: ChatCompletionChunk = serde_json::from_str(
            r#"{"id":42,"created":"yesterday","model":null,"choices":[{"index":"0","delta":{"role":7,"content":"A"}}]}"#,
        )
        .unwrap();
        assert_eq!(chunk.content_fragment(), Some("A"));
        assert_eq!(chunk.id, None);
        assert_eq!(chunk.created, None);

        let null_delta: ChatCompletionChunk =
            serde_json::from_str(r#"{"choices":[{"delta":null,"finish_reason":"stop"}]}"#).unwrap();
        assert_eq!(null_delta.content_fragment(), None);
        assert_eq!(null_delta.finish_reason(), Some("stop"));

        let null_choices: ChatCompletionChunk =
            serde_json::from_str(r#"{"choices":null}"#).unwrap();
        assert!(null_choices.choices.is_empty());
    }

    #[test]
    fn non_object_payloads_fail_to_parse() {
        assert!(serde_json::from_str::<ChatCompletionChunk>("oops").is_err());
        assert!(serde_json::from_str::<ChatCompletionChunk>("42").is_err());
        assert!(serde_json::from_str::<ChatCompletionChunk>(r#"{"choices":"x"}"#).is_err());
    }

    #[test]
    fn completion_converts_to_chunk() {
        let raw = r#"{"id":"c1","choices":[{"message":{"role":"assistant","content":"full"},"finish_reason":"stop"}]}"#;
        let completion: ChatCompletion = serde_json::from_str(raw).unwrap();
        let chunk = ChatCompletionChunk::from(completion);
        assert_eq!(chunk.content_fragment(), Some("full"));
        assert_eq!(chunk.finish_reason(), Some("stop"));
        assert_eq!(chunk.id.as_deref(), Some("c1"));
    }
}
