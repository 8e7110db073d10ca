use serde::{Deserialize, Serialize};

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Serialize, Debug)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub stream: bool,
}

/// Body of a non-streaming chat completion.
#[derive(Deserialize, Debug)]
pub struct ChatCompletion {
    #[serde(default)]
    pub choices: Vec<CompletionChoice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Deserialize, Debug)]
pub struct CompletionChoice {
    pub message: Option<CompletionMessage>,
}

#[derive(Deserialize, Debug)]
pub struct CompletionMessage {
    pub content: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

#[derive(Deserialize, Debug)]
pub struct ChatResponseDelta {
    pub content: Option<String>,
}

/// One decoded `data:` object of a streamed completion.
///
/// Some gateways send the full `message` object instead of a `delta`,
/// so both are accepted.
#[derive(Deserialize, Debug)]
pub struct ChatResponseChoice {
    #[serde(default)]
    pub delta: Option<ChatResponseDelta>,
    #[serde(default)]
    pub message: Option<CompletionMessage>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

impl ChatResponseChoice {
    pub fn text(&self) -> Option<&str> {
        self.delta
            .as_ref()
            .and_then(|delta| delta.content.as_deref())
            .or_else(|| {
                self.message
                    .as_ref()
                    .and_then(|message| message.content.as_deref())
            })
    }
}

#[derive(Deserialize, Debug)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatResponseChoice>,
}

#[derive(Deserialize, Debug)]
pub struct ModelInfo {
    pub id: String,
    pub created: Option<u64>,
    pub owned_by: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct ModelsResponse {
    #[serde(default)]
    pub data: Vec<ModelInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_omits_unset_optional_fields() {
        let request = ChatRequest {
            model: "gpt-4o-mini".into(),
            messages: vec![ChatMessage {
                role: "user".into(),
                content: "hi".into(),
            }],
            max_tokens: None,
            temperature: None,
            stream: false,
        };

        let json = serde_json::to_value(&request).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({
                "model": "gpt-4o-mini",
                "messages": [{"role": "user", "content": "hi"}]
            })
        );
    }

    #[test]
    fn streaming_request_carries_stream_flag() {
        let request = ChatRequest {
            model: "m".into(),
            messages: Vec::new(),
            max_tokens: Some(500),
            temperature: Some(0.5),
            stream: true,
        };

        let json = serde_json::to_value(&request).expect("serialize");
        assert_eq!(json["stream"], serde_json::json!(true));
        assert_eq!(json["max_tokens"], serde_json::json!(500));
    }

    #[test]
    fn choice_text_prefers_delta_then_message() {
        let delta: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"delta":{"content":"a"}}]}"#).unwrap();
        assert_eq!(delta.choices[0].text(), Some("a"));

        let message: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":"b"}}]}"#).unwrap();
        assert_eq!(message.choices[0].text(), Some("b"));

        let empty: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#)
                .unwrap();
        assert_eq!(empty.choices[0].text(), None);
        assert_eq!(empty.choices[0].finish_reason.as_deref(), Some("stop"));
    }
}
