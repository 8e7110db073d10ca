use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use tracing::{debug, error};

use super::{sse, validate_conversation, ChatTransport, FragmentStream, TransportError};
use crate::api::{ChatCompletion, ChatMessage, ChatRequest, ModelsResponse};
use crate::core::config::Settings;
use crate::utils::url::{chat_completions_url, models_url};

/// Bodies of failed responses are cut to this many characters.
const ERROR_BODY_LIMIT: usize = 300;
const VALIDATION_TIMEOUT: Duration = Duration::from_secs(15);

/// Direct client for OpenAI-compatible `chat/completions` endpoints.
#[derive(Clone)]
pub struct OpenAiTransport {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    request_timeout: Duration,
    stream_timeout: Duration,
    streaming: bool,
}

fn truncate_body(body: &str) -> String {
    body.chars().take(ERROR_BODY_LIMIT).collect()
}

async fn status_error(response: reqwest::Response) -> TransportError {
    let code = response.status().as_u16();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<no body>".to_string());
    TransportError::Status {
        code,
        message: truncate_body(body.trim()),
    }
}

impl OpenAiTransport {
    pub fn new(settings: &Settings) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: settings.base_url.clone(),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            max_tokens: Some(settings.max_tokens),
            temperature: Some(settings.temperature),
            request_timeout: Duration::from_secs(settings.request_timeout_secs),
            stream_timeout: Duration::from_secs(settings.stream_timeout_secs),
            streaming: settings.streaming,
        }
    }

    fn request(&self, messages: Vec<ChatMessage>, stream: bool) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages,
            // Streaming replies are bounded by the idle timeout instead.
            max_tokens: if stream { None } else { self.max_tokens },
            temperature: self.temperature,
            stream,
        }
    }

    fn post(&self, url: String) -> reqwest::RequestBuilder {
        self.client
            .post(url)
            .bearer_auth(&self.api_key)
            .header("Content-Type", "application/json")
    }

    /// Confirm the key works. Uses a one-token completion when a model is
    /// configured, otherwise the models listing.
    pub async fn validate_api_key(&self) -> Result<(), TransportError> {
        self.check_configuration()?;
        if self.model.trim().is_empty() {
            return self.fetch_model_ids().await.map(|_| ());
        }

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: "ping".to_string(),
            }],
            max_tokens: Some(1),
            temperature: None,
            stream: false,
        };
        let response = self
            .post(chat_completions_url(&self.base_url))
            .timeout(VALIDATION_TIMEOUT)
            .json(&request)
            .send()
            .await
            .map_err(|err| TransportError::from_reqwest(err, VALIDATION_TIMEOUT))?;
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }
        Ok(())
    }

    async fn fetch_model_ids(&self) -> Result<Vec<String>, TransportError> {
        let response = self
            .client
            .get(models_url(&self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(VALIDATION_TIMEOUT)
            .send()
            .await
            .map_err(|err| TransportError::from_reqwest(err, VALIDATION_TIMEOUT))?;
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }
        let models: ModelsResponse = response
            .json()
            .await
            .map_err(|err| TransportError::Malformed(err.to_string()))?;
        Ok(models.data.into_iter().map(|model| model.id).collect())
    }

    /// Chat-capable model ids offered by the endpoint.
    pub async fn list_models(&self) -> Result<Vec<String>, TransportError> {
        self.check_configuration()?;
        let mut ids: Vec<String> = self
            .fetch_model_ids()
            .await?
            .into_iter()
            .filter(|id| id.contains("gpt-") || id.contains("o-"))
            .collect();
        ids.sort();
        Ok(ids)
    }
}

#[async_trait]
impl ChatTransport for OpenAiTransport {
    async fn send(&self, messages: Vec<ChatMessage>) -> Result<String, TransportError> {
        self.check_configuration()?;
        validate_conversation(&messages)?;

        let request = self.request(messages, false);
        let response = self
            .post(chat_completions_url(&self.base_url))
            .timeout(self.request_timeout)
            .json(&request)
            .send()
            .await
            .map_err(|err| TransportError::from_reqwest(err, self.request_timeout))?;

        if !response.status().is_success() {
            let err = status_error(response).await;
            error!(error = %err, "chat completion failed");
            return Err(err);
        }

        let completion: ChatCompletion = response.json().await.map_err(|err| {
            if err.is_decode() {
                TransportError::Malformed(err.to_string())
            } else {
                TransportError::from_reqwest(err, self.request_timeout)
            }
        })?;
        if let Some(usage) = completion.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "chat completion usage"
            );
        }
        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| TransportError::Malformed("No response choices from API".into()))?;
        choice
            .message
            .and_then(|message| message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| TransportError::Malformed("Empty response from API".into()))
    }

    async fn stream(&self, messages: Vec<ChatMessage>) -> Result<FragmentStream, TransportError> {
        self.check_configuration()?;
        validate_conversation(&messages)?;

        let request = self.request(messages, true);
        let pending = self
            .post(chat_completions_url(&self.base_url))
            .header("Accept", "text/event-stream")
            .json(&request)
            .send();
        let response = tokio::time::timeout(self.stream_timeout, pending)
            .await
            .map_err(|_| TransportError::Timeout(self.stream_timeout))?
            .map_err(|err| TransportError::from_reqwest(err, self.stream_timeout))?;

        if !response.status().is_success() {
            let err = status_error(response).await;
            error!(error = %err, "streaming chat completion failed");
            return Err(err);
        }

        let stream_timeout = self.stream_timeout;
        let body = response
            .bytes_stream()
            .map(move |chunk| {
                chunk
                    .map(|bytes| bytes.to_vec())
                    .map_err(|err| TransportError::from_reqwest(err, stream_timeout))
            })
            .boxed();
        Ok(sse::fragment_stream(body, self.stream_timeout))
    }

    fn supports_streaming(&self) -> bool {
        self.streaming
    }

    fn check_configuration(&self) -> Result<(), TransportError> {
        if self.api_key.trim().is_empty() {
            return Err(TransportError::Configuration(
                "Invalid or missing API key".to_string(),
            ));
        }
        Ok(())
    }
}
