//! Chat-completion transports.
//!
//! A [`ChatTransport`] either answers a conversation in one round trip or
//! yields the answer as a stream of text fragments. The stream worker in
//! [`crate::core::chat_stream`] decides which path to take based on
//! [`ChatTransport::supports_streaming`].

pub mod openai;
pub mod sse;

use std::error::Error;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::api::ChatMessage;

pub use openai::OpenAiTransport;

/// Lazy sequence of non-empty text deltas.
pub type FragmentStream = BoxStream<'static, Result<String, TransportError>>;

#[derive(Debug, Clone, PartialEq)]
pub enum TransportError {
    /// The server answered with a non-2xx status.
    Status { code: u16, message: String },
    /// A single-shot body could not be decoded or carried no content.
    Malformed(String),
    /// No response (or no further stream data) within the allowed wait.
    Timeout(Duration),
    /// The request never reached the server or the connection dropped.
    Connectivity(String),
    /// Missing or unusable credentials, model or conversation.
    Configuration(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Status { code, message } => write!(f, "HTTP {code}: {message}"),
            TransportError::Malformed(message) => write!(f, "Malformed response: {message}"),
            TransportError::Timeout(after) => {
                write!(f, "Request timed out after {}s", after.as_secs())
            }
            TransportError::Connectivity(message) => write!(f, "Connection error: {message}"),
            TransportError::Configuration(message) => write!(f, "Configuration error: {message}"),
        }
    }
}

impl Error for TransportError {}

impl TransportError {
    pub(crate) fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(timeout)
        } else if let Some(status) = err.status() {
            TransportError::Status {
                code: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            TransportError::Connectivity(err.to_string())
        }
    }
}

/// Reject conversations the API would refuse anyway.
pub fn validate_conversation(messages: &[ChatMessage]) -> Result<(), TransportError> {
    if messages.is_empty() {
        return Err(TransportError::Configuration(
            "Empty conversation history".to_string(),
        ));
    }
    if let Some(bad) = messages
        .iter()
        .find(|msg| !matches!(msg.role.as_str(), "system" | "user" | "assistant"))
    {
        return Err(TransportError::Configuration(format!(
            "Unsupported message role: {}",
            bad.role
        )));
    }
    Ok(())
}

#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// One round trip returning the full reply.
    async fn send(&self, messages: Vec<ChatMessage>) -> Result<String, TransportError>;

    /// Start a streamed completion. Errors before the first byte surface
    /// here; later failures surface as items of the returned stream.
    async fn stream(&self, messages: Vec<ChatMessage>) -> Result<FragmentStream, TransportError>;

    fn supports_streaming(&self) -> bool {
        true
    }

    /// Cheap local check run before a send is accepted.
    fn check_configuration(&self) -> Result<(), TransportError> {
        Ok(())
    }
}
