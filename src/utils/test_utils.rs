use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};

use crate::api::ChatMessage;
use crate::core::card::CardContent;
use crate::core::transport::{ChatTransport, FragmentStream, TransportError};

/// In-memory transport replaying a fixed script.
pub struct ScriptedTransport {
    fragments: Vec<String>,
    reply: Option<String>,
    stream_failure: Option<TransportError>,
    failure: Option<TransportError>,
    streaming: bool,
    configuration: Result<(), TransportError>,
    calls: AtomicUsize,
    last_request: Mutex<Option<Vec<ChatMessage>>>,
}

impl ScriptedTransport {
    fn base(streaming: bool) -> Self {
        Self {
            fragments: Vec::new(),
            reply: None,
            stream_failure: None,
            failure: None,
            streaming,
            configuration: Ok(()),
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn streaming(fragments: &[&str]) -> Self {
        Self {
            fragments: fragments.iter().map(|f| f.to_string()).collect(),
            ..Self::base(true)
        }
    }

    pub fn single_shot(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            ..Self::base(false)
        }
    }

    /// Fails before producing anything.
    pub fn failing(err: TransportError) -> Self {
        Self {
            failure: Some(err),
            ..Self::base(true)
        }
    }

    /// Fails after the scripted fragments were yielded.
    pub fn then_fail(mut self, err: TransportError) -> Self {
        self.stream_failure = Some(err);
        self
    }

    pub fn misconfigured(message: &str) -> Self {
        Self {
            configuration: Err(TransportError::Configuration(message.to_string())),
            ..Self::base(true)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<Vec<ChatMessage>> {
        self.last_request.lock().ok().and_then(|guard| guard.clone())
    }

    fn record(&self, messages: Vec<ChatMessage>) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut guard) = self.last_request.lock() {
            *guard = Some(messages);
        }
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    async fn send(&self, messages: Vec<ChatMessage>) -> Result<String, TransportError> {
        self.record(messages);
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        Ok(self
            .reply
            .clone()
            .unwrap_or_else(|| self.fragments.concat()))
    }

    async fn stream(&self, messages: Vec<ChatMessage>) -> Result<FragmentStream, TransportError> {
        self.record(messages);
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        let mut items: Vec<Result<String, TransportError>> =
            self.fragments.iter().cloned().map(Ok).collect();
        if let Some(err) = &self.stream_failure {
            items.push(Err(err.clone()));
        }
        Ok(stream::iter(items).boxed())
    }

    fn supports_streaming(&self) -> bool {
        self.streaming
    }

    fn check_configuration(&self) -> Result<(), TransportError> {
        self.configuration.clone()
    }
}

pub fn sample_card() -> CardContent {
    CardContent {
        id: 1_700_000_000_001,
        front: "What is the capital of France?".to_string(),
        back: "Paris".to_string(),
    }
}

pub fn sample_api_messages() -> Vec<ChatMessage> {
    vec![
        ChatMessage {
            role: "system".to_string(),
            content: "card ctx".to_string(),
        },
        ChatMessage {
            role: "user".to_string(),
            content: "explain this".to_string(),
        },
    ]
}
