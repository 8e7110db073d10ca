use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::api::ChatMessage;
use crate::core::transport::{ChatTransport, TransportError};

/// Events crossing from the stream worker to the refresh driver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RelayEvent {
    Chunk(String),
    Error(String),
    /// Always the last event of a send. Carries the full reply when one was
    /// produced.
    Done(Option<String>),
}

pub struct StreamParams {
    pub transport: Arc<dyn ChatTransport>,
    pub api_messages: Vec<ChatMessage>,
}

/// The receiving half of one send plus the worker producing into it.
pub struct StreamHandle {
    pub rx: mpsc::UnboundedReceiver<RelayEvent>,
    pub worker: JoinHandle<()>,
}

#[derive(Clone)]
pub struct ChatStreamService {
    tx: mpsc::UnboundedSender<RelayEvent>,
}

impl ChatStreamService {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RelayEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Run one transport call on a fresh relay and return its handle.
    pub fn spawn_stream(params: StreamParams) -> StreamHandle {
        let (service, rx) = Self::new();
        let worker = tokio::spawn(async move { service.run(params).await });
        StreamHandle { rx, worker }
    }

    fn emit(&self, event: RelayEvent) {
        // A dropped receiver means the session went away; the reply is moot.
        if self.tx.send(event).is_err() {
            debug!("relay receiver dropped");
        }
    }

    async fn run(self, params: StreamParams) {
        let StreamParams {
            transport,
            api_messages,
        } = params;
        let streaming = transport.supports_streaming();
        debug!(
            messages = api_messages.len(),
            streaming, "starting chat request"
        );

        let mut full = String::new();
        let outcome = if streaming {
            self.relay_stream(transport.as_ref(), api_messages, &mut full)
                .await
        } else {
            match transport.send(api_messages).await {
                Ok(text) => {
                    full = text;
                    Ok(())
                }
                Err(err) => Err(err),
            }
        };

        if let Err(err) = outcome {
            warn!(error = %err, "chat request failed");
            self.emit(RelayEvent::Error(err.to_string()));
        }

        debug!(chars = full.len(), "chat request finished");
        let payload = (!full.is_empty()).then_some(full);
        self.emit(RelayEvent::Done(payload));
    }

    async fn relay_stream(
        &self,
        transport: &dyn ChatTransport,
        api_messages: Vec<ChatMessage>,
        full: &mut String,
    ) -> Result<(), TransportError> {
        let mut fragments = transport.stream(api_messages).await?;
        while let Some(fragment) = fragments.next().await {
            let fragment = fragment?;
            if fragment.is_empty() {
                continue;
            }
            full.push_str(&fragment);
            self.emit(RelayEvent::Chunk(fragment));
        }
        Ok(())
    }

    #[cfg(test)]
    pub fn send_for_test(&self, event: RelayEvent) {
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::{sample_api_messages, ScriptedTransport};

    async fn drain(handle: StreamHandle) -> Vec<RelayEvent> {
        let StreamHandle { mut rx, worker } = handle;
        worker.await.expect("worker should not panic");
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn params(transport: ScriptedTransport) -> StreamParams {
        StreamParams {
            transport: Arc::new(transport),
            api_messages: sample_api_messages(),
        }
    }

    #[tokio::test]
    async fn streamed_fragments_are_relayed_in_order_then_done() {
        let transport = ScriptedTransport::streaming(&["The ", "answer ", "is 42."]);
        let events = drain(ChatStreamService::spawn_stream(params(transport))).await;
        assert_eq!(
            events,
            vec![
                RelayEvent::Chunk("The ".into()),
                RelayEvent::Chunk("answer ".into()),
                RelayEvent::Chunk("is 42.".into()),
                RelayEvent::Done(Some("The answer is 42.".into())),
            ]
        );
    }

    #[tokio::test]
    async fn single_shot_transport_only_sends_done() {
        let transport = ScriptedTransport::single_shot("Full reply");
        let events = drain(ChatStreamService::spawn_stream(params(transport))).await;
        assert_eq!(events, vec![RelayEvent::Done(Some("Full reply".into()))]);
    }

    #[tokio::test]
    async fn immediate_failure_emits_error_then_empty_done() {
        let transport =
            ScriptedTransport::failing(TransportError::Connectivity("timeout".into()));
        let events = drain(ChatStreamService::spawn_stream(params(transport))).await;
        assert_eq!(
            events,
            vec![
                RelayEvent::Error("Connection error: timeout".into()),
                RelayEvent::Done(None),
            ]
        );
    }

    #[tokio::test]
    async fn mid_stream_failure_keeps_partial_text_in_done() {
        let transport = ScriptedTransport::streaming(&["partial"])
            .then_fail(TransportError::Timeout(std::time::Duration::from_secs(60)));
        let events = drain(ChatStreamService::spawn_stream(params(transport))).await;
        assert_eq!(
            events,
            vec![
                RelayEvent::Chunk("partial".into()),
                RelayEvent::Error("Request timed out after 60s".into()),
                RelayEvent::Done(Some("partial".into())),
            ]
        );
    }

    #[tokio::test]
    async fn empty_stream_ends_with_empty_done() {
        let transport = ScriptedTransport::streaming(&[]);
        let events = drain(ChatStreamService::spawn_stream(params(transport))).await;
        assert_eq!(events, vec![RelayEvent::Done(None)]);
    }

    #[tokio::test]
    async fn worker_finishes_when_receiver_is_dropped() {
        let transport = ScriptedTransport::streaming(&["a", "b"]);
        let StreamHandle { rx, worker } = ChatStreamService::spawn_stream(params(transport));
        drop(rx);
        worker.await.expect("worker should complete without a receiver");
    }

    #[test]
    fn test_sender_feeds_the_paired_receiver() {
        let (service, mut rx) = ChatStreamService::new();
        service.send_for_test(RelayEvent::Chunk("x".into()));
        service.send_for_test(RelayEvent::Done(None));
        assert_eq!(rx.try_recv().ok(), Some(RelayEvent::Chunk("x".into())));
        assert_eq!(rx.try_recv().ok(), Some(RelayEvent::Done(None)));
        assert!(rx.try_recv().is_err());
    }
}
