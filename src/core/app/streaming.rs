use std::ops::Range;
use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use super::ChatSession;
use crate::api::ChatMessage;
use crate::core::chat_stream::{ChatStreamService, RelayEvent, StreamHandle, StreamParams};
use crate::core::message::Role;
use crate::core::transport::ChatTransport;
use crate::ui::markdown::error_block;
use crate::ui::surface::ChatSurface;

/// Transient state of the reply being streamed.
pub(super) struct StreamSession {
    accumulated: Vec<String>,
    rx: mpsc::UnboundedReceiver<RelayEvent>,
    worker: Option<JoinHandle<()>>,
    placeholder: Range<usize>,
    errored: bool,
}

impl StreamSession {
    pub(super) fn spawn(
        transport: Arc<dyn ChatTransport>,
        api_messages: Vec<ChatMessage>,
        placeholder: Range<usize>,
    ) -> Self {
        let StreamHandle { rx, worker } = ChatStreamService::spawn_stream(StreamParams {
            transport,
            api_messages,
        });
        Self {
            accumulated: Vec::new(),
            rx,
            worker: Some(worker),
            placeholder,
            errored: false,
        }
    }

    fn text(&self) -> String {
        self.accumulated.concat()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No reply in flight.
    Idle,
    /// A reply is still streaming.
    Pending,
    /// The reply was finalized during this tick.
    Finished,
}

impl<S: ChatSurface> ChatSession<S> {
    /// Drain every queued relay event and apply it to the surface.
    pub fn on_tick(&mut self) -> TickOutcome {
        let Some(session) = self.stream.as_mut() else {
            return TickOutcome::Idle;
        };

        let done = loop {
            match session.rx.try_recv() {
                Ok(RelayEvent::Chunk(fragment)) => {
                    if session.errored {
                        continue;
                    }
                    session.accumulated.push(fragment);
                    let markup = self.renderer.assistant_block(&session.text());
                    session.placeholder = self.surface.insert(session.placeholder.clone(), &markup);
                }
                Ok(RelayEvent::Error(message)) => {
                    session.errored = true;
                    session.placeholder = self
                        .surface
                        .insert(session.placeholder.clone(), &error_block(&message));
                }
                Ok(RelayEvent::Done(payload)) => break Some(payload),
                Err(TryRecvError::Empty) => break None,
                Err(TryRecvError::Disconnected) => {
                    warn!("stream worker exited without finishing the reply");
                    if !session.errored {
                        session.errored = true;
                        session.placeholder = self.surface.insert(
                            session.placeholder.clone(),
                            &error_block("The response stream ended unexpectedly"),
                        );
                    }
                    break Some(None);
                }
            }
        };

        match done {
            Some(payload) => {
                self.complete_stream(payload);
                TickOutcome::Finished
            }
            None => TickOutcome::Pending,
        }
    }

    fn complete_stream(&mut self, payload: Option<String>) {
        let Some(session) = self.stream.as_mut() else {
            return;
        };
        let payload = payload.filter(|text| !text.is_empty());

        // Single-shot replies arrive only with `Done`.
        if !session.errored && session.accumulated.is_empty() {
            if let Some(text) = payload.as_deref() {
                let markup = self.renderer.assistant_block(text);
                session.placeholder = self.surface.insert(session.placeholder.clone(), &markup);
            }
        }

        let errored = session.errored;
        let final_text = payload.unwrap_or_else(|| session.text());
        if !errored && !final_text.is_empty() {
            self.conversation.append(Role::Assistant, final_text);
        }
        self.finalize_stream();
    }

    /// End the current reply and unlock the send control. Returns false when
    /// no reply was in flight.
    pub fn finalize_stream(&mut self) -> bool {
        let Some(mut session) = self.stream.take() else {
            return false;
        };
        session.rx.close();
        if let Some(worker) = session.worker.take() {
            if !worker.is_finished() {
                debug!("detaching unfinished stream worker");
            }
        }
        let send = self.tr("Send");
        self.surface.set_send_enabled(true, &send);
        self.surface.scroll_to_end();
        true
    }

    /// Tick at the refresh interval until no reply is in flight.
    pub async fn run_until_idle(&mut self) {
        let mut ticker = tokio::time::interval(self.refresh_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if self.on_tick() != TickOutcome::Pending {
                break;
            }
        }
    }

    /// Send `text` and drive the reply to completion.
    pub async fn ask(&mut self, text: &str) -> Result<(), super::SendError> {
        self.send_message(text)?;
        self.run_until_idle().await;
        Ok(())
    }

    /// Start a reply fed by the returned relay instead of a transport.
    #[cfg(test)]
    pub(crate) fn send_with_manual_relay(
        &mut self,
        text: &str,
    ) -> Result<ChatStreamService, super::SendError> {
        let (_, placeholder) = self.prepare_send(text)?;
        let (service, rx) = ChatStreamService::new();
        self.stream = Some(StreamSession {
            accumulated: Vec::new(),
            rx,
            worker: None,
            placeholder,
            errored: false,
        });
        Ok(service)
    }

    #[cfg(test)]
    pub(crate) fn placeholder_range(&self) -> Option<Range<usize>> {
        self.stream.as_ref().map(|session| session.placeholder.clone())
    }
}
