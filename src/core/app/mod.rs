//! One chat session bound to a card: input handling, the refresh driver
//! that applies relay events to the surface, and card writeback.
//!
//! A session owns at most one in-flight reply. [`ChatSession::send_message`]
//! starts it, [`ChatSession::on_tick`] drains the relay without blocking and
//! [`ChatSession::run_until_idle`] ticks on a fixed interval until the reply
//! is finalized. All of this runs on the task that owns the surface; only the
//! transport call runs elsewhere.

use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error};

use crate::api::ChatMessage;
use crate::core::card::{format_conversation_for_card, CardContent, CardWriteback};
use crate::core::config::Settings;
use crate::core::conversation::{Conversation, ConversationSummary};
use crate::core::i18n::Translator;
use crate::core::message::Role;
use crate::core::transport::{ChatTransport, TransportError};
use crate::ui::markdown::{placeholder_block, system_block, user_block, MessageRenderer};
use crate::ui::surface::ChatSurface;
use crate::ui::theme::MarkupTheme;

mod streaming;

pub use streaming::TickOutcome;
use streaming::StreamSession;

#[derive(Debug, Clone, PartialEq)]
pub enum SendError {
    EmptyMessage,
    /// A reply is still streaming.
    StreamActive,
    Configuration(TransportError),
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::EmptyMessage => write!(f, "message is empty"),
            SendError::StreamActive => write!(f, "a reply is still in progress"),
            SendError::Configuration(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SendError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SendError::Configuration(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionOptions {
    pub markdown: bool,
    pub refresh_interval: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            markdown: true,
            refresh_interval: Duration::from_millis(30),
        }
    }
}

impl From<&Settings> for SessionOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            markdown: settings.markdown,
            refresh_interval: Duration::from_millis(settings.refresh_interval_ms.max(1)),
        }
    }
}

pub struct ChatSession<S: ChatSurface> {
    conversation: Conversation,
    card: Option<CardContent>,
    transport: Arc<dyn ChatTransport>,
    renderer: MessageRenderer,
    card_renderer: MessageRenderer,
    surface: S,
    translator: Arc<Translator>,
    refresh_interval: Duration,
    stream: Option<StreamSession>,
}

impl<S: ChatSurface> ChatSession<S> {
    pub fn new(
        surface: S,
        transport: Arc<dyn ChatTransport>,
        translator: Arc<Translator>,
        card: Option<CardContent>,
        options: SessionOptions,
    ) -> Self {
        Self {
            conversation: Conversation::new(card.as_ref()),
            card,
            transport,
            renderer: MessageRenderer::new(MarkupTheme::chat(), options.markdown),
            card_renderer: MessageRenderer::new(MarkupTheme::card(), options.markdown),
            surface,
            translator,
            refresh_interval: options.refresh_interval,
            stream: None,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn summary(&self) -> ConversationSummary {
        self.conversation.summary()
    }

    pub fn card(&self) -> Option<&CardContent> {
        self.card.as_ref()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn is_streaming(&self) -> bool {
        self.stream.is_some()
    }

    fn tr(&self, key: &str) -> String {
        self.translator.translate(key)
    }

    fn notice(&mut self, title: &str, message: &str) {
        let title = self.tr(title);
        self.surface.show_notice(&title, message);
    }

    /// Record the user's message, draw it with a placeholder below and lock
    /// the send control. Returns the request history and the placeholder.
    fn prepare_send(
        &mut self,
        text: &str,
    ) -> Result<(Vec<ChatMessage>, std::ops::Range<usize>), SendError> {
        let text = text.trim();
        if text.is_empty() {
            let message = self.tr("Please enter a message");
            self.notice("Warning", &message);
            return Err(SendError::EmptyMessage);
        }
        if self.stream.is_some() {
            return Err(SendError::StreamActive);
        }
        if let Err(err) = self.transport.check_configuration() {
            self.notice("Error", &err.to_string());
            return Err(SendError::Configuration(err));
        }

        self.conversation.append(Role::User, text);
        self.surface.append_block(&user_block(text));
        let thinking = self.tr("Thinking...");
        self.surface.set_send_enabled(false, &thinking);
        let placeholder = placeholder_block(&self.tr("AI is thinking..."));
        let placeholder = self.surface.append_block(&placeholder);
        self.surface.scroll_to_end();
        Ok((self.conversation.to_api_messages(), placeholder))
    }

    /// Start a reply to `text`. Must be called inside a tokio runtime; the
    /// reply is applied by later [`ChatSession::on_tick`] calls.
    pub fn send_message(&mut self, text: &str) -> Result<(), SendError> {
        let (api_messages, placeholder) = self.prepare_send(text)?;
        debug!(messages = api_messages.len(), "sending chat message");
        self.stream = Some(StreamSession::spawn(
            Arc::clone(&self.transport),
            api_messages,
            placeholder,
        ));
        Ok(())
    }

    /// Append unsaved dialogue to the card. Returns how many messages were
    /// written; every outcome is also reported as a notice.
    pub fn save_to_card(&mut self, writeback: &dyn CardWriteback) -> usize {
        let pending = self.conversation.pending_since_last_save();
        if pending.is_empty() {
            let message = self.tr("No new conversation to save");
            self.notice("Information", &message);
            return 0;
        }
        let count = pending.len();
        let markup = format_conversation_for_card(&pending, &self.card_renderer);
        match writeback.append_to_card(&markup) {
            Ok(()) => {
                self.conversation.mark_saved();
                let message = self.tr("Conversation saved to card successfully");
                self.notice("Information", &message);
                count
            }
            Err(err) => {
                error!(error = %err, "failed to save conversation to card");
                let message = format!("{}: {err}", self.tr("Failed to Save to Card"));
                self.notice("Error", &message);
                0
            }
        }
    }

    /// Drop any in-flight reply, wipe the surface and restart from the card.
    pub fn clear_chat(&mut self) {
        self.finalize_stream();
        self.surface.clear();
        self.conversation.new_session(self.card.as_ref());
    }

    /// Shows the front of the open card above the conversation.
    pub fn show_card_context(&mut self) {
        let Some(card) = &self.card else {
            return;
        };
        let line = format!("{}: {}", self.tr("Card"), card.front);
        self.surface.append_block(&system_block(&line));
    }
}

#[cfg(test)]
mod tests;
