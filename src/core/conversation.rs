//! The append-only conversation log that seeds every request.

use crate::core::card::CardContent;
use crate::core::message::{Message, Role};

/// Counts reported by [`Conversation::summary`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSummary {
    pub total_messages: usize,
    pub user_messages: usize,
    pub assistant_messages: usize,
    pub card_id: Option<i64>,
}

/// Ordered, role-tagged messages owned by a single chat session.
///
/// Entries are never edited or removed individually; the only way to shrink
/// the log is [`Conversation::new_session`]. `saved_count` counts dialogue
/// (user/assistant) messages that have already been written back to the card.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    saved_count: usize,
    card_id: Option<i64>,
}

pub fn card_context_prompt(card: &CardContent) -> String {
    format!(
        "Current Anki Card:\nFront: {}\nBack: {}\n\n\
Please help me understand this card better. You can explain concepts, provide examples, \
answer questions, or help with memorization techniques.",
        card.front, card.back
    )
}

impl Conversation {
    pub fn new(card: Option<&CardContent>) -> Self {
        let mut conversation = Self::default();
        conversation.new_session(card);
        conversation
    }

    /// Reset to a single system message describing `card`.
    pub fn new_session(&mut self, card: Option<&CardContent>) {
        self.messages.clear();
        self.saved_count = 0;
        self.card_id = card.map(|card| card.id);
        if let Some(card) = card {
            self.messages.push(Message::system(card_context_prompt(card)));
        }
    }

    pub fn append(&mut self, role: Role, content: impl Into<String>) {
        self.messages.push(Message::new(role, content));
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn saved_count(&self) -> usize {
        self.saved_count
    }

    fn dialogue(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|msg| msg.role.is_dialogue())
    }

    /// Dialogue messages appended since the last [`Conversation::mark_saved`].
    pub fn pending_since_last_save(&self) -> Vec<&Message> {
        self.dialogue().skip(self.saved_count).collect()
    }

    pub fn mark_saved(&mut self) {
        self.saved_count = self.dialogue().count();
    }

    pub fn to_api_messages(&self) -> Vec<crate::api::ChatMessage> {
        self.messages.iter().map(Message::to_api).collect()
    }

    pub fn summary(&self) -> ConversationSummary {
        ConversationSummary {
            total_messages: self.messages.len(),
            user_messages: self.messages.iter().filter(|m| m.role == Role::User).count(),
            assistant_messages: self
                .messages
                .iter()
                .filter(|m| m.role == Role::Assistant)
                .count(),
            card_id: self.card_id,
        }
    }
}
