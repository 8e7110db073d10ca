//! Presentation layer for chat sessions.
//!
//! - [`surface`]: the [`surface::ChatSurface`] port and the in-memory
//!   [`surface::HtmlDocument`].
//! - [`markdown`]: the message renderer and transcript block builders.
//! - [`theme`]: inline style sets for the chat transcript and card fields.
//! - [`terminal`]: plain-text surface used by the CLI.
//!
//! Ownership boundary: this layer turns text into markup and shows it, while
//! [`crate::core`] owns conversation state and stream orchestration.

pub mod markdown;
pub mod surface;
pub mod terminal;
pub mod theme;
