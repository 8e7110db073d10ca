//! Cardchat lets a flashcard learner discuss the card under review with an AI
//! model and append the conversation back into the card.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the conversation log, card access, configuration and the
//!   streaming orchestration that relays reply fragments from a background
//!   worker to a timer-driven refresh loop.
//! - [`ui`] renders messages into styled markup and presents them on a
//!   [`ui::surface::ChatSurface`].
//! - [`api`] defines chat/model payloads exchanged with OpenAI-compatible
//!   endpoints.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`].

pub mod api;
pub mod cli;
pub mod core;
pub mod ui;
pub mod utils;
