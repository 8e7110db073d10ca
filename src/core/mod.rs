pub mod app;
pub mod card;
pub mod chat_stream;
pub mod config;
pub mod conversation;
pub mod i18n;
pub mod keyring;
pub mod message;
pub mod transport;
