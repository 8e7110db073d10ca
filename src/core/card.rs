//! Access to the card under review and writeback of saved conversations.

use std::error::Error;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, error};

use crate::core::config::path_display;
use crate::core::message::{Message, Role};
use crate::ui::markdown::MessageRenderer;
use crate::ui::theme::CARD_SEPARATOR;
use crate::utils::html::extract_text_from_html;

/// Plain-text view of a card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardContent {
    pub id: i64,
    pub front: String,
    pub back: String,
}

pub trait CardProvider {
    fn current_card(&self) -> Option<CardContent>;
}

pub trait CardWriteback {
    /// Append `markup` after the card's back content and persist it.
    fn append_to_card(&self, markup: &str) -> Result<(), PersistenceError>;
}

#[derive(Debug)]
pub enum PersistenceError {
    Read { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: serde_json::Error },
    Write { path: PathBuf, source: std::io::Error },
    Encode(serde_json::Error),
    NoCard,
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistenceError::Read { path, source } => {
                write!(f, "Failed to read card at {}: {}", path_display(path), source)
            }
            PersistenceError::Parse { path, source } => {
                write!(f, "Failed to parse card at {}: {}", path_display(path), source)
            }
            PersistenceError::Write { path, source } => {
                write!(f, "Failed to write card at {}: {}", path_display(path), source)
            }
            PersistenceError::Encode(source) => write!(f, "Failed to encode card: {source}"),
            PersistenceError::NoCard => write!(f, "No card is open"),
        }
    }
}

impl Error for PersistenceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PersistenceError::Read { source, .. } | PersistenceError::Write { source, .. } => {
                Some(source)
            }
            PersistenceError::Parse { source, .. } | PersistenceError::Encode(source) => {
                Some(source)
            }
            PersistenceError::NoCard => None,
        }
    }
}

/// Card fields as stored on disk; both sides hold HTML.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CardRecord {
    pub id: i64,
    pub front: String,
    pub back: String,
}

impl CardRecord {
    pub fn content(&self) -> CardContent {
        CardContent {
            id: self.id,
            front: extract_text_from_html(&self.front),
            back: extract_text_from_html(&self.back),
        }
    }
}

/// A single card kept as a JSON file.
#[derive(Debug, Clone)]
pub struct FileCardStore {
    path: PathBuf,
}

impl FileCardStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Write a fresh card file, replacing any existing one.
    pub fn create(path: impl Into<PathBuf>, record: &CardRecord) -> Result<Self, PersistenceError> {
        let store = Self::new(path);
        store.save(record)?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<CardRecord, PersistenceError> {
        let contents = fs::read_to_string(&self.path).map_err(|source| PersistenceError::Read {
            path: self.path.clone(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| PersistenceError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, record: &CardRecord) -> Result<(), PersistenceError> {
        let write_err = |source| PersistenceError::Write {
            path: self.path.clone(),
            source,
        };
        let parent = self
            .path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty());
        if let Some(dir) = parent {
            fs::create_dir_all(dir).map_err(write_err)?;
        }
        let contents = serde_json::to_string_pretty(record).map_err(PersistenceError::Encode)?;
        let mut temp_file = match parent {
            Some(dir) => NamedTempFile::new_in(dir),
            None => NamedTempFile::new(),
        }
        .map_err(write_err)?;
        temp_file.write_all(contents.as_bytes()).map_err(write_err)?;
        temp_file.as_file_mut().sync_all().map_err(write_err)?;
        temp_file
            .persist(&self.path)
            .map_err(|err| write_err(err.error))?;
        Ok(())
    }
}

impl CardProvider for FileCardStore {
    fn current_card(&self) -> Option<CardContent> {
        match self.load() {
            Ok(record) => Some(record.content()),
            Err(err) => {
                error!(error = %err, "failed to load card");
                None
            }
        }
    }
}

impl CardWriteback for FileCardStore {
    fn append_to_card(&self, markup: &str) -> Result<(), PersistenceError> {
        let mut record = self.load()?;
        if !record.back.is_empty() {
            record.back.push_str(CARD_SEPARATOR);
        }
        record.back.push_str(markup);
        self.save(&record)?;
        debug!(card_id = record.id, bytes = markup.len(), "appended conversation to card");
        Ok(())
    }
}

/// Card markup for the given messages. Only user and assistant messages with
/// content produce blocks.
pub fn format_conversation_for_card(messages: &[&Message], renderer: &MessageRenderer) -> String {
    messages
        .iter()
        .filter(|msg| msg.role.is_dialogue())
        .filter_map(|msg| {
            let text = msg.content.trim();
            (!text.is_empty()).then(|| renderer.card_block(text, msg.role == Role::User))
        })
        .collect()
}
