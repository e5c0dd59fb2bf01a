use eco_core::model::{Alternative, Card, CardError, CardId, Difficulty, SessionRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::json::{JsonCardFile, JsonHistoryFile};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// Persisted shape for a card.
///
/// Mirrors the domain `Card` so adapters can serialize/deserialize without
/// leaking storage concerns into the domain layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardRecord {
    pub id: CardId,
    pub scenario: String,
    pub difficulty: String,
    pub alternatives: Vec<Alternative>,
}

impl CardRecord {
    #[must_use]
    pub fn from_card(card: &Card) -> Self {
        Self {
            id: card.id(),
            scenario: card.scenario().to_owned(),
            difficulty: card.difficulty().as_str().to_owned(),
            alternatives: card.alternatives().to_vec(),
        }
    }

    /// Convert the record back into a domain `Card`.
    ///
    /// # Errors
    ///
    /// Returns `CardError` if the record fails card validation.
    pub fn into_card(self) -> Result<Card, CardError> {
        Card::new(self.id, self.scenario, self.difficulty, self.alternatives)
    }
}

/// Source of scenario cards for a session.
pub trait DeckSource: Send + Sync {
    /// Fetch all cards whose difficulty matches (case-insensitively).
    ///
    /// Each call returns a fresh vector the caller may reorder freely.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the underlying cards cannot be read.
    fn fetch_by_difficulty(&self, difficulty: &Difficulty) -> Result<Vec<Card>, StorageError> {
        Ok(self
            .all_cards()?
            .into_iter()
            .filter(|card| card.difficulty().matches(difficulty))
            .collect())
    }

    /// Fetch every card, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the underlying cards cannot be read.
    fn all_cards(&self) -> Result<Vec<Card>, StorageError>;
}

/// Writable card catalogue.
pub trait CardRepository: DeckSource {
    /// Insert a card, replacing any existing card with the same id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the card cannot be stored.
    fn upsert_card(&self, card: &Card) -> Result<(), StorageError>;
}

/// Persistence for completed-session history.
pub trait HistoryStore: Send + Sync {
    /// Load all records in stored order. Missing data loads as empty.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if stored data exists but cannot be read.
    fn load(&self) -> Result<Vec<SessionRecord>, StorageError>;

    /// Replace the stored history with `records`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the records cannot be written.
    fn save(&self, records: &[SessionRecord]) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    cards: Arc<Mutex<BTreeMap<CardId, Card>>>,
    history: Arc<Mutex<Vec<SessionRecord>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a repository pre-loaded with `cards`.
    #[must_use]
    pub fn with_cards(cards: impl IntoIterator<Item = Card>) -> Self {
        let repo = Self::new();
        if let Ok(mut guard) = repo.cards.lock() {
            guard.extend(cards.into_iter().map(|card| (card.id(), card)));
        }
        repo
    }
}

impl DeckSource for InMemoryRepository {
    fn all_cards(&self) -> Result<Vec<Card>, StorageError> {
        let guard = self
            .cards
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.values().cloned().collect())
    }
}

impl CardRepository for InMemoryRepository {
    fn upsert_card(&self, card: &Card) -> Result<(), StorageError> {
        let mut guard = self
            .cards
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(card.id(), card.clone());
        Ok(())
    }
}

impl HistoryStore for InMemoryRepository {
    fn load(&self) -> Result<Vec<SessionRecord>, StorageError> {
        let guard = self
            .history
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.clone())
    }

    fn save(&self, records: &[SessionRecord]) -> Result<(), StorageError> {
        let mut guard = self
            .history
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        *guard = records.to_vec();
        Ok(())
    }
}

/// Aggregates card and history stores behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub deck: Arc<dyn DeckSource>,
    pub cards: Arc<dyn CardRepository>,
    pub history: Arc<dyn HistoryStore>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let deck: Arc<dyn DeckSource> = Arc::new(repo.clone());
        let cards: Arc<dyn CardRepository> = Arc::new(repo.clone());
        let history: Arc<dyn HistoryStore> = Arc::new(repo);
        Self {
            deck,
            cards,
            history,
        }
    }

    /// Build a `Storage` backed by JSON files.
    #[must_use]
    pub fn json(cards_path: impl AsRef<Path>, history_path: impl AsRef<Path>) -> Self {
        let card_file = JsonCardFile::new(cards_path.as_ref());
        let deck: Arc<dyn DeckSource> = Arc::new(card_file.clone());
        let cards: Arc<dyn CardRepository> = Arc::new(card_file);
        let history: Arc<dyn HistoryStore> =
            Arc::new(JsonHistoryFile::new(history_path.as_ref()));
        Self {
            deck,
            cards,
            history,
        }
    }
}
