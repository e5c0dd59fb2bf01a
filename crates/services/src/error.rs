//! Shared error types for the services crate.

use thiserror::Error;

use eco_core::analytics::ClassificationError;
use eco_core::model::{CardId, ConfigurationError};
use storage::repository::StorageError;

/// Call-order violations of the session state machine.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum StateError {
    #[error("session has not been started")]
    NotStarted,
    #[error("session has already been started")]
    AlreadyStarted,
    #[error("the current card must be answered before drawing another")]
    AwaitingAnswer,
    #[error("deck exhausted: no cards left to draw")]
    DeckExhausted,
    #[error("no card is waiting for an answer")]
    NoCardPending,
    #[error("session has already ended")]
    Ended,
    #[error("session has not ended yet")]
    NotEnded,
    #[error("session result was already recorded")]
    AlreadyRecorded,
}

/// Errors emitted by session services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error("choice {label:?} ({impact}) is not an alternative of card {card_id}")]
    InvalidAnswer {
        card_id: CardId,
        label: String,
        impact: f64,
    },
    #[error("choice {index} is out of range for card {card_id} ({available} alternatives)")]
    InvalidChoiceIndex {
        card_id: CardId,
        index: usize,
        available: usize,
    },
    #[error(transparent)]
    Classification(#[from] ClassificationError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl SessionError {
    /// Returns the state violation, if this is one.
    #[must_use]
    pub fn state(&self) -> Option<StateError> {
        match self {
            SessionError::State(err) => Some(*err),
            _ => None,
        }
    }

    /// True for answers that do not belong to the current card.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SessionError::InvalidAnswer { .. } | SessionError::InvalidChoiceIndex { .. }
        )
    }
}
