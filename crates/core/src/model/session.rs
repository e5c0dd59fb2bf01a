use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analytics::{NormalizeError, normalize};
use crate::model::{Difficulty, SessionId};
use crate::time::format_timestamp;

//
// ─── CONFIGURATION ─────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigurationError {
    #[error("session configuration cannot change once the session has started")]
    Locked,

    #[error("round count must be > 0")]
    InvalidMaxRounds,

    #[error("difficulty cannot be empty")]
    EmptyDifficulty,
}

/// Difficulty and round budget for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    difficulty: Difficulty,
    max_rounds: u32,
}

impl SessionConfig {
    /// Number of rounds used when nothing else is configured.
    pub const DEFAULT_ROUNDS: u32 = 10;

    /// Creates a validated session configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::EmptyDifficulty` for a blank label and
    /// `ConfigurationError::InvalidMaxRounds` when `max_rounds` is zero.
    pub fn new(difficulty: impl AsRef<str>, max_rounds: u32) -> Result<Self, ConfigurationError> {
        let difficulty =
            Difficulty::parse(difficulty).ok_or(ConfigurationError::EmptyDifficulty)?;
        if max_rounds == 0 {
            return Err(ConfigurationError::InvalidMaxRounds);
        }
        Ok(Self {
            difficulty,
            max_rounds,
        })
    }

    #[must_use]
    pub fn difficulty(&self) -> &Difficulty {
        &self.difficulty
    }

    #[must_use]
    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::easy(),
            max_rounds: Self::DEFAULT_ROUNDS,
        }
    }
}

//
// ─── COMPLETED SESSION ─────────────────────────────────────────────────────────
//

/// Outcome of one finished play-through, as stored in the history.
///
/// `best_possible`/`worst_possible` are the lowest and highest totals the
/// player could have reached with the cards they were dealt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedSession {
    timestamp: String,
    difficulty: Difficulty,
    total_rounds: u32,
    total_score: f64,
    #[serde(alias = "bestScore")]
    best_possible: f64,
    #[serde(alias = "worstScore")]
    worst_possible: f64,
}

impl CompletedSession {
    #[must_use]
    pub fn new(
        completed_at: DateTime<Utc>,
        difficulty: Difficulty,
        total_rounds: u32,
        total_score: f64,
        best_possible: f64,
        worst_possible: f64,
    ) -> Self {
        Self {
            timestamp: format_timestamp(completed_at),
            difficulty,
            total_rounds,
            total_score,
            best_possible,
            worst_possible,
        }
    }

    #[must_use]
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    #[must_use]
    pub fn difficulty(&self) -> &Difficulty {
        &self.difficulty
    }

    #[must_use]
    pub fn total_rounds(&self) -> u32 {
        self.total_rounds
    }

    #[must_use]
    pub fn total_score(&self) -> f64 {
        self.total_score
    }

    #[must_use]
    pub fn best_possible(&self) -> f64 {
        self.best_possible
    }

    #[must_use]
    pub fn worst_possible(&self) -> f64 {
        self.worst_possible
    }

    /// Normalized performance (0..=100) of this session against its own range.
    ///
    /// # Errors
    ///
    /// Returns `NormalizeError` if the stored values are non-finite or the
    /// range is degenerate.
    pub fn performance(&self) -> Result<f64, NormalizeError> {
        normalize(self.total_score, self.best_possible, self.worst_possible)
    }
}

/// A completed session together with the id the ledger assigned to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    #[serde(rename = "sessionId")]
    pub id: SessionId,
    #[serde(flatten)]
    pub session: CompletedSession,
}

impl SessionRecord {
    #[must_use]
    pub fn new(id: SessionId, session: CompletedSession) -> Self {
        Self { id, session }
    }
}
