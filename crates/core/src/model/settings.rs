use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::model::{ConfigurationError, Difficulty, SessionConfig};

pub const DEFAULT_CARDS_PATH: &str = "data/cards.json";
pub const DEFAULT_HISTORY_PATH: &str = "data/game_sessions.json";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameSettings {
    cards_path: PathBuf,
    history_path: PathBuf,
    session: SessionConfig,
    shuffle_seed: Option<u64>,
}

/// Unvalidated settings as collected from defaults, environment and flags.
#[derive(Clone, Debug, Default)]
pub struct GameSettingsDraft {
    pub cards_path: Option<String>,
    pub history_path: Option<String>,
    pub difficulty: Option<String>,
    pub rounds: Option<u32>,
    pub shuffle_seed: Option<u64>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum GameSettingsError {
    #[error("cards path cannot be empty")]
    EmptyCardsPath,
    #[error("history path cannot be empty")]
    EmptyHistoryPath,
    #[error(transparent)]
    Session(#[from] ConfigurationError),
}

impl GameSettingsDraft {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overlay `other` on top of this draft; values set in `other` win.
    #[must_use]
    pub fn merge(self, other: GameSettingsDraft) -> Self {
        Self {
            cards_path: other.cards_path.or(self.cards_path),
            history_path: other.history_path.or(self.history_path),
            difficulty: other.difficulty.or(self.difficulty),
            rounds: other.rounds.or(self.rounds),
            shuffle_seed: other.shuffle_seed.or(self.shuffle_seed),
        }
    }

    /// Validate and normalize the draft, filling unset values with defaults.
    ///
    /// # Errors
    ///
    /// Returns `GameSettingsError` if a path is blank or the session
    /// configuration is invalid.
    pub fn validate(self) -> Result<GameSettings, GameSettingsError> {
        let cards_path = normalize_path(self.cards_path, DEFAULT_CARDS_PATH)
            .ok_or(GameSettingsError::EmptyCardsPath)?;
        let history_path = normalize_path(self.history_path, DEFAULT_HISTORY_PATH)
            .ok_or(GameSettingsError::EmptyHistoryPath)?;
        let difficulty = self
            .difficulty
            .unwrap_or_else(|| Difficulty::EASY.to_owned());
        let rounds = self.rounds.unwrap_or(SessionConfig::DEFAULT_ROUNDS);
        let session = SessionConfig::new(difficulty, rounds)?;

        Ok(GameSettings {
            cards_path,
            history_path,
            session,
            shuffle_seed: self.shuffle_seed,
        })
    }
}

impl GameSettings {
    #[must_use]
    pub fn cards_path(&self) -> &Path {
        &self.cards_path
    }

    #[must_use]
    pub fn history_path(&self) -> &Path {
        &self.history_path
    }

    #[must_use]
    pub fn session(&self) -> &SessionConfig {
        &self.session
    }

    #[must_use]
    pub fn shuffle_seed(&self) -> Option<u64> {
        self.shuffle_seed
    }
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            cards_path: PathBuf::from(DEFAULT_CARDS_PATH),
            history_path: PathBuf::from(DEFAULT_HISTORY_PATH),
            session: SessionConfig::default(),
            shuffle_seed: None,
        }
    }
}

fn normalize_path(value: Option<String>, default: &str) -> Option<PathBuf> {
    match value {
        None => Some(PathBuf::from(default)),
        Some(raw) => {
            let trimmed = raw.trim();
            (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
        }
    }
}
