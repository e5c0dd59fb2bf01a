use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::model::ids::CardId;

//
// ─── DIFFICULTY ────────────────────────────────────────────────────────────────
//

/// Difficulty label used to filter the card deck (e.g. "Easy", "Medium", "Hard").
///
/// Labels are free-form; matching between labels ignores case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Difficulty(String);

impl Difficulty {
    pub const EASY: &'static str = "Easy";
    pub const MEDIUM: &'static str = "Medium";
    pub const HARD: &'static str = "Hard";

    /// Builds a difficulty from a label, trimming whitespace.
    ///
    /// Returns `None` when the label is blank.
    #[must_use]
    pub fn parse(label: impl AsRef<str>) -> Option<Self> {
        let trimmed = label.as_ref().trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_owned()))
        }
    }

    #[must_use]
    pub fn easy() -> Self {
        Self(Self::EASY.to_owned())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive comparison used when filtering cards.
    #[must_use]
    pub fn matches(&self, other: &Difficulty) -> bool {
        self.0.to_lowercase() == other.0.to_lowercase()
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Self::easy()
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

//
// ─── ALTERNATIVE ───────────────────────────────────────────────────────────────
//

/// One answer option on a card together with its environmental impact.
///
/// Equality is by value: two alternatives are the same choice when both the
/// label and the impact match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    #[serde(rename = "choice", alias = "label")]
    label: String,
    #[serde(rename = "co2", alias = "impact")]
    impact: f64,
}

impl Alternative {
    #[must_use]
    pub fn new(label: impl Into<String>, impact: f64) -> Self {
        Self {
            label: label.into(),
            impact,
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn impact(&self) -> f64 {
        self.impact
    }
}

//
// ─── CARD ──────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum CardError {
    #[error("card scenario cannot be empty")]
    EmptyScenario,

    #[error("card difficulty cannot be empty")]
    EmptyDifficulty,

    #[error("card must offer at least one alternative")]
    NoAlternatives,

    #[error("alternative {index} has an empty label")]
    EmptyLabel { index: usize },

    #[error("alternative {index} has a non-finite impact: {impact}")]
    NonFiniteImpact { index: usize, impact: f64 },
}

/// A scenario card with its ordered answer alternatives.
///
/// Cards are immutable once built; a session only ever reads them.
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    id: CardId,
    scenario: String,
    difficulty: Difficulty,
    alternatives: Vec<Alternative>,
}

impl Card {
    /// Builds a validated card.
    ///
    /// # Errors
    ///
    /// Returns `CardError` if the scenario or difficulty is blank, there are no
    /// alternatives, or any alternative has a blank label or non-finite impact.
    pub fn new(
        id: CardId,
        scenario: impl Into<String>,
        difficulty: impl AsRef<str>,
        alternatives: Vec<Alternative>,
    ) -> Result<Self, CardError> {
        let scenario = scenario.into();
        if scenario.trim().is_empty() {
            return Err(CardError::EmptyScenario);
        }
        let difficulty = Difficulty::parse(difficulty).ok_or(CardError::EmptyDifficulty)?;
        if alternatives.is_empty() {
            return Err(CardError::NoAlternatives);
        }
        for (index, alt) in alternatives.iter().enumerate() {
            if alt.label.trim().is_empty() {
                return Err(CardError::EmptyLabel { index });
            }
            if !alt.impact.is_finite() {
                return Err(CardError::NonFiniteImpact {
                    index,
                    impact: alt.impact,
                });
            }
        }

        Ok(Self {
            id,
            scenario,
            difficulty,
            alternatives,
        })
    }

    #[must_use]
    pub fn id(&self) -> CardId {
        self.id
    }

    #[must_use]
    pub fn scenario(&self) -> &str {
        &self.scenario
    }

    #[must_use]
    pub fn difficulty(&self) -> &Difficulty {
        &self.difficulty
    }

    #[must_use]
    pub fn alternatives(&self) -> &[Alternative] {
        &self.alternatives
    }

    /// Looks up an alternative by value.
    #[must_use]
    pub fn find_alternative(&self, choice: &Alternative) -> Option<&Alternative> {
        self.alternatives.iter().find(|alt| *alt == choice)
    }

    /// Lowest impact among this card's alternatives.
    #[must_use]
    pub fn min_impact(&self) -> f64 {
        self.alternatives
            .iter()
            .map(Alternative::impact)
            .fold(f64::INFINITY, f64::min)
    }

    /// Highest impact among this card's alternatives.
    #[must_use]
    pub fn max_impact(&self) -> f64 {
        self.alternatives
            .iter()
            .map(Alternative::impact)
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
