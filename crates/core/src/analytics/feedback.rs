use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::model::Card;

#[derive(Debug, Error, Clone, Copy, PartialEq)]
#[non_exhaustive]
pub enum ClassificationError {
    #[error("score {score} is outside the achievable range [{best}, {worst}]")]
    OutOfRange { score: f64, best: f64, worst: f64 },
}

/// Qualitative verdict for a final score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackTier {
    Excellent,
    Good,
    Poor,
    VeryPoor,
}

impl FeedbackTier {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            FeedbackTier::Excellent => "excellent",
            FeedbackTier::Good => "good",
            FeedbackTier::Poor => "poor",
            FeedbackTier::VeryPoor => "very poor",
        }
    }

    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            FeedbackTier::Excellent => "Climate hero",
            FeedbackTier::Good => "Mindful choices",
            FeedbackTier::Poor => "Unsustainable",
            FeedbackTier::VeryPoor => "Climate negligence",
        }
    }

    /// Player-facing feedback message.
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            FeedbackTier::Excellent => {
                "You're a climate hero! Your choices show deep environmental care."
            }
            FeedbackTier::Good => {
                "You're making mindful decisions! Your eco-awareness is inspiring."
            }
            FeedbackTier::Poor => {
                "Your lifestyle is unsustainable. You're actively making the climate crisis worse!"
            }
            FeedbackTier::VeryPoor => {
                "This is climate negligence. Your choices show complete disregard for the planet's future!"
            }
        }
    }
}

impl fmt::Display for FeedbackTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Lowest and highest totals reachable with a given set of cards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AchievableRange {
    pub best: f64,
    pub worst: f64,
    pub average: f64,
}

impl AchievableRange {
    /// Sums per-card minimum and maximum impacts over the first `max_rounds` cards.
    ///
    /// If fewer cards than `max_rounds` are given, only those cards count.
    #[must_use]
    pub fn from_cards(cards: &[Card], max_rounds: u32) -> Self {
        let rounds = usize::try_from(max_rounds).unwrap_or(usize::MAX);
        let (best, worst) = cards
            .iter()
            .take(rounds)
            .fold((0.0, 0.0), |(best, worst), card| {
                (best + card.min_impact(), worst + card.max_impact())
            });

        Self {
            best,
            worst,
            average: (best + worst) / 2.0,
        }
    }

    #[must_use]
    pub fn contains(&self, score: f64) -> bool {
        score >= self.best && score <= self.worst
    }
}

/// Maps a final score to a feedback tier relative to the achievable range.
///
/// Tier edges sit at `average / 2`, `average` and `1.5 * average` rather than
/// at the midpoints of each half of the range. Depending on the cards, some
/// tiers may be unreachable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeedbackClassifier {
    range: AchievableRange,
}

impl FeedbackClassifier {
    #[must_use]
    pub fn new(cards: &[Card], max_rounds: u32) -> Self {
        Self {
            range: AchievableRange::from_cards(cards, max_rounds),
        }
    }

    #[must_use]
    pub fn from_range(range: AchievableRange) -> Self {
        Self { range }
    }

    #[must_use]
    pub fn range(&self) -> AchievableRange {
        self.range
    }

    /// Classifies `score` into one of the four tiers.
    ///
    /// # Errors
    ///
    /// Returns `ClassificationError::OutOfRange` if `score` is outside
    /// `[best, worst]` (including NaN).
    pub fn classify(&self, score: f64) -> Result<FeedbackTier, ClassificationError> {
        let AchievableRange {
            best,
            worst,
            average,
        } = self.range;

        if !self.range.contains(score) {
            return Err(ClassificationError::OutOfRange { score, best, worst });
        }

        let tier = if score < average / 2.0 {
            FeedbackTier::Excellent
        } else if score < average {
            FeedbackTier::Good
        } else if score < 1.5 * average {
            FeedbackTier::Poor
        } else {
            FeedbackTier::VeryPoor
        };
        Ok(tier)
    }
}
