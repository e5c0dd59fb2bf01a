//! Pure scoring analytics: normalization, feedback tiers and percentile rank.

mod feedback;
mod normalize;
mod percentile;
mod trend;

pub use feedback::{AchievableRange, ClassificationError, FeedbackClassifier, FeedbackTier};
pub use normalize::{NormalizeError, normalize};
pub use percentile::{BaselineStats, PercentileRanker, erf, standard_normal_cdf};
pub use trend::{PerformancePoint, performance_series};
