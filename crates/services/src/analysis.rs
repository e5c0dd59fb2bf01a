//! End-of-session feedback: tier, normalized performance and percentile.

use serde::Serialize;

use eco_core::analytics::{AchievableRange, FeedbackClassifier, FeedbackTier, PercentileRanker};
use eco_core::model::{SessionId, SessionRecord};

use crate::error::SessionError;
use crate::history::HistoryLedger;

/// Everything shown to the player after a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionReport {
    pub session_id: SessionId,
    pub final_score: f64,
    pub range: AchievableRange,
    pub tier: FeedbackTier,
    /// Normalized score in `[0, 100]`; `None` for a degenerate range.
    pub performance: Option<f64>,
    /// Rank against earlier sessions; `None` until two earlier sessions exist.
    pub percentile: Option<f64>,
}

impl SessionReport {
    #[must_use]
    pub fn message(&self) -> &'static str {
        self.tier.message()
    }
}

/// Builds reports for recorded sessions using the ledger as baseline.
#[derive(Debug, Clone)]
pub struct PerformanceAnalyzer {
    ledger: HistoryLedger,
}

impl PerformanceAnalyzer {
    #[must_use]
    pub fn new(ledger: HistoryLedger) -> Self {
        Self { ledger }
    }

    /// Reports on `record`, ranking it against sessions with lower ids.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Classification` if the stored score lies
    /// outside the stored best/worst range.
    pub fn report(&self, record: &SessionRecord) -> Result<SessionReport, SessionError> {
        let session = &record.session;
        let best = session.best_possible();
        let worst = session.worst_possible();
        let range = AchievableRange {
            best,
            worst,
            average: (best + worst) / 2.0,
        };
        let tier = FeedbackClassifier::from_range(range).classify(session.total_score())?;

        let performance = match session.performance() {
            Ok(value) => Some(value),
            Err(err) => {
                log::warn!("session {} has no normalized performance: {err}", record.id);
                None
            }
        };

        let baseline: Vec<f64> = self
            .ledger
            .performance_series()
            .into_iter()
            .filter(|point| point.session_id < record.id)
            .map(|point| point.performance)
            .collect();
        let percentile =
            performance.and_then(|value| PercentileRanker::rank(&baseline, value));

        Ok(SessionReport {
            session_id: record.id,
            final_score: session.total_score(),
            range,
            tier,
            performance,
            percentile,
        })
    }

    /// Reports on the stored session with `id`, if it exists.
    ///
    /// # Errors
    ///
    /// Same as [`PerformanceAnalyzer::report`].
    pub fn report_for(&self, id: SessionId) -> Result<Option<SessionReport>, SessionError> {
        self.ledger
            .get(id)
            .map(|record| self.report(&record))
            .transpose()
    }
}
