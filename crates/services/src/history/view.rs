use serde::Serialize;

use eco_core::analytics::{PercentileRanker, PerformancePoint};
use eco_core::model::{Difficulty, SessionId, SessionRecord};

use super::HistoryLedger;

/// One row of the history listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryListItem {
    pub id: SessionId,
    pub timestamp: String,
    pub difficulty: Difficulty,
    pub rounds: u32,
    pub score: f64,
    pub best_possible: f64,
    pub worst_possible: f64,
    /// `None` when the stored range cannot be normalized.
    pub performance: Option<f64>,
}

impl HistoryListItem {
    #[must_use]
    pub fn from_record(record: &SessionRecord) -> Self {
        let session = &record.session;
        Self {
            id: record.id,
            timestamp: session.timestamp().to_owned(),
            difficulty: session.difficulty().clone(),
            rounds: session.total_rounds(),
            score: session.total_score(),
            best_possible: session.best_possible(),
            worst_possible: session.worst_possible(),
            performance: session.performance().ok(),
        }
    }
}

/// History listing plus the performance trend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryOverview {
    pub items: Vec<HistoryListItem>,
    pub trend: Vec<PerformancePoint>,
    /// Percentile of the newest session against all earlier ones; `None`
    /// when the newest session has no performance.
    pub latest_percentile: Option<f64>,
}

impl HistoryOverview {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl HistoryLedger {
    /// Snapshot of the whole history for display.
    #[must_use]
    pub fn overview(&self) -> HistoryOverview {
        let records = self.all();
        let items: Vec<HistoryListItem> =
            records.iter().map(HistoryListItem::from_record).collect();
        let trend = eco_core::analytics::performance_series(&records);

        // The newest record is last in the trend whenever it has a performance.
        let latest_percentile = items.last().and_then(|item| item.performance).and_then(|_| {
            let performances: Vec<f64> = trend.iter().map(|point| point.performance).collect();
            PercentileRanker::rank_latest(&performances)
        });

        HistoryOverview {
            items,
            trend,
            latest_percentile,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eco_core::model::CompletedSession;
    use eco_core::time::fixed_now;

    #[test]
    fn overview_lists_sessions_with_trend() {
        let ledger = HistoryLedger::in_memory();
        for score in [2.0, 4.0, 6.0] {
            ledger.append(CompletedSession::new(
                fixed_now(),
                Difficulty::easy(),
                3,
                score,
                0.0,
                10.0,
            ));
        }
        // Single-alternative deck: best == worst.
        ledger.append(CompletedSession::new(fixed_now(), Difficulty::easy(), 1, 3.0, 3.0, 3.0));

        let overview = ledger.overview();
        assert_eq!(overview.items.len(), 4);
        assert_eq!(overview.items[3].performance, None);
        assert_eq!(overview.trend.len(), 3);
        assert_eq!(overview.items[0].timestamp, "2023-11-14 22:13:20");

        assert_eq!(overview.latest_percentile, None);
    }

    #[test]
    fn latest_percentile_ranks_newest_session() {
        let ledger = HistoryLedger::in_memory();
        for score in [2.0, 4.0, 6.0] {
            ledger.append(CompletedSession::new(
                fixed_now(),
                Difficulty::easy(),
                3,
                score,
                0.0,
                10.0,
            ));
        }

        let latest = ledger.overview().latest_percentile.unwrap();
        assert!(latest < 50.0);
    }

    #[test]
    fn empty_history_has_no_percentile() {
        let overview = HistoryLedger::in_memory().overview();
        assert!(overview.is_empty());
        assert_eq!(overview.latest_percentile, None);
    }
}
