use serde::{Deserialize, Serialize};

use crate::model::{SessionId, SessionRecord};

/// One point of the performance-over-time series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformancePoint {
    pub session_id: SessionId,
    pub performance: f64,
}

/// Normalized performance for each record, in ledger order.
///
/// Records that cannot be normalized (degenerate or non-finite range) are
/// skipped.
#[must_use]
pub fn performance_series(records: &[SessionRecord]) -> Vec<PerformancePoint> {
    records
        .iter()
        .filter_map(|record| match record.session.performance() {
            Ok(performance) => Some(PerformancePoint {
                session_id: record.id,
                performance,
            }),
            Err(err) => {
                log::warn!("skipping session {} in performance series: {err}", record.id);
                None
            }
        })
        .collect()
}
