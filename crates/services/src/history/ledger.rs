use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use eco_core::analytics::{PerformancePoint, performance_series};
use eco_core::model::{CompletedSession, SessionId, SessionRecord};
use storage::repository::{HistoryStore, InMemoryRepository};

#[derive(Debug, Default)]
struct LedgerState {
    records: Vec<SessionRecord>,
    /// False while the store holds data that could not be read; saving
    /// would overwrite it.
    writable: bool,
}

/// Append-mostly list of completed sessions with sequential ids.
///
/// Records are loaded from the store once and kept in memory; every change
/// is saved back best-effort. A store that cannot be read leaves the ledger
/// empty and read-only towards the store, so the unreadable data is never
/// overwritten. Failed saves are logged and the in-memory records stay
/// authoritative. Clones share the same records.
#[derive(Clone)]
pub struct HistoryLedger {
    store: Arc<dyn HistoryStore>,
    state: Arc<Mutex<LedgerState>>,
}

impl HistoryLedger {
    #[must_use]
    pub fn new(store: Arc<dyn HistoryStore>) -> Self {
        let state = match store.load() {
            Ok(mut records) => {
                records.sort_by_key(|record| record.id);
                LedgerState {
                    records,
                    writable: true,
                }
            }
            Err(err) => {
                log::warn!(
                    "failed to load session history; new sessions are kept in memory only: {err}"
                );
                LedgerState::default()
            }
        };
        Self {
            store,
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Creates a ledger backed by an in-memory store.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryRepository::new()))
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, state: &LedgerState) {
        if !state.writable {
            log::warn!("session history store is unreadable; not saving over it");
            return;
        }
        if let Err(err) = self.store.save(&state.records) {
            log::error!("failed to save session history: {err}");
        }
    }

    /// Stores `session` under `max(existing ids) + 1` (or 1) and returns the id.
    pub fn append(&self, session: CompletedSession) -> SessionId {
        let mut state = self.lock();
        let id = state
            .records
            .iter()
            .map(|record| record.id)
            .max()
            .map_or(SessionId::FIRST, SessionId::next);
        state.records.push(SessionRecord::new(id, session));
        self.persist(&state);
        log::info!("recorded session {id}");
        id
    }

    /// All sessions in ascending id order.
    #[must_use]
    pub fn all(&self) -> Vec<SessionRecord> {
        self.lock().records.clone()
    }

    #[must_use]
    pub fn get(&self, id: SessionId) -> Option<SessionRecord> {
        self.lock()
            .records
            .iter()
            .find(|record| record.id == id)
            .cloned()
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.lock().records.len()
    }

    /// Removes the session with `id`. Returns whether one was removed.
    pub fn remove(&self, id: SessionId) -> bool {
        let mut state = self.lock();
        let before = state.records.len();
        state.records.retain(|record| record.id != id);
        if state.records.len() == before {
            return false;
        }
        self.persist(&state);
        log::info!("removed session {id}");
        true
    }

    /// Drops every session.
    ///
    /// This is an explicit discard, so it also replaces a store that could
    /// not be read.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.records.clear();
        state.writable = true;
        self.persist(&state);
        log::info!("cleared session history");
    }

    /// Normalized performance of each session, oldest first.
    #[must_use]
    pub fn performance_series(&self) -> Vec<PerformancePoint> {
        performance_series(&self.lock().records)
    }
}

impl fmt::Debug for HistoryLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryLedger")
            .field("count", &self.count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eco_core::model::Difficulty;
    use eco_core::time::fixed_now;
    use storage::repository::StorageError;

    fn completed(score: f64) -> CompletedSession {
        CompletedSession::new(fixed_now(), Difficulty::easy(), 2, score, 1.0, 9.0)
    }

    #[test]
    fn append_assigns_sequential_ids() {
        let ledger = HistoryLedger::in_memory();
        assert_eq!(ledger.append(completed(3.0)), SessionId::new(1));
        assert_eq!(ledger.append(completed(4.0)), SessionId::new(2));
        assert_eq!(ledger.count(), 2);
        let ids: Vec<_> = ledger.all().iter().map(|record| record.id).collect();
        assert_eq!(ids, vec![SessionId::new(1), SessionId::new(2)]);
    }

    #[test]
    fn ids_continue_from_max_after_removal() {
        let ledger = HistoryLedger::in_memory();
        for score in [1.0, 2.0, 3.0] {
            ledger.append(completed(score));
        }
        assert!(ledger.remove(SessionId::new(2)));
        assert!(!ledger.remove(SessionId::new(2)));
        assert_eq!(ledger.append(completed(5.0)), SessionId::new(4));

        assert!(ledger.remove(SessionId::new(4)));
        assert_eq!(ledger.append(completed(6.0)), SessionId::new(4));
    }

    #[test]
    fn get_and_clear() {
        let ledger = HistoryLedger::in_memory();
        let id = ledger.append(completed(7.0));
        let record = ledger.get(id).unwrap();
        assert!((record.session.total_score() - 7.0).abs() < 1e-9);
        assert!(ledger.get(SessionId::new(99)).is_none());

        ledger.clear();
        assert_eq!(ledger.count(), 0);
        assert_eq!(ledger.append(completed(1.0)), SessionId::FIRST);
    }

    #[test]
    fn performance_series_follows_id_order() {
        let ledger = HistoryLedger::in_memory();
        ledger.append(completed(1.0));
        ledger.append(completed(9.0));
        let series = ledger.performance_series();
        assert_eq!(series.len(), 2);
        assert!((series[0].performance - 100.0).abs() < 1e-9);
        assert!((series[1].performance - 0.0).abs() < 1e-9);
    }

    /// Counts saves; `load` and `save` fail on demand.
    #[derive(Default)]
    struct FlakyStore {
        unreadable: bool,
        read_only: bool,
        saves: Mutex<usize>,
    }

    impl FlakyStore {
        fn saves(&self) -> usize {
            *self.saves.lock().unwrap()
        }
    }

    impl HistoryStore for FlakyStore {
        fn load(&self) -> Result<Vec<SessionRecord>, StorageError> {
            if self.unreadable {
                return Err(StorageError::Serialization("missing field".into()));
            }
            Ok(Vec::new())
        }

        fn save(&self, _records: &[SessionRecord]) -> Result<(), StorageError> {
            *self.saves.lock().unwrap() += 1;
            if self.read_only {
                return Err(StorageError::Io("read-only".into()));
            }
            Ok(())
        }
    }

    #[test]
    fn failed_saves_keep_sessions_in_memory() {
        let store = Arc::new(FlakyStore {
            read_only: true,
            ..FlakyStore::default()
        });
        let ledger = HistoryLedger::new(store.clone());

        assert_eq!(ledger.append(completed(2.0)), SessionId::new(1));
        assert_eq!(ledger.append(completed(3.0)), SessionId::new(2));
        assert_eq!(ledger.all().len(), 2);
        assert_eq!(store.saves(), 2);

        assert!(ledger.remove(SessionId::new(1)));
        assert_eq!(ledger.append(completed(4.0)), SessionId::new(3));
    }

    #[test]
    fn unreadable_store_is_never_overwritten() {
        let store = Arc::new(FlakyStore {
            unreadable: true,
            ..FlakyStore::default()
        });
        let ledger = HistoryLedger::new(store.clone());
        assert_eq!(ledger.count(), 0);

        assert_eq!(ledger.append(completed(2.0)), SessionId::FIRST);
        assert_eq!(ledger.append(completed(3.0)), SessionId::new(2));
        assert!(ledger.remove(SessionId::FIRST));
        assert_eq!(ledger.count(), 1);
        assert_eq!(store.saves(), 0);

        ledger.clear();
        assert_eq!(store.saves(), 1);
        ledger.append(completed(1.0));
        assert_eq!(store.saves(), 2);
    }

    #[test]
    fn clones_share_records() {
        let ledger = HistoryLedger::in_memory();
        let other = ledger.clone();
        ledger.append(completed(5.0));
        assert_eq!(other.count(), 1);
        assert_eq!(other.append(completed(6.0)), SessionId::new(2));
    }

    #[test]
    fn loads_existing_records_in_id_order() {
        let repo = Arc::new(InMemoryRepository::new());
        repo.save(&[
            SessionRecord::new(SessionId::new(4), completed(4.0)),
            SessionRecord::new(SessionId::new(2), completed(2.0)),
        ])
        .unwrap();

        let ledger = HistoryLedger::new(repo);
        let ids: Vec<_> = ledger.all().iter().map(|record| record.id).collect();
        assert_eq!(ids, vec![SessionId::new(2), SessionId::new(4)]);
        assert_eq!(ledger.append(completed(1.0)), SessionId::new(5));
    }
}
