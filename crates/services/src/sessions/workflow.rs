use std::fmt;
use std::sync::Arc;

use eco_core::Clock;
use eco_core::model::{Alternative, SessionConfig, SessionRecord};
use storage::repository::{DeckSource, Storage};

use super::machine::{AnswerOutcome, SessionStateMachine, ShuffleMode};
use crate::analysis::{PerformanceAnalyzer, SessionReport};
use crate::error::{SessionError, StateError};
use crate::history::HistoryLedger;

/// Result of answering a single card through the game loop.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionAnswerResult {
    pub outcome: AnswerOutcome,
    /// Present on the answer that ended the session.
    pub report: Option<SessionReport>,
}

/// Orchestrates session start, answering, and recording into the history.
#[derive(Clone)]
pub struct GameLoopService {
    clock: Clock,
    deck: Arc<dyn DeckSource>,
    ledger: HistoryLedger,
    shuffle: ShuffleMode,
}

impl GameLoopService {
    #[must_use]
    pub fn new(clock: Clock, deck: Arc<dyn DeckSource>, ledger: HistoryLedger) -> Self {
        Self {
            clock,
            deck,
            ledger,
            shuffle: ShuffleMode::default(),
        }
    }

    #[must_use]
    pub fn from_storage(clock: Clock, storage: &Storage) -> Self {
        Self::new(
            clock,
            Arc::clone(&storage.deck),
            HistoryLedger::new(Arc::clone(&storage.history)),
        )
    }

    #[must_use]
    pub fn with_shuffle(mut self, shuffle: ShuffleMode) -> Self {
        self.shuffle = shuffle;
        self
    }

    #[must_use]
    pub fn ledger(&self) -> &HistoryLedger {
        &self.ledger
    }

    #[must_use]
    pub fn analyzer(&self) -> PerformanceAnalyzer {
        PerformanceAnalyzer::new(self.ledger.clone())
    }

    /// A fresh session in the configuring phase.
    #[must_use]
    pub fn new_session(&self) -> SessionStateMachine {
        SessionStateMachine::new(Arc::clone(&self.deck))
            .with_clock(self.clock)
            .with_shuffle(self.shuffle)
    }

    /// Configures and starts a session in one step.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the deck cannot be fetched.
    pub fn start_session(&self, config: SessionConfig) -> Result<SessionStateMachine, SessionError> {
        let mut session = self.new_session();
        session.set_config(config)?;
        session.start()?;
        Ok(session)
    }

    /// Answers the current card and records the session once it ends.
    ///
    /// # Errors
    ///
    /// Propagates the state machine's errors.
    pub fn submit_answer(
        &self,
        session: &mut SessionStateMachine,
        choice: &Alternative,
    ) -> Result<SessionAnswerResult, SessionError> {
        let outcome = session.submit_answer(choice)?;
        self.after_answer(session, outcome)
    }

    /// Like [`GameLoopService::submit_answer`], by alternative position.
    ///
    /// # Errors
    ///
    /// Propagates the state machine's errors.
    pub fn submit_choice(
        &self,
        session: &mut SessionStateMachine,
        index: usize,
    ) -> Result<SessionAnswerResult, SessionError> {
        let outcome = session.submit_choice(index)?;
        self.after_answer(session, outcome)
    }

    fn after_answer(
        &self,
        session: &mut SessionStateMachine,
        outcome: AnswerOutcome,
    ) -> Result<SessionAnswerResult, SessionError> {
        let report = if outcome.is_ended {
            Some(self.finalize(session)?)
        } else {
            None
        };
        Ok(SessionAnswerResult { outcome, report })
    }

    /// Appends an ended session to the ledger and reports on it.
    ///
    /// # Errors
    ///
    /// Returns `StateError::NotEnded` for a running session and
    /// `StateError::AlreadyRecorded` if it was recorded before.
    pub fn finalize(&self, session: &mut SessionStateMachine) -> Result<SessionReport, SessionError> {
        let completed = session.completed_session()?;
        if session.session_id().is_some() {
            return Err(StateError::AlreadyRecorded.into());
        }

        let id = self.ledger.append(completed.clone());
        session.mark_recorded(id)?;
        self.analyzer().report(&SessionRecord::new(id, completed))
    }
}

impl fmt::Debug for GameLoopService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameLoopService")
            .field("clock", &self.clock)
            .field("shuffle", &self.shuffle)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eco_core::analytics::FeedbackTier;
    use eco_core::model::{Card, CardId, SessionId};
    use eco_core::time::fixed_clock;
    use storage::repository::InMemoryRepository;

    fn build_card(id: u64, low: f64, high: f64) -> Card {
        Card::new(
            CardId::new(id),
            format!("Scenario {id}"),
            "Medium",
            vec![Alternative::new("low", low), Alternative::new("high", high)],
        )
        .unwrap()
    }

    fn service() -> GameLoopService {
        let repo = Arc::new(InMemoryRepository::with_cards([
            build_card(1, 1.0, 5.0),
            build_card(2, 0.0, 3.0),
        ]));
        GameLoopService::new(fixed_clock(), repo, HistoryLedger::in_memory())
            .with_shuffle(ShuffleMode::Off)
    }

    #[test]
    fn ending_answer_records_and_reports() {
        let service = service();
        let mut session = service
            .start_session(SessionConfig::new("medium", 2).unwrap())
            .unwrap();

        session.draw_next().unwrap();
        let first = service.submit_choice(&mut session, 0).unwrap();
        assert!(first.report.is_none());
        assert_eq!(service.ledger().count(), 0);

        session.draw_next().unwrap();
        let last = service.submit_choice(&mut session, 0).unwrap();
        let report = last.report.unwrap();
        assert_eq!(report.session_id, SessionId::FIRST);
        assert_eq!(report.tier, FeedbackTier::Excellent);
        assert_eq!(report.performance, Some(100.0));
        assert_eq!(session.session_id(), Some(SessionId::FIRST));
        assert_eq!(service.ledger().count(), 1);
    }

    #[test]
    fn finalize_is_rejected_twice_and_before_end() {
        let service = service();
        let mut session = service
            .start_session(SessionConfig::new("Medium", 1).unwrap())
            .unwrap();
        assert_eq!(
            service.finalize(&mut session).unwrap_err().state(),
            Some(StateError::NotEnded)
        );

        session.draw_next().unwrap();
        service.submit_choice(&mut session, 1).unwrap();
        assert_eq!(
            service.finalize(&mut session).unwrap_err().state(),
            Some(StateError::AlreadyRecorded)
        );
        assert_eq!(service.ledger().count(), 1);
    }
}
