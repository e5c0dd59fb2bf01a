use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::fmt;
use std::sync::Arc;

use eco_core::Clock;
use eco_core::analytics::{AchievableRange, FeedbackClassifier};
use eco_core::model::{
    Alternative, Card, CardId, CompletedSession, ConfigurationError, SessionConfig, SessionId,
};
use storage::repository::DeckSource;

use super::progress::SessionProgress;
use crate::error::{SessionError, StateError};

//
// ─── SHUFFLING ─────────────────────────────────────────────────────────────────
//

/// How the fetched deck is ordered before play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShuffleMode {
    /// Shuffle with the thread-local RNG.
    #[default]
    Random,
    /// Shuffle with a seeded RNG; the same seed always yields the same order.
    Seeded(u64),
    /// Keep the order returned by the deck source.
    Off,
}

impl ShuffleMode {
    fn apply(self, cards: &mut [Card]) {
        match self {
            ShuffleMode::Random => cards.shuffle(&mut rand::rng()),
            ShuffleMode::Seeded(seed) => cards.shuffle(&mut StdRng::seed_from_u64(seed)),
            ShuffleMode::Off => {}
        }
    }
}

//
// ─── ROUND RESULTS ─────────────────────────────────────────────────────────────
//

/// The alternative picked for one card.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundResult {
    pub card_id: CardId,
    pub choice: Alternative,
}

/// Outcome of a single accepted answer.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerOutcome {
    pub round: RoundResult,
    pub total_score: f64,
    pub answered: u32,
    pub is_ended: bool,
}

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Configuring,
    InProgress,
    Ended,
}

//
// ─── STATE MACHINE ─────────────────────────────────────────────────────────────
//

/// One play-through: configure, start, then alternate draw and answer until
/// the configured number of rounds has been answered.
///
/// The deck is fetched once on `start` and consumed front to back. Lower
/// scores are better.
pub struct SessionStateMachine {
    deck_source: Arc<dyn DeckSource>,
    clock: Clock,
    shuffle: ShuffleMode,
    config: SessionConfig,
    phase: SessionPhase,
    deck: Vec<Card>,
    cards_drawn: u32,
    answers_submitted: u32,
    total_score: f64,
    rounds: Vec<RoundResult>,
    ended_at: Option<DateTime<Utc>>,
    session_id: Option<SessionId>,
}

impl SessionStateMachine {
    /// Creates a machine in the configuring phase with the default config.
    #[must_use]
    pub fn new(deck_source: Arc<dyn DeckSource>) -> Self {
        Self {
            deck_source,
            clock: Clock::default(),
            shuffle: ShuffleMode::default(),
            config: SessionConfig::default(),
            phase: SessionPhase::Configuring,
            deck: Vec::new(),
            cards_drawn: 0,
            answers_submitted: 0,
            total_score: 0.0,
            rounds: Vec::new(),
            ended_at: None,
            session_id: None,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_shuffle(mut self, shuffle: ShuffleMode) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Sets difficulty and round count.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::Locked` once `start` has succeeded, and
    /// the validation errors of `SessionConfig::new` for bad values. A
    /// rejected call leaves the previous configuration in place.
    pub fn configure(
        &mut self,
        difficulty: impl AsRef<str>,
        max_rounds: u32,
    ) -> Result<(), SessionError> {
        self.ensure_configurable()?;
        self.set_config(SessionConfig::new(difficulty, max_rounds)?)
    }

    /// Replaces the configuration with an already validated one.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::Locked` once `start` has succeeded.
    pub fn set_config(&mut self, config: SessionConfig) -> Result<(), SessionError> {
        self.ensure_configurable()?;
        self.config = config;
        log::debug!(
            "session configured: difficulty={}, rounds={}",
            self.config.difficulty(),
            self.config.max_rounds()
        );
        Ok(())
    }

    /// Fetches and orders the deck for the configured difficulty.
    ///
    /// Returns the number of cards available. A deck with fewer cards than
    /// rounds is accepted; drawing past its end reports `DeckExhausted`.
    ///
    /// # Errors
    ///
    /// Returns `StateError::AlreadyStarted` when called twice, or the
    /// storage error if the deck cannot be fetched.
    pub fn start(&mut self) -> Result<usize, SessionError> {
        if self.phase != SessionPhase::Configuring {
            return Err(StateError::AlreadyStarted.into());
        }

        let mut deck = self
            .deck_source
            .fetch_by_difficulty(self.config.difficulty())?;
        self.shuffle.apply(&mut deck);

        let max_rounds = usize::try_from(self.config.max_rounds()).unwrap_or(usize::MAX);
        if deck.len() < max_rounds {
            log::warn!(
                "deck for difficulty {} has {} cards for {} rounds",
                self.config.difficulty(),
                deck.len(),
                max_rounds
            );
        }
        log::info!(
            "session started: difficulty={}, rounds={}, cards={}",
            self.config.difficulty(),
            self.config.max_rounds(),
            deck.len()
        );

        self.deck = deck;
        self.phase = SessionPhase::InProgress;
        Ok(self.deck.len())
    }

    /// Draws the next card from the front of the deck.
    ///
    /// # Errors
    ///
    /// Returns a `StateError` if the session is not running, the previous
    /// card is still unanswered, or the deck is exhausted.
    pub fn draw_next(&mut self) -> Result<&Card, SessionError> {
        self.ensure_in_progress()?;
        if self.awaiting_answer() {
            return Err(StateError::AwaitingAnswer.into());
        }

        let index = usize::try_from(self.cards_drawn).unwrap_or(usize::MAX);
        if index >= self.deck.len() {
            return Err(StateError::DeckExhausted.into());
        }

        self.cards_drawn += 1;
        let card = &self.deck[index];
        log::debug!("drew card {} ({}/{})", card.id(), self.cards_drawn, self.config.max_rounds());
        Ok(card)
    }

    /// Answers the current card. Alternatives are compared by value.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidAnswer` if `choice` is not one of the
    /// current card's alternatives; the state is left unchanged. Returns a
    /// `StateError` when no card is pending.
    pub fn submit_answer(&mut self, choice: &Alternative) -> Result<AnswerOutcome, SessionError> {
        self.ensure_in_progress()?;
        let card = self.current_card().ok_or(StateError::NoCardPending)?;

        let round = match card.find_alternative(choice) {
            Some(matched) => RoundResult {
                card_id: card.id(),
                choice: matched.clone(),
            },
            None => {
                return Err(SessionError::InvalidAnswer {
                    card_id: card.id(),
                    label: choice.label().to_owned(),
                    impact: choice.impact(),
                });
            }
        };

        Ok(self.record(round))
    }

    /// Answers the current card by the position of the alternative.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidChoiceIndex` if `index` is out of range,
    /// otherwise the same errors as `submit_answer`.
    pub fn submit_choice(&mut self, index: usize) -> Result<AnswerOutcome, SessionError> {
        self.ensure_in_progress()?;
        let card = self.current_card().ok_or(StateError::NoCardPending)?;
        let choice = card.alternatives().get(index).cloned().ok_or_else(|| {
            SessionError::InvalidChoiceIndex {
                card_id: card.id(),
                index,
                available: card.alternatives().len(),
            }
        })?;
        self.submit_answer(&choice)
    }

    fn record(&mut self, round: RoundResult) -> AnswerOutcome {
        self.total_score += round.choice.impact();
        self.answers_submitted += 1;
        log::debug!(
            "card {} answered with {:?} ({}), total={}",
            round.card_id,
            round.choice.label(),
            round.choice.impact(),
            self.total_score
        );
        self.rounds.push(round.clone());

        if self.answers_submitted >= self.config.max_rounds() {
            self.phase = SessionPhase::Ended;
            self.ended_at = Some(self.clock.now());
            log::info!(
                "session ended after {} rounds with score {}",
                self.answers_submitted,
                self.total_score
            );
        }

        AnswerOutcome {
            round,
            total_score: self.total_score,
            answered: self.answers_submitted,
            is_ended: self.is_ended(),
        }
    }

    fn ensure_configurable(&self) -> Result<(), ConfigurationError> {
        if self.phase == SessionPhase::Configuring {
            Ok(())
        } else {
            Err(ConfigurationError::Locked)
        }
    }

    fn ensure_in_progress(&self) -> Result<(), StateError> {
        match self.phase {
            SessionPhase::Configuring => Err(StateError::NotStarted),
            SessionPhase::InProgress => Ok(()),
            SessionPhase::Ended => Err(StateError::Ended),
        }
    }

    fn awaiting_answer(&self) -> bool {
        self.phase == SessionPhase::InProgress && self.answers_submitted < self.cards_drawn
    }

    /// Sum of chosen impacts, available once the session has ended.
    ///
    /// # Errors
    ///
    /// Returns `StateError::NotEnded` before the last round is answered.
    pub fn final_score(&self) -> Result<f64, SessionError> {
        if self.is_ended() {
            Ok(self.total_score)
        } else {
            Err(StateError::NotEnded.into())
        }
    }

    /// Builds the history entry for an ended session.
    ///
    /// # Errors
    ///
    /// Returns `StateError::NotEnded` before the last round is answered.
    pub fn completed_session(&self) -> Result<CompletedSession, SessionError> {
        let total_score = self.final_score()?;
        let range = self.achievable_range();
        let completed_at = self.ended_at.unwrap_or_else(|| self.clock.now());
        Ok(CompletedSession::new(
            completed_at,
            self.config.difficulty().clone(),
            self.answers_submitted,
            total_score,
            range.best,
            range.worst,
        ))
    }

    /// Remembers the ledger id assigned to this session.
    ///
    /// # Errors
    ///
    /// Returns `StateError::NotEnded` for a running session and
    /// `StateError::AlreadyRecorded` if an id was already assigned.
    pub fn mark_recorded(&mut self, id: SessionId) -> Result<(), StateError> {
        if !self.is_ended() {
            return Err(StateError::NotEnded);
        }
        if self.session_id.is_some() {
            return Err(StateError::AlreadyRecorded);
        }
        self.session_id = Some(id);
        Ok(())
    }

    /// Best and worst totals reachable with the cards dealt this session.
    #[must_use]
    pub fn achievable_range(&self) -> AchievableRange {
        AchievableRange::from_cards(&self.deck, self.config.max_rounds())
    }

    #[must_use]
    pub fn classifier(&self) -> FeedbackClassifier {
        FeedbackClassifier::from_range(self.achievable_range())
    }

    /// True once at least one card was drawn and the session has not ended.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.cards_drawn > 0 && !self.is_ended()
    }

    #[must_use]
    pub fn is_ended(&self) -> bool {
        self.phase == SessionPhase::Ended
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The drawn card still waiting for an answer.
    #[must_use]
    pub fn current_card(&self) -> Option<&Card> {
        if !self.awaiting_answer() {
            return None;
        }
        let index = usize::try_from(self.cards_drawn).ok()?.checked_sub(1)?;
        self.deck.get(index)
    }

    /// Running total; equals the final score once ended.
    #[must_use]
    pub fn total_score(&self) -> f64 {
        self.total_score
    }

    /// The ordered deck fetched on `start`.
    #[must_use]
    pub fn session_cards(&self) -> &[Card] {
        &self.deck
    }

    #[must_use]
    pub fn rounds(&self) -> &[RoundResult] {
        &self.rounds
    }

    #[must_use]
    pub fn session_id(&self) -> Option<SessionId> {
        self.session_id
    }

    #[must_use]
    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let max_rounds = self.config.max_rounds();
        let drawn = usize::try_from(self.cards_drawn).unwrap_or(usize::MAX);
        SessionProgress {
            max_rounds,
            drawn: self.cards_drawn,
            answered: self.answers_submitted,
            remaining_rounds: max_rounds.saturating_sub(self.answers_submitted),
            cards_left: self.deck.len().saturating_sub(drawn),
            awaiting_answer: self.awaiting_answer(),
            is_ended: self.is_ended(),
        }
    }
}

impl fmt::Debug for SessionStateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStateMachine")
            .field("config", &self.config)
            .field("phase", &self.phase)
            .field("shuffle", &self.shuffle)
            .field("deck_len", &self.deck.len())
            .field("cards_drawn", &self.cards_drawn)
            .field("answers_submitted", &self.answers_submitted)
            .field("total_score", &self.total_score)
            .field("session_id", &self.session_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eco_core::time::{fixed_clock, fixed_now};
    use storage::repository::InMemoryRepository;

    fn build_card(id: u64, difficulty: &str, impacts: &[(&str, f64)]) -> Card {
        let alternatives = impacts
            .iter()
            .map(|(label, impact)| Alternative::new(*label, *impact))
            .collect();
        Card::new(CardId::new(id), format!("Scenario {id}"), difficulty, alternatives).unwrap()
    }

    fn easy_deck() -> Arc<InMemoryRepository> {
        Arc::new(InMemoryRepository::with_cards([
            build_card(1, "Easy", &[("Bike", 1.0), ("Car", 5.0)]),
            build_card(2, "Easy", &[("Tap water", 0.5), ("Bottled", 2.0)]),
            build_card(3, "Easy", &[("Line dry", 0.0), ("Dryer", 3.0)]),
            build_card(4, "Hard", &[("Train", 4.0), ("Plane", 90.0)]),
        ]))
    }

    fn machine(rounds: u32) -> SessionStateMachine {
        let mut machine = SessionStateMachine::new(easy_deck())
            .with_clock(fixed_clock())
            .with_shuffle(ShuffleMode::Off);
        machine.configure("Easy", rounds).unwrap();
        machine
    }

    #[test]
    fn configure_rejects_invalid_values_and_keeps_previous() {
        let mut machine = machine(2);
        let err = machine.configure("Easy", 0).unwrap_err();
        assert!(matches!(
            err,
            SessionError::Configuration(ConfigurationError::InvalidMaxRounds)
        ));
        let err = machine.configure("  ", 3).unwrap_err();
        assert!(matches!(
            err,
            SessionError::Configuration(ConfigurationError::EmptyDifficulty)
        ));
        assert_eq!(machine.config().max_rounds(), 2);
    }

    #[test]
    fn configure_is_locked_after_start() {
        let mut machine = machine(2);
        assert_eq!(machine.start().unwrap(), 3);
        let err = machine.configure("Hard", 1).unwrap_err();
        assert!(matches!(
            err,
            SessionError::Configuration(ConfigurationError::Locked)
        ));
        assert_eq!(machine.start().unwrap_err().state(), Some(StateError::AlreadyStarted));
    }

    #[test]
    fn replacing_config_mid_session_is_locked() {
        let mut machine = machine(5);
        machine.start().unwrap();
        for _ in 0..2 {
            machine.draw_next().unwrap();
            machine.submit_choice(0).unwrap();
        }

        let err = machine
            .set_config(SessionConfig::new("Hard", 1).unwrap())
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::Configuration(ConfigurationError::Locked)
        ));
        assert_eq!(machine.config().max_rounds(), 5);
        assert_eq!(machine.config().difficulty().as_str(), "Easy");
        assert_eq!(machine.phase(), SessionPhase::InProgress);
    }

    #[test]
    fn draw_before_start_is_rejected() {
        let mut machine = machine(2);
        assert_eq!(machine.draw_next().unwrap_err().state(), Some(StateError::NotStarted));
        assert!(!machine.is_started());
    }

    #[test]
    fn plays_until_max_rounds() {
        let mut machine = machine(2);
        machine.start().unwrap();

        assert_eq!(machine.draw_next().unwrap().id(), CardId::new(1));
        assert!(machine.is_started());
        let outcome = machine.submit_answer(&Alternative::new("Bike", 1.0)).unwrap();
        assert!(!outcome.is_ended);
        assert_eq!(machine.final_score().unwrap_err().state(), Some(StateError::NotEnded));

        assert_eq!(machine.draw_next().unwrap().id(), CardId::new(2));
        let outcome = machine.submit_choice(1).unwrap();
        assert!(outcome.is_ended);
        assert_eq!(outcome.answered, 2);

        assert!(machine.is_ended());
        assert!(!machine.is_started());
        assert!((machine.final_score().unwrap() - 3.0).abs() < 1e-9);
        assert_eq!(machine.ended_at(), Some(fixed_now()));
        assert_eq!(machine.draw_next().unwrap_err().state(), Some(StateError::Ended));
    }

    #[test]
    fn drawing_twice_without_answer_is_rejected() {
        let mut machine = machine(2);
        machine.start().unwrap();
        machine.draw_next().unwrap();
        assert_eq!(machine.draw_next().unwrap_err().state(), Some(StateError::AwaitingAnswer));
        assert_eq!(machine.current_card().map(Card::id), Some(CardId::new(1)));
    }

    #[test]
    fn answering_without_drawn_card_is_rejected() {
        let mut machine = machine(2);
        machine.start().unwrap();
        let err = machine.submit_answer(&Alternative::new("Bike", 1.0)).unwrap_err();
        assert_eq!(err.state(), Some(StateError::NoCardPending));
    }

    #[test]
    fn invalid_answer_leaves_state_unchanged() {
        let mut machine = machine(2);
        machine.start().unwrap();
        machine.draw_next().unwrap();

        let err = machine.submit_answer(&Alternative::new("Bike", 2.0)).unwrap_err();
        assert!(matches!(err, SessionError::InvalidAnswer { .. }));
        assert!(err.is_validation());

        let err = machine.submit_choice(7).unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidChoiceIndex { index: 7, available: 2, .. }
        ));

        let progress = machine.progress();
        assert_eq!(progress.answered, 0);
        assert!(progress.awaiting_answer);
        assert_eq!(machine.total_score(), 0.0);
        assert!(machine.submit_answer(&Alternative::new("Car", 5.0)).is_ok());
    }

    #[test]
    fn short_deck_reports_exhaustion() {
        let mut machine = machine(5);
        assert_eq!(machine.start().unwrap(), 3);
        for _ in 0..3 {
            machine.draw_next().unwrap();
            machine.submit_choice(0).unwrap();
        }
        assert_eq!(machine.draw_next().unwrap_err().state(), Some(StateError::DeckExhausted));
        assert!(!machine.is_ended());
    }

    #[test]
    fn empty_deck_starts_with_no_cards() {
        let mut machine = machine(2);
        machine.configure("Medium", 2).unwrap();
        assert_eq!(machine.start().unwrap(), 0);
        assert_eq!(machine.draw_next().unwrap_err().state(), Some(StateError::DeckExhausted));
    }

    #[test]
    fn seeded_shuffle_is_reproducible() {
        let order = |seed| {
            let mut machine =
                SessionStateMachine::new(easy_deck()).with_shuffle(ShuffleMode::Seeded(seed));
            machine.set_config(SessionConfig::new("easy", 3).unwrap()).unwrap();
            machine.start().unwrap();
            machine
                .session_cards()
                .iter()
                .map(Card::id)
                .collect::<Vec<_>>()
        };
        assert_eq!(order(42), order(42));
        assert_eq!(order(42).len(), 3);
    }

    #[test]
    fn completed_session_reports_range_and_records_once() {
        let mut machine = machine(2);
        assert_eq!(
            machine.completed_session().unwrap_err().state(),
            Some(StateError::NotEnded)
        );
        machine.start().unwrap();
        for _ in 0..2 {
            machine.draw_next().unwrap();
            machine.submit_choice(0).unwrap();
        }

        let completed = machine.completed_session().unwrap();
        assert_eq!(completed.total_rounds(), 2);
        assert!((completed.best_possible() - 1.5).abs() < 1e-9);
        assert!((completed.worst_possible() - 7.0).abs() < 1e-9);
        assert!((completed.total_score() - 1.5).abs() < 1e-9);

        machine.mark_recorded(SessionId::new(1)).unwrap();
        assert_eq!(
            machine.mark_recorded(SessionId::new(2)),
            Err(StateError::AlreadyRecorded)
        );
        assert_eq!(machine.session_id(), Some(SessionId::new(1)));
    }
}
