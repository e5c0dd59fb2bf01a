#![forbid(unsafe_code)]

pub mod analysis;
pub mod error;
pub mod history;
pub mod sessions;

pub use eco_core::Clock;

pub use analysis::{PerformanceAnalyzer, SessionReport};
pub use error::{SessionError, StateError};
pub use history::{HistoryLedger, HistoryListItem, HistoryOverview};

pub use sessions::{
    AnswerOutcome, GameLoopService, RoundResult, SessionAnswerResult, SessionPhase,
    SessionProgress, SessionStateMachine, ShuffleMode,
};
