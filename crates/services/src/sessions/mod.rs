mod machine;
mod progress;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::{SessionError, StateError};
pub use machine::{AnswerOutcome, RoundResult, SessionPhase, SessionStateMachine, ShuffleMode};
pub use progress::SessionProgress;
pub use workflow::{GameLoopService, SessionAnswerResult};
