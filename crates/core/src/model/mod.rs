mod card;
mod ids;
mod session;
mod settings;

pub use ids::{CardId, SessionId};

pub use card::{Alternative, Card, CardError, Difficulty};
pub use session::{CompletedSession, ConfigurationError, SessionConfig, SessionRecord};
pub use settings::{GameSettings, GameSettingsDraft, GameSettingsError};
