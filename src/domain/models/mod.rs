//! Domain models for the trial simulation engine.

pub mod case;
pub mod config;
pub mod session;
pub mod transcript;
pub mod utterance;

pub use case::{CaseCategory, CaseRecord};
pub use config::{
    AutoContinueConfig, BackendConfig, Config, DatabaseConfig, LoggingConfig, PacingConfig,
    TurnRulesConfig,
};
pub use session::{AutoAdvancePhase, SessionState, TrialEvent, TrialSession, TurnState};
pub use transcript::{ChatMessage, ChatRole, StoredMessage};
pub use utterance::{Origin, ParticipantRole, Utterance};
