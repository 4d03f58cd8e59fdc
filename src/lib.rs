//! Tribunal - simulated courtroom turn orchestration
//!
//! Tribunal drives a multi-role legal-trial simulation over a single
//! text-generation backend: it splits each generated response into
//! per-speaker turns, decides when the human defense attorney holds the
//! floor, keeps the trial moving autonomously within a bounded number of
//! continuations, and persists the transcript across runs.
//!
//! # Architecture
//!
//! The crate follows Clean Architecture / Hexagonal Architecture
//! principles:
//!
//! - **Domain Layer** (`domain`): models, errors, and the ports the core
//!   depends on
//! - **Service Layer** (`services`): the orchestration core (parsing,
//!   turn rules, response sessions, auto-continuation, presentation)
//! - **Adapters** (`adapters`): SQLite persistence and generation
//!   backends implementing the ports
//! - **Infrastructure Layer** (`infrastructure`): configuration and
//!   logging
//! - **CLI Layer** (`cli`): command-line interface

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    AutoAdvancePhase, AutoContinueConfig, CaseCategory, CaseRecord, Config, DatabaseConfig,
    LoggingConfig, Origin, PacingConfig, ParticipantRole, TrialEvent, TrialSession, TurnState,
    Utterance,
};
pub use domain::ports::{GenerationBackend, GenerationEvent, GenerationRequest, TranscriptStore};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{TrialRuntime, TurnRules};
