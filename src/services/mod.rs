//! Service layer: the orchestration core behind the CLI.

pub mod auto_continue;
pub mod persistence_queue;
pub mod presentation;
pub mod response_session;
pub mod role_tags;
pub mod turn_rules;

pub use persistence_queue::PersistenceQueue;
pub use response_session::TrialRuntime;
pub use turn_rules::TurnRules;
