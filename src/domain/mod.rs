//! Domain layer: pure models, errors, and the ports the core depends on.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
