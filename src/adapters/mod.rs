//! Adapters: concrete implementations of the domain ports.

pub mod backends;
pub mod sqlite;
