//! CLI layer: clap command definitions and terminal rendering.

pub mod commands;
pub mod display;
pub mod types;

pub use types::{Cli, Commands};
