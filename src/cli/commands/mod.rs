//! CLI command implementations.

pub mod cases;
pub mod history;
pub mod reset;
pub mod run;
