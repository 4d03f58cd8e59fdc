//! CLI type definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tribunal")]
#[command(about = "Tribunal - simulador de juicios por turnos", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Load configuration from this file instead of .tribunal/config.yaml
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Litigate a case interactively as the defense attorney
    Run {
        /// Case to litigate
        #[arg(default_value = "case-1")]
        case_id: String,

        /// Use the scripted offline backend instead of the API
        #[arg(long)]
        offline: bool,
    },

    /// List the available cases
    Cases,

    /// Print the persisted transcript of a case
    History {
        /// Case whose transcript to print
        #[arg(default_value = "case-1")]
        case_id: String,
    },

    /// Wipe a case's transcript and acceptance for a fresh run
    Reset {
        /// Case to reset
        #[arg(default_value = "case-1")]
        case_id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}
