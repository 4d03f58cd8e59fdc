//! Tribunal CLI entry point.

use anyhow::Result;
use clap::Parser;

use tribunal::cli::{commands, Cli, Commands};
use tribunal::infrastructure::config::ConfigLoader;
use tribunal::infrastructure::logging;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{} {err:#}", console::style("error:").red().bold());
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };
    logging::init(&config.logging)?;

    match cli.command {
        Commands::Run { case_id, offline } => commands::run::execute(config, case_id, offline).await,
        Commands::Cases => commands::cases::execute(config).await,
        Commands::History { case_id } => commands::history::execute(config, case_id).await,
        Commands::Reset { case_id, yes } => commands::reset::execute(config, case_id, yes).await,
    }
}
