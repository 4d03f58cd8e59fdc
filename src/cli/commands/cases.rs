//! List the cases available to litigate.

use anyhow::Result;

use crate::adapters::sqlite::{initialize_database, SqliteTranscriptStore};
use crate::cli::display;
use crate::domain::models::Config;
use crate::domain::ports::TranscriptStore;

pub async fn execute(config: Config) -> Result<()> {
    let pool = initialize_database(&config.database).await?;
    let store = SqliteTranscriptStore::new(pool);

    let cases = store.list_cases().await?;
    println!("{}", display::cases_table(&cases));
    Ok(())
}
