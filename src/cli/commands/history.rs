//! Print the persisted transcript of a case.

use anyhow::{Context, Result};
use console::style;

use crate::adapters::sqlite::{initialize_database, SqliteTranscriptStore};
use crate::cli::display;
use crate::domain::models::Config;
use crate::domain::ports::TranscriptStore;

pub async fn execute(config: Config, case_id: String) -> Result<()> {
    let pool = initialize_database(&config.database).await?;
    let store = SqliteTranscriptStore::new(pool);

    let case = store
        .find_case(&case_id)
        .await?
        .with_context(|| format!("caso desconocido: {case_id}"))?;
    let session = store.session_for_case(&case_id).await?;
    let transcript = store.load_transcript(session.id).await?;

    println!("{}", style(&case.title).bold());
    if transcript.is_empty() {
        println!("{}", style("(sin intervenciones)").dim());
        return Ok(());
    }
    for message in transcript {
        display::print_utterance(&message.into_utterance());
    }
    Ok(())
}
