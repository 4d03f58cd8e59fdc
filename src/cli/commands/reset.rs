//! Wipe a case's transcript and acceptance.

use anyhow::{Context, Result};
use console::style;
use std::io::Write;

use crate::adapters::sqlite::{initialize_database, SqliteTranscriptStore};
use crate::domain::models::Config;
use crate::domain::ports::TranscriptStore;

pub async fn execute(config: Config, case_id: String, yes: bool) -> Result<()> {
    let pool = initialize_database(&config.database).await?;
    let store = SqliteTranscriptStore::new(pool);

    let case = store
        .find_case(&case_id)
        .await?
        .with_context(|| format!("caso desconocido: {case_id}"))?;

    if !yes {
        print!(
            "{} ",
            style(format!(
                "Se borrará todo el historial de \"{}\". ¿Continuar? [s/N]:",
                case.title
            ))
            .bold()
        );
        let _ = std::io::stdout().flush();
        let mut answer = String::new();
        std::io::stdin().read_line(&mut answer)?;
        if !matches!(answer.trim().to_lowercase().as_str(), "s" | "si" | "sí") {
            println!("{}", style("Cancelado.").dim());
            return Ok(());
        }
    }

    let session = store.session_for_case(&case_id).await?;
    store.reset_session(session.id).await?;
    println!("{}", style("Historial borrado.").green());
    Ok(())
}
