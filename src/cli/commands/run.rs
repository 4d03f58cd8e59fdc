//! Interactive courtroom session.

use std::sync::Arc;

use anyhow::{Context, Result};
use console::style;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::info;

use crate::adapters::backends::{scenario_prompt, MockBackend, OpenAiBackend};
use crate::adapters::sqlite::{initialize_database, SqliteTranscriptStore};
use crate::cli::display::{self, EventRenderer};
use crate::domain::models::{CaseRecord, Config};
use crate::domain::ports::{GenerationBackend, TranscriptStore};
use crate::services::{TrialRuntime, TurnRules};

pub async fn execute(config: Config, case_id: String, offline: bool) -> Result<()> {
    let pool = initialize_database(&config.database).await?;
    let store = Arc::new(SqliteTranscriptStore::new(pool));

    let case = store
        .find_case(&case_id)
        .await?
        .with_context(|| format!("caso desconocido: {case_id}"))?;
    let session = store.session_for_case(&case_id).await?;

    let backend: Arc<dyn GenerationBackend> = if offline {
        info!("using scripted offline backend");
        Arc::new(MockBackend::new())
    } else {
        Arc::new(OpenAiBackend::new(
            config.backend.clone(),
            scenario_prompt(&case.title, &case.facts),
        )?)
    };

    let (runtime, mut events) = TrialRuntime::new(
        &session,
        backend,
        store,
        TurnRules::from_config(&config.turn_rules),
        config.pacing,
        config.auto_continue,
    );
    let runtime = Arc::new(runtime);

    tokio::spawn(async move {
        let mut renderer = EventRenderer::new();
        while let Some(event) = events.recv().await {
            renderer.render(&event);
        }
    });

    let mut input = BufReader::new(tokio::io::stdin()).lines();

    let restored = runtime.restore().await?;
    if restored > 0 {
        println!(
            "{}",
            style(format!("Se retoma la vista ({restored} intervenciones).")).dim()
        );
        for utterance in runtime.transcript().await {
            display::print_utterance(&utterance);
        }
    } else if !bootstrap(&runtime, &case, &mut input).await? {
        return Ok(());
    }

    loop {
        print!("{} ", style("›").green().bold());
        use std::io::Write;
        let _ = std::io::stdout().flush();

        let Some(line) = input.next_line().await? else {
            break;
        };
        let text = line.trim();

        match text {
            "" => {}
            "/quit" | "/salir" => break,
            "/help" | "/ayuda" => print_help(),
            "/objection" | "/objecion" => {
                submit(&runtime, "¡Objeción!").await;
            }
            "/reset" => {
                runtime.reset().await?;
                println!("{}", style("La causa vuelve a empezar.").yellow());
                if !bootstrap(&runtime, &case, &mut input).await? {
                    break;
                }
            }
            _ => submit(&runtime, text).await,
        }
    }

    println!("{}", style("Se levanta la sesión.").dim());
    Ok(())
}

/// One-time acceptance gate plus the scripted case presentation.
///
/// Returns `false` if the user declined the case.
async fn bootstrap(
    runtime: &Arc<TrialRuntime>,
    case: &CaseRecord,
    input: &mut Lines<BufReader<Stdin>>,
) -> Result<bool> {
    display::print_case_banner(case);

    if !runtime.is_accepted().await? {
        print!(
            "{} ",
            style("¿Acepta representar a la defensa? [s/N]:").bold()
        );
        use std::io::Write;
        let _ = std::io::stdout().flush();

        let answer = input.next_line().await?.unwrap_or_default();
        if !matches!(answer.trim().to_lowercase().as_str(), "s" | "si" | "sí") {
            println!("{}", style("Caso rechazado.").dim());
            return Ok(false);
        }
        runtime.accept_case().await?;
    }

    if let Err(err) = runtime.start_presentation().await {
        // The Failure event already rendered the message.
        info!(error = %err, "presentation did not complete");
    }
    Ok(true)
}

async fn submit(runtime: &Arc<TrialRuntime>, text: &str) {
    let spinner = display::deliberation_spinner();
    let result = runtime.submit_human(text).await;
    spinner.finish_and_clear();
    if let Err(err) = result {
        // Rendered by the Failure event; keep the session alive.
        info!(error = %err, "submission failed");
    }
}

fn print_help() {
    println!("  /objection   interponer una objeción");
    println!("  /reset       reiniciar la causa desde cero");
    println!("  /quit        levantar la sesión");
}
