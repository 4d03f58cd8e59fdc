//! Terminal rendering for the courtroom exchange.

use std::collections::HashMap;
use std::io::Write;
use std::time::Duration;

use comfy_table::{presets, Attribute, Cell, ContentArrangement, Table};
use console::{style, StyledObject};
use indicatif::{ProgressBar, ProgressStyle};
use uuid::Uuid;

use crate::domain::models::{CaseRecord, ParticipantRole, TrialEvent, Utterance};

/// Colored badge for a speaker.
fn role_badge(role: ParticipantRole) -> StyledObject<&'static str> {
    let name = role.display_name();
    match role {
        ParticipantRole::Judge => style(name).red().bold(),
        ParticipantRole::Prosecutor => style(name).magenta().bold(),
        ParticipantRole::Witness => style(name).yellow(),
        ParticipantRole::Clerk => style(name).cyan(),
        ParticipantRole::System => style(name).dim(),
        ParticipantRole::Human => style(name).green().bold(),
    }
}

/// Print one finalized utterance.
pub fn print_utterance(utterance: &Utterance) {
    println!("{}: {}", role_badge(utterance.role), utterance.text);
}

/// Indeterminate spinner shown while the tribunal deliberates.
pub fn deliberation_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("spinner template is valid")
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "),
    );
    pb.set_message("El tribunal delibera...");
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Streaming renderer: remembers each progressively revealed utterance's
/// speaker and how much of it has been printed, so updates only emit the
/// new suffix.
#[derive(Default)]
pub struct EventRenderer {
    revealing: HashMap<Uuid, (ParticipantRole, usize)>,
}

impl EventRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render one orchestration event.
    pub fn render(&mut self, event: &TrialEvent) {
        match event {
            TrialEvent::Appended(utterance) => {
                if utterance.text.is_empty() {
                    // Placeholder for a progressive reveal; the badge
                    // prints with the first update.
                    self.revealing.insert(utterance.id, (utterance.role, 0));
                } else {
                    print_utterance(utterance);
                }
            }
            TrialEvent::Updated { id, text } => {
                let entry = self
                    .revealing
                    .entry(*id)
                    .or_insert((ParticipantRole::System, 0));
                if entry.1 == 0 && !text.is_empty() {
                    print!("{}: ", role_badge(entry.0));
                }
                if let Some(suffix) = text.get(entry.1..) {
                    print!("{suffix}");
                    let _ = std::io::stdout().flush();
                    entry.1 = text.len();
                }
            }
            TrialEvent::Finalized { id, .. } => {
                if self.revealing.remove(id).is_some() {
                    println!();
                }
            }
            TrialEvent::Discarded { id } => {
                self.revealing.remove(id);
            }
            TrialEvent::TurnChanged(turn) => {
                if turn.is_human_turn {
                    println!("{}", style("── Su turno, letrado ──").green().dim());
                }
            }
            TrialEvent::AutoAdvancing { attempt } => {
                println!(
                    "{}",
                    style(format!("… la vista continúa ({attempt})")).dim()
                );
            }
            TrialEvent::Exhausted => {
                println!(
                    "{}",
                    style("El tribunal guarda silencio y espera a la defensa.").yellow()
                );
            }
            TrialEvent::Failure { message, retryable } => {
                let hint = if *retryable {
                    " Puede reintentar."
                } else {
                    ""
                };
                eprintln!("{} {message}.{hint}", style("✗").red().bold());
            }
        }
    }
}

/// Render the case list as a table.
pub fn cases_table(cases: &[CaseRecord]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("ID").add_attribute(Attribute::Bold),
        Cell::new("Título").add_attribute(Attribute::Bold),
        Cell::new("Materia").add_attribute(Attribute::Bold),
    ]);
    for case in cases {
        table.add_row(vec![
            Cell::new(&case.id),
            Cell::new(&case.title),
            Cell::new(case.category.as_str()),
        ]);
    }
    table
}

/// Banner shown before the acceptance prompt.
pub fn print_case_banner(case: &CaseRecord) {
    println!();
    println!("{}", style(&case.title).bold().underlined());
    println!("{}", style(format!("Materia: {}", case.category.as_str())).dim());
    println!();
    println!("{}", case.facts);
    println!();
}
