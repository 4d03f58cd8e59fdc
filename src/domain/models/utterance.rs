//! Utterances: the attributed units of courtroom dialogue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where an utterance came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Typed by the human participant (the defense attorney).
    Human,
    /// Produced by the generation backend.
    Generated,
}

/// Closed set of courtroom participants.
///
/// Resolved exactly once from the speaker label when an utterance is
/// created; everything downstream consumes the enum and never re-parses
/// label text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    Judge,
    Prosecutor,
    Witness,
    Clerk,
    System,
    Human,
}

impl ParticipantRole {
    /// Resolve a free-text speaker label into a participant role.
    ///
    /// Labels are the model's own Spanish stage names ("Juez Laboral",
    /// "Jorge Ramírez - Testigo") but English keywords are honored too.
    /// Anything unrecognized falls back to `System`.
    pub fn from_label(label: &str) -> Self {
        let lower = label.to_lowercase();
        if lower.contains("juez") || lower.contains("judge") {
            ParticipantRole::Judge
        } else if lower.contains("fiscal") || lower.contains("prosecutor") {
            ParticipantRole::Prosecutor
        } else if lower.contains("testigo") || lower.contains("witness") {
            ParticipantRole::Witness
        } else if lower.contains("secretario") || lower.contains("clerk") {
            ParticipantRole::Clerk
        } else {
            ParticipantRole::System
        }
    }

    /// Display name used by the terminal renderer.
    pub fn display_name(&self) -> &'static str {
        match self {
            ParticipantRole::Judge => "Juez",
            ParticipantRole::Prosecutor => "Fiscal",
            ParticipantRole::Witness => "Testigo",
            ParticipantRole::Clerk => "Secretario",
            ParticipantRole::System => "Sistema",
            ParticipantRole::Human => "Abogado (Tú)",
        }
    }
}

/// One attributed line of simulated dialogue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Utterance {
    /// Unique id, generated at creation. Persistence is idempotent per id.
    pub id: Uuid,
    /// Label extracted from the source tag, `None` for untagged human input.
    pub speaker_label: Option<String>,
    /// Role resolved once from the label (or `Human` for human input).
    pub role: ParticipantRole,
    /// Utterance body, trimmed; tagged utterances keep their `[label]` prefix.
    pub text: String,
    pub origin: Origin,
    pub created_at: DateTime<Utc>,
}

impl Utterance {
    /// Create a generated utterance attributed to a speaker label.
    pub fn generated(label: Option<String>, text: impl Into<String>) -> Self {
        let role = label
            .as_deref()
            .map_or(ParticipantRole::System, ParticipantRole::from_label);
        Self {
            id: Uuid::new_v4(),
            speaker_label: label,
            role,
            text: text.into(),
            origin: Origin::Generated,
            created_at: Utc::now(),
        }
    }

    /// Create an utterance from direct human input.
    pub fn human(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            speaker_label: None,
            role: ParticipantRole::Human,
            text: text.into(),
            origin: Origin::Human,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_from_label_spanish() {
        assert_eq!(ParticipantRole::from_label("Juez"), ParticipantRole::Judge);
        assert_eq!(
            ParticipantRole::from_label("Juez Laboral"),
            ParticipantRole::Judge
        );
        assert_eq!(
            ParticipantRole::from_label("Fiscal"),
            ParticipantRole::Prosecutor
        );
        assert_eq!(
            ParticipantRole::from_label("Jorge Ramírez - Testigo"),
            ParticipantRole::Witness
        );
        assert_eq!(
            ParticipantRole::from_label("Secretario"),
            ParticipantRole::Clerk
        );
    }

    #[test]
    fn test_role_from_label_fallback() {
        assert_eq!(
            ParticipantRole::from_label("Sistema"),
            ParticipantRole::System
        );
        assert_eq!(
            ParticipantRole::from_label("Perito Contable"),
            ParticipantRole::System
        );
    }

    #[test]
    fn test_human_utterance_has_no_label() {
        let u = Utterance::human("Objeción, Señoría.");
        assert!(u.speaker_label.is_none());
        assert_eq!(u.role, ParticipantRole::Human);
        assert_eq!(u.origin, Origin::Human);
    }

    #[test]
    fn test_generated_utterance_resolves_role_once() {
        let u = Utterance::generated(Some("Juez".into()), "[Juez] Proceda.");
        assert_eq!(u.role, ParticipantRole::Judge);
        assert_eq!(u.origin, Origin::Generated);
    }
}
