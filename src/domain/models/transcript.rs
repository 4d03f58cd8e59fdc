//! Transcript wire types shared with the generation backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::utterance::{Origin, Utterance};

/// Chat role in the backend wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
            ChatRole::System => "system",
        }
    }

    pub fn from_str_or_assistant(s: &str) -> Self {
        match s {
            "user" => ChatRole::User,
            "system" => ChatRole::System,
            _ => ChatRole::Assistant,
        }
    }
}

impl From<Origin> for ChatRole {
    fn from(origin: Origin) -> Self {
        match origin {
            Origin::Human => ChatRole::User,
            Origin::Generated => ChatRole::Assistant,
        }
    }
}

/// One entry of the backend request payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

impl From<&Utterance> for ChatMessage {
    fn from(utterance: &Utterance) -> Self {
        Self {
            role: utterance.origin.into(),
            content: utterance.text.clone(),
        }
    }
}

/// A persisted message as returned by the transcript store, in stored order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: Uuid,
    pub role: ChatRole,
    pub speaker_label: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl StoredMessage {
    /// Rehydrate a transcript utterance from its persisted form.
    pub fn into_utterance(self) -> Utterance {
        match self.role {
            ChatRole::User => Utterance {
                id: self.id,
                speaker_label: None,
                role: crate::domain::models::ParticipantRole::Human,
                text: self.content,
                origin: Origin::Human,
                created_at: self.created_at,
            },
            _ => {
                let role = self.speaker_label.as_deref().map_or(
                    crate::domain::models::ParticipantRole::System,
                    crate::domain::models::ParticipantRole::from_label,
                );
                Utterance {
                    id: self.id,
                    speaker_label: self.speaker_label,
                    role,
                    text: self.content,
                    origin: Origin::Generated,
                    created_at: self.created_at,
                }
            }
        }
    }
}
