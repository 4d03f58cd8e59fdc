//! SQLite implementation of the `TranscriptStore` port.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::adapters::sqlite::{parse_datetime, parse_uuid};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{CaseCategory, CaseRecord, ChatRole, StoredMessage, TrialSession, Utterance};
use crate::domain::ports::TranscriptStore;

/// SQLite-backed case, session, and transcript persistence.
#[derive(Clone)]
pub struct SqliteTranscriptStore {
    pool: SqlitePool,
}

impl SqliteTranscriptStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: String,
    role: String,
    speaker: Option<String>,
    content: String,
    created_at: String,
}

impl MessageRow {
    fn into_stored(self) -> DomainResult<StoredMessage> {
        Ok(StoredMessage {
            id: parse_uuid(&self.id)?,
            role: ChatRole::from_str_or_assistant(&self.role),
            speaker_label: self.speaker,
            content: self.content,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CaseRow {
    id: String,
    title: String,
    category: String,
    facts: String,
    created_at: String,
}

impl CaseRow {
    fn into_record(self) -> DomainResult<CaseRecord> {
        Ok(CaseRecord {
            id: self.id,
            title: self.title,
            category: CaseCategory::from_str_or_penal(&self.category),
            facts: self.facts,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SessionRow {
    id: String,
    case_id: String,
    accepted: i64,
    created_at: String,
}

impl SessionRow {
    fn into_session(self) -> DomainResult<TrialSession> {
        Ok(TrialSession {
            id: parse_uuid(&self.id)?,
            case_id: self.case_id,
            accepted: self.accepted != 0,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

#[async_trait]
impl TranscriptStore for SqliteTranscriptStore {
    async fn append_utterance(&self, session_id: Uuid, utterance: &Utterance) -> DomainResult<()> {
        // OR IGNORE makes retried saves no-ops: the id is the dedup key.
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO messages (id, session_id, role, speaker, content, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(utterance.id.to_string())
        .bind(session_id.to_string())
        .bind(ChatRole::from(utterance.origin).as_str())
        .bind(utterance.speaker_label.as_deref())
        .bind(&utterance.text)
        .bind(utterance.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load_transcript(&self, session_id: Uuid) -> DomainResult<Vec<StoredMessage>> {
        let rows: Vec<MessageRow> = sqlx::query_as(
            "SELECT id, role, speaker, content, created_at FROM messages
             WHERE session_id = ? ORDER BY rowid ASC",
        )
        .bind(session_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(MessageRow::into_stored).collect()
    }

    async fn get_acceptance(&self, session_id: Uuid) -> DomainResult<bool> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT accepted FROM sessions WHERE id = ?")
            .bind(session_id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|(accepted,)| accepted != 0)
            .ok_or(DomainError::SessionNotFound(session_id))
    }

    async fn set_acceptance(&self, session_id: Uuid) -> DomainResult<()> {
        let result = sqlx::query("UPDATE sessions SET accepted = 1 WHERE id = ?")
            .bind(session_id.to_string())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DomainError::SessionNotFound(session_id));
        }
        Ok(())
    }

    async fn reset_session(&self, session_id: Uuid) -> DomainResult<()> {
        sqlx::query("DELETE FROM messages WHERE session_id = ?")
            .bind(session_id.to_string())
            .execute(&self.pool)
            .await?;
        sqlx::query("UPDATE sessions SET accepted = 0 WHERE id = ?")
            .bind(session_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn session_for_case(&self, case_id: &str) -> DomainResult<TrialSession> {
        if self.find_case(case_id).await?.is_none() {
            return Err(DomainError::CaseNotFound(case_id.to_string()));
        }

        // UNIQUE(case_id) plus OR IGNORE keeps this race-free: whichever
        // insert lands first wins and the select returns it.
        sqlx::query(
            "INSERT OR IGNORE INTO sessions (id, case_id, accepted, created_at)
             VALUES (?, ?, 0, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(case_id)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        let row: SessionRow = sqlx::query_as(
            "SELECT id, case_id, accepted, created_at FROM sessions WHERE case_id = ?",
        )
        .bind(case_id)
        .fetch_one(&self.pool)
        .await?;
        row.into_session()
    }

    async fn find_case(&self, case_id: &str) -> DomainResult<Option<CaseRecord>> {
        let row: Option<CaseRow> = sqlx::query_as(
            "SELECT id, title, category, facts, created_at FROM cases WHERE id = ?",
        )
        .bind(case_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(CaseRow::into_record).transpose()
    }

    async fn list_cases(&self) -> DomainResult<Vec<CaseRecord>> {
        let rows: Vec<CaseRow> = sqlx::query_as(
            "SELECT id, title, category, facts, created_at FROM cases ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(CaseRow::into_record).collect()
    }
}
