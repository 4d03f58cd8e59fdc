//! Ports: the traits the orchestration core depends on.

use async_trait::async_trait;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::errors::DomainResult;
use super::models::{CaseRecord, ChatMessage, StoredMessage, TrialSession, Utterance};

/// One backend invocation's payload: the full ordered transcript plus the
/// flags that tell the backend which moment of the trial this is.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub transcript: Vec<ChatMessage>,
    pub case_id: String,
    /// True only for the one-shot case-summary bootstrap.
    pub internal: bool,
    /// True only for auto-continuation invocations (no new human input).
    pub auto_continue: bool,
}

impl GenerationRequest {
    pub fn new(transcript: Vec<ChatMessage>, case_id: impl Into<String>) -> Self {
        Self {
            transcript,
            case_id: case_id.into(),
            internal: false,
            auto_continue: false,
        }
    }

    pub fn internal(mut self) -> Self {
        self.internal = true;
        self
    }

    pub fn auto_continue(mut self) -> Self {
        self.auto_continue = true;
        self
    }
}

/// Events emitted while a generation stream is consumed.
#[derive(Debug, Clone)]
pub enum GenerationEvent {
    /// A chunk of streamed text, in arrival order.
    Text(String),
    /// The stream failed mid-flight. Terminal.
    Error(String),
}

/// The text-generation backend, treated as a black box: given a transcript
/// it produces one continuous streamed text response. Channel close marks
/// the end of the stream.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Identifier used in logs.
    fn name(&self) -> &'static str;

    /// Start one generation, returning the stream of text chunks.
    ///
    /// Transport-level failures (unreachable backend, non-success status)
    /// are returned as `Err` before any chunk is produced; mid-stream
    /// failures arrive as [`GenerationEvent::Error`].
    async fn stream(
        &self,
        request: GenerationRequest,
    ) -> DomainResult<mpsc::Receiver<GenerationEvent>>;
}

/// Persistence surface for cases, sessions, and message transcripts.
///
/// `append_utterance` must be idempotent per utterance id so a retry after
/// a partial failure cannot double-insert.
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    /// Persist one utterance. Idempotent per `utterance.id`.
    async fn append_utterance(&self, session_id: Uuid, utterance: &Utterance) -> DomainResult<()>;

    /// Load the persisted transcript in stored (chronological) order.
    async fn load_transcript(&self, session_id: Uuid) -> DomainResult<Vec<StoredMessage>>;

    /// Whether the case was explicitly accepted for this session.
    async fn get_acceptance(&self, session_id: Uuid) -> DomainResult<bool>;

    /// Record the one-time acceptance action.
    async fn set_acceptance(&self, session_id: Uuid) -> DomainResult<()>;

    /// Clear the transcript and acceptance flag for a fresh run.
    async fn reset_session(&self, session_id: Uuid) -> DomainResult<()>;

    /// Look up the session for a case, creating it lazily on first use.
    async fn session_for_case(&self, case_id: &str) -> DomainResult<TrialSession>;

    /// Look up a case record.
    async fn find_case(&self, case_id: &str) -> DomainResult<Option<CaseRecord>>;

    /// All cases available to litigate.
    async fn list_cases(&self) -> DomainResult<Vec<CaseRecord>>;
}
