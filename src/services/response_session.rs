//! Response session: the stateful orchestrator that owns the transcript,
//! invokes the generation backend, splits the streamed blob into turns,
//! and paces them out to the UI.
//!
//! Concurrency model: single-threaded and event-driven. Only one backend
//! invocation may be in flight per session; the human input path and the
//! auto-continuation loop both serialize through the `in_flight` flag.
//! Every invocation captures the session epoch at start and drops its
//! results if a reset bumped the epoch while it was suspended.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    AutoAdvancePhase, AutoContinueConfig, ChatMessage, PacingConfig, SessionState, TrialEvent,
    TrialSession, TurnState, Utterance,
};
use crate::domain::ports::{GenerationBackend, GenerationEvent, GenerationRequest, TranscriptStore};
use crate::services::persistence_queue::PersistenceQueue;
use crate::services::role_tags;
use crate::services::turn_rules::TurnRules;

/// What kind of invocation is being made; maps to the backend flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InvocationKind {
    /// Triggered by fresh human input.
    Human,
    /// Autonomous continuation with no new human input.
    AutoContinue,
    /// The one-shot judge-summary bootstrap call.
    Internal,
}

/// Orchestrates one trial session for the lifetime of one process.
pub struct TrialRuntime {
    pub(crate) state: Arc<RwLock<SessionState>>,
    pub(crate) backend: Arc<dyn GenerationBackend>,
    pub(crate) store: Arc<dyn TranscriptStore>,
    pub(crate) saver: PersistenceQueue,
    pub(crate) rules: TurnRules,
    pub(crate) pacing: PacingConfig,
    pub(crate) auto: AutoContinueConfig,
    events: mpsc::UnboundedSender<TrialEvent>,
}

impl TrialRuntime {
    /// Build a runtime for one session, returning the UI event stream.
    pub fn new(
        session: &TrialSession,
        backend: Arc<dyn GenerationBackend>,
        store: Arc<dyn TranscriptStore>,
        rules: TurnRules,
        pacing: PacingConfig,
        auto: AutoContinueConfig,
    ) -> (Self, mpsc::UnboundedReceiver<TrialEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let saver = PersistenceQueue::spawn(store.clone());
        let runtime = Self {
            state: Arc::new(RwLock::new(SessionState::new(
                session.id,
                session.case_id.clone(),
            ))),
            backend,
            store,
            saver,
            rules,
            pacing,
            auto,
            events,
        };
        (runtime, events_rx)
    }

    pub(crate) fn emit(&self, event: TrialEvent) {
        let _ = self.events.send(event);
    }

    /// Reload the persisted transcript into memory.
    ///
    /// A non-empty history marks the presentation bootstrap as already
    /// done, and the turn state is recomputed from the latest utterance.
    pub async fn restore(&self) -> DomainResult<usize> {
        let session_id = { self.state.read().await.session_id };
        let stored = self.store.load_transcript(session_id).await?;
        let count = stored.len();

        let mut state = self.state.write().await;
        state.transcript = stored.into_iter().map(|m| m.into_utterance()).collect();
        state.presentation_started = !state.transcript.is_empty();
        if let Some(last) = state.transcript.last() {
            state.turn.is_human_turn = self.rules.classify(&last.text);
            state.turn.auto_continue_count = 0;
        }
        info!(session_id = %session_id, messages = count, "transcript restored");
        Ok(count)
    }

    /// Current derived turn state.
    pub async fn turn_state(&self) -> TurnState {
        self.state.read().await.turn
    }

    /// Snapshot of the in-memory transcript.
    pub async fn transcript(&self) -> Vec<Utterance> {
        self.state.read().await.transcript.clone()
    }

    /// Whether the presentation bootstrap already ran for this session.
    pub async fn presentation_started(&self) -> bool {
        self.state.read().await.presentation_started
    }

    /// Submit one human utterance and settle the exchange: invoke the
    /// backend, append the generated turns, then let the auto-continuation
    /// loop keep the trial moving until the floor returns to the human.
    ///
    /// On backend failure the optimistic human append is kept so no input
    /// is lost; only the generated continuation is missing and the call
    /// may be retried.
    pub async fn submit_human(&self, text: &str) -> DomainResult<TurnState> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(DomainError::ValidationFailed(
                "utterance text is empty".to_string(),
            ));
        }

        self.begin_invocation().await?;

        // Optimistic append, durable before the backend call.
        let utterance = Utterance::human(trimmed);
        let session_id = {
            let mut state = self.state.write().await;
            state.transcript.push(utterance.clone());
            state.session_id
        };
        self.emit(TrialEvent::Appended(utterance.clone()));
        if let Err(err) = self.saver.save_and_wait(session_id, utterance).await {
            // Display never blocks on the store; the idempotent save will
            // be retried with the next state change.
            warn!(error = %err, "human utterance not yet persisted");
        }

        let invoked = self.invoke(InvocationKind::Human).await;
        self.end_invocation().await;

        match invoked {
            Ok(_) => self.run_auto_continue().await,
            Err(err) => {
                self.emit(TrialEvent::Failure {
                    message: err.to_string(),
                    retryable: err.is_retryable(),
                });
                Err(err)
            }
        }
    }

    /// Mark an invocation as in flight, rejecting concurrent starts.
    pub(crate) async fn begin_invocation(&self) -> DomainResult<()> {
        let mut state = self.state.write().await;
        if state.in_flight {
            return Err(DomainError::InvocationInFlight);
        }
        state.in_flight = true;
        Ok(())
    }

    pub(crate) async fn end_invocation(&self) {
        self.state.write().await.in_flight = false;
    }

    /// One Response Session invocation: call the backend with the full
    /// transcript, consume the stream to completion, split the blob into
    /// per-speaker turns, and append them with pacing delays.
    ///
    /// Returns the recomputed turn state. An empty generation is a no-op
    /// that leaves the turn state untouched.
    pub(crate) async fn invoke(&self, kind: InvocationKind) -> DomainResult<TurnState> {
        let (epoch, request, session_id) = {
            let state = self.state.read().await;
            let transcript: Vec<ChatMessage> =
                state.transcript.iter().map(ChatMessage::from).collect();
            let mut request = GenerationRequest::new(transcript, state.case_id.clone());
            match kind {
                InvocationKind::AutoContinue => request = request.auto_continue(),
                InvocationKind::Internal => request = request.internal(),
                InvocationKind::Human => {}
            }
            (state.epoch, request, state.session_id)
        };

        debug!(?kind, epoch, "invoking generation backend");
        let accumulated = self.consume_stream(request).await?;

        // Boundary detection happens only on the assembled blob: the model
        // may place several speaker tags in one continuous response.
        let utterances = role_tags::parse(&accumulated);
        if utterances.is_empty() {
            debug!("empty generation; leaving turn state unchanged");
            return Ok(self.state.read().await.turn);
        }

        for (i, utterance) in utterances.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(Duration::from_millis(self.pacing.utterance_gap_ms)).await;
            }
            self.append_checked(epoch, utterance.clone()).await?;
            self.saver.save(session_id, utterance.clone());
        }

        let last_text = utterances
            .last()
            .map(|u| u.text.clone())
            .unwrap_or_default();
        self.recompute_turn(epoch, &last_text).await
    }

    /// Drain one generation stream into a single string.
    async fn consume_stream(&self, request: GenerationRequest) -> DomainResult<String> {
        let mut rx = self.backend.stream(request).await?;
        let mut accumulated = String::new();
        while let Some(event) = rx.recv().await {
            match event {
                GenerationEvent::Text(chunk) => accumulated.push_str(&chunk),
                GenerationEvent::Error(message) => return Err(DomainError::Backend(message)),
            }
        }
        Ok(accumulated)
    }

    /// Append one utterance unless the session was reset since `epoch`.
    pub(crate) async fn append_checked(&self, epoch: u64, utterance: Utterance) -> DomainResult<()> {
        let mut state = self.state.write().await;
        if state.epoch != epoch {
            debug!("dropping stale utterance from epoch {epoch}");
            return Err(DomainError::Cancelled);
        }
        state.transcript.push(utterance.clone());
        drop(state);
        self.emit(TrialEvent::Appended(utterance));
        Ok(())
    }

    /// Recompute the turn state from the latest utterance text.
    ///
    /// A classified human turn resets the auto-continue counter.
    pub(crate) async fn recompute_turn(&self, epoch: u64, last_text: &str) -> DomainResult<TurnState> {
        let is_human = self.rules.classify(last_text);
        let turn = {
            let mut state = self.state.write().await;
            if state.epoch != epoch {
                return Err(DomainError::Cancelled);
            }
            state.turn.is_human_turn = is_human;
            if is_human {
                state.turn.auto_continue_count = 0;
                state.phase = AutoAdvancePhase::AwaitingHuman;
            }
            state.turn
        };
        self.emit(TrialEvent::TurnChanged(turn));
        Ok(turn)
    }

    /// Record the one-time case acceptance.
    pub async fn accept_case(&self) -> DomainResult<()> {
        let session_id = { self.state.read().await.session_id };
        self.store.set_acceptance(session_id).await
    }

    /// Whether this session's case has been accepted.
    pub async fn is_accepted(&self) -> DomainResult<bool> {
        let session_id = { self.state.read().await.session_id };
        self.store.get_acceptance(session_id).await
    }

    /// Reset the whole session: clear the stored transcript and acceptance,
    /// wipe in-memory state, and bump the epoch so any in-flight
    /// invocation's late results are discarded.
    pub async fn reset(&self) -> DomainResult<()> {
        let session_id = {
            let mut state = self.state.write().await;
            state.reset();
            state.session_id
        };
        self.store.reset_session(session_id).await?;
        info!(session_id = %session_id, "session reset");
        self.emit(TrialEvent::TurnChanged(TurnState::default()));
        Ok(())
    }
}
