//! Trial session state: turn tracking, auto-advance phases, UI events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::utterance::Utterance;

/// Persistent record of one user's run through one case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialSession {
    pub id: Uuid,
    pub case_id: String,
    /// Set once by explicit human action; gates the presentation bootstrap.
    pub accepted: bool,
    pub created_at: DateTime<Utc>,
}

/// Derived turn state, recomputed after every transcript append.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnState {
    /// Whether the human participant holds the floor next.
    pub is_human_turn: bool,
    /// Consecutive auto-advances since the last human turn.
    pub auto_continue_count: u32,
}

impl Default for TurnState {
    fn default() -> Self {
        Self {
            is_human_turn: true,
            auto_continue_count: 0,
        }
    }
}

/// Phase of the auto-continuation state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AutoAdvancePhase {
    /// The floor belongs to the human; nothing is scheduled.
    AwaitingHuman,
    /// A non-human participant holds the floor; auto invocations run.
    AutoAdvancing,
    /// The retry ceiling was hit; human turn was forced.
    Exhausted,
}

/// All per-session mutable state, held in one place so a reset can
/// invalidate it wholesale via the epoch counter.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub session_id: Uuid,
    pub case_id: String,
    pub transcript: Vec<Utterance>,
    pub turn: TurnState,
    pub phase: AutoAdvancePhase,
    /// Only one backend invocation may be in flight at a time.
    pub in_flight: bool,
    /// One-shot guard for the presentation bootstrap.
    pub presentation_started: bool,
    /// Bumped on every reset; in-flight results from an older epoch are
    /// dropped instead of appended.
    pub epoch: u64,
}

impl SessionState {
    pub fn new(session_id: Uuid, case_id: impl Into<String>) -> Self {
        Self {
            session_id,
            case_id: case_id.into(),
            transcript: Vec::new(),
            turn: TurnState::default(),
            phase: AutoAdvancePhase::AwaitingHuman,
            in_flight: false,
            presentation_started: false,
            epoch: 0,
        }
    }

    /// Clear everything that belongs to the old run and start a new epoch.
    pub fn reset(&mut self) {
        self.transcript.clear();
        self.turn = TurnState::default();
        self.phase = AutoAdvancePhase::AwaitingHuman;
        self.in_flight = false;
        self.presentation_started = false;
        self.epoch += 1;
    }
}

/// Events yielded to the UI layer as the orchestration progresses.
#[derive(Debug, Clone)]
pub enum TrialEvent {
    /// A new utterance was appended to the transcript.
    Appended(Utterance),
    /// A streaming-in-progress utterance grew; `text` is the full text so far.
    Updated { id: Uuid, text: String },
    /// A streaming utterance finished and is now frozen.
    Finalized { id: Uuid, text: String },
    /// A streaming placeholder produced no usable text and was dropped.
    Discarded { id: Uuid },
    /// Turn state was recomputed.
    TurnChanged(TurnState),
    /// The loop scheduled another autonomous invocation.
    AutoAdvancing { attempt: u32 },
    /// The auto-continue ceiling was hit; the human regains the floor.
    Exhausted,
    /// A retryable failure; the transcript keeps any optimistic human append.
    Failure { message: String, retryable: bool },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_turn_is_human() {
        let turn = TurnState::default();
        assert!(turn.is_human_turn);
        assert_eq!(turn.auto_continue_count, 0);
    }

    #[test]
    fn test_reset_bumps_epoch_and_clears() {
        let mut state = SessionState::new(Uuid::new_v4(), "case-1");
        state.transcript.push(Utterance::human("hola"));
        state.in_flight = true;
        state.presentation_started = true;
        state.turn.auto_continue_count = 3;

        state.reset();

        assert!(state.transcript.is_empty());
        assert!(!state.in_flight);
        assert!(!state.presentation_started);
        assert_eq!(state.turn, TurnState::default());
        assert_eq!(state.phase, AutoAdvancePhase::AwaitingHuman);
        assert_eq!(state.epoch, 1);
    }
}
