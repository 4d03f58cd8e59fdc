//! Auto-continuation loop: keeps the trial moving while non-human
//! participants hold the floor, bounded by a consecutive-advance ceiling.
//!
//! Each pass waits a readable delay, invokes the backend with the
//! auto-continue flag (no new human input), and re-derives the turn from
//! whatever the invocation appended. The counter only resets when the
//! floor actually returns to the human, so a runaway exchange can never
//! schedule more than `max_consecutive` autonomous invocations in a row.

use std::time::Duration;

use tracing::{debug, info};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{AutoAdvancePhase, TrialEvent, TurnState};
use crate::services::response_session::{InvocationKind, TrialRuntime};

impl TrialRuntime {
    /// Run autonomous invocations until the floor returns to the human,
    /// the ceiling is hit, or an invocation fails.
    ///
    /// Failures during an autonomous pass are terminal for the loop but
    /// not for the session: the phase drops back to `AwaitingHuman` so the
    /// human can nudge the trial forward, and the error surfaces as a
    /// `Failure` event rather than an `Err`.
    pub(crate) async fn run_auto_continue(&self) -> DomainResult<TurnState> {
        loop {
            let (turn, ceiling) = {
                let mut state = self.state.write().await;
                if state.turn.is_human_turn {
                    state.phase = AutoAdvancePhase::AwaitingHuman;
                    return Ok(state.turn);
                }
                if state.turn.auto_continue_count >= self.auto.max_consecutive {
                    // Ceiling hit: force the human turn so the loop can
                    // never run away, and start counting fresh.
                    state.phase = AutoAdvancePhase::Exhausted;
                    state.turn.is_human_turn = true;
                    state.turn.auto_continue_count = 0;
                    let turn = state.turn;
                    drop(state);
                    info!("auto-continue ceiling reached; forcing human turn");
                    self.emit(TrialEvent::Exhausted);
                    self.emit(TrialEvent::TurnChanged(turn));
                    return Ok(turn);
                }
                state.phase = AutoAdvancePhase::AutoAdvancing;
                state.turn.auto_continue_count += 1;
                (state.turn, self.auto.max_consecutive)
            };

            debug!(
                attempt = turn.auto_continue_count,
                ceiling, "scheduling autonomous continuation"
            );
            self.emit(TrialEvent::AutoAdvancing {
                attempt: turn.auto_continue_count,
            });
            tokio::time::sleep(Duration::from_millis(self.pacing.auto_continue_delay_ms)).await;

            self.begin_invocation().await?;
            let invoked = self.invoke(InvocationKind::AutoContinue).await;
            self.end_invocation().await;

            match invoked {
                Ok(_) => {}
                Err(DomainError::Cancelled) => return Err(DomainError::Cancelled),
                Err(err) => {
                    let turn = {
                        let mut state = self.state.write().await;
                        state.phase = AutoAdvancePhase::AwaitingHuman;
                        state.turn
                    };
                    self.emit(TrialEvent::Failure {
                        message: err.to_string(),
                        retryable: err.is_retryable(),
                    });
                    return Ok(turn);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::backends::mock::{MockBackend, MockReply};
    use crate::services::response_session::tests::test_runtime;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_loop_stops_when_floor_returns_to_human() {
        let backend = Arc::new(MockBackend::new());
        // Human-initiated reply keeps the floor away from the human; two
        // auto passes later the judge hands it back.
        backend
            .push_reply(MockReply::text("[Fiscal] Presento la primera prueba."))
            .await;
        backend
            .push_reply(MockReply::text("[Juez] Tomo nota de la prueba."))
            .await;
        backend
            .push_reply(MockReply::text("[Juez] Defensa, proceda."))
            .await;
        let (runtime, _events, _store) = test_runtime(backend.clone()).await;

        let turn = runtime.submit_human("Inicie el juicio.").await.unwrap();

        assert!(turn.is_human_turn);
        // Human turn resets the counter.
        assert_eq!(turn.auto_continue_count, 0);
        assert_eq!(backend.invocation_count().await, 3);
        // 1 human + 3 generated utterances.
        assert_eq!(runtime.transcript().await.len(), 4);
    }

    #[tokio::test]
    async fn test_ceiling_forces_human_turn_after_exactly_four_advances() {
        let backend = Arc::new(MockBackend::new());
        // Every reply withholds the floor; the loop must cut off on its own.
        for i in 0..10 {
            backend
                .push_reply(MockReply::text(format!("[Fiscal] Continúo, punto {i}.")))
                .await;
        }
        let (runtime, mut events, _store) = test_runtime(backend.clone()).await;

        let turn = runtime.submit_human("Proceda.").await.unwrap();

        assert!(turn.is_human_turn);
        assert_eq!(turn.auto_continue_count, 0);
        // One human-initiated invocation plus exactly four autonomous ones.
        assert_eq!(backend.invocation_count().await, 5);

        let mut advancing = 0;
        let mut exhausted = 0;
        while let Ok(event) = events.try_recv() {
            match event {
                TrialEvent::AutoAdvancing { .. } => advancing += 1,
                TrialEvent::Exhausted => exhausted += 1,
                _ => {}
            }
        }
        assert_eq!(advancing, 4);
        assert_eq!(exhausted, 1);
    }

    #[tokio::test]
    async fn test_auto_failure_returns_floor_without_error() {
        let backend = Arc::new(MockBackend::new());
        backend
            .push_reply(MockReply::text("[Fiscal] Sigo con mi exposición."))
            .await;
        backend
            .push_reply(MockReply::transport_failure("backend unavailable"))
            .await;
        let (runtime, mut events, _store) = test_runtime(backend).await;

        // The human-initiated exchange itself succeeded, so submit returns
        // Ok even though the autonomous follow-up failed.
        runtime.submit_human("Adelante.").await.unwrap();

        let mut saw_failure = false;
        while let Ok(event) = events.try_recv() {
            if let TrialEvent::Failure { retryable, .. } = event {
                assert!(retryable);
                saw_failure = true;
            }
        }
        assert!(saw_failure);
        // 1 human + 1 generated; the failed pass appended nothing.
        assert_eq!(runtime.transcript().await.len(), 2);
    }

    #[tokio::test]
    async fn test_counter_carries_across_consecutive_auto_passes() {
        let backend = Arc::new(MockBackend::new());
        backend
            .push_reply(MockReply::text("[Fiscal] Punto uno."))
            .await;
        backend
            .push_reply(MockReply::text("[Fiscal] Punto dos."))
            .await;
        backend
            .push_reply(MockReply::text("[Juez] Abogado, adelante."))
            .await;
        let (runtime, mut events, _store) = test_runtime(backend).await;

        runtime.submit_human("Empiece.").await.unwrap();

        let attempts: Vec<u32> = std::iter::from_fn(|| events.try_recv().ok())
            .filter_map(|event| match event {
                TrialEvent::AutoAdvancing { attempt } => Some(attempt),
                _ => None,
            })
            .collect();
        assert_eq!(attempts, vec![1, 2]);
    }
}
