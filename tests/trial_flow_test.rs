//! End-to-end trial flow over the scripted backend and an in-memory store.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use tribunal::adapters::backends::{MockBackend, MockReply};
use tribunal::adapters::sqlite::{create_test_pool, run_migrations, SqliteTranscriptStore};
use tribunal::domain::models::{
    AutoContinueConfig, Origin, PacingConfig, TrialEvent,
};
use tribunal::domain::ports::TranscriptStore;
use tribunal::{TrialRuntime, TurnRules};

async fn setup(
    case_id: &str,
    backend: Arc<MockBackend>,
) -> (
    Arc<TrialRuntime>,
    mpsc::UnboundedReceiver<TrialEvent>,
    Arc<SqliteTranscriptStore>,
) {
    let pool = create_test_pool().await.expect("test pool");
    run_migrations(&pool).await.expect("migrations");
    let store = Arc::new(SqliteTranscriptStore::new(pool));
    let session = store.session_for_case(case_id).await.expect("session");

    let (runtime, events) = TrialRuntime::new(
        &session,
        backend,
        store.clone(),
        TurnRules::default(),
        PacingConfig::immediate(),
        AutoContinueConfig::default(),
    );
    (Arc::new(runtime), events, store)
}

/// Wait for the fire-and-forget persistence queue to drain.
async fn settle_saves() {
    tokio::time::sleep(Duration::from_millis(150)).await;
}

#[tokio::test]
async fn test_full_trial_flow_from_acceptance_to_handoff() {
    let backend = Arc::new(MockBackend::new());
    // Judge summary for the bootstrap, handing the floor straight over.
    backend
        .push_reply(MockReply::chunks(vec![
            "[Juez] Se juzga el robo en la joyería El Diamante. ",
            "Defensa, tiene la palabra.",
        ]))
        .await;
    // The exchange after the first human utterance: two passes before the
    // floor comes back.
    backend
        .push_reply(MockReply::text(
            "[Fiscal] Llamo a declarar a Jorge Ramírez. [Jorge Ramírez - Testigo] Vi al acusado esa noche.",
        ))
        .await;
    backend
        .push_reply(MockReply::text("[Juez] Abogado, puede interrogar al testigo."))
        .await;

    let (runtime, _events, store) = setup("case-1", backend.clone()).await;

    runtime.accept_case().await.unwrap();
    let turn = runtime.start_presentation().await.unwrap();
    assert!(turn.is_human_turn);

    let turn = runtime
        .submit_human("La defensa está lista, Señoría.")
        .await
        .unwrap();
    assert!(turn.is_human_turn);
    assert_eq!(turn.auto_continue_count, 0);

    // 1 summary invocation, 1 human-initiated, 1 auto-continuation.
    assert_eq!(backend.invocation_count().await, 3);

    let transcript = runtime.transcript().await;
    // 4 scripted lines + summary + human + 2 split speakers + judge handoff.
    assert_eq!(transcript.len(), 9);
    assert_eq!(transcript[5].origin, Origin::Human);
    assert_eq!(
        transcript[7].speaker_label.as_deref(),
        Some("Jorge Ramírez - Testigo")
    );

    // Everything visible is also durable, in the same order.
    settle_saves().await;
    let session = store.session_for_case("case-1").await.unwrap();
    let stored = store.load_transcript(session.id).await.unwrap();
    assert_eq!(stored.len(), transcript.len());
    for (stored, live) in stored.iter().zip(&transcript) {
        assert_eq!(stored.id, live.id);
        assert_eq!(stored.content, live.text);
    }
}

#[tokio::test]
async fn test_runaway_exchange_is_cut_off_at_the_ceiling() {
    let backend = Arc::new(MockBackend::new());
    for _ in 0..12 {
        backend
            .push_reply(MockReply::text("[Fiscal] La acusación continúa su exposición."))
            .await;
    }
    let (runtime, mut events, _store) = setup("case-1", backend.clone()).await;

    let turn = runtime.submit_human("Proceda, Señoría.").await.unwrap();

    // The floor is forced back regardless of what the backend keeps saying.
    assert!(turn.is_human_turn);
    assert_eq!(backend.invocation_count().await, 5);

    let mut attempts = Vec::new();
    let mut exhausted = 0;
    while let Ok(event) = events.try_recv() {
        match event {
            TrialEvent::AutoAdvancing { attempt } => attempts.push(attempt),
            TrialEvent::Exhausted => exhausted += 1,
            _ => {}
        }
    }
    assert_eq!(attempts, vec![1, 2, 3, 4]);
    assert_eq!(exhausted, 1);

    // A fresh human turn starts a fresh allowance.
    let turn = runtime.submit_human("Retomo mi alegato.").await.unwrap();
    assert!(turn.is_human_turn);
    assert_eq!(backend.invocation_count().await, 10);
}

#[tokio::test]
async fn test_appended_events_match_transcript_order() {
    let backend = Arc::new(MockBackend::new());
    backend
        .push_reply(MockReply::text(
            "[Juez] Orden. [Fiscal] Procedo. [Juez] Defensa, proceda.",
        ))
        .await;
    let (runtime, mut events, _store) = setup("case-2", backend).await;

    runtime.submit_human("Buenos días.").await.unwrap();

    let appended: Vec<_> = std::iter::from_fn(|| events.try_recv().ok())
        .filter_map(|event| match event {
            TrialEvent::Appended(utterance) => Some(utterance.id),
            _ => None,
        })
        .collect();
    let transcript: Vec<_> = runtime.transcript().await.iter().map(|u| u.id).collect();
    assert_eq!(appended, transcript);
}

#[tokio::test]
async fn test_reset_clears_store_and_allows_fresh_presentation() {
    let backend = Arc::new(MockBackend::new());
    backend
        .push_reply(MockReply::text("[Juez] Primer resumen. Defensa, adelante."))
        .await;
    backend
        .push_reply(MockReply::text("[Juez] Segundo resumen. Defensa, adelante."))
        .await;
    let (runtime, _events, store) = setup("case-2", backend).await;

    runtime.accept_case().await.unwrap();
    runtime.start_presentation().await.unwrap();
    settle_saves().await;

    runtime.reset().await.unwrap();
    assert!(runtime.transcript().await.is_empty());

    let session = store.session_for_case("case-2").await.unwrap();
    assert!(store.load_transcript(session.id).await.unwrap().is_empty());
    assert!(!store.get_acceptance(session.id).await.unwrap());

    // Acceptance is required again, then the bootstrap reruns cleanly.
    runtime.accept_case().await.unwrap();
    runtime.start_presentation().await.unwrap();
    let transcript = runtime.transcript().await;
    assert!(transcript
        .last()
        .unwrap()
        .text
        .contains("Segundo resumen"));
}

#[tokio::test]
async fn test_restart_restores_turn_and_skips_presentation() {
    let backend = Arc::new(MockBackend::new());
    backend
        .push_reply(MockReply::text("[Juez] Resumen. Defensa, tiene la palabra."))
        .await;
    let (runtime, _events, store) = setup("case-1", backend.clone()).await;
    runtime.accept_case().await.unwrap();
    runtime.start_presentation().await.unwrap();
    settle_saves().await;
    let original = runtime.transcript().await;

    // Simulate a restart: new runtime over the same store.
    let session = store.session_for_case("case-1").await.unwrap();
    let (fresh, _fresh_events) = TrialRuntime::new(
        &session,
        backend.clone(),
        store.clone(),
        TurnRules::default(),
        PacingConfig::immediate(),
        AutoContinueConfig::default(),
    );
    let restored = fresh.restore().await.unwrap();
    assert_eq!(restored, original.len());
    assert!(fresh.turn_state().await.is_human_turn);
    assert!(fresh.presentation_started().await);

    // The bootstrap must not rerun over existing history.
    let before = backend.invocation_count().await;
    fresh.start_presentation().await.unwrap();
    assert_eq!(backend.invocation_count().await, before);

    let rehydrated: Vec<_> = fresh.transcript().await.iter().map(|u| u.id).collect();
    let expected: Vec<_> = original.iter().map(|u| u.id).collect();
    assert_eq!(rehydrated, expected);
}
