//! Fire-and-forget persistence queue.
//!
//! Transcript appends are optimistic: the UI shows an utterance as soon
//! as it is finalized, while the write to the store happens behind this
//! queue. Commands are idempotent upserts keyed by utterance id (the
//! store ignores duplicates), so a retry after a partial failure cannot
//! double-insert. Writes follow append order because the worker drains
//! one unbounded channel.

use std::sync::Arc;
use std::time::Duration;

use backoff::ExponentialBackoff;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::Utterance;
use crate::domain::ports::TranscriptStore;

struct SaveCommand {
    session_id: Uuid,
    utterance: Utterance,
    ack: Option<oneshot::Sender<DomainResult<()>>>,
}

/// Clonable handle to the background save worker.
#[derive(Clone)]
pub struct PersistenceQueue {
    tx: mpsc::UnboundedSender<SaveCommand>,
}

impl PersistenceQueue {
    /// Spawn the worker task draining save commands against the store.
    pub fn spawn(store: Arc<dyn TranscriptStore>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<SaveCommand>();

        tokio::spawn(async move {
            while let Some(cmd) = rx.recv().await {
                let result =
                    save_with_retry(store.as_ref(), cmd.session_id, &cmd.utterance).await;
                match &result {
                    Ok(()) => debug!(utterance_id = %cmd.utterance.id, "utterance persisted"),
                    Err(err) => warn!(
                        utterance_id = %cmd.utterance.id,
                        error = %err,
                        "dropping utterance after exhausted save retries"
                    ),
                }
                if let Some(ack) = cmd.ack {
                    let _ = ack.send(result);
                }
            }
        });

        Self { tx }
    }

    /// Enqueue a best-effort save; never blocks the caller.
    pub fn save(&self, session_id: Uuid, utterance: Utterance) {
        let _ = self.tx.send(SaveCommand {
            session_id,
            utterance,
            ack: None,
        });
    }

    /// Enqueue a save and wait for it to land (used for human input, which
    /// must be durable before the backend is invoked).
    pub async fn save_and_wait(
        &self,
        session_id: Uuid,
        utterance: Utterance,
    ) -> DomainResult<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx
            .send(SaveCommand {
                session_id,
                utterance,
                ack: Some(ack_tx),
            })
            .map_err(|_| DomainError::DatabaseError("persistence worker stopped".to_string()))?;
        ack_rx
            .await
            .map_err(|_| DomainError::DatabaseError("persistence worker stopped".to_string()))?
    }
}

fn retry_policy() -> ExponentialBackoff {
    ExponentialBackoff {
        initial_interval: Duration::from_millis(50),
        max_elapsed_time: Some(Duration::from_secs(3)),
        ..ExponentialBackoff::default()
    }
}

async fn save_with_retry(
    store: &dyn TranscriptStore,
    session_id: Uuid,
    utterance: &Utterance,
) -> DomainResult<()> {
    backoff::future::retry(retry_policy(), || async {
        store
            .append_utterance(session_id, utterance)
            .await
            .map_err(|err| match err {
                DomainError::DatabaseError(_) => backoff::Error::transient(err),
                other => backoff::Error::permanent(other),
            })
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{create_test_pool, run_migrations, SqliteTranscriptStore};
    use crate::domain::ports::TranscriptStore;

    async fn test_store() -> Arc<SqliteTranscriptStore> {
        let pool = create_test_pool().await.unwrap();
        run_migrations(&pool).await.unwrap();
        Arc::new(SqliteTranscriptStore::new(pool))
    }

    #[tokio::test]
    async fn test_save_and_wait_lands_in_store() {
        let store = test_store().await;
        let session = store.session_for_case("case-1").await.unwrap();
        let queue = PersistenceQueue::spawn(store.clone());

        let utterance = Utterance::human("Mi cliente es inocente.");
        queue.save_and_wait(session.id, utterance).await.unwrap();

        let transcript = store.load_transcript(session.id).await.unwrap();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript[0].content, "Mi cliente es inocente.");
    }

    #[tokio::test]
    async fn test_duplicate_saves_insert_once() {
        let store = test_store().await;
        let session = store.session_for_case("case-1").await.unwrap();
        let queue = PersistenceQueue::spawn(store.clone());

        let utterance = Utterance::generated(Some("Juez".into()), "[Juez] Orden.");
        queue
            .save_and_wait(session.id, utterance.clone())
            .await
            .unwrap();
        queue.save_and_wait(session.id, utterance).await.unwrap();

        let transcript = store.load_transcript(session.id).await.unwrap();
        assert_eq!(transcript.len(), 1);
    }

    #[tokio::test]
    async fn test_fire_and_forget_preserves_order() {
        let store = test_store().await;
        let session = store.session_for_case("case-1").await.unwrap();
        let queue = PersistenceQueue::spawn(store.clone());

        for i in 0..5 {
            queue.save(
                session.id,
                Utterance::generated(Some("Juez".into()), format!("[Juez] Punto {i}.")),
            );
        }
        // Marker write: once it lands, everything queued before it has too.
        queue
            .save_and_wait(session.id, Utterance::human("listo"))
            .await
            .unwrap();

        let transcript = store.load_transcript(session.id).await.unwrap();
        assert_eq!(transcript.len(), 6);
        for (i, message) in transcript.iter().take(5).enumerate() {
            assert_eq!(message.content, format!("[Juez] Punto {i}."));
        }
    }
}
