//! Presentation sequencer: the one-time scripted opening of a freshly
//! accepted case, followed by the judge's generated case summary.
//!
//! The opening lines are fixed per built-in case (docket number and named
//! participants), with a generic fallback keyed by case category, and are
//! paced out like any other exchange. The summary is the only progressively revealed
//! generation in the system: a placeholder utterance appears immediately
//! and grows as chunks arrive, so the long first generation does not sit
//! behind a blank screen.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    CaseCategory, CaseRecord, ParticipantRole, TrialEvent, TurnState, Utterance,
};
use crate::domain::ports::{GenerationEvent, GenerationRequest};
use crate::services::response_session::{InvocationKind, TrialRuntime};
use crate::services::role_tags;

/// The scripted courtroom opening for a case, ready to append.
pub fn opening_script(case: &CaseRecord) -> Vec<Utterance> {
    const LEAD_IN: &str =
        "[Sistema] La audiencia está por comenzar. Las partes se están presentando.";
    const JUDGE_GREETING: &str = "Buenos días a todos. Antes de comenzar, permítanme \
         presentar un resumen del caso que vamos a tratar hoy.";

    let lines: Vec<String> = match case.id.as_str() {
        "case-1" => vec![
            LEAD_IN.to_string(),
            "[Secretario] Buenos días. Audiencia de Juicio Oral. Causa Penal 45/2024. \
             Delito: Robo Agravado."
                .to_string(),
            "[Secretario] Juez Presidente: Hon. María González. Fiscal: Lic. Roberto \
             Sánchez. Defensa: Usted."
                .to_string(),
            format!("[Juez] {JUDGE_GREETING}"),
        ],
        "case-2" => vec![
            LEAD_IN.to_string(),
            "[Secretario] Buenos días. Audiencia Principal. Junta de Conciliación y \
             Arbitraje. Expediente LAB-128/2024."
                .to_string(),
            "[Secretario] Juez Laboral: Lic. Fernando Ramírez. Abogado de la demandante: \
             Lic. Patricia Martínez. Abogado de la empresa: Usted."
                .to_string(),
            format!("[Juez Laboral] {JUDGE_GREETING}"),
        ],
        // Custom cases get a generic opening keyed by category.
        _ => match case.category {
            CaseCategory::Penal => vec![
                LEAD_IN.to_string(),
                "[Secretario] Buenos días. Audiencia de Juicio Oral.".to_string(),
                "[Secretario] Juez Presidente: Hon. María González. Fiscal: Lic. Roberto \
                 Sánchez. Defensa: Usted."
                    .to_string(),
                format!("[Juez] {JUDGE_GREETING}"),
            ],
            CaseCategory::Laboral => vec![
                LEAD_IN.to_string(),
                "[Secretario] Buenos días. Audiencia Principal. Junta de Conciliación y \
                 Arbitraje."
                    .to_string(),
                "[Secretario] Juez Laboral: Lic. Fernando Ramírez. Abogado de la \
                 demandante: Lic. Patricia Martínez. Abogado de la empresa: Usted."
                    .to_string(),
                format!("[Juez] {JUDGE_GREETING}"),
            ],
        },
    };

    lines
        .into_iter()
        .map(|line| {
            let label = role_tags::leading_label(&line);
            Utterance::generated(label, line)
        })
        .collect()
}

impl TrialRuntime {
    /// Run the one-time presentation: scripted opening, settle delay, then
    /// the judge's generated summary with progressive reveal, and finally
    /// the auto-continuation loop if the summary withholds the floor.
    ///
    /// No-ops (returning the current turn) when the session already has
    /// history or the presentation already ran. Requires prior acceptance.
    pub async fn start_presentation(&self) -> DomainResult<TurnState> {
        if !self.is_accepted().await? {
            return Err(DomainError::CaseNotAccepted);
        }

        let (epoch, case_id, session_id) = {
            let mut state = self.state.write().await;
            if state.presentation_started || !state.transcript.is_empty() || state.in_flight {
                debug!("presentation already ran or session busy; skipping");
                return Ok(state.turn);
            }
            state.presentation_started = true;
            state.in_flight = true;
            (state.epoch, state.case_id.clone(), state.session_id)
        };

        let result = self.run_presentation(epoch, &case_id, session_id).await;
        self.end_invocation().await;

        match result {
            Ok(turn) if !turn.is_human_turn => self.run_auto_continue().await,
            Ok(turn) => Ok(turn),
            Err(err) => {
                // Allow a retry of the whole bootstrap unless it was a
                // reset that cut it short.
                if !matches!(err, DomainError::Cancelled) {
                    let mut state = self.state.write().await;
                    if state.epoch == epoch {
                        state.presentation_started = false;
                    }
                    drop(state);
                    self.emit(TrialEvent::Failure {
                        message: err.to_string(),
                        retryable: err.is_retryable(),
                    });
                }
                Err(err)
            }
        }
    }

    async fn run_presentation(
        &self,
        epoch: u64,
        case_id: &str,
        session_id: uuid::Uuid,
    ) -> DomainResult<TurnState> {
        let case = self
            .store
            .find_case(case_id)
            .await?
            .ok_or_else(|| DomainError::CaseNotFound(case_id.to_string()))?;
        info!(case_id, title = %case.title, "starting case presentation");

        for (i, utterance) in opening_script(&case).into_iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(Duration::from_millis(self.pacing.presentation_gap_ms)).await;
            }
            self.append_checked(epoch, utterance.clone()).await?;
            self.saver.save(session_id, utterance);
        }

        tokio::time::sleep(Duration::from_millis(self.pacing.summary_settle_ms)).await;

        let summary = self.reveal_summary(epoch, case_id, session_id).await?;
        let Some(summary) = summary else {
            // Empty summary: drop the placeholder but keep the opening and
            // the bootstrap guard, matching a no-op generation.
            warn!("judge summary came back empty");
            return Ok(self.state.read().await.turn);
        };

        self.recompute_turn(epoch, &summary.text).await
    }

    /// Stream the judge's case summary into a growing placeholder
    /// utterance. Returns the finalized utterance, or `None` if the
    /// generation was empty and the placeholder was discarded.
    async fn reveal_summary(
        &self,
        epoch: u64,
        case_id: &str,
        session_id: uuid::Uuid,
    ) -> DomainResult<Option<Utterance>> {
        let request = {
            let state = self.state.read().await;
            GenerationRequest::new(
                state.transcript.iter().map(Into::into).collect(),
                case_id.to_string(),
            )
            .internal()
        };

        // The summary is the judge's; the attribution is provisional
        // until the finalized text names its own speaker.
        let placeholder = Utterance::generated(Some("Juez".to_string()), "");
        let placeholder_id = placeholder.id;
        self.append_checked(epoch, placeholder).await?;

        let mut rx = match self.backend.stream(request).await {
            Ok(rx) => rx,
            Err(err) => {
                self.discard_placeholder(epoch, placeholder_id).await;
                return Err(err);
            }
        };

        let mut accumulated = String::new();
        while let Some(event) = rx.recv().await {
            match event {
                GenerationEvent::Text(chunk) => {
                    accumulated.push_str(&chunk);
                    self.emit(TrialEvent::Updated {
                        id: placeholder_id,
                        text: accumulated.clone(),
                    });
                }
                GenerationEvent::Error(message) => {
                    self.discard_placeholder(epoch, placeholder_id).await;
                    return Err(DomainError::Backend(message));
                }
            }
        }

        let text = accumulated.trim().to_string();
        if text.is_empty() {
            self.discard_placeholder(epoch, placeholder_id).await;
            self.emit(TrialEvent::Discarded { id: placeholder_id });
            return Ok(None);
        }

        // The summary stays one utterance even if the model slipped in
        // several tags; only the leading tag attributes it.
        let label = role_tags::leading_label(&text);
        let finalized = {
            let mut state = self.state.write().await;
            if state.epoch != epoch {
                return Err(DomainError::Cancelled);
            }
            let slot = state
                .transcript
                .iter_mut()
                .find(|u| u.id == placeholder_id)
                .ok_or(DomainError::Cancelled)?;
            slot.text.clone_from(&text);
            slot.speaker_label.clone_from(&label);
            slot.role = label
                .as_deref()
                .map_or(ParticipantRole::Judge, ParticipantRole::from_label);
            slot.clone()
        };
        self.emit(TrialEvent::Finalized {
            id: placeholder_id,
            text,
        });
        self.saver.save(session_id, finalized.clone());
        Ok(Some(finalized))
    }

    /// Remove a never-finalized placeholder from the transcript.
    async fn discard_placeholder(&self, epoch: u64, id: uuid::Uuid) {
        let mut state = self.state.write().await;
        if state.epoch == epoch {
            state.transcript.retain(|u| u.id != id);
        }
    }
}
