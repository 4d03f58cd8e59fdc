//! OpenAI-compatible chat completions backend.
//!
//! Speaks the streaming chat completions wire format: one POST with
//! `stream: true`, SSE `data:` lines back, `[DONE]` sentinel at the end.
//! The orchestration core never sees any of this; it gets text chunks on
//! a channel.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{BackendConfig, ChatMessage, ChatRole};
use crate::domain::ports::{GenerationBackend, GenerationEvent, GenerationRequest};

/// Instruction appended as a trailing user message on auto-continuation
/// invocations, standing in for the human input that does not exist.
const AUTO_CONTINUE_NUDGE: &str = "Continúa con la simulación. Si el juez cedió la palabra a \
     otro participante, habla como esa persona. No repitas intervenciones anteriores.";

/// Instruction appended on the one-shot case-summary bootstrap.
const SUMMARY_INSTRUCTION: &str = "Como juez, presenta el caso a las partes: resume los hechos \
     en disputa y abre la vista. Responde en una sola intervención etiquetada [Juez].";

#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    stream: bool,
}

#[derive(Debug, Clone, Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

impl From<&ChatMessage> for WireMessage {
    fn from(message: &ChatMessage) -> Self {
        Self {
            role: message.role.as_str(),
            content: message.content.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Deserialize, Default)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Streaming chat-completions client implementing [`GenerationBackend`].
pub struct OpenAiBackend {
    config: BackendConfig,
    client: Client,
    /// Stable scenario prompt, built once from the case record.
    system_prompt: String,
}

impl OpenAiBackend {
    pub fn new(config: BackendConfig, system_prompt: impl Into<String>) -> DomainResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                DomainError::ValidationFailed(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            config,
            client,
            system_prompt: system_prompt.into(),
        })
    }

    fn api_key(&self) -> DomainResult<String> {
        self.config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| DomainError::ValidationFailed("OPENAI_API_KEY not set".to_string()))
    }

    /// Assemble the wire messages: system prompt, the transcript, and the
    /// synthetic trailing instruction for flagged invocations.
    fn build_messages(&self, request: &GenerationRequest) -> Vec<WireMessage> {
        let mut messages = Vec::with_capacity(request.transcript.len() + 2);
        messages.push(WireMessage {
            role: ChatRole::System.as_str(),
            content: self.system_prompt.clone(),
        });
        messages.extend(request.transcript.iter().map(WireMessage::from));

        if request.internal {
            messages.push(WireMessage {
                role: ChatRole::User.as_str(),
                content: SUMMARY_INSTRUCTION.to_string(),
            });
        } else if request.auto_continue {
            messages.push(WireMessage {
                role: ChatRole::User.as_str(),
                content: AUTO_CONTINUE_NUDGE.to_string(),
            });
        }
        messages
    }

    fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.config.base_url)
    }
}

#[async_trait]
impl GenerationBackend for OpenAiBackend {
    fn name(&self) -> &'static str {
        "openai_api"
    }

    async fn stream(
        &self,
        request: GenerationRequest,
    ) -> DomainResult<mpsc::Receiver<GenerationEvent>> {
        let api_key = self.api_key()?;
        let wire_request = WireRequest {
            model: &self.config.model,
            messages: self.build_messages(&request),
            stream: true,
        };

        debug!(
            model = %self.config.model,
            messages = wire_request.messages.len(),
            auto_continue = request.auto_continue,
            internal = request.internal,
            "starting chat completion"
        );

        let response = self
            .client
            .post(self.completions_url())
            .header(header::CONTENT_TYPE, "application/json")
            .bearer_auth(&api_key)
            .json(&wire_request)
            .send()
            .await
            .map_err(|e| DomainError::Backend(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DomainError::Backend(format!("API error {status}: {body}")));
        }

        let (tx, rx) = mpsc::channel(100);
        tokio::spawn(async move {
            let mut stream = response.bytes_stream();
            let mut buffer = String::new();

            while let Some(item) = stream.next().await {
                let bytes = match item {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        warn!(error = %e, "chat completion stream broke");
                        let _ = tx
                            .send(GenerationEvent::Error(format!("stream read failed: {e}")))
                            .await;
                        return;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&bytes));

                while let Some(newline) = buffer.find('\n') {
                    let line = buffer[..newline].trim().to_string();
                    buffer.drain(..=newline);

                    let Some(data) = line.strip_prefix("data: ") else {
                        continue;
                    };
                    if data == "[DONE]" {
                        return;
                    }
                    match serde_json::from_str::<StreamChunk>(data) {
                        Ok(chunk) => {
                            let content = chunk
                                .choices
                                .into_iter()
                                .next()
                                .and_then(|choice| choice.delta.content);
                            if let Some(content) = content {
                                if tx.send(GenerationEvent::Text(content)).await.is_err() {
                                    return;
                                }
                            }
                        }
                        Err(e) => debug!(error = %e, "skipping unparseable SSE line"),
                    }
                }
            }
        });

        Ok(rx)
    }
}

/// Build the stable scenario prompt for one case.
pub fn scenario_prompt(title: &str, facts: &str) -> String {
    format!(
        "Eres el motor de una simulación de juicio. El usuario es el abogado defensor; tú \
         interpretas a todos los demás participantes (juez, fiscal, testigos, secretario). \
         Marca cada cambio de hablante con una etiqueta [Rol] al inicio de su intervención, \
         por ejemplo [Juez] o [Fiscal]. Cede la palabra a la defensa con frases explícitas \
         como \"Defensa, tiene la palabra\".\n\nCaso: {title}\n\nHechos: {facts}"
    )
}
