//! Streaming chat engine.
//!
//! [`ChatEngine::stream_reply`] runs the full reply path on a spawned task
//! and hands the caller a channel of frames: zero or more `{"text": ...}`
//! fragments, at most one `{"error": ...}`, and always exactly one final
//! `{"done": true}`. Retrieval and memory failures degrade the reply instead
//! of failing it; only provider failures surface as an error frame.

use crate::index::RetrievalIndex;
use crate::memory::ConversationMemory;
use crate::model::{FewShotExample, PersonaReport, StyleMode, StyleSignature};
use crate::prompt;
use crate::providers::{ChatMessage, GenerationProvider};
use crate::style;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// One frame of a streamed reply. Serialized untagged so the wire shape is
/// `{"text": ...}`, `{"error": ...}` or `{"done": true}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StreamFrame {
    Text { text: String },
    Error { error: String },
    Done { done: bool },
}

impl StreamFrame {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self::Error {
            error: error.into(),
        }
    }

    pub fn done() -> Self {
        Self::Done { done: true }
    }
}

/// Persona context carried from a completed analysis into chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaContext {
    pub report: PersonaReport,
    pub speaker_name: String,
    #[serde(default)]
    pub style_examples: Vec<String>,
    #[serde(default)]
    pub dialog_examples: Vec<FewShotExample>,
    #[serde(default)]
    pub style_signature: StyleSignature,
}

/// One inbound chat message.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub session_id: String,
    pub message: String,
    /// Retrieval/memory partition, usually the job id.
    pub owner_key: Option<String>,
    pub persona: Option<PersonaContext>,
    pub mode: StyleMode,
}

/// Tunables shared by every reply.
#[derive(Debug, Clone)]
pub struct ChatOptions {
    pub top_k: usize,
    pub max_distance: f32,
    pub temperature: f32,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            top_k: 5,
            max_distance: 0.85,
            temperature: 0.3,
        }
    }
}

#[derive(Clone)]
pub struct ChatEngine {
    provider: Option<Arc<dyn GenerationProvider>>,
    index: Arc<RetrievalIndex>,
    memory: Arc<ConversationMemory>,
    options: ChatOptions,
}

impl ChatEngine {
    pub fn new(
        provider: Option<Arc<dyn GenerationProvider>>,
        index: Arc<RetrievalIndex>,
        memory: Arc<ConversationMemory>,
        options: ChatOptions,
    ) -> Self {
        Self {
            provider,
            index,
            memory,
            options,
        }
    }

    /// Stream a reply for the request. The returned receiver yields frames
    /// until the terminal `done` frame, which is always sent exactly once.
    pub fn stream_reply(&self, request: ChatRequest) -> mpsc::Receiver<StreamFrame> {
        let (tx, rx) = mpsc::channel(32);
        let engine = self.clone();
        tokio::spawn(async move {
            engine.produce(request, tx).await;
        });
        rx
    }

    async fn produce(&self, request: ChatRequest, tx: mpsc::Sender<StreamFrame>) {
        let Some(provider) = &self.provider else {
            let _ = tx
                .send(StreamFrame::error("생성 모델이 설정되지 않았습니다."))
                .await;
            let _ = tx.send(StreamFrame::done()).await;
            return;
        };

        let context = if request.mode.uses_retrieval() {
            self.retrieve_context(&request).await
        } else {
            None
        };

        let messages = self.compose(&request, context.as_deref());

        let stream = provider
            .stream_chat(&messages, self.options.temperature)
            .await;
        let mut stream = match stream {
            Ok(s) => s,
            Err(e) => {
                let _ = tx.send(StreamFrame::error(e.to_string())).await;
                let _ = tx.send(StreamFrame::done()).await;
                return;
            }
        };

        let mut buffer = String::new();
        let mut failed = false;
        while let Some(item) = stream.next().await {
            match item {
                Ok(fragment) => {
                    let clean = style::sanitize_no_emoji(&fragment);
                    if clean.is_empty() {
                        continue;
                    }
                    buffer.push_str(&clean);
                    if tx.send(StreamFrame::text(clean)).await.is_err() {
                        // Receiver gone; stop generating.
                        return;
                    }
                }
                Err(e) => {
                    warn!("completion stream failed mid-reply: {e}");
                    let _ = tx.send(StreamFrame::error(e.to_string())).await;
                    failed = true;
                    break;
                }
            }
        }

        // A failed or empty reply is never written back to memory.
        if !failed && !buffer.is_empty() {
            self.memory.append(
                request.owner_key.as_deref(),
                &request.session_id,
                &request.message,
                &buffer,
            );
        }

        let _ = tx.send(StreamFrame::done()).await;
    }

    /// Retrieve context for the message, absorbing every failure into `None`.
    async fn retrieve_context(&self, request: &ChatRequest) -> Option<String> {
        let owner = request.owner_key.as_deref()?;
        let hit = match self
            .index
            .query(owner, &request.message, self.options.top_k)
            .await
        {
            Ok(hit) => hit,
            Err(e) => {
                warn!("retrieval failed, continuing without context: {e}");
                return None;
            }
        };

        let min_distance = hit.min_distance?;
        if min_distance > self.options.max_distance {
            debug!(min_distance, "retrieval below relevance gate, dropping context");
            return None;
        }

        let joined = hit
            .chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\n---\n");
        let clean = style::sanitize_no_emoji(&joined);
        if clean.trim().is_empty() {
            None
        } else {
            Some(clean)
        }
    }

    /// Assemble the outbound message list: system prompt (persona or base,
    /// plus gated context), up to three few-shot pairs, the memory window,
    /// then the user message. Only the rich persona instruction block is
    /// mode-gated; the few-shot pairs ride along in every mode.
    fn compose(&self, request: &ChatRequest, context: Option<&str>) -> Vec<ChatMessage> {
        let prompt_persona = request
            .persona
            .as_ref()
            .filter(|_| request.mode.uses_persona_prompt());

        let mut system = match prompt_persona {
            Some(p) => prompt::build_persona_prompt(
                &p.report,
                &p.speaker_name,
                &p.style_examples,
                &p.dialog_examples,
                &p.style_signature,
            ),
            None => prompt::build_base_prompt(
                request.persona.as_ref().map(|p| p.speaker_name.as_str()),
            ),
        };
        if let Some(context) = context {
            system.push_str(&prompt::context_appendix(context));
        }

        let mut messages = vec![ChatMessage::system(system)];

        if let Some(p) = &request.persona {
            for example in p.dialog_examples.iter().take(3) {
                let user = style::sanitize_no_emoji(&example.user).trim().to_string();
                let reply = style::sanitize_no_emoji(&example.persona).trim().to_string();
                if user.is_empty() || reply.is_empty() {
                    continue;
                }
                messages.push(ChatMessage::user(user));
                messages.push(ChatMessage::assistant(reply));
            }
        }

        messages.extend(
            self.memory
                .recent(request.owner_key.as_deref(), &request.session_id),
        );
        messages.push(ChatMessage::user(request.message.clone()));
        messages
    }
}
