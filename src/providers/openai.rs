//! HTTP client for an OpenAI-compatible chat completions API.
//!
//! Handles request construction, bearer authentication, JSON-object
//! completions for persona reports, and streaming SSE responses. Failures
//! surface once; there is no retry here, callers degrade instead.

use crate::error::{Error, Result};
use crate::providers::{ChatMessage, GenerationProvider, TokenStream};
use crate::telemetry::genai::{record_token_usage, start_chat_span};
use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use tracing::{Instrument, debug};

/// Base URL for the chat completions endpoint.
const API_BASE_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Chat completions client.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    model: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(api_key: &SecretString, model: impl Into<String>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", api_key.expose_secret()))
            .map_err(|e| Error::Config(format!("invalid API key header value: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| Error::Provider(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            model: model.into(),
            base_url: API_BASE_URL.to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Overrides the base URL (for testing with wiremock).
    #[cfg(test)]
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    async fn post(&self, body: serde_json::Value) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(&self.base_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Provider(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        debug!(status = %status, "completion response received");

        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(Error::Provider(format!("API returned {status}: {body}")))
    }
}

#[async_trait]
impl GenerationProvider for OpenAiClient {
    async fn complete_json(&self, messages: &[ChatMessage]) -> Result<serde_json::Value> {
        let span = start_chat_span(&self.model, "openai");
        async {
            let body = serde_json::json!({
                "model": self.model,
                "messages": messages,
                "response_format": {"type": "json_object"},
            });
            let response = self.post(body).await?;
            let completion: CompletionResponse = response
                .json()
                .await
                .map_err(|e| Error::Provider(format!("failed to parse API response: {e}")))?;
            if let Some(usage) = &completion.usage {
                record_token_usage(
                    &tracing::Span::current(),
                    usage.prompt_tokens,
                    usage.completion_tokens,
                );
            }
            let content = completion
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .ok_or_else(|| Error::Provider("completion had no content".to_string()))?;
            serde_json::from_str(&content)
                .map_err(|e| Error::Provider(format!("completion was not a JSON object: {e}")))
        }
        .instrument(span)
        .await
    }

    async fn stream_chat(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<TokenStream> {
        let span = start_chat_span(&self.model, "openai");
        let response = async {
            let body = serde_json::json!({
                "model": self.model,
                "messages": messages,
                "temperature": temperature,
                "stream": true,
            });
            self.post(body).await
        }
        .instrument(span)
        .await?;

        let stream = response
            .bytes_stream()
            .eventsource()
            .filter_map(|result| async move {
                match result {
                    Ok(event) => {
                        if event.data.trim() == "[DONE]" {
                            return None;
                        }
                        match serde_json::from_str::<StreamChunk>(&event.data) {
                            Ok(chunk) => chunk
                                .choices
                                .into_iter()
                                .next()
                                .and_then(|c| c.delta.content)
                                .filter(|text| !text.is_empty())
                                .map(Ok),
                            Err(e) => Some(Err(Error::Provider(format!(
                                "failed to parse stream chunk: {e}"
                            )))),
                        }
                    }
                    Err(e) => Some(Err(Error::Provider(format!("SSE stream error: {e}")))),
                }
            });

        Ok(Box::pin(stream))
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct TokenUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
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
    content: Option<String>,
}
