//! Provider seams for the external language-model services.
//!
//! The core consumes generation and embedding as abstract request/response
//! contracts; the concrete HTTP clients live in [`openai`] and [`jina`].
//! Tests substitute scripted implementations of these traits.

pub mod jina;
pub mod openai;

use crate::error::Result;
use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// Role of a message in an outbound model request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message of an outbound model request (and of conversation memory).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Ordered text fragments from a streaming completion.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// A language-model generation provider.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Single-shot completion constrained to return a JSON object.
    async fn complete_json(&self, messages: &[ChatMessage]) -> Result<serde_json::Value>;

    /// Streaming completion yielding text fragments in order.
    async fn stream_chat(&self, messages: &[ChatMessage], temperature: f32)
    -> Result<TokenStream>;
}

/// An embedding provider: one fixed-length vector per input, in order.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Length of the vectors this provider produces.
    fn dimension(&self) -> usize;
}
