//! Jina embeddings client.
//!
//! Keyless operation is deliberate: without a key the client returns
//! all-zero vectors of the right dimension instead of failing, which keeps
//! the indexing path alive while the distance gate filters the results out.

use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;
use crate::telemetry::genai::{record_token_usage, start_embedding_span};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use tracing::{Instrument, debug};

const API_BASE_URL: &str = "https://api.jina.ai/v1/embeddings";

/// Output dimension of the jina-embeddings-v2 family.
pub const EMBEDDING_DIMENSION: usize = 768;

/// Embeddings client. `api_key` being `None` selects keyless mode.
#[derive(Debug, Clone)]
pub struct JinaClient {
    client: reqwest::Client,
    model: String,
    base_url: String,
    api_key: Option<SecretString>,
    dimension: usize,
}

impl JinaClient {
    pub fn new(api_key: Option<SecretString>, model: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| Error::Provider(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            model: model.into(),
            base_url: API_BASE_URL.to_string(),
            api_key,
            dimension: EMBEDDING_DIMENSION,
        })
    }

    /// Overrides the base URL (for testing with wiremock).
    #[cfg(test)]
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }
}

#[async_trait]
impl EmbeddingProvider for JinaClient {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let Some(key) = &self.api_key else {
            debug!(count = texts.len(), "no embedding credentials, returning zero vectors");
            return Ok(vec![vec![0.0; self.dimension]; texts.len()]);
        };

        let span = start_embedding_span(&self.model, "jina");
        async {
            let body = serde_json::json!({
                "input": texts,
                "model": self.model,
            });
            let response = self
                .client
                .post(&self.base_url)
                .bearer_auth(key.expose_secret())
                .json(&body)
                .send()
                .await
                .map_err(|e| Error::Provider(format!("HTTP request failed: {e}")))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(Error::Provider(format!("API returned {status}: {body}")));
            }

            let parsed: EmbeddingResponse = response
                .json()
                .await
                .map_err(|e| Error::Provider(format!("failed to parse API response: {e}")))?;
            if let Some(usage) = &parsed.usage {
                record_token_usage(&tracing::Span::current(), usage.total_tokens, 0);
            }
            if parsed.data.len() != texts.len() {
                return Err(Error::Provider(format!(
                    "expected {} embeddings, got {}",
                    texts.len(),
                    parsed.data.len()
                )));
            }
            Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
        }
        .instrument(span)
        .await
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
    #[serde(default)]
    usage: Option<EmbeddingUsage>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingUsage {
    #[serde(default)]
    total_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn inputs() -> Vec<String> {
        vec!["첫 번째 청크".to_string(), "두 번째 청크".to_string()]
    }

    #[tokio::test]
    async fn embed_parses_vectors_in_order() {
        let server = MockServer::start().await;

        let response_body = serde_json::json!({
            "model": "jina-embeddings-v2-base-en",
            "data": [
                {"index": 0, "embedding": [0.1, 0.2, 0.3]},
                {"index": 1, "embedding": [0.4, 0.5, 0.6]}
            ],
            "usage": {"total_tokens": 12}
        });

        Mock::given(method("POST"))
            .and(path("/"))
            .and(header("authorization", "Bearer jina-test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&response_body))
            .mount(&server)
            .await;

        let client = JinaClient::new(
            Some(SecretString::from("jina-test-key".to_string())),
            "jina-embeddings-v2-base-en",
        )
        .unwrap()
        .with_base_url(server.uri());

        let vectors = client.embed(&inputs()).await.unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0], vec![0.1, 0.2, 0.3]);
        assert_eq!(vectors[1], vec![0.4, 0.5, 0.6]);
    }

    #[tokio::test]
    async fn keyless_mode_returns_zero_vectors() {
        let client = JinaClient::new(None, "jina-embeddings-v2-base-en").unwrap();
        let vectors = client.embed(&inputs()).await.unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0].len(), EMBEDDING_DIMENSION);
        assert!(vectors[0].iter().all(|v| *v == 0.0));
    }

    #[tokio::test]
    async fn embed_surfaces_api_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let client = JinaClient::new(
            Some(SecretString::from("wrong".to_string())),
            "jina-embeddings-v2-base-en",
        )
        .unwrap()
        .with_base_url(server.uri());

        let err = client.embed(&inputs()).await.unwrap_err();
        assert!(err.to_string().contains("401"), "got: {err}");
    }

    #[tokio::test]
    async fn embed_rejects_count_mismatch() {
        let server = MockServer::start().await;

        let response_body = serde_json::json!({
            "data": [{"index": 0, "embedding": [0.1]}]
        });

        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&response_body))
            .mount(&server)
            .await;

        let client = JinaClient::new(
            Some(SecretString::from("jina-test-key".to_string())),
            "jina-embeddings-v2-base-en",
        )
        .unwrap()
        .with_base_url(server.uri());

        assert!(client.embed(&inputs()).await.is_err());
    }

    #[tokio::test]
    async fn embed_of_nothing_is_nothing() {
        let client = JinaClient::new(None, "jina-embeddings-v2-base-en").unwrap();
        assert!(client.embed(&[]).await.unwrap().is_empty());
    }
}
