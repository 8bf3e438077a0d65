//! Typed configuration from environment variables.
//!
//! Loaded once at startup. API keys are optional: missing credentials
//! degrade features (local fallback report, zero-vector embeddings) instead
//! of failing fast, matching how the chat engine treats absent providers.
//! Sensitive values are wrapped in secrecy::SecretString to prevent log leaks.

use crate::model::StyleMode;
use secrecy::SecretString;

#[derive(Debug)]
pub struct Config {
    /// Postgres URL for the pgvector chunk store. When unset, the binary
    /// falls back to the in-process store.
    pub database_url: Option<SecretString>,
    /// Generation provider credential. When unset, chat replies short-circuit
    /// to an error frame and persona reports use the local fallback.
    pub openai_api_key: Option<SecretString>,
    /// Embedding provider credential. When unset, embeddings are zero vectors.
    pub jina_api_key: Option<SecretString>,
    pub openai_model: String,
    pub embeddings_model: String,
    pub temperature: f32,
    /// Conversation turns retained per session (entries = 2x this).
    pub memory_turns: usize,
    /// Nearest chunks fetched per retrieval query.
    pub rag_results: usize,
    /// Distance gate: retrieved context is dropped above this.
    pub rag_max_distance: f32,
    pub style_mode: StyleMode,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this. Numeric vars
    /// that fail to parse fall back to their defaults rather than erroring.
    pub fn from_env() -> Self {
        Self {
            database_url: secret_var("DATABASE_URL"),
            openai_api_key: secret_var("OPENAI_API_KEY"),
            jina_api_key: secret_var("JINA_API_KEY"),
            openai_model: string_var("OPENAI_MODEL", "gpt-4o-mini"),
            embeddings_model: string_var("JINA_EMBEDDINGS_MODEL", "jina-embeddings-v2-base-en"),
            temperature: parsed_var("OPENAI_TEMPERATURE", 0.3),
            memory_turns: parsed_var("MEMORY_TURNS", 8),
            rag_results: parsed_var("RAG_RESULTS", 5),
            rag_max_distance: parsed_var("RAG_MAX_DISTANCE", 0.85),
            style_mode: std::env::var("STYLE_MODE")
                .map(|v| StyleMode::parse(&v))
                .unwrap_or_default(),
            otel_endpoint: std::env::var("OTEL_ENDPOINT").ok(),
            log_level: string_var("LOG_LEVEL", "info"),
        }
    }
}

fn secret_var(name: &str) -> Option<SecretString> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(SecretString::from)
}

fn string_var(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parsed_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
