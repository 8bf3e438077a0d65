//! Retrieval index over transcript chunks.
//!
//! Turns are grouped into overlapping-free windows of five, rendered as
//! `[speaker] text` lines, embedded, and stored per owner key. Queries embed
//! the user message and return the nearest chunks with the minimum distance
//! for the caller's gate.

use crate::error::Result;
use crate::model::Turn;
use crate::providers::EmbeddingProvider;
use crate::store::{NewChunk, ScoredChunk, VectorStore};
use std::sync::Arc;
use tracing::{debug, info};

/// Turns per chunk.
const CHUNK_WINDOW: usize = 5;

/// Result of a similarity query.
#[derive(Debug, Clone)]
pub struct RetrievalHit {
    pub chunks: Vec<ScoredChunk>,
    /// Distance of the best chunk, `None` when nothing matched.
    pub min_distance: Option<f32>,
}

pub struct RetrievalIndex {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl RetrievalIndex {
    pub fn new(store: Arc<dyn VectorStore>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { store, embedder }
    }

    /// Render turns into chunk texts of up to [`CHUNK_WINDOW`] lines.
    pub fn chunk_turns(turns: &[Turn]) -> Vec<String> {
        turns
            .chunks(CHUNK_WINDOW)
            .map(|group| {
                group
                    .iter()
                    .map(|t| format!("[{}] {}", t.speaker, t.text))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .collect()
    }

    /// Embed and store the turns under `owner_key`. Returns the number of
    /// chunks written. An empty turn list writes nothing.
    pub async fn index_turns(&self, owner_key: &str, turns: &[Turn]) -> Result<usize> {
        let texts = Self::chunk_turns(turns);
        if texts.is_empty() {
            return Ok(0);
        }

        let embeddings = self.embedder.embed(&texts).await?;
        let chunks: Vec<NewChunk> = texts
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(i, (text, embedding))| NewChunk {
                id: format!("{owner_key}_{i}"),
                text,
                embedding,
            })
            .collect();

        let count = chunks.len();
        self.store.add(owner_key, chunks).await?;
        info!(owner_key, chunks = count, "indexed transcript chunks");
        Ok(count)
    }

    /// Nearest chunks for a free-text query.
    pub async fn query(&self, owner_key: &str, text: &str, k: usize) -> Result<RetrievalHit> {
        let embeddings = self.embedder.embed(&[text.to_string()]).await?;
        let Some(embedding) = embeddings.first() else {
            return Ok(RetrievalHit {
                chunks: Vec::new(),
                min_distance: None,
            });
        };

        let chunks = self.store.query(owner_key, embedding, k).await?;
        let min_distance = chunks.first().map(|c| c.distance);
        debug!(owner_key, hits = chunks.len(), ?min_distance, "retrieval query");
        Ok(RetrievalHit {
            chunks,
            min_distance,
        })
    }
}
