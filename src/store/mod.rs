//! Vector storage behind a trait seam.
//!
//! [`pgvector::PgVectorStore`] is the production backend; [`memory`] holds an
//! in-process store for keyless runs and tests. Distances are cosine in both.

pub mod memory;
pub mod pgvector;

use crate::error::Result;
use async_trait::async_trait;

/// A chunk ready for insertion.
#[derive(Debug, Clone)]
pub struct NewChunk {
    pub id: String,
    pub text: String,
    pub embedding: Vec<f32>,
}

/// A chunk returned from a similarity query.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub id: String,
    pub text: String,
    /// Cosine distance to the query vector, lower is closer.
    pub distance: f32,
}

/// Keyed vector storage. `owner_key` partitions chunks per transcript so
/// queries never mix speakers.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert chunks under an owner key. Re-inserting an existing id is a
    /// no-op, not an error.
    async fn add(&self, owner_key: &str, chunks: Vec<NewChunk>) -> Result<()>;

    /// Nearest chunks for the owner, closest first.
    async fn query(&self, owner_key: &str, embedding: &[f32], k: usize)
    -> Result<Vec<ScoredChunk>>;
}
