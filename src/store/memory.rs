//! In-process vector store.
//!
//! Used when no DATABASE_URL is configured and by the tests. Cosine distance
//! over unnormalized vectors; a zero-norm side returns the maximum distance
//! so keyless zero vectors never pass the retrieval gate.

use crate::error::Result;
use crate::store::{NewChunk, ScoredChunk, VectorStore};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct InMemoryStore {
    chunks: Mutex<HashMap<String, Vec<NewChunk>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn add(&self, owner_key: &str, chunks: Vec<NewChunk>) -> Result<()> {
        let mut guard = self.chunks.lock().unwrap_or_else(|e| e.into_inner());
        let existing = guard.entry(owner_key.to_string()).or_default();
        for chunk in chunks {
            if existing.iter().any(|c| c.id == chunk.id) {
                continue;
            }
            existing.push(chunk);
        }
        Ok(())
    }

    async fn query(
        &self,
        owner_key: &str,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let guard = self.chunks.lock().unwrap_or_else(|e| e.into_inner());
        let Some(stored) = guard.get(owner_key) else {
            return Ok(Vec::new());
        };

        let mut scored: Vec<ScoredChunk> = stored
            .iter()
            .map(|chunk| ScoredChunk {
                id: chunk.id.clone(),
                text: chunk.text.clone(),
                distance: cosine_distance(embedding, &chunk.embedding),
            })
            .collect();
        scored.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        scored.truncate(k);
        Ok(scored)
    }
}

/// Cosine distance in [0, 2]. Zero-norm vectors are maximally distant.
fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 1.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, text: &str, embedding: Vec<f32>) -> NewChunk {
        NewChunk {
            id: id.to_string(),
            text: text.to_string(),
            embedding,
        }
    }

    #[tokio::test]
    async fn query_returns_closest_first() {
        let store = InMemoryStore::new();
        store
            .add(
                "job1",
                vec![
                    chunk("job1_0", "far", vec![0.0, 1.0]),
                    chunk("job1_1", "near", vec![1.0, 0.05]),
                ],
            )
            .await
            .unwrap();

        let hits = store.query("job1", &[1.0, 0.0], 2).await.unwrap();
        assert_eq!(hits[0].text, "near");
        assert!(hits[0].distance < hits[1].distance);
    }

    #[tokio::test]
    async fn owners_are_isolated() {
        let store = InMemoryStore::new();
        store
            .add("job1", vec![chunk("job1_0", "mine", vec![1.0, 0.0])])
            .await
            .unwrap();

        let hits = store.query("job2", &[1.0, 0.0], 5).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn duplicate_ids_are_ignored() {
        let store = InMemoryStore::new();
        store
            .add("job1", vec![chunk("job1_0", "first", vec![1.0, 0.0])])
            .await
            .unwrap();
        store
            .add("job1", vec![chunk("job1_0", "second", vec![0.0, 1.0])])
            .await
            .unwrap();

        let hits = store.query("job1", &[1.0, 0.0], 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text, "first");
    }

    #[tokio::test]
    async fn zero_vectors_are_maximally_distant() {
        let store = InMemoryStore::new();
        store
            .add("job1", vec![chunk("job1_0", "zeros", vec![0.0, 0.0])])
            .await
            .unwrap();

        let hits = store.query("job1", &[0.0, 0.0], 1).await.unwrap();
        assert_eq!(hits[0].distance, 1.0);
    }
}
