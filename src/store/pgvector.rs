//! Postgres + pgvector backend.

use crate::error::Result;
use crate::store::{NewChunk, ScoredChunk, VectorStore};
use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Vector store over a shared Postgres connection pool.
pub struct PgVectorStore {
    pool: PgPool,
}

impl PgVectorStore {
    /// Connect to Postgres and create a connection pool.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(url)
            .await?;
        Ok(Self { pool })
    }

    /// Create the pgvector extension and chunk table if missing.
    pub async fn ensure_schema(&self, dimension: usize) -> Result<()> {
        sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
            .execute(&self.pool)
            .await?;
        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS transcript_chunks (
                owner_key  TEXT NOT NULL,
                chunk_id   TEXT NOT NULL,
                content    TEXT NOT NULL,
                embedding  vector({dimension}) NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                PRIMARY KEY (owner_key, chunk_id)
            )"
        ))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Simple health check.
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl VectorStore for PgVectorStore {
    async fn add(&self, owner_key: &str, chunks: Vec<NewChunk>) -> Result<()> {
        for chunk in chunks {
            sqlx::query(
                "INSERT INTO transcript_chunks (owner_key, chunk_id, content, embedding)
                 VALUES ($1, $2, $3, $4::vector)
                 ON CONFLICT (owner_key, chunk_id) DO NOTHING",
            )
            .bind(owner_key)
            .bind(&chunk.id)
            .bind(&chunk.text)
            .bind(format_vector(&chunk.embedding))
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    async fn query(
        &self,
        owner_key: &str,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let rows: Vec<ChunkRow> = sqlx::query_as(
            "SELECT chunk_id, content, (embedding <=> $2::vector)::float4 AS distance
             FROM transcript_chunks
             WHERE owner_key = $1
             ORDER BY embedding <=> $2::vector
             LIMIT $3",
        )
        .bind(owner_key)
        .bind(format_vector(embedding))
        .bind(k as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ScoredChunk::from).collect())
    }
}

#[derive(sqlx::FromRow)]
struct ChunkRow {
    chunk_id: String,
    content: String,
    distance: f32,
}

impl From<ChunkRow> for ScoredChunk {
    fn from(row: ChunkRow) -> Self {
        Self {
            id: row.chunk_id,
            text: row.content,
            distance: row.distance,
        }
    }
}

/// Format a f32 slice as a pgvector string literal: `"[0.1,0.2,0.3]"`
fn format_vector(v: &[f32]) -> String {
    let inner: Vec<String> = v.iter().map(|x| x.to_string()).collect();
    format!("[{}]", inner.join(","))
}

#[cfg(test)]
mod tests {
    use super::format_vector;

    #[test]
    fn vector_literal_format() {
        assert_eq!(format_vector(&[0.1, 0.2, 0.3]), "[0.1,0.2,0.3]");
        assert_eq!(format_vector(&[]), "[]");
    }
}
