//! SQLite-backed [`VectorStore`] implementation.
//!
//! Collections live in the `collections` table; chunks and their embedding
//! BLOBs in `chunks`, keyed by an autoincrement `seq` that preserves
//! insertion order for tie-breaking. See [`crate::migrate`] for the schema.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::embedding::{blob_to_vec, vec_to_blob};
use crate::models::{Chunk, ChunkMetadata, RetrievedChunk};

use super::{check_batch, check_query, rank, DistanceMetric, VectorStore};

/// SQLite implementation of the [`VectorStore`] trait.
pub struct SqliteVectorStore {
    pool: SqlitePool,
}

impl SqliteVectorStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Metric and dimension of a collection, if it exists.
    async fn collection_info(&self, name: &str) -> Result<Option<(DistanceMetric, Option<usize>)>> {
        let row = sqlx::query("SELECT metric, dims FROM collections WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let metric: String = row.get("metric");
                let dims: Option<i64> = row.get("dims");
                Ok(Some((
                    metric.parse::<DistanceMetric>()?,
                    dims.map(|d| d as usize),
                )))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn reset_collection(&self, name: &str, metric: DistanceMetric) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM chunks WHERE collection = ?")
            .bind(name)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM collections WHERE name = ?")
            .bind(name)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "INSERT INTO collections (name, metric, dims, created_at) VALUES (?, ?, NULL, ?)",
        )
        .bind(name)
        .bind(metric.as_str())
        .bind(chrono::Utc::now().timestamp())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn has_collection(&self, name: &str) -> Result<bool> {
        Ok(self.collection_info(name).await?.is_some())
    }

    async fn add(&self, name: &str, chunks: &[Chunk], vectors: &[Vec<f32>]) -> Result<()> {
        let (_, existing) = self
            .collection_info(name)
            .await?
            .ok_or_else(|| anyhow!("collection not found: {}", name))?;
        let dims = check_batch(chunks, vectors, existing)?;

        let mut tx = self.pool.begin().await?;

        for (chunk, vector) in chunks.iter().zip(vectors) {
            sqlx::query(
                r#"
                INSERT INTO chunks (collection, id, category, filename, chunk_index,
                                    text, hash, embedding)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(name)
            .bind(&chunk.id)
            .bind(chunk.category.label())
            .bind(&chunk.filename)
            .bind(chunk.chunk_index)
            .bind(&chunk.text)
            .bind(&chunk.hash)
            .bind(vec_to_blob(vector))
            .execute(&mut *tx)
            .await?;
        }

        if existing.is_none() {
            if let Some(d) = dims {
                sqlx::query("UPDATE collections SET dims = ? WHERE name = ?")
                    .bind(d as i64)
                    .bind(name)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn query(&self, name: &str, vector: &[f32], top_k: usize) -> Result<Vec<RetrievedChunk>> {
        let metric = match self.collection_info(name).await? {
            Some((metric, dims)) => {
                check_query(vector, dims)?;
                metric
            }
            None => return Ok(Vec::new()),
        };

        let rows = sqlx::query(
            r#"
            SELECT category, filename, chunk_index, text, embedding
            FROM chunks
            WHERE collection = ?
            ORDER BY seq
            "#,
        )
        .bind(name)
        .fetch_all(&self.pool)
        .await?;

        let hits = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                RetrievedChunk {
                    content: row.get("text"),
                    metadata: ChunkMetadata {
                        category: row.get("category"),
                        filename: row.get("filename"),
                        chunk_index: row.get("chunk_index"),
                    },
                    distance: metric.distance(vector, &blob_to_vec(&blob)),
                }
            })
            .collect();

        Ok(rank(hits, top_k))
    }

    async fn count(&self, name: &str) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks WHERE collection = ?")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }
}
