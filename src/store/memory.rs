//! In-memory [`VectorStore`] implementation for tests.
//!
//! Uses a `HashMap` of collections behind `std::sync::RwLock`. Query is
//! brute-force over every stored vector.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::models::{Chunk, ChunkMetadata, RetrievedChunk};

use super::{check_batch, check_query, rank, DistanceMetric, VectorStore};

struct StoredChunk {
    chunk: Chunk,
    vector: Vec<f32>,
}

struct Collection {
    metric: DistanceMetric,
    dims: Option<usize>,
    chunks: Vec<StoredChunk>,
}

/// In-memory store for testing.
#[derive(Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Collection>>> {
        self.collections
            .read()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, Collection>>> {
        self.collections
            .write()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn reset_collection(&self, name: &str, metric: DistanceMetric) -> Result<()> {
        self.write()?.insert(
            name.to_string(),
            Collection {
                metric,
                dims: None,
                chunks: Vec::new(),
            },
        );
        Ok(())
    }

    async fn has_collection(&self, name: &str) -> Result<bool> {
        Ok(self.read()?.contains_key(name))
    }

    async fn add(&self, name: &str, chunks: &[Chunk], vectors: &[Vec<f32>]) -> Result<()> {
        let mut collections = self.write()?;
        let collection = collections
            .get_mut(name)
            .ok_or_else(|| anyhow!("collection not found: {}", name))?;

        collection.dims = check_batch(chunks, vectors, collection.dims)?;
        for (chunk, vector) in chunks.iter().zip(vectors) {
            collection.chunks.push(StoredChunk {
                chunk: chunk.clone(),
                vector: vector.clone(),
            });
        }
        Ok(())
    }

    async fn query(&self, name: &str, vector: &[f32], top_k: usize) -> Result<Vec<RetrievedChunk>> {
        let collections = self.read()?;
        let collection = match collections.get(name) {
            Some(c) => c,
            None => return Ok(Vec::new()),
        };
        check_query(vector, collection.dims)?;

        let hits = collection
            .chunks
            .iter()
            .map(|stored| RetrievedChunk {
                content: stored.chunk.text.clone(),
                metadata: ChunkMetadata {
                    category: stored.chunk.category.label().to_string(),
                    filename: stored.chunk.filename.clone(),
                    chunk_index: stored.chunk.chunk_index,
                },
                distance: collection.metric.distance(vector, &stored.vector),
            })
            .collect();

        Ok(rank(hits, top_k))
    }

    async fn count(&self, name: &str) -> Result<usize> {
        Ok(self.read()?.get(name).map_or(0, |c| c.chunks.len()))
    }
}
