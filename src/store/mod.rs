//! Vector store abstraction.
//!
//! The [`VectorStore`] trait defines the collection operations the indexer
//! and retriever need. Two backends are provided:
//!
//! - [`sqlite::SqliteVectorStore`] — persistent, one SQLite file per
//!   deployment, brute-force nearest-neighbour search over stored BLOBs.
//! - [`memory::InMemoryVectorStore`] — `RwLock`-guarded maps, used by tests.
//!
//! A collection is created with a [`DistanceMetric`]; its dimension is fixed
//! by the first vectors added to it.

pub mod memory;
pub mod sqlite;

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::models::{Chunk, RetrievedChunk};

/// Distance function of a collection. Lower is closer for every metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// `1 - cosine_similarity`.
    #[default]
    Cosine,
    /// Squared Euclidean distance.
    L2,
    /// `1 - dot product`.
    Ip,
}

impl DistanceMetric {
    pub fn as_str(self) -> &'static str {
        match self {
            DistanceMetric::Cosine => "cosine",
            DistanceMetric::L2 => "l2",
            DistanceMetric::Ip => "ip",
        }
    }

    pub fn distance(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceMetric::Cosine => 1.0 - crate::embedding::cosine_similarity(a, b),
            DistanceMetric::L2 => a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum(),
            DistanceMetric::Ip => 1.0 - a.iter().zip(b).map(|(x, y)| x * y).sum::<f32>(),
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistanceMetric {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cosine" => Ok(DistanceMetric::Cosine),
            "l2" => Ok(DistanceMetric::L2),
            "ip" => Ok(DistanceMetric::Ip),
            other => bail!("Unknown distance metric: '{}'", other),
        }
    }
}

/// Abstract vector store.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`reset_collection`](VectorStore::reset_collection) | Drop a collection (if any) and create it empty |
/// | [`has_collection`](VectorStore::has_collection) | Whether a collection exists |
/// | [`add`](VectorStore::add) | Insert chunks with their embeddings |
/// | [`query`](VectorStore::query) | Top-K nearest chunks, closest first |
/// | [`count`](VectorStore::count) | Number of chunks in a collection |
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn reset_collection(&self, name: &str, metric: DistanceMetric) -> Result<()>;

    async fn has_collection(&self, name: &str) -> Result<bool>;

    /// Add chunks and their vectors (same length, same order).
    ///
    /// Fails if the collection does not exist or a vector's dimension does
    /// not match the collection's.
    async fn add(&self, name: &str, chunks: &[Chunk], vectors: &[Vec<f32>]) -> Result<()>;

    /// Nearest chunks to `vector`, at most `top_k`, by non-decreasing
    /// distance. A missing collection yields an empty list; a vector whose
    /// dimension differs from the collection's is an error.
    async fn query(&self, name: &str, vector: &[f32], top_k: usize) -> Result<Vec<RetrievedChunk>>;

    async fn count(&self, name: &str) -> Result<usize>;
}

/// Check an `add` batch and return its common dimension.
///
/// `existing` is the collection's dimension, if it already holds vectors.
pub(crate) fn check_batch(
    chunks: &[Chunk],
    vectors: &[Vec<f32>],
    existing: Option<usize>,
) -> Result<Option<usize>> {
    if chunks.len() != vectors.len() {
        bail!(
            "chunk/vector count mismatch: {} chunks, {} vectors",
            chunks.len(),
            vectors.len()
        );
    }
    let mut dims = existing;
    for (chunk, vector) in chunks.iter().zip(vectors) {
        match dims {
            Some(d) if d != vector.len() => bail!(
                "embedding dimension mismatch for {}: expected {}, got {}",
                chunk.id,
                d,
                vector.len()
            ),
            Some(_) => {}
            None => dims = Some(vector.len()),
        }
    }
    Ok(dims)
}

/// Check a query vector against the collection's dimension.
pub(crate) fn check_query(vector: &[f32], dims: Option<usize>) -> Result<()> {
    match dims {
        Some(d) if d != vector.len() => bail!(
            "embedding dimension mismatch for query: expected {}, got {}",
            d,
            vector.len()
        ),
        _ => Ok(()),
    }
}

/// Sort hits by distance and keep the first `top_k`.
///
/// The sort is stable, so equal distances keep insertion order.
pub(crate) fn rank(mut hits: Vec<RetrievedChunk>, top_k: usize) -> Vec<RetrievedChunk> {
    hits.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    hits.truncate(top_k);
    hits
}
