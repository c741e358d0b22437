//! Indexing pipeline: reset the collection, chunk every document, embed all
//! chunks in one batch call, and add them to the store together.
//!
//! The collection always mirrors the most recent document set. There is no
//! incremental update: every call starts from an empty collection.

use anyhow::{bail, Result};
use std::sync::Arc;

use crate::chunk::Chunker;
use crate::embedding::{check_dims, EmbeddingProvider};
use crate::models::DocumentRecord;
use crate::store::{DistanceMetric, VectorStore};

/// Counts reported after indexing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub documents: usize,
    pub chunks: usize,
}

pub struct Indexer {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    chunker: Chunker,
    collection: String,
    metric: DistanceMetric,
}

impl Indexer {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        chunker: Chunker,
        collection: impl Into<String>,
        metric: DistanceMetric,
    ) -> Self {
        Self {
            store,
            embedder,
            chunker,
            collection: collection.into(),
            metric,
        }
    }

    /// Replace the collection's contents with chunks of `documents`.
    pub async fn index_documents(&self, documents: &[DocumentRecord]) -> Result<IndexStats> {
        self.store
            .reset_collection(&self.collection, self.metric)
            .await?;
        tracing::info!(collection = %self.collection, metric = %self.metric, "collection reset");

        let chunks: Vec<_> = documents
            .iter()
            .enumerate()
            .flat_map(|(seq, doc)| self.chunker.chunk_document(seq, doc))
            .collect();

        if chunks.is_empty() {
            tracing::warn!(documents = documents.len(), "no chunks to index");
            return Ok(IndexStats {
                documents: documents.len(),
                chunks: 0,
            });
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed_texts(&texts).await?;
        if vectors.len() != chunks.len() {
            bail!(
                "embedding provider returned {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            );
        }
        check_dims(self.embedder.as_ref(), &vectors)?;

        self.store.add(&self.collection, &chunks, &vectors).await?;

        tracing::info!(
            documents = documents.len(),
            chunks = chunks.len(),
            model = self.embedder.model_name(),
            "documents indexed"
        );

        Ok(IndexStats {
            documents: documents.len(),
            chunks: chunks.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChunkingConfig;
    use crate::models::Category;
    use crate::store::memory::InMemoryVectorStore;
    use async_trait::async_trait;

    /// Claims `dims` but returns vectors of `len`.
    struct FixedLength {
        dims: usize,
        len: usize,
    }

    #[async_trait]
    impl EmbeddingProvider for FixedLength {
        fn model_name(&self) -> &str {
            "fixed"
        }
        fn dims(&self) -> usize {
            self.dims
        }
        async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![0.5; self.len]).collect())
        }
    }

    fn indexer(store: Arc<InMemoryVectorStore>, dims: usize, len: usize) -> Indexer {
        Indexer::new(
            store,
            Arc::new(FixedLength { dims, len }),
            Chunker::new(&ChunkingConfig::default()),
            "claims",
            DistanceMetric::Cosine,
        )
    }

    fn documents() -> Vec<DocumentRecord> {
        vec![DocumentRecord {
            category: Category::Daily,
            filename: "day-41.txt".to_string(),
            text: "Concrete pour postponed after the rebar inspection failed on level 3."
                .to_string(),
        }]
    }

    #[tokio::test]
    async fn indexes_vectors_of_configured_dimension() {
        let store = Arc::new(InMemoryVectorStore::new());
        let stats = indexer(store.clone(), 4, 4)
            .index_documents(&documents())
            .await
            .unwrap();
        assert_eq!(stats, IndexStats { documents: 1, chunks: 1 });
        assert_eq!(store.count("claims").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn rejects_vectors_of_other_dimension() {
        let store = Arc::new(InMemoryVectorStore::new());
        let err = indexer(store.clone(), 1536, 3)
            .index_documents(&documents())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("dimension mismatch"), "{}", err);
        assert_eq!(store.count("claims").await.unwrap(), 0);
    }
}
