//! Nearest-neighbour retrieval over the indexed collection.

use anyhow::Result;
use std::sync::Arc;

use crate::config::Config;
use crate::embedding::{check_dims, create_provider, EmbeddingProvider};
use crate::models::RetrievedChunk;
use crate::store::sqlite::SqliteVectorStore;
use crate::store::VectorStore;
use crate::{db, migrate};

pub struct Retriever {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    collection: String,
    top_k: usize,
}

impl Retriever {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        collection: impl Into<String>,
        top_k: usize,
    ) -> Self {
        Self {
            store,
            embedder,
            collection: collection.into(),
            top_k,
        }
    }

    /// Retrieve with the configured `top_k`.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedChunk>> {
        self.retrieve_k(query, self.top_k).await
    }

    /// Top-`k` chunks closest to `query`, closest first.
    ///
    /// Returns an empty list without embedding the query when the
    /// collection has not been created yet.
    pub async fn retrieve_k(&self, query: &str, k: usize) -> Result<Vec<RetrievedChunk>> {
        if !self.store.has_collection(&self.collection).await? {
            tracing::debug!(collection = %self.collection, "no collection, nothing to retrieve");
            return Ok(Vec::new());
        }

        let vector = self.embedder.embed_query(query).await?;
        check_dims(self.embedder.as_ref(), std::slice::from_ref(&vector))?;
        self.store.query(&self.collection, &vector, k).await
    }
}

/// `cadv search`: query the persisted collection and print the hits.
pub async fn run_search(config: &Config, query: &str, top_k: Option<usize>) -> Result<()> {
    if query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }

    migrate::run_migrations(config).await?;
    let pool = db::connect(config).await?;
    let store = SqliteVectorStore::new(pool.clone());

    if !store.has_collection(&config.db.collection).await? {
        println!("No results.");
        pool.close().await;
        return Ok(());
    }

    let retriever = Retriever::new(
        Arc::new(store),
        Arc::from(create_provider(config)?),
        config.db.collection.clone(),
        config.retrieval.top_k,
    );

    let k = top_k.unwrap_or(config.retrieval.top_k).max(1);
    let results = retriever.retrieve_k(query, k).await?;

    if results.is_empty() {
        println!("No results.");
    }

    for (i, hit) in results.iter().enumerate() {
        println!(
            "{}. [{:.4}] {} / {}",
            i + 1,
            hit.distance,
            hit.metadata.category,
            hit.metadata.filename
        );
        println!("    chunk: {}", hit.metadata.chunk_index);
        let excerpt: String = hit.content.chars().take(240).collect();
        println!("    excerpt: \"{}\"", excerpt.replace('\n', " ").trim());
        println!();
    }

    pool.close().await;
    Ok(())
}
