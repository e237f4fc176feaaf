//! In-memory vector store using cosine similarity.
//!
//! This module provides [`InMemoryVectorStore`], a dependency-free stand-in
//! for an external vector index, backed by a `HashMap` protected by a
//! `tokio::sync::RwLock`. It is meant for development, tests, and demos.

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::document::{VectorHit, VectorRecord};
use crate::error::{HybridError, Result};
use crate::vectorstore::VectorStore;

const BACKEND: &str = "InMemory";

#[derive(Debug)]
struct Collection {
    dimensions: usize,
    records: HashMap<String, VectorRecord>,
}

/// An in-memory vector store using cosine similarity for search.
///
/// Collections are stored as collection name → record ID → record. Each
/// collection remembers the dimensionality it was created with and rejects
/// vectors of any other length. Equal scores are ordered by record id so
/// results are deterministic.
///
/// # Example
///
/// ```rust,ignore
/// use vecgraph_search::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection("docs", 384).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records stored in a collection, or `None` if it does not exist.
    pub async fn record_count(&self, collection: &str) -> Option<usize> {
        self.collections.read().await.get(collection).map(|c| c.records.len())
    }
}

fn missing_collection(collection: &str) -> HybridError {
    HybridError::vector_index(BACKEND, format!("collection '{collection}' does not exist"))
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections
            .entry(name.to_string())
            .or_insert_with(|| Collection { dimensions, records: HashMap::new() });
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections.remove(name);
        Ok(())
    }

    async fn upsert(&self, collection: &str, records: &[VectorRecord]) -> Result<()> {
        let mut collections = self.collections.write().await;
        let store = collections.get_mut(collection).ok_or_else(|| missing_collection(collection))?;

        // Validate the whole batch first so a bad record leaves the store untouched.
        if let Some(bad) = records.iter().find(|r| r.embedding.len() != store.dimensions) {
            return Err(HybridError::DimensionMismatch {
                expected: store.dimensions,
                actual: bad.embedding.len(),
            });
        }
        for record in records {
            store.records.insert(record.id.clone(), record.clone());
        }
        debug!(collection, count = records.len(), "upserted records in memory");
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<VectorHit>> {
        let collections = self.collections.read().await;
        let store = collections.get(collection).ok_or_else(|| missing_collection(collection))?;
        if embedding.len() != store.dimensions {
            return Err(HybridError::DimensionMismatch {
                expected: store.dimensions,
                actual: embedding.len(),
            });
        }

        let mut hits: Vec<VectorHit> = store
            .records
            .values()
            .map(|record| VectorHit {
                id: record.id.clone(),
                score: cosine_similarity(&record.embedding, embedding),
                text: record.text.clone(),
                metadata: record.metadata.clone(),
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal).then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(top_k);
        Ok(hits)
    }
}
