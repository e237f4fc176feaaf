//! Vector index trait for storing and searching document embeddings.

use async_trait::async_trait;

use crate::document::{VectorHit, VectorRecord};
use crate::error::Result;

/// A vector index with nearest-neighbour search.
///
/// Implementations manage named collections of [`VectorRecord`]s. All
/// vectors in a collection share the dimensionality the collection was
/// created with; a mismatched vector is reported as
/// [`HybridError::DimensionMismatch`](crate::HybridError::DimensionMismatch)
/// where the backend can detect it.
///
/// # Example
///
/// ```rust,ignore
/// use vecgraph_search::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection("docs", 384).await?;
/// store.upsert("docs", &records).await?;
/// let hits = store.search("docs", &query_embedding, 5).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create a named collection. No-op if it already exists.
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()>;

    /// Delete a named collection and all its data.
    async fn delete_collection(&self, name: &str) -> Result<()>;

    /// Upsert records into a collection. A record whose id already exists
    /// replaces the stored one.
    async fn upsert(&self, collection: &str, records: &[VectorRecord]) -> Result<()>;

    /// Search for the `top_k` most similar records to the given embedding.
    ///
    /// Returns at most `top_k` hits ordered by descending similarity score.
    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<VectorHit>>;
}
