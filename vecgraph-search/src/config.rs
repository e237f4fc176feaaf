//! Configuration for hybrid search.

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::error::{HybridError, Result};

/// How related documents are discovered for a search hit.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RelatedVia {
    /// Documents that were returned, viewed, or bookmarked from the same
    /// user or query node as the hit.
    #[default]
    Interactions,
    /// Documents covering at least one of the topics the hit covers.
    SharedTopics,
}

/// Configuration parameters for [`HybridSearch`](crate::HybridSearch).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HybridConfig {
    /// Name of the vector index collection holding document embeddings.
    pub collection: String,
    /// Number of nearest neighbours retrieved by [`search`](crate::HybridSearch::search).
    pub top_k: usize,
    /// Maximum number of topics and related documents attached to each result.
    pub max_related: usize,
    /// Maximum number of graph lookups in flight for a single search.
    pub max_concurrency: usize,
    /// Strategy used to find related documents.
    pub related_via: RelatedVia,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            collection: "hybrid_search".to_string(),
            top_k: 3,
            max_related: 5,
            max_concurrency: 8,
            related_via: RelatedVia::default(),
        }
    }
}

impl HybridConfig {
    /// Create a new builder for constructing a [`HybridConfig`].
    pub fn builder() -> HybridConfigBuilder {
        HybridConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`HybridConfig`].
#[derive(Debug, Clone, Default)]
pub struct HybridConfigBuilder {
    config: HybridConfig,
}

impl HybridConfigBuilder {
    /// Set the vector collection name.
    pub fn collection(mut self, name: impl Into<String>) -> Self {
        self.config.collection = name.into();
        self
    }

    /// Set the default number of nearest neighbours to retrieve.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the default cap on topics and related documents per result.
    pub fn max_related(mut self, m: usize) -> Self {
        self.config.max_related = m;
        self
    }

    /// Set how many graph lookups may run concurrently.
    pub fn max_concurrency(mut self, permits: usize) -> Self {
        self.config.max_concurrency = permits;
        self
    }

    /// Set the related-document strategy.
    pub fn related_via(mut self, related_via: RelatedVia) -> Self {
        self.config.related_via = related_via;
        self
    }

    /// Build the [`HybridConfig`], validating that parameters are usable.
    ///
    /// # Errors
    ///
    /// Returns [`HybridError::ConfigError`] if:
    /// - `collection` is empty
    /// - `top_k == 0`
    /// - `max_related == 0`
    /// - `max_concurrency == 0` or above [`Semaphore::MAX_PERMITS`]
    pub fn build(self) -> Result<HybridConfig> {
        if self.config.collection.trim().is_empty() {
            return Err(HybridError::ConfigError("collection must not be empty".to_string()));
        }
        if self.config.top_k == 0 {
            return Err(HybridError::ConfigError("top_k must be greater than zero".to_string()));
        }
        if self.config.max_related == 0 {
            return Err(HybridError::ConfigError(
                "max_related must be greater than zero".to_string(),
            ));
        }
        if self.config.max_concurrency == 0 {
            return Err(HybridError::ConfigError(
                "max_concurrency must be greater than zero".to_string(),
            ));
        }
        if self.config.max_concurrency > Semaphore::MAX_PERMITS {
            return Err(HybridError::ConfigError(format!(
                "max_concurrency must be at most {}",
                Semaphore::MAX_PERMITS
            )));
        }
        Ok(self.config)
    }
}
