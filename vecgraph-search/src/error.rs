//! Error types for the `vecgraph-search` crate.

use thiserror::Error;

/// Errors that can occur in hybrid search operations.
///
/// Every leaf failure (embedder, vector index, graph store) is surfaced to the
/// caller with its kind intact. Nothing in this crate retries.
#[derive(Debug, Error)]
pub enum HybridError {
    /// The embedding model was unreachable or failed to produce a vector.
    #[error("Embedding unavailable ({provider}): {message}")]
    EmbeddingUnavailable {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The vector index was unreachable or rejected the request.
    #[error("Vector index unavailable ({backend}): {message}")]
    VectorIndexUnavailable {
        /// The vector index backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// A vector did not match the dimensionality of its collection.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// The dimensionality the collection was created with.
        expected: usize,
        /// The length of the offending vector.
        actual: usize,
    },

    /// The graph store was unreachable or failed to execute a request.
    #[error("Graph store unavailable ({backend}): {message}")]
    GraphStoreUnavailable {
        /// The graph store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// A pattern query was malformed or rejected by the graph store.
    #[error("Graph query error: {0}")]
    QueryError(String),

    /// The caller supplied an invalid argument (for example `top_k == 0`).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl HybridError {
    pub(crate) fn vector_index(backend: &str, message: impl Into<String>) -> Self {
        Self::VectorIndexUnavailable { backend: backend.to_string(), message: message.into() }
    }

    pub(crate) fn graph_store(backend: &str, message: impl Into<String>) -> Self {
        Self::GraphStoreUnavailable { backend: backend.to_string(), message: message.into() }
    }
}

/// A convenience result type for hybrid search operations.
pub type Result<T> = std::result::Result<T, HybridError>;
