//! # vecgraph-search
//!
//! Hybrid semantic search over a vector index and a knowledge graph.
//!
//! ## Overview
//!
//! A query is embedded, the nearest documents are fetched from a vector
//! index, and each hit is enriched from a graph store with the topics it
//! covers and the documents related to it. Results keep the vector index
//! ranking; the graph only adds context.
//!
//! - [`HybridSearch`] - the orchestrator, built with [`HybridSearch::builder`]
//! - [`EmbeddingProvider`] - text to vector
//! - [`VectorStore`] - nearest-neighbour lookup over embedded documents
//! - [`GraphStore`] - typed nodes, typed relationships, and pattern queries
//!
//! In-memory backends ([`InMemoryVectorStore`], [`InMemoryGraphStore`]) and
//! deterministic embedders ([`MockEmbeddingProvider`],
//! [`StaticEmbeddingProvider`]) need no external services.
//!
//! ## Features
//!
//! | Feature | Backend |
//! |---------|---------|
//! | `openai` | [`OpenAIEmbeddingProvider`](openai::OpenAIEmbeddingProvider) |
//! | `qdrant` | [`QdrantVectorStore`](qdrant::QdrantVectorStore) |
//! | `neo4j` | [`Neo4jGraphStore`](neo4j::Neo4jGraphStore) over the HTTP API |
//! | `full` | all of the above |

pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod graph;
pub mod graphstore;
pub mod hybrid;
pub mod inmemory;
pub mod inmemory_graph;
pub mod mock;
pub mod pattern;
pub mod vectorstore;

#[cfg(feature = "neo4j")]
pub mod neo4j;
#[cfg(feature = "openai")]
pub mod openai;
#[cfg(feature = "qdrant")]
pub mod qdrant;

pub use config::{HybridConfig, HybridConfigBuilder, RelatedVia};
pub use document::{Document, SearchResult, VectorHit, VectorRecord};
pub use embedding::EmbeddingProvider;
pub use error::{HybridError, Result};
pub use graph::{GraphValue, Node, NodeLabel, Properties, RelationType, Relationship, Row};
pub use graphstore::GraphStore;
pub use hybrid::{HybridSearch, HybridSearchBuilder, Interaction};
pub use inmemory::InMemoryVectorStore;
pub use inmemory_graph::InMemoryGraphStore;
pub use mock::{MockEmbeddingProvider, StaticEmbeddingProvider};
pub use pattern::{DocumentContext, PatternQuery};
pub use vectorstore::VectorStore;

#[cfg(feature = "neo4j")]
pub use neo4j::{Neo4jConfig, Neo4jGraphStore};
#[cfg(feature = "openai")]
pub use openai::OpenAIEmbeddingProvider;
#[cfg(feature = "qdrant")]
pub use qdrant::QdrantVectorStore;
