//! Data types for documents, vector records, and search results.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A source document added to the corpus.
///
/// Documents are written once: the embedding of `text` goes to the vector
/// index and a `Document` node goes to the graph store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Document {
    /// Unique identifier shared by the vector record and the graph node.
    pub id: String,
    /// The text content of the document.
    pub text: String,
    /// Display name for the graph node. Defaults to `Document-{id}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Topic labels the document covers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub topics: Vec<String>,
    /// Key-value metadata stored alongside the vector.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Document {
    /// Create a document with the given id and text.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), text: text.into(), ..Default::default() }
    }

    /// Set the display name of the graph node.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Add a topic label.
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topics.push(topic.into());
        self
    }

    /// Add a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// The name used for the document's graph node.
    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| format!("Document-{}", self.id))
    }
}

/// An `(id, vector, metadata)` tuple as stored in a vector index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorRecord {
    /// Document identifier.
    pub id: String,
    /// The document text, kept in the index payload.
    pub text: String,
    /// The embedding of `text`.
    pub embedding: Vec<f32>,
    /// Key-value metadata.
    pub metadata: HashMap<String, String>,
}

/// A nearest-neighbour hit returned by a vector index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorHit {
    /// Document identifier.
    pub id: String,
    /// Similarity score (higher is more similar).
    pub score: f32,
    /// The stored document text.
    pub text: String,
    /// The stored metadata.
    pub metadata: HashMap<String, String>,
}

/// A similarity hit enriched with graph-derived context.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    /// Document identifier.
    pub id: String,
    /// Similarity score from the vector index.
    pub score: f32,
    /// The stored document text.
    pub text: String,
    /// Topic labels connected to the document, in graph order.
    pub topics: Vec<String>,
    /// Identifiers of related documents, in graph order.
    pub related: Vec<String>,
}
