//! Counting and failing wrappers around the in-memory backends.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use vecgraph_search::pattern::PatternQuery;
use vecgraph_search::{
    EmbeddingProvider, GraphStore, HybridConfig, HybridError, HybridSearch, InMemoryGraphStore,
    InMemoryVectorStore, Node, NodeLabel, Properties, RelationType, Relationship, Result, Row,
    StaticEmbeddingProvider, VectorHit, VectorRecord, VectorStore,
};

pub struct CountingEmbedder {
    inner: StaticEmbeddingProvider,
    pub calls: AtomicUsize,
}

#[async_trait]
impl EmbeddingProvider for CountingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.embed(text).await
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }
}

#[derive(Default)]
pub struct CountingVectorStore {
    pub inner: InMemoryVectorStore,
    pub searches: AtomicUsize,
    pub fail_search: AtomicBool,
}

#[async_trait]
impl VectorStore for CountingVectorStore {
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        self.inner.create_collection(name, dimensions).await
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        self.inner.delete_collection(name).await
    }

    async fn upsert(&self, collection: &str, records: &[VectorRecord]) -> Result<()> {
        self.inner.upsert(collection, records).await
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<VectorHit>> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        if self.fail_search.load(Ordering::SeqCst) {
            return Err(HybridError::VectorIndexUnavailable {
                backend: "counting".into(),
                message: "connection refused".into(),
            });
        }
        self.inner.search(collection, embedding, top_k).await
    }
}

/// Counts `execute` calls. Lookups for documents listed in `delays` sleep
/// first, and lookups for `failing` documents return an error.
#[derive(Default)]
pub struct CountingGraphStore {
    pub inner: InMemoryGraphStore,
    pub executes: AtomicUsize,
    pub delays: HashMap<String, Duration>,
    pub failing: Option<String>,
}

impl CountingGraphStore {
    fn anchor_id(query: &PatternQuery) -> String {
        query.anchor.value.as_str().unwrap_or_default().to_string()
    }
}

#[async_trait]
impl GraphStore for CountingGraphStore {
    async fn execute(&self, query: &PatternQuery) -> Result<Vec<Row>> {
        self.executes.fetch_add(1, Ordering::SeqCst);
        let id = Self::anchor_id(query);
        if let Some(delay) = self.delays.get(&id) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing.as_deref() == Some(id.as_str()) {
            return Err(HybridError::GraphStoreUnavailable {
                backend: "counting".into(),
                message: "session expired".into(),
            });
        }
        self.inner.execute(query).await
    }

    async fn create_node(
        &self,
        label: NodeLabel,
        name: &str,
        properties: Properties,
    ) -> Result<Node> {
        self.inner.create_node(label, name, properties).await
    }

    async fn create_relationship(
        &self,
        from: &Node,
        kind: RelationType,
        to: &Node,
        properties: Properties,
    ) -> Result<Relationship> {
        self.inner.create_relationship(from, kind, to, properties).await
    }

    async fn find_node(&self, label: NodeLabel, name: &str) -> Result<Option<Node>> {
        self.inner.find_node(label, name).await
    }

    async fn find_document(&self, document_id: &str) -> Result<Option<Node>> {
        self.inner.find_document(document_id).await
    }

    async fn related(
        &self,
        node: &Node,
        kind: Option<RelationType>,
    ) -> Result<Vec<(Relationship, Node)>> {
        self.inner.related(node, kind).await
    }

    async fn shortest_path(
        &self,
        from: &Node,
        to: &Node,
        max_depth: usize,
    ) -> Result<Option<Vec<Node>>> {
        self.inner.shortest_path(from, to, max_depth).await
    }

    async fn clear(&self) -> Result<()> {
        self.inner.clear().await
    }
}

pub struct Fixture {
    pub search: HybridSearch,
    pub embedder: Arc<CountingEmbedder>,
    pub vectors: Arc<CountingVectorStore>,
    pub graph: Arc<CountingGraphStore>,
}

impl Fixture {
    pub fn new(embedder: StaticEmbeddingProvider, config: HybridConfig) -> Self {
        Self::with_graph(embedder, config, CountingGraphStore::default())
    }

    pub fn with_graph(
        embedder: StaticEmbeddingProvider,
        config: HybridConfig,
        graph: CountingGraphStore,
    ) -> Self {
        let embedder = Arc::new(CountingEmbedder { inner: embedder, calls: AtomicUsize::new(0) });
        let vectors = Arc::new(CountingVectorStore::default());
        let graph = Arc::new(graph);
        let search = HybridSearch::builder()
            .config(config)
            .embedding_provider(embedder.clone())
            .vector_store(vectors.clone())
            .graph_store(graph.clone())
            .build()
            .unwrap();
        Self { search, embedder, vectors, graph }
    }

    pub fn embed_calls(&self) -> usize {
        self.embedder.calls.load(Ordering::SeqCst)
    }

    pub fn vector_searches(&self) -> usize {
        self.vectors.searches.load(Ordering::SeqCst)
    }

    pub fn graph_executes(&self) -> usize {
        self.graph.executes.load(Ordering::SeqCst)
    }
}

/// Two-dimensional embeddings where "query" is closest to doc1, then doc2,
/// then doc3.
pub fn corpus_embedder() -> StaticEmbeddingProvider {
    StaticEmbeddingProvider::new(2)
        .with("query", vec![1.0, 0.1])
        .with("Graph databases store relationships", vec![1.0, 0.0])
        .with("Vector search finds similar text", vec![0.7, 0.7])
        .with("Slow cooking recipes", vec![0.0, 1.0])
}
