//! Hybrid search orchestrator.
//!
//! [`HybridSearch`] composes an [`EmbeddingProvider`], a [`VectorStore`] and a
//! [`GraphStore`]. Queries are embedded, matched against the vector index,
//! and every hit is enriched with topics and related documents from the
//! graph. Similarity rank is authoritative: enrichment never reorders hits.
//!
//! # Example
//!
//! ```rust,ignore
//! use vecgraph_search::{HybridConfig, HybridSearch, InMemoryGraphStore, InMemoryVectorStore};
//!
//! let search = HybridSearch::builder()
//!     .config(HybridConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .graph_store(Arc::new(InMemoryGraphStore::new()))
//!     .build()?;
//!
//! search.create_collection().await?;
//! search.add_document(&Document::new("doc1", "Rust is fast").with_topic("Rust")).await?;
//! let results = search.search_with("systems languages", 3, 5).await?;
//! ```

use std::sync::Arc;

use serde_json::{Value, json};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{Instrument, error, info, info_span};

use crate::config::HybridConfig;
use crate::document::{Document, SearchResult, VectorHit, VectorRecord};
use crate::embedding::EmbeddingProvider;
use crate::error::{HybridError, Result};
use crate::graph::{
    CONTENT_PROPERTY, DOCUMENT_ID_PROPERTY, Node, NodeLabel, Properties, RelationType,
};
use crate::graphstore::GraphStore;
use crate::pattern::{DocumentContext, PatternQuery};
use crate::vectorstore::VectorStore;

/// A user interaction with a document, recorded as a graph relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interaction {
    Viewed,
    Bookmarked,
}

impl Interaction {
    pub fn relation_type(&self) -> RelationType {
        match self {
            Interaction::Viewed => RelationType::Viewed,
            Interaction::Bookmarked => RelationType::Bookmarked,
        }
    }
}

/// The hybrid search orchestrator.
///
/// Holds no per-query state; a single instance can serve concurrent
/// searches. Construct one via [`HybridSearch::builder()`].
pub struct HybridSearch {
    config: HybridConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    graph_store: Arc<dyn GraphStore>,
}

impl HybridSearch {
    /// Create a new [`HybridSearchBuilder`].
    pub fn builder() -> HybridSearchBuilder {
        HybridSearchBuilder::default()
    }

    /// Return a reference to the configuration.
    pub fn config(&self) -> &HybridConfig {
        &self.config
    }

    /// Return a reference to the embedding provider.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedding_provider
    }

    /// Return a reference to the vector store.
    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.vector_store
    }

    /// Return a reference to the graph store.
    pub fn graph_store(&self) -> &Arc<dyn GraphStore> {
        &self.graph_store
    }

    /// Create the configured collection with the embedder's dimensionality.
    /// No-op if it already exists.
    pub async fn create_collection(&self) -> Result<()> {
        let name = &self.config.collection;
        let dimensions = self.embedding_provider.dimensions();
        self.vector_store.create_collection(name, dimensions).await.inspect_err(|e| {
            error!(collection = %name, error = %e, "failed to create collection");
        })
    }

    /// Drop the configured collection and create it again, empty.
    pub async fn reset_collection(&self) -> Result<()> {
        let name = &self.config.collection;
        self.vector_store.delete_collection(name).await.inspect_err(|e| {
            error!(collection = %name, error = %e, "failed to delete collection");
        })?;
        self.create_collection().await
    }

    /// Add a document to both stores: embed → upsert → Document node →
    /// topics connected via `COVERS`.
    ///
    /// Adding the same document id again overwrites the vector record and
    /// reuses the existing graph node and topic links.
    ///
    /// # Errors
    ///
    /// Propagates the first embedder, vector index, or graph store failure.
    pub async fn add_document(&self, document: &Document) -> Result<Node> {
        let embedding = self.embed_text(&document.text).await?;
        let record = VectorRecord {
            id: document.id.clone(),
            text: document.text.clone(),
            embedding,
            metadata: document.metadata.clone(),
        };
        self.vector_store.upsert(&self.config.collection, &[record]).await.inspect_err(|e| {
            error!(document.id = %document.id, error = %e, "upsert failed while adding document");
        })?;

        let node = match self.graph_store.find_document(&document.id).await? {
            Some(node) => node,
            None => {
                let mut properties = Properties::new();
                for (key, value) in &document.metadata {
                    properties.insert(key.clone(), Value::String(value.clone()));
                }
                properties.insert(DOCUMENT_ID_PROPERTY.to_string(), json!(document.id));
                properties.insert(CONTENT_PROPERTY.to_string(), json!(document.text));
                self.graph_store
                    .create_node(NodeLabel::Document, &document.display_name(), properties)
                    .await?
            }
        };

        let covered: Vec<String> = self
            .graph_store
            .related(&node, Some(RelationType::Covers))
            .await?
            .into_iter()
            .map(|(_, topic)| topic.id)
            .collect();
        for name in &document.topics {
            let topic = self.add_topic(name, Properties::new()).await?;
            if !covered.contains(&topic.id) {
                self.graph_store
                    .create_relationship(&node, RelationType::Covers, &topic, Properties::new())
                    .await?;
            }
        }

        info!(document.id = %document.id, topic_count = document.topics.len(), "added document");
        Ok(node)
    }

    /// Add several documents in order, stopping at the first failure.
    pub async fn add_documents(&self, documents: &[Document]) -> Result<Vec<Node>> {
        let mut nodes = Vec::with_capacity(documents.len());
        for document in documents {
            nodes.push(self.add_document(document).await?);
        }
        Ok(nodes)
    }

    /// Return the topic named `name`, creating it if it does not exist.
    pub async fn add_topic(&self, name: &str, properties: Properties) -> Result<Node> {
        self.find_or_create(NodeLabel::Topic, name, properties).await
    }

    /// Connect a document to a topic with `kind` (usually `COVERS` or
    /// `ABOUT`). Returns `false` when either end does not exist.
    pub async fn connect_document_to_topic(
        &self,
        document_id: &str,
        topic: &str,
        kind: RelationType,
    ) -> Result<bool> {
        let Some(document) = self.graph_store.find_document(document_id).await? else {
            return Ok(false);
        };
        let Some(topic) = self.graph_store.find_node(NodeLabel::Topic, topic).await? else {
            return Ok(false);
        };
        self.graph_store.create_relationship(&document, kind, &topic, Properties::new()).await?;
        Ok(true)
    }

    /// Vector-only search: embed → nearest neighbours, without graph context.
    ///
    /// # Errors
    ///
    /// Returns [`HybridError::InvalidArgument`] if `top_k == 0`, otherwise
    /// propagates embedder and vector index failures.
    pub async fn semantic_search(&self, query: &str, top_k: usize) -> Result<Vec<VectorHit>> {
        if top_k == 0 {
            return Err(HybridError::InvalidArgument("top_k must be greater than zero".into()));
        }
        let embedding = self.embed_text(query).await?;
        self.nearest(&embedding, top_k).await
    }

    /// Hybrid search using the configured `top_k` and `max_related`.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        self.search_with(query, self.config.top_k, self.config.max_related).await
    }

    /// Hybrid search: embed → nearest `top_k` → graph context per hit.
    ///
    /// Results keep the vector index order. Each carries at most
    /// `max_related` topics and `max_related` related documents, in the order
    /// the graph store produced them. Hits without a `Document` node get an
    /// empty context.
    ///
    /// # Errors
    ///
    /// Returns [`HybridError::InvalidArgument`] if `top_k` or `max_related` is
    /// zero, before contacting any service. Any embedder, vector index, or
    /// graph store failure aborts the search and is returned unchanged; no
    /// partial results are produced.
    #[tracing::instrument(
        name = "hybrid.search",
        skip_all,
        fields(search.id = %uuid::Uuid::new_v4(), top_k = top_k, max_related = max_related)
    )]
    pub async fn search_with(
        &self,
        query: &str,
        top_k: usize,
        max_related: usize,
    ) -> Result<Vec<SearchResult>> {
        if top_k == 0 {
            return Err(HybridError::InvalidArgument("top_k must be greater than zero".into()));
        }
        if max_related == 0 {
            return Err(HybridError::InvalidArgument(
                "max_related must be greater than zero".into(),
            ));
        }

        // 1. Embed the query
        let embedding = self.embed_text(query).await?;

        // 2. Nearest neighbours, in similarity order
        let hits = self.nearest(&embedding, top_k).await?;
        if hits.is_empty() {
            info!(result_count = 0, "hybrid search completed");
            return Ok(Vec::new());
        }

        // 3. Graph context, one lookup per hit
        let contexts = self.enrich(&hits, max_related).await?;

        // 4. Join by rank
        let results: Vec<SearchResult> = hits
            .into_iter()
            .zip(contexts)
            .map(|(hit, context)| SearchResult {
                id: hit.id,
                score: hit.score,
                text: hit.text,
                topics: context.topics,
                related: context.related,
            })
            .collect();

        info!(result_count = results.len(), "hybrid search completed");
        Ok(results)
    }

    /// Run [`search`](HybridSearch::search) on behalf of `user` and log it in
    /// the graph: `(User)-[:SEARCHED]->(Query)`, an optional
    /// `(Query)-[:HAS_INTENT]->(Intent)`, and `(Query)-[:RETURNED]->(Document)`
    /// with `rank` and `score` for every result that has a graph node.
    pub async fn search_for_user(
        &self,
        user: &str,
        query: &str,
        intent: Option<&str>,
    ) -> Result<Vec<SearchResult>> {
        let results = self.search(query).await?;

        let timestamp = chrono::Utc::now().to_rfc3339();
        let user_node = self.find_or_create(NodeLabel::User, user, Properties::new()).await?;
        let query_node = self
            .graph_store
            .create_node(NodeLabel::Query, query, timestamped(&timestamp))
            .await?;
        self.graph_store
            .create_relationship(
                &user_node,
                RelationType::Searched,
                &query_node,
                timestamped(&timestamp),
            )
            .await?;

        if let Some(intent) = intent {
            let intent_node =
                self.find_or_create(NodeLabel::Intent, intent, Properties::new()).await?;
            self.graph_store
                .create_relationship(
                    &query_node,
                    RelationType::HasIntent,
                    &intent_node,
                    Properties::new(),
                )
                .await?;
        }

        for (rank, result) in results.iter().enumerate() {
            let Some(document) = self.graph_store.find_document(&result.id).await? else {
                continue;
            };
            let mut properties = Properties::new();
            properties.insert("rank".to_string(), json!(rank + 1));
            properties.insert("score".to_string(), json!(result.score));
            self.graph_store
                .create_relationship(&query_node, RelationType::Returned, &document, properties)
                .await?;
        }

        info!(user, result_count = results.len(), "logged search");
        Ok(results)
    }

    /// Record that `user` viewed or bookmarked a document. Returns `false`
    /// when the document is not in the graph.
    pub async fn record_interaction(
        &self,
        user: &str,
        document_id: &str,
        interaction: Interaction,
        mut properties: Properties,
    ) -> Result<bool> {
        let Some(document) = self.graph_store.find_document(document_id).await? else {
            return Ok(false);
        };
        let user_node = self.find_or_create(NodeLabel::User, user, Properties::new()).await?;
        properties
            .entry("timestamp")
            .or_insert_with(|| Value::String(chrono::Utc::now().to_rfc3339()));
        self.graph_store
            .create_relationship(&user_node, interaction.relation_type(), &document, properties)
            .await?;
        Ok(true)
    }

    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let embedding = self.embedding_provider.embed(text).await.inspect_err(|e| {
            error!(error = %e, "embedding failed");
        })?;
        let expected = self.embedding_provider.dimensions();
        if embedding.len() != expected {
            error!(expected, actual = embedding.len(), "embedding has unexpected dimensionality");
            return Err(HybridError::DimensionMismatch { expected, actual: embedding.len() });
        }
        Ok(embedding)
    }

    async fn nearest(&self, embedding: &[f32], top_k: usize) -> Result<Vec<VectorHit>> {
        let collection = &self.config.collection;
        let mut hits =
            self.vector_store.search(collection, embedding, top_k).await.inspect_err(|e| {
                error!(collection = %collection, error = %e, "vector search failed");
            })?;
        hits.truncate(top_k);
        Ok(hits)
    }

    /// Fan out one graph lookup per hit and collect the contexts by rank.
    ///
    /// Lookups run on a [`JoinSet`] bounded by `max_concurrency` permits. On
    /// the first failure the set is dropped, which aborts every lookup still
    /// in flight.
    async fn enrich(&self, hits: &[VectorHit], max_related: usize) -> Result<Vec<DocumentContext>> {
        let permit_count = self.config.max_concurrency.clamp(1, Semaphore::MAX_PERMITS);
        let permits = Arc::new(Semaphore::new(permit_count));
        let mut lookups = JoinSet::new();

        for (rank, hit) in hits.iter().enumerate() {
            let graph = Arc::clone(&self.graph_store);
            let permits = Arc::clone(&permits);
            let document_id = hit.id.clone();
            let query =
                PatternQuery::document_context(&hit.id, max_related, self.config.related_via);
            let span = info_span!("hybrid.enrich", document.id = %hit.id, rank);

            lookups.spawn(
                async move {
                    let _permit = permits.acquire_owned().await.map_err(|e| {
                        HybridError::graph_store("lookup pool", format!("permit unavailable: {e}"))
                    })?;
                    let rows = graph.execute(&query).await?;
                    let context = DocumentContext::from_rows(&document_id, &rows, max_related);
                    Ok::<_, HybridError>((rank, context))
                }
                .instrument(span),
            );
        }

        let mut contexts = vec![DocumentContext::default(); hits.len()];
        while let Some(joined) = lookups.join_next().await {
            let (rank, context) = joined
                .map_err(|e| {
                    let message = format!("graph lookup task failed: {e}");
                    HybridError::graph_store("lookup pool", message)
                })
                .and_then(|lookup| lookup)
                .inspect_err(|e| error!(error = %e, "graph enrichment failed"))?;
            contexts[rank] = context;
        }
        Ok(contexts)
    }

    async fn find_or_create(
        &self,
        label: NodeLabel,
        name: &str,
        properties: Properties,
    ) -> Result<Node> {
        if let Some(node) = self.graph_store.find_node(label, name).await? {
            return Ok(node);
        }
        self.graph_store.create_node(label, name, properties).await
    }
}

fn timestamped(timestamp: &str) -> Properties {
    let mut properties = Properties::new();
    properties.insert("timestamp".to_string(), json!(timestamp));
    properties
}

/// Builder for constructing a [`HybridSearch`].
///
/// All fields are required. Call [`build()`](HybridSearchBuilder::build) to
/// validate and produce the orchestrator.
///
/// # Example
///
/// ```rust,ignore
/// let search = HybridSearch::builder()
///     .config(HybridConfig::default())
///     .embedding_provider(Arc::new(embedder))
///     .vector_store(Arc::new(QdrantVectorStore::from_env()?))
///     .graph_store(Arc::new(Neo4jGraphStore::new(Neo4jConfig::from_env()?)?))
///     .build()?;
/// ```
#[derive(Default)]
pub struct HybridSearchBuilder {
    config: Option<HybridConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    graph_store: Option<Arc<dyn GraphStore>>,
}

impl HybridSearchBuilder {
    /// Set the configuration.
    pub fn config(mut self, config: HybridConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector index backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Set the graph store backend.
    pub fn graph_store(mut self, store: Arc<dyn GraphStore>) -> Self {
        self.graph_store = Some(store);
        self
    }

    /// Build the [`HybridSearch`], validating that all fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`HybridError::ConfigError`] if any field is missing.
    pub fn build(self) -> Result<HybridSearch> {
        let config =
            self.config.ok_or_else(|| HybridError::ConfigError("config is required".to_string()))?;
        let embedding_provider = self.embedding_provider.ok_or_else(|| {
            HybridError::ConfigError("embedding_provider is required".to_string())
        })?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| HybridError::ConfigError("vector_store is required".to_string()))?;
        let graph_store = self
            .graph_store
            .ok_or_else(|| HybridError::ConfigError("graph_store is required".to_string()))?;

        Ok(HybridSearch { config, embedding_provider, vector_store, graph_store })
    }
}
