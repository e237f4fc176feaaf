//! Graph store trait for typed nodes, typed relationships, and pattern queries.

use async_trait::async_trait;

use crate::error::Result;
use crate::graph::{Node, NodeLabel, Properties, RelationType, Relationship, Row};
use crate::pattern::PatternQuery;

/// A graph database holding typed nodes connected by directed, typed
/// relationships.
///
/// [`execute`](GraphStore::execute) is the primitive hybrid search relies
/// on; the remaining methods are the knowledge-graph operations used while
/// building the corpus and logging searches. Each call is atomic from the
/// caller's point of view.
///
/// # Example
///
/// ```rust,ignore
/// use vecgraph_search::{GraphStore, InMemoryGraphStore, NodeLabel, RelationType};
///
/// let graph = InMemoryGraphStore::new();
/// let doc = graph.create_node(NodeLabel::Document, "Intro", props).await?;
/// let topic = graph.create_node(NodeLabel::Topic, "AI", Default::default()).await?;
/// graph.create_relationship(&doc, RelationType::Covers, &topic, Default::default()).await?;
/// ```
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Run a pattern query and return its rows.
    async fn execute(&self, query: &PatternQuery) -> Result<Vec<Row>>;

    /// Create a node with a fresh id.
    async fn create_node(
        &self,
        label: NodeLabel,
        name: &str,
        properties: Properties,
    ) -> Result<Node>;

    /// Create a relationship `from -[kind]-> to`.
    async fn create_relationship(
        &self,
        from: &Node,
        kind: RelationType,
        to: &Node,
        properties: Properties,
    ) -> Result<Relationship>;

    /// Find the first node with the given label and name.
    async fn find_node(&self, label: NodeLabel, name: &str) -> Result<Option<Node>>;

    /// Find the `Document` node carrying the given document id.
    async fn find_document(&self, document_id: &str) -> Result<Option<Node>>;

    /// Outgoing relationships of `node`, optionally restricted to one type,
    /// paired with the node at the other end.
    async fn related(
        &self,
        node: &Node,
        kind: Option<RelationType>,
    ) -> Result<Vec<(Relationship, Node)>>;

    /// The shortest undirected path from `from` to `to` using at most
    /// `max_depth` relationships, as the list of nodes along it.
    async fn shortest_path(
        &self,
        from: &Node,
        to: &Node,
        max_depth: usize,
    ) -> Result<Option<Vec<Node>>>;

    /// Remove every node and relationship.
    async fn clear(&self) -> Result<()>;
}
