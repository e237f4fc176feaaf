//! In-memory graph store.
//!
//! [`InMemoryGraphStore`] keeps nodes and relationships in insertion order
//! behind a `tokio::sync::RwLock` and evaluates [`PatternQuery`]s by walking
//! their hops. Traversal follows relationship insertion order, so query
//! results are deterministic. It stands in for an external graph database in
//! tests and demos.

use std::collections::{HashMap, HashSet, VecDeque};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{HybridError, Result};
use crate::graph::{GraphValue, Node, NodeLabel, Properties, RelationType, Relationship, Row};
use crate::graphstore::GraphStore;
use crate::pattern::{Direction, Expansion, PatternQuery};

#[derive(Debug, Default)]
struct GraphState {
    nodes: Vec<Node>,
    positions: HashMap<String, usize>,
    relationships: Vec<Relationship>,
}

impl GraphState {
    fn node(&self, id: &str) -> Option<&Node> {
        self.positions.get(id).map(|&i| &self.nodes[i])
    }

    /// Nodes reached from `node` over one hop, in relationship order.
    fn step<'a>(
        &'a self,
        node: &Node,
        direction: Direction,
        accepts: impl Fn(RelationType) -> bool,
    ) -> Vec<&'a Node> {
        self.relationships
            .iter()
            .filter(|rel| accepts(rel.kind))
            .filter_map(|rel| match direction {
                Direction::Outgoing => (rel.from == node.id).then_some(&rel.to),
                Direction::Incoming => (rel.to == node.id).then_some(&rel.from),
                Direction::Either if rel.from == node.id => Some(&rel.to),
                Direction::Either if rel.to == node.id => Some(&rel.from),
                Direction::Either => None,
            })
            .filter_map(|id| self.node(id))
            .collect()
    }

    fn expand(&self, anchor: &Node, expansion: &Expansion) -> GraphValue {
        let mut frontier: Vec<&Node> = vec![anchor];
        for hop in &expansion.hops {
            let mut seen: HashSet<String> = HashSet::new();
            frontier = frontier
                .iter()
                .flat_map(|node| self.step(node, hop.direction, |kind| hop.accepts(kind)))
                .filter(|node| seen.insert(node.id.clone()))
                .collect();
        }

        let mut values: Vec<Value> = Vec::new();
        for node in frontier {
            if values.len() >= expansion.limit {
                break;
            }
            let is_anchor = expansion.exclude_anchor && node.id == anchor.id;
            if node.label != expansion.target || is_anchor {
                continue;
            }
            match node.property(&expansion.project) {
                Some(Value::Null) | None => {}
                Some(value) if !values.contains(&value) => values.push(value),
                Some(_) => {}
            }
        }
        GraphValue::List(values.into_iter().map(GraphValue::Scalar).collect())
    }
}

/// An in-memory [`GraphStore`].
///
/// # Example
///
/// ```rust,ignore
/// use vecgraph_search::{GraphStore, InMemoryGraphStore, PatternQuery, RelatedVia};
///
/// let graph = InMemoryGraphStore::new();
/// let query = PatternQuery::document_context("doc1", 5, RelatedVia::Interactions);
/// let rows = graph.execute(&query).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryGraphStore {
    state: RwLock<GraphState>,
}

impl InMemoryGraphStore {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes and relationships currently stored.
    pub async fn counts(&self) -> (usize, usize) {
        let state = self.state.read().await;
        (state.nodes.len(), state.relationships.len())
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn execute(&self, query: &PatternQuery) -> Result<Vec<Row>> {
        query.validate()?;
        let state = self.state.read().await;
        let anchor = &query.anchor;

        let rows: Vec<Row> = state
            .nodes
            .iter()
            .filter(|node| {
                node.label == anchor.label
                    && node.property(&anchor.key).as_ref() == Some(&anchor.value)
            })
            .map(|node| {
                query
                    .expansions
                    .iter()
                    .map(|expansion| (expansion.var.clone(), state.expand(node, expansion)))
                    .collect()
            })
            .collect();

        debug!(anchor = %anchor.value, rows = rows.len(), "executed in-memory pattern query");
        Ok(rows)
    }

    async fn create_node(
        &self,
        label: NodeLabel,
        name: &str,
        properties: Properties,
    ) -> Result<Node> {
        let node = Node::new(label, name, properties);
        let mut state = self.state.write().await;
        let position = state.nodes.len();
        state.positions.insert(node.id.clone(), position);
        state.nodes.push(node.clone());
        Ok(node)
    }

    async fn create_relationship(
        &self,
        from: &Node,
        kind: RelationType,
        to: &Node,
        properties: Properties,
    ) -> Result<Relationship> {
        let mut state = self.state.write().await;
        for endpoint in [from, to] {
            if state.node(&endpoint.id).is_none() {
                return Err(HybridError::QueryError(format!(
                    "node '{}' ({}) does not exist",
                    endpoint.name, endpoint.id
                )));
            }
        }
        let relationship = Relationship::new(from, kind, to, properties);
        state.relationships.push(relationship.clone());
        Ok(relationship)
    }

    async fn find_node(&self, label: NodeLabel, name: &str) -> Result<Option<Node>> {
        let state = self.state.read().await;
        Ok(state.nodes.iter().find(|n| n.label == label && n.name == name).cloned())
    }

    async fn find_document(&self, document_id: &str) -> Result<Option<Node>> {
        let state = self.state.read().await;
        Ok(state
            .nodes
            .iter()
            .find(|n| n.label == NodeLabel::Document && n.document_id() == Some(document_id))
            .cloned())
    }

    async fn related(
        &self,
        node: &Node,
        kind: Option<RelationType>,
    ) -> Result<Vec<(Relationship, Node)>> {
        let state = self.state.read().await;
        Ok(state
            .relationships
            .iter()
            .filter(|rel| rel.from == node.id && kind.is_none_or(|k| k == rel.kind))
            .filter_map(|rel| state.node(&rel.to).map(|to| (rel.clone(), to.clone())))
            .collect())
    }

    async fn shortest_path(
        &self,
        from: &Node,
        to: &Node,
        max_depth: usize,
    ) -> Result<Option<Vec<Node>>> {
        let state = self.state.read().await;
        if state.node(&from.id).is_none() || state.node(&to.id).is_none() {
            return Ok(None);
        }

        // Breadth-first search recording each node's parent and depth.
        let mut parents: HashMap<&str, Option<&str>> = HashMap::from([(from.id.as_str(), None)]);
        let mut queue = VecDeque::from([(from.id.as_str(), 0usize)]);
        while let Some((current, depth)) = queue.pop_front() {
            if current == to.id {
                let mut path = Vec::with_capacity(depth + 1);
                let mut cursor = Some(current);
                while let Some(id) = cursor {
                    if let Some(node) = state.node(id) {
                        path.push(node.clone());
                    }
                    cursor = parents.get(id).copied().flatten();
                }
                path.reverse();
                return Ok(Some(path));
            }
            if depth == max_depth {
                continue;
            }
            let Some(node) = state.node(current) else { continue };
            for next in state.step(node, Direction::Either, |_| true) {
                if !parents.contains_key(next.id.as_str()) {
                    parents.insert(next.id.as_str(), Some(current));
                    queue.push_back((next.id.as_str(), depth + 1));
                }
            }
        }
        Ok(None)
    }

    async fn clear(&self) -> Result<()> {
        let mut state = self.state.write().await;
        *state = GraphState::default();
        debug!("cleared in-memory graph");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::config::RelatedVia;
    use crate::graph::DOCUMENT_ID_PROPERTY;
    use crate::pattern::{Hop, RELATED_VAR, TOPICS_VAR};

    async fn document(graph: &InMemoryGraphStore, id: &str) -> Node {
        let mut props = Properties::new();
        props.insert(DOCUMENT_ID_PROPERTY.to_string(), json!(id));
        graph.create_node(NodeLabel::Document, &format!("Document-{id}"), props).await.unwrap()
    }

    async fn node(graph: &InMemoryGraphStore, label: NodeLabel, name: &str) -> Node {
        graph.create_node(label, name, Properties::new()).await.unwrap()
    }

    async fn link(graph: &InMemoryGraphStore, from: &Node, kind: RelationType, to: &Node) {
        graph.create_relationship(from, kind, to, Properties::new()).await.unwrap();
    }

    #[tokio::test]
    async fn document_context_collects_topics_and_interactions() {
        let graph = InMemoryGraphStore::new();
        let doc1 = document(&graph, "doc1").await;
        let doc2 = document(&graph, "doc2").await;
        let doc3 = document(&graph, "doc3").await;
        let ai = node(&graph, NodeLabel::Topic, "AI").await;
        let ml = node(&graph, NodeLabel::Topic, "ML").await;
        let user = node(&graph, NodeLabel::User, "Alice").await;
        let query = node(&graph, NodeLabel::Query, "what is ai").await;

        link(&graph, &doc1, RelationType::About, &ai).await;
        link(&graph, &doc1, RelationType::Covers, &ml).await;
        link(&graph, &doc1, RelationType::Covers, &ai).await;
        link(&graph, &query, RelationType::Returned, &doc1).await;
        link(&graph, &query, RelationType::Returned, &doc3).await;
        link(&graph, &user, RelationType::Viewed, &doc1).await;
        link(&graph, &user, RelationType::Bookmarked, &doc2).await;

        let rows = graph
            .execute(&PatternQuery::document_context("doc1", 10, RelatedVia::Interactions))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][TOPICS_VAR].to_strings(), ["AI", "ML"]);
        assert_eq!(rows[0][RELATED_VAR].to_strings(), ["doc3", "doc2"]);

        let rows = graph
            .execute(&PatternQuery::document_context("doc1", 1, RelatedVia::Interactions))
            .await
            .unwrap();
        assert_eq!(rows[0][TOPICS_VAR].to_strings(), ["AI"]);
        assert_eq!(rows[0][RELATED_VAR].to_strings(), ["doc3"]);
    }

    #[tokio::test]
    async fn missing_anchor_yields_no_rows() {
        let graph = InMemoryGraphStore::new();
        let rows = graph
            .execute(&PatternQuery::document_context("nope", 3, RelatedVia::SharedTopics))
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn shared_topics_excludes_anchor() {
        let graph = InMemoryGraphStore::new();
        let python = document(&graph, "python").await;
        let data = document(&graph, "data").await;
        let topic = node(&graph, NodeLabel::Topic, "Python").await;
        link(&graph, &python, RelationType::Covers, &topic).await;
        link(&graph, &data, RelationType::Covers, &topic).await;

        let rows = graph
            .execute(&PatternQuery::document_context("python", 5, RelatedVia::SharedTopics))
            .await
            .unwrap();
        assert_eq!(rows[0][RELATED_VAR].to_strings(), ["data"]);
    }

    #[tokio::test]
    async fn either_direction_hop_matches_both_ends() {
        let graph = InMemoryGraphStore::new();
        let doc = document(&graph, "doc").await;
        let topic = node(&graph, NodeLabel::Topic, "AI").await;
        link(&graph, &doc, RelationType::Covers, &topic).await;

        let query = PatternQuery::anchored(NodeLabel::Topic, "name", "AI").expand(Expansion {
            var: "docs".to_string(),
            hops: vec![Hop { types: vec![], direction: Direction::Either }],
            target: NodeLabel::Document,
            project: DOCUMENT_ID_PROPERTY.to_string(),
            exclude_anchor: false,
            limit: 5,
        });
        let rows = graph.execute(&query).await.unwrap();
        assert_eq!(rows[0]["docs"].to_strings(), ["doc"]);
    }

    #[tokio::test]
    async fn relationships_require_existing_nodes() {
        let graph = InMemoryGraphStore::new();
        let stored = node(&graph, NodeLabel::User, "John").await;
        let dangling = Node::new(NodeLabel::Query, "never stored", Properties::new());
        let err = graph
            .create_relationship(&stored, RelationType::Searched, &dangling, Properties::new())
            .await
            .unwrap_err();
        assert!(matches!(err, HybridError::QueryError(_)));
    }

    #[tokio::test]
    async fn related_and_shortest_path() {
        let graph = InMemoryGraphStore::new();
        let user = node(&graph, NodeLabel::User, "John").await;
        let query = node(&graph, NodeLabel::Query, "How do neural networks work?").await;
        let topic = node(&graph, NodeLabel::Topic, "Neural Networks").await;
        let doc = document(&graph, "nn").await;
        link(&graph, &user, RelationType::Searched, &query).await;
        link(&graph, &query, RelationType::About, &topic).await;
        link(&graph, &doc, RelationType::Covers, &topic).await;

        let related = graph.related(&query, None).await.unwrap();
        assert_eq!(related.len(), 1);
        assert_eq!(related[0].1.name, "Neural Networks");
        assert!(graph.related(&query, Some(RelationType::Returned)).await.unwrap().is_empty());

        let path = graph.shortest_path(&user, &doc, 3).await.unwrap().unwrap();
        let names: Vec<&str> = path.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(
            names,
            ["John", "How do neural networks work?", "Neural Networks", "Document-nn"]
        );
        assert!(graph.shortest_path(&user, &doc, 2).await.unwrap().is_none());

        graph.clear().await.unwrap();
        assert_eq!(graph.counts().await, (0, 0));
        assert!(graph.find_node(NodeLabel::User, "John").await.unwrap().is_none());
    }
}
