//! Neo4j graph store backend.
//!
//! Provides [`Neo4jGraphStore`] which implements [`GraphStore`] against the
//! Neo4j HTTP transactional endpoint (`POST /db/{database}/tx/commit`) using
//! `reqwest`. Every call is a single auto-committed transaction.
//!
//! Nodes are identified by a `uuid` property assigned on creation. Labels and
//! relationship types are rendered from typed enums; all values travel as
//! query parameters.
//!
//! This module is only available when the `neo4j` feature is enabled.
//!
//! # Example
//!
//! ```rust,ignore
//! use vecgraph_search::neo4j::{Neo4jConfig, Neo4jGraphStore};
//!
//! let config = Neo4jConfig::new("http://localhost:7474", "neo4j", "password");
//! let graph = Neo4jGraphStore::new(config)?;
//! let rows = graph.run_cypher("MATCH (t:Topic) RETURN t.name AS name", Default::default()).await?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, error};

use crate::error::{HybridError, Result};
use crate::graph::{
    DOCUMENT_ID_PROPERTY, GraphValue, Node, NodeLabel, Properties, RelationType, Relationship, Row,
};
use crate::graphstore::GraphStore;
use crate::pattern::PatternQuery;

const BACKEND: &str = "neo4j";

/// Cypher map projection used to return nodes as plain JSON.
fn node_projection(var: &str) -> String {
    format!(
        "{{id: {var}.uuid, label: labels({var})[0], \
         name: {var}.name, properties: properties({var})}}"
    )
}

/// Connection settings for a Neo4j server.
#[derive(Debug, Clone, PartialEq)]
pub struct Neo4jConfig {
    /// HTTP base URI, e.g. `http://localhost:7474`.
    pub uri: String,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl Neo4jConfig {
    /// Settings for the default `neo4j` database.
    pub fn new(
        uri: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            uri: uri.into().trim_end_matches('/').to_string(),
            user: user.into(),
            password: password.into(),
            database: "neo4j".to_string(),
        }
    }

    /// Use another database.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Read `NEO4J_URI` (default `http://localhost:7474`), `NEO4J_USER`
    /// (default `neo4j`), `NEO4J_PASSWORD` (required) and `NEO4J_DATABASE`
    /// (default `neo4j`).
    pub fn from_env() -> Result<Self> {
        let uri = std::env::var("NEO4J_URI").unwrap_or_else(|_| "http://localhost:7474".into());
        let user = std::env::var("NEO4J_USER").unwrap_or_else(|_| "neo4j".into());
        let password = std::env::var("NEO4J_PASSWORD").map_err(|_| {
            HybridError::ConfigError("NEO4J_PASSWORD environment variable not set".into())
        })?;
        let config = Self::new(uri, user, password);
        Ok(match std::env::var("NEO4J_DATABASE") {
            Ok(database) => config.with_database(database),
            Err(_) => config,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/db/{}/tx/commit", self.uri, self.database)
    }
}

/// A [`GraphStore`] backed by [Neo4j](https://neo4j.com/).
pub struct Neo4jGraphStore {
    client: reqwest::Client,
    config: Neo4jConfig,
}

impl Neo4jGraphStore {
    /// Create a store for the given connection settings. No request is sent
    /// until the first query.
    pub fn new(config: Neo4jConfig) -> Result<Self> {
        if config.uri.is_empty() {
            return Err(HybridError::ConfigError("Neo4j URI must not be empty".into()));
        }
        Ok(Self { client: reqwest::Client::new(), config })
    }

    /// Create a store from the environment. See [`Neo4jConfig::from_env`].
    pub fn from_env() -> Result<Self> {
        Self::new(Neo4jConfig::from_env()?)
    }

    /// Run an arbitrary Cypher statement and return its rows.
    pub async fn run_cypher(&self, statement: &str, parameters: Properties) -> Result<Vec<Row>> {
        let records = self.run(statement, &parameters).await?;
        Ok(records
            .into_iter()
            .map(|record| record.into_iter().map(|(k, v)| (k, GraphValue::from(v))).collect())
            .collect())
    }

    async fn run(&self, statement: &str, parameters: &Properties) -> Result<Vec<Record>> {
        let body = TxRequest { statements: [Statement { statement, parameters }] };

        let response = self
            .client
            .post(self.config.endpoint())
            .basic_auth(&self.config.user, Some(&self.config.password))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(backend = BACKEND, error = %e, "request failed");
                HybridError::graph_store(BACKEND, format!("request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            error!(backend = BACKEND, %status, "HTTP error");
            return Err(HybridError::graph_store(BACKEND, format!("HTTP {status}: {detail}")));
        }

        let tx: TxResponse = response.json().await.map_err(|e| {
            error!(backend = BACKEND, error = %e, "failed to parse response");
            HybridError::graph_store(BACKEND, format!("failed to parse response: {e}"))
        })?;

        let records = records_from_response(tx)?;
        debug!(backend = BACKEND, rows = records.len(), "cypher statement completed");
        Ok(records)
    }

    async fn query_nodes(&self, statement: &str, parameters: Properties) -> Result<Vec<Node>> {
        self.run(statement, &parameters)
            .await?
            .iter()
            .filter_map(|record| record.get("node"))
            .map(node_from_value)
            .collect()
    }
}

#[derive(Serialize)]
struct TxRequest<'a> {
    statements: [Statement<'a>; 1],
}

#[derive(Serialize)]
struct Statement<'a> {
    statement: &'a str,
    parameters: &'a Properties,
}

#[derive(Debug, Deserialize)]
struct TxResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    #[serde(default)]
    errors: Vec<TxError>,
}

#[derive(Debug, Deserialize)]
struct StatementResult {
    columns: Vec<String>,
    #[serde(default)]
    data: Vec<RowData>,
}

#[derive(Debug, Deserialize)]
struct RowData {
    row: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct TxError {
    code: String,
    message: String,
}

type Record = serde_json::Map<String, Value>;

fn records_from_response(tx: TxResponse) -> Result<Vec<Record>> {
    if let Some(err) = tx.errors.into_iter().next() {
        error!(backend = BACKEND, code = %err.code, "statement failed");
        // Syntax, semantic, and constraint errors are the caller's fault;
        // everything else (auth, transient, database) means the store is unusable.
        return Err(if err.code.starts_with("Neo.ClientError.Statement")
            || err.code.starts_with("Neo.ClientError.Schema")
        {
            HybridError::QueryError(format!("{}: {}", err.code, err.message))
        } else {
            HybridError::graph_store(BACKEND, format!("{}: {}", err.code, err.message))
        });
    }

    let Some(result) = tx.results.into_iter().next() else {
        return Ok(Vec::new());
    };
    Ok(result
        .data
        .into_iter()
        .map(|data| result.columns.iter().cloned().zip(data.row).collect())
        .collect())
}

fn node_from_value(value: &Value) -> Result<Node> {
    let field = |key: &str| value.get(key).and_then(Value::as_str);
    let label = field("label")
        .and_then(NodeLabel::parse)
        .ok_or_else(|| HybridError::QueryError(format!("node has no known label: {value}")))?;
    let mut properties = value
        .get("properties")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    properties.remove("uuid");
    properties.remove("name");

    Ok(Node {
        id: field("id").unwrap_or_default().to_string(),
        label,
        name: field("name").unwrap_or_default().to_string(),
        properties,
    })
}

fn params(entries: impl IntoIterator<Item = (&'static str, Value)>) -> Properties {
    entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

#[async_trait]
impl GraphStore for Neo4jGraphStore {
    async fn execute(&self, query: &PatternQuery) -> Result<Vec<Row>> {
        let cypher = query.to_cypher()?;
        self.run_cypher(&cypher.statement, cypher.parameters).await
    }

    async fn create_node(
        &self,
        label: NodeLabel,
        name: &str,
        properties: Properties,
    ) -> Result<Node> {
        let node = Node::new(label, name, properties);
        let mut props = node.properties.clone();
        props.insert("name".to_string(), json!(node.name));
        props.insert("uuid".to_string(), json!(node.id));

        let statement = format!("CREATE (e:{label} $props) RETURN e.uuid AS id");
        let created = self.run(&statement, &params([("props", Value::Object(props))])).await?;
        if created.is_empty() {
            return Err(HybridError::QueryError(format!("failed to create {label} '{name}'")));
        }
        Ok(node)
    }

    async fn create_relationship(
        &self,
        from: &Node,
        kind: RelationType,
        to: &Node,
        properties: Properties,
    ) -> Result<Relationship> {
        let relationship = Relationship::new(from, kind, to, properties);
        let mut props = relationship.properties.clone();
        props.insert("uuid".to_string(), json!(relationship.id));

        let statement = format!(
            "MATCH (a {{uuid: $from}}), (b {{uuid: $to}}) \
             CREATE (a)-[r:{kind} $props]->(b) RETURN r.uuid AS id"
        );
        let created = self
            .run(
                &statement,
                &params([
                    ("from", json!(from.id)),
                    ("to", json!(to.id)),
                    ("props", Value::Object(props)),
                ]),
            )
            .await?;
        if created.is_empty() {
            return Err(HybridError::QueryError(format!(
                "cannot connect '{}' to '{}': node does not exist",
                from.name, to.name
            )));
        }
        Ok(relationship)
    }

    async fn find_node(&self, label: NodeLabel, name: &str) -> Result<Option<Node>> {
        let statement = format!(
            "MATCH (e:{label} {{name: $name}}) RETURN {} AS node LIMIT 1",
            node_projection("e")
        );
        let nodes = self.query_nodes(&statement, params([("name", json!(name))])).await?;
        Ok(nodes.into_iter().next())
    }

    async fn find_document(&self, document_id: &str) -> Result<Option<Node>> {
        let statement = format!(
            "MATCH (e:Document {{{DOCUMENT_ID_PROPERTY}: $doc_id}}) RETURN {} AS node LIMIT 1",
            node_projection("e")
        );
        let nodes = self.query_nodes(&statement, params([("doc_id", json!(document_id))])).await?;
        Ok(nodes.into_iter().next())
    }

    async fn related(
        &self,
        node: &Node,
        kind: Option<RelationType>,
    ) -> Result<Vec<(Relationship, Node)>> {
        let rel = kind.map(|k| format!("r:{k}")).unwrap_or_else(|| "r".to_string());
        let statement = format!(
            "MATCH (a {{uuid: $id}})-[{rel}]->(b) \
             RETURN r.uuid AS id, type(r) AS kind, properties(r) AS properties, {} AS node",
            node_projection("b")
        );
        let records = self.run(&statement, &params([("id", json!(node.id))])).await?;

        let mut related = Vec::with_capacity(records.len());
        for record in &records {
            let Some(other) = record.get("node") else { continue };
            let other = node_from_value(other)?;
            let kind = record.get("kind").and_then(Value::as_str).and_then(RelationType::parse);
            let Some(kind) = kind else {
                // Relationship types outside the hybrid search schema.
                continue;
            };
            let mut properties =
                record.get("properties").and_then(Value::as_object).cloned().unwrap_or_default();
            properties.remove("uuid");
            let relationship = Relationship {
                id: record.get("id").and_then(Value::as_str).unwrap_or_default().to_string(),
                kind,
                from: node.id.clone(),
                to: other.id.clone(),
                properties,
            };
            related.push((relationship, other));
        }
        Ok(related)
    }

    async fn shortest_path(
        &self,
        from: &Node,
        to: &Node,
        max_depth: usize,
    ) -> Result<Option<Vec<Node>>> {
        if from.id == to.id {
            return Ok(Some(vec![from.clone()]));
        }
        if max_depth == 0 {
            return Ok(None);
        }
        let statement = format!(
            "MATCH (a {{uuid: $from}}), (b {{uuid: $to}}) \
             MATCH path = shortestPath((a)-[*..{max_depth}]-(b)) \
             RETURN [n IN nodes(path) | {}] AS nodes",
            node_projection("n")
        );
        let records = self
            .run(&statement, &params([("from", json!(from.id)), ("to", json!(to.id))]))
            .await?;

        let Some(nodes) = records.first().and_then(|r| r.get("nodes")).and_then(Value::as_array)
        else {
            return Ok(None);
        };
        nodes.iter().map(node_from_value).collect::<Result<Vec<_>>>().map(Some)
    }

    async fn clear(&self) -> Result<()> {
        self.run("MATCH (n) DETACH DELETE n", &Properties::new()).await?;
        debug!(backend = BACKEND, "cleared graph");
        Ok(())
    }
}
