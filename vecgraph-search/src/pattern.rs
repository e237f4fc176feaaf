//! Parameterized graph pattern queries.
//!
//! A [`PatternQuery`] anchors on a single node (matched by label and one
//! property) and expands along chains of typed relationships. Each
//! [`Expansion`] binds an output variable to the distinct values of one
//! property of the nodes it reaches, in traversal order, truncated to a
//! limit. Executing a query yields one [`Row`](crate::graph::Row) per anchor
//! match and no rows when the anchor does not exist.
//!
//! The same query can be evaluated directly by an in-process store or
//! rendered to Cypher with [`PatternQuery::to_cypher`].

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::warn;

use crate::config::RelatedVia;
use crate::error::{HybridError, Result};
use crate::graph::{DOCUMENT_ID_PROPERTY, NodeLabel, Properties, RelationType, Row};

/// Output variable holding topic names in a document context query.
pub const TOPICS_VAR: &str = "topics";

/// Output variable holding related document ids in a document context query.
pub const RELATED_VAR: &str = "related";

const INTERACTIONS: [RelationType; 3] =
    [RelationType::Returned, RelationType::Viewed, RelationType::Bookmarked];

/// Direction of a hop relative to the node it starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// `(a)-[r]->(b)`
    Outgoing,
    /// `(a)<-[r]-(b)`
    Incoming,
    /// `(a)-[r]-(b)`
    Either,
}

/// One relationship step in an expansion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hop {
    /// Accepted relationship types. Empty accepts any type.
    pub types: Vec<RelationType>,
    pub direction: Direction,
}

impl Hop {
    pub fn outgoing(types: &[RelationType]) -> Self {
        Self { types: types.to_vec(), direction: Direction::Outgoing }
    }

    pub fn incoming(types: &[RelationType]) -> Self {
        Self { types: types.to_vec(), direction: Direction::Incoming }
    }

    /// Whether a relationship of `kind` satisfies this hop.
    pub fn accepts(&self, kind: RelationType) -> bool {
        self.types.is_empty() || self.types.contains(&kind)
    }

    fn to_cypher(&self) -> String {
        let types = if self.types.is_empty() {
            String::new()
        } else {
            let names: Vec<&str> = self.types.iter().map(RelationType::as_str).collect();
            format!(":{}", names.join("|"))
        };
        match self.direction {
            Direction::Outgoing => format!("-[{types}]->"),
            Direction::Incoming => format!("<-[{types}]-"),
            Direction::Either => format!("-[{types}]-"),
        }
    }
}

/// The node a pattern query starts from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub label: NodeLabel,
    /// Property compared against `value`.
    pub key: String,
    pub value: Value,
}

/// A chain of hops whose end nodes are projected into one output variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expansion {
    /// Output variable name.
    pub var: String,
    pub hops: Vec<Hop>,
    /// Label the final node must carry.
    pub target: NodeLabel,
    /// Property of the final node to project.
    pub project: String,
    /// Drop the anchor node itself from the results.
    pub exclude_anchor: bool,
    /// Maximum number of distinct values kept.
    pub limit: usize,
}

/// A parameterized pattern query. See the module docs for semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternQuery {
    pub anchor: Anchor,
    pub expansions: Vec<Expansion>,
}

/// A Cypher statement with its bound parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct CypherQuery {
    pub statement: String,
    pub parameters: Properties,
}

impl PatternQuery {
    /// Start a query anchored on the node with `label` whose `key` property
    /// equals `value`.
    pub fn anchored(label: NodeLabel, key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self { anchor: Anchor { label, key: key.into(), value: value.into() }, expansions: vec![] }
    }

    /// Add an expansion.
    pub fn expand(mut self, expansion: Expansion) -> Self {
        self.expansions.push(expansion);
        self
    }

    /// The query used to enrich a search hit: topics the document is about or
    /// covers, and related documents found according to `related_via`, each
    /// capped at `limit`.
    pub fn document_context(document_id: &str, limit: usize, related_via: RelatedVia) -> Self {
        let topic_hop = Hop::outgoing(&[RelationType::About, RelationType::Covers]);
        let related_hops = match related_via {
            RelatedVia::Interactions => {
                vec![Hop::incoming(&INTERACTIONS), Hop::outgoing(&INTERACTIONS)]
            }
            RelatedVia::SharedTopics => {
                vec![Hop::outgoing(&[RelationType::Covers]), Hop::incoming(&[RelationType::Covers])]
            }
        };

        Self::anchored(NodeLabel::Document, DOCUMENT_ID_PROPERTY, document_id)
            .expand(Expansion {
                var: TOPICS_VAR.to_string(),
                hops: vec![topic_hop],
                target: NodeLabel::Topic,
                project: "name".to_string(),
                exclude_anchor: false,
                limit,
            })
            .expand(Expansion {
                var: RELATED_VAR.to_string(),
                hops: related_hops,
                target: NodeLabel::Document,
                project: DOCUMENT_ID_PROPERTY.to_string(),
                exclude_anchor: true,
                limit,
            })
    }

    /// Check that the query can be executed.
    ///
    /// # Errors
    ///
    /// Returns [`HybridError::QueryError`] for an expansion without hops, an
    /// empty or non-identifier variable/property name, or a duplicate
    /// variable.
    pub fn validate(&self) -> Result<()> {
        if !is_identifier(&self.anchor.key) {
            return Err(HybridError::QueryError(format!(
                "invalid anchor property '{}'",
                self.anchor.key
            )));
        }
        for (i, expansion) in self.expansions.iter().enumerate() {
            if expansion.hops.is_empty() {
                return Err(HybridError::QueryError(format!(
                    "expansion '{}' has no hops",
                    expansion.var
                )));
            }
            if !is_identifier(&expansion.var) || !is_identifier(&expansion.project) {
                return Err(HybridError::QueryError(format!(
                    "invalid variable or property in expansion '{}'",
                    expansion.var
                )));
            }
            if self.expansions[..i].iter().any(|e| e.var == expansion.var) {
                return Err(HybridError::QueryError(format!(
                    "duplicate variable '{}'",
                    expansion.var
                )));
            }
        }
        Ok(())
    }

    /// Render the query as Cypher.
    ///
    /// Labels, relationship types and property names come from typed values
    /// and validated identifiers; the anchor value and the limits are passed
    /// as parameters (`$anchor`, `$limit_0`, `$limit_1`, ...).
    ///
    /// ```text
    /// MATCH (anchor:Document {doc_id: $anchor})
    /// OPTIONAL MATCH (anchor)-[:ABOUT|COVERS]->(n0:Topic)
    /// WITH anchor, collect(DISTINCT n0.name)[..$limit_0] AS topics
    /// ...
    /// RETURN topics, related
    /// ```
    pub fn to_cypher(&self) -> Result<CypherQuery> {
        self.validate()?;

        let mut parameters = Properties::new();
        parameters.insert("anchor".to_string(), self.anchor.value.clone());

        let mut lines = vec![format!(
            "MATCH (anchor:{} {{{}: $anchor}})",
            self.anchor.label, self.anchor.key
        )];
        let mut carried = vec!["anchor".to_string()];

        for (i, expansion) in self.expansions.iter().enumerate() {
            let node = format!("n{i}");
            let mut pattern = String::from("(anchor)");
            for (h, hop) in expansion.hops.iter().enumerate() {
                pattern.push_str(&hop.to_cypher());
                if h + 1 == expansion.hops.len() {
                    pattern.push_str(&format!("({node}:{})", expansion.target));
                } else {
                    pattern.push_str("()");
                }
            }
            lines.push(format!("OPTIONAL MATCH {pattern}"));
            if expansion.exclude_anchor {
                lines.push(format!("WHERE {node} <> anchor"));
            }

            let limit_param = format!("limit_{i}");
            parameters.insert(limit_param.clone(), json!(expansion.limit));
            lines.push(format!(
                "WITH {}, collect(DISTINCT {node}.{})[..${limit_param}] AS {}",
                carried.join(", "),
                expansion.project,
                expansion.var
            ));
            carried.push(expansion.var.clone());
        }

        let returned: Vec<&str> = self.expansions.iter().map(|e| e.var.as_str()).collect();
        if returned.is_empty() {
            lines.push("RETURN anchor".to_string());
        } else {
            lines.push(format!("RETURN {}", returned.join(", ")));
        }

        Ok(CypherQuery { statement: lines.join("\n"), parameters })
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Graph context attached to one search hit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentContext {
    pub topics: Vec<String>,
    pub related: Vec<String>,
}

impl DocumentContext {
    /// Build the context for `document_id` from the rows of a
    /// [`PatternQuery::document_context`] query.
    ///
    /// No rows means the document is not in the graph and yields an empty
    /// context. Several rows mean the id matched more than one `Document`
    /// node; the first row is used. Both lists are cut to `limit` entries
    /// whatever the store returned.
    pub fn from_rows(document_id: &str, rows: &[Row], limit: usize) -> Self {
        let Some(row) = rows.first() else {
            return Self::default();
        };
        if rows.len() > 1 {
            warn!(
                document.id = document_id,
                matches = rows.len(),
                "document id matched several graph nodes, using the first"
            );
        }
        let column = |var: &str| {
            let mut values = row.get(var).map(|v| v.to_strings()).unwrap_or_default();
            values.truncate(limit);
            values
        };
        Self { topics: column(TOPICS_VAR), related: column(RELATED_VAR) }
    }
}
