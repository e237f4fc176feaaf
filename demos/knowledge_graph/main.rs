//! # Knowledge Graph Example
//!
//! Builds the search knowledge graph by hand (users, queries, intents,
//! topics, documents) and answers a few questions with the `GraphStore`
//! primitives: pattern queries, neighbour lookups and shortest paths.
//!
//! Run: `cargo run --example knowledge_graph`

use serde_json::json;
use vecgraph_search::graph::DOCUMENT_ID_PROPERTY;
use vecgraph_search::pattern::{Expansion, Hop};
use vecgraph_search::{
    GraphStore, InMemoryGraphStore, Node, NodeLabel, PatternQuery, Properties, RelationType,
};

fn props(value: serde_json::Value) -> Properties {
    match value {
        serde_json::Value::Object(map) => map,
        _ => Properties::new(),
    }
}

async fn link(
    graph: &InMemoryGraphStore,
    from: &Node,
    kind: RelationType,
    to: &Node,
    properties: serde_json::Value,
) -> anyhow::Result<()> {
    graph.create_relationship(from, kind, to, props(properties)).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    vecgraph_telemetry::init_telemetry("knowledge-graph-demo").ok();

    let graph = InMemoryGraphStore::new();
    graph.clear().await?;

    // -- 1. Entities --------------------------------------------------------
    let john = graph
        .create_node(
            NodeLabel::User,
            "John",
            props(json!({"age": 28, "occupation": "Software Engineer"})),
        )
        .await?;
    let alice = graph
        .create_node(
            NodeLabel::User,
            "Alice",
            props(json!({"age": 35, "occupation": "Data Scientist"})),
        )
        .await?;

    let ml_doc = graph
        .create_node(
            NodeLabel::Document,
            "Introduction to Machine Learning",
            props(json!({
                DOCUMENT_ID_PROPERTY: "1",
                "content": "Machine learning is a subset of AI focused on learning from data."
            })),
        )
        .await?;
    let nn_doc = graph
        .create_node(
            NodeLabel::Document,
            "Neural Networks Explained",
            props(json!({
                DOCUMENT_ID_PROPERTY: "2",
                "content": "Neural networks are inspired by the human brain's structure."
            })),
        )
        .await?;
    let dl_doc = graph
        .create_node(
            NodeLabel::Document,
            "Introduction to Deep Learning",
            props(json!({
                DOCUMENT_ID_PROPERTY: "3",
                "content":
                    "Deep learning uses multiple layers of neural networks for complex tasks."
            })),
        )
        .await?;

    let ml = graph.create_node(NodeLabel::Topic, "Machine Learning", Properties::new()).await?;
    let nn = graph.create_node(NodeLabel::Topic, "Neural Networks", Properties::new()).await?;
    let dl = graph.create_node(NodeLabel::Topic, "Deep Learning", Properties::new()).await?;

    let learning = graph
        .create_node(
            NodeLabel::Intent,
            "Learning",
            props(json!({"description": "User wants to learn about a topic"})),
        )
        .await?;
    let comparison = graph
        .create_node(
            NodeLabel::Intent,
            "Comparison",
            props(json!({"description": "User wants to compare concepts"})),
        )
        .await?;

    let q1 = graph
        .create_node(
            NodeLabel::Query,
            "How do neural networks work?",
            props(json!({"timestamp": "2023-06-01T10:30:00"})),
        )
        .await?;
    let q2 = graph
        .create_node(
            NodeLabel::Query,
            "Difference between ML and deep learning?",
            props(json!({"timestamp": "2023-06-02T14:45:00"})),
        )
        .await?;

    // -- 2. Relationships ---------------------------------------------------
    let searched_at = |ts: &str| json!({ "timestamp": ts });
    link(&graph, &john, RelationType::Searched, &q1, searched_at("2023-06-01T10:30:00")).await?;
    link(&graph, &alice, RelationType::Searched, &q2, searched_at("2023-06-02T14:45:00")).await?;
    link(&graph, &q1, RelationType::HasIntent, &learning, json!({})).await?;
    link(&graph, &q2, RelationType::HasIntent, &comparison, json!({})).await?;
    link(&graph, &q1, RelationType::About, &nn, json!({})).await?;
    link(&graph, &q2, RelationType::About, &ml, json!({})).await?;
    link(&graph, &q2, RelationType::About, &dl, json!({})).await?;
    link(&graph, &ml_doc, RelationType::Covers, &ml, json!({})).await?;
    link(&graph, &nn_doc, RelationType::Covers, &nn, json!({})).await?;
    link(&graph, &dl_doc, RelationType::Covers, &dl, json!({})).await?;
    link(&graph, &dl_doc, RelationType::References, &nn, json!({})).await?;
    link(&graph, &q1, RelationType::Returned, &nn_doc, json!({"rank": 1, "score": 0.92})).await?;
    link(&graph, &q1, RelationType::Returned, &dl_doc, json!({"rank": 2, "score": 0.78})).await?;
    link(&graph, &q2, RelationType::Returned, &ml_doc, json!({"rank": 1, "score": 0.85})).await?;
    link(&graph, &q2, RelationType::Returned, &dl_doc, json!({"rank": 2, "score": 0.82})).await?;
    link(&graph, &john, RelationType::Viewed, &nn_doc, json!({"duration": 120})).await?;
    link(&graph, &alice, RelationType::Viewed, &ml_doc, json!({"duration": 90})).await?;
    link(&graph, &alice, RelationType::Bookmarked, &dl_doc, json!({})).await?;

    let (nodes, relationships) = graph.counts().await;
    println!("Knowledge graph created: {nodes} nodes, {relationships} relationships");

    // -- 3. Documents covering or referencing a topic ----------------------
    let about_nn =
        PatternQuery::anchored(NodeLabel::Topic, "name", "Neural Networks").expand(Expansion {
            var: "documents".to_string(),
            hops: vec![Hop::incoming(&[RelationType::Covers, RelationType::References])],
            target: NodeLabel::Document,
            project: "name".to_string(),
            exclude_anchor: false,
            limit: 10,
        });
    for row in graph.execute(&about_nn).await? {
        let documents = row.get("documents").map(|v| v.to_strings()).unwrap_or_default();
        println!("\nDocuments about Neural Networks: {}", documents.join(", "));
    }

    // -- 4. Topics a query was about ----------------------------------------
    let topics: Vec<String> = graph
        .related(&q2, Some(RelationType::About))
        .await?
        .into_iter()
        .map(|(_, topic)| topic.name)
        .collect();
    println!("Query '{}' is about: {}", q2.name, topics.join(", "));

    // -- 5. Documents returned for the 'Learning' intent --------------------
    println!("\nDocuments returned for 'Learning' intent:");
    for (returned, document) in graph.related(&q1, Some(RelationType::Returned)).await? {
        let score = returned.properties.get("score").cloned().unwrap_or_default();
        println!("- '{}' -> '{}' (score: {score})", q1.name, document.name);
    }

    // -- 6. User interests --------------------------------------------------
    println!("\nUser interests based on search queries:");
    for user in [&john, &alice] {
        let mut interests = Vec::new();
        for (_, query) in graph.related(user, Some(RelationType::Searched)).await? {
            for (_, topic) in graph.related(&query, Some(RelationType::About)).await? {
                if !interests.contains(&topic.name) {
                    interests.push(topic.name);
                }
            }
        }
        println!("- {} is interested in: {}", user.name, interests.join(", "));
    }

    // -- 7. Shortest path ---------------------------------------------------
    match graph.shortest_path(&john, &dl_doc, 3).await? {
        Some(path) => {
            let names: Vec<&str> = path.iter().map(|n| n.name.as_str()).collect();
            println!("\nPath from John to '{}': {}", dl_doc.name, names.join(" -> "));
        }
        None => println!("\nNo path from John to '{}' within 3 hops", dl_doc.name),
    }

    Ok(())
}
