//! # Hybrid Search over Live Services
//!
//! Same flow as `hybrid_search`, against real backends:
//!
//! - embeddings from an OpenAI-compatible API (`OPENAI_API_KEY`, optional
//!   `OPENAI_BASE_URL` and `EMBEDDING_MODEL`/`EMBEDDING_DIMENSIONS` for a
//!   self-hosted model)
//! - Qdrant (`QDRANT_URL`, default `http://localhost:6334`)
//! - Neo4j over HTTP (`NEO4J_URI`, `NEO4J_USER`, `NEO4J_PASSWORD`,
//!   `NEO4J_DATABASE`)
//!
//! The graph database is cleared on start.
//!
//! Run: `cargo run --example hybrid_services --features services`

use std::sync::Arc;

use vecgraph_search::neo4j::Neo4jGraphStore;
use vecgraph_search::openai::OpenAIEmbeddingProvider;
use vecgraph_search::qdrant::QdrantVectorStore;
use vecgraph_search::{Document, GraphStore, HybridConfig, HybridSearch, RelationType};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    vecgraph_telemetry::init_telemetry("hybrid-services-demo")?;

    let mut embedder = OpenAIEmbeddingProvider::from_env()?;
    if let Ok(model) = std::env::var("EMBEDDING_MODEL") {
        embedder = embedder.with_model(model);
    }
    if let Ok(dims) = std::env::var("EMBEDDING_DIMENSIONS") {
        embedder = embedder.with_native_dimensions(dims.parse()?);
    }

    let graph = Arc::new(Neo4jGraphStore::from_env()?);
    graph.clear().await?;

    let search = HybridSearch::builder()
        .config(HybridConfig::default())
        .embedding_provider(Arc::new(embedder))
        .vector_store(Arc::new(QdrantVectorStore::from_env()?))
        .graph_store(graph.clone())
        .build()?;
    search.reset_collection().await?;

    search
        .add_documents(&[
            Document::new("1", "Machine learning is a subset of AI focused on learning from data.")
                .with_name("Introduction to Machine Learning")
                .with_topic("Machine Learning"),
            Document::new("2", "Neural networks are inspired by the human brain's structure.")
                .with_name("Neural Networks Explained")
                .with_topic("Neural Networks"),
            Document::new(
                "3",
                "Deep learning uses multiple layers of neural networks for complex tasks.",
            )
            .with_name("Introduction to Deep Learning")
            .with_topic("Deep Learning"),
        ])
        .await?;
    search.add_topic("AI", Default::default()).await?;
    search.connect_document_to_topic("1", "AI", RelationType::About).await?;

    let results =
        search.search_for_user("John", "How do neural networks work?", Some("Learning")).await?;
    for (i, result) in results.iter().enumerate() {
        println!(
            "{}. [{:.4}] {} topics={:?} related={:?}",
            i + 1,
            result.score,
            result.text,
            result.topics,
            result.related
        );
    }

    let rows = graph
        .run_cypher(
            "MATCH (u:User)-[:SEARCHED]->(q:Query)-[:RETURNED]->(d:Document) \
             RETURN u.name AS user, q.name AS query, collect(d.name) AS documents",
            Default::default(),
        )
        .await?;
    for row in rows {
        let user = row.get("user").and_then(|v| v.as_str()).unwrap_or_default().to_string();
        let documents = row.get("documents").map(|v| v.to_strings()).unwrap_or_default();
        println!("{user} was shown: {}", documents.join(", "));
    }

    Ok(())
}
