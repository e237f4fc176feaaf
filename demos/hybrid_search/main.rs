//! # Hybrid Search Example
//!
//! Indexes a small AI corpus into an in-memory vector store and knowledge
//! graph, logs a few user searches, then shows how graph context grows as
//! the graph learns which documents are returned and viewed together.
//!
//! Uses the deterministic `MockEmbeddingProvider`, so it runs with **zero
//! API keys** and no external services. Scores are therefore not
//! semantically meaningful.
//!
//! Run: `cargo run --example hybrid_search`

use std::sync::Arc;

use vecgraph_search::{
    Document, HybridConfig, HybridSearch, InMemoryGraphStore, InMemoryVectorStore, Interaction,
    MockEmbeddingProvider, Properties, RelatedVia, RelationType, SearchResult,
};

const CORPUS: [(&str, &str, &[&str]); 10] = [
    ("0", "Artificial intelligence is revolutionizing various industries.", &["AI"]),
    (
        "1",
        "Machine learning is a subset of AI focused on learning from data.",
        &["AI", "Machine Learning"],
    ),
    ("2", "Neural networks are inspired by the human brain's structure.", &["Neural Networks"]),
    (
        "3",
        "Deep learning uses multiple layers of neural networks for complex tasks.",
        &["Deep Learning", "Neural Networks"],
    ),
    ("4", "Natural Language Processing helps computers understand human language.", &["NLP"]),
    (
        "5",
        "Computer vision enables machines to interpret visual information.",
        &["Computer Vision"],
    ),
    (
        "6",
        "Reinforcement learning involves agents learning through trial and error.",
        &["Machine Learning"],
    ),
    (
        "7",
        "Data preprocessing is a crucial step in any machine learning pipeline.",
        &["Data", "Machine Learning"],
    ),
    ("8", "Feature engineering transforms raw data into useful model inputs.", &["Data"]),
    ("9", "Model evaluation metrics help assess AI system performance.", &["AI"]),
];

fn print_results(results: &[SearchResult]) {
    if results.is_empty() {
        println!("  (no results)");
    }
    for (i, result) in results.iter().enumerate() {
        println!("  {}. [score={:.4}] doc={} | {}", i + 1, result.score, result.id, result.text);
        if !result.topics.is_empty() {
            println!("     topics:  {}", result.topics.join(", "));
        }
        if !result.related.is_empty() {
            println!("     related: {}", result.related.join(", "));
        }
    }
}

fn build(related_via: RelatedVia) -> anyhow::Result<HybridSearch> {
    let config = HybridConfig::builder()
        .collection("hybrid_search")
        .top_k(3)
        .max_related(3)
        .related_via(related_via)
        .build()?;

    Ok(HybridSearch::builder()
        .config(config)
        .embedding_provider(Arc::new(MockEmbeddingProvider::new(64)))
        .vector_store(Arc::new(InMemoryVectorStore::new()))
        .graph_store(Arc::new(InMemoryGraphStore::new()))
        .build()?)
}

async fn index_corpus(search: &HybridSearch) -> anyhow::Result<()> {
    search.create_collection().await?;
    for (id, text, topics) in CORPUS {
        let document = topics
            .iter()
            .fold(Document::new(id, text).with_metadata("source", "sample"), |doc, topic| {
                doc.with_topic(*topic)
            });
        search.add_document(&document).await?;
    }
    println!("Indexed {} documents", CORPUS.len());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    vecgraph_telemetry::init_telemetry("hybrid-search-demo").ok();

    // -- 1. Related documents through shared topics ------------------------
    let search = build(RelatedVia::SharedTopics)?;
    index_corpus(&search).await?;

    // Tag one document with an extra topic after the fact.
    search.add_topic("Foundations", Properties::new()).await?;
    search.connect_document_to_topic("0", "Foundations", RelationType::About).await?;

    for query in ["How do neural networks learn?", "preparing data for models"] {
        println!("\nQuery: \"{query}\"");
        print_results(&search.search(query).await?);
    }

    // -- 2. Related documents through user behaviour -----------------------
    let search = build(RelatedVia::Interactions)?;
    index_corpus(&search).await?;

    let query = "What is machine learning?";
    println!("\nQuery: \"{query}\" (before any interactions)");
    print_results(&search.search(query).await?);

    let logged = search.search_for_user("John", query, Some("Learning")).await?;
    if let Some(top) = logged.first() {
        search.record_interaction("John", &top.id, Interaction::Viewed, Properties::new()).await?;
    }
    search.record_interaction("John", "8", Interaction::Bookmarked, Properties::new()).await?;

    println!("\nQuery: \"{query}\" (after John searched, viewed and bookmarked)");
    print_results(&search.search(query).await?);

    println!("\nDone.");
    Ok(())
}
