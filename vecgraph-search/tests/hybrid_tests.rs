//! Hybrid search against in-memory backends wrapped in counting fakes.

mod common;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use common::{CountingGraphStore, Fixture, corpus_embedder};
use serde_json::json;
use vecgraph_search::{
    Document, GraphStore, HybridConfig, HybridError, Interaction, NodeLabel, Properties,
    RelatedVia, RelationType, StaticEmbeddingProvider, VectorRecord, VectorStore,
};

const DOC1: &str = "Graph databases store relationships";
const DOC2: &str = "Vector search finds similar text";
const DOC3: &str = "Slow cooking recipes";

fn config() -> HybridConfig {
    HybridConfig::builder().collection("docs").top_k(3).max_related(5).build().unwrap()
}

async fn two_documents(fixture: &Fixture) {
    fixture.search.create_collection().await.unwrap();
    fixture.search.add_document(&Document::new("doc1", DOC1)).await.unwrap();
    fixture.search.add_document(&Document::new("doc2", DOC2)).await.unwrap();
}

#[tokio::test]
async fn topic_about_first_hit_only() {
    let fixture = Fixture::new(corpus_embedder(), config());
    two_documents(&fixture).await;
    fixture.search.add_topic("AI", Properties::new()).await.unwrap();
    assert!(
        fixture
            .search
            .connect_document_to_topic("doc1", "AI", RelationType::About)
            .await
            .unwrap()
    );

    let results = fixture.search.search_with("query", 2, 5).await.unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].id, "doc1");
    assert_eq!(results[0].topics, ["AI"]);
    assert!(results[0].related.is_empty());
    assert_eq!(results[1].id, "doc2");
    assert!(results[1].topics.is_empty());
    assert!(results[1].related.is_empty());
    assert!(results[0].score >= results[1].score);
    assert_eq!(results[0].text, DOC1);
    assert_eq!(fixture.graph_executes(), 2);
}

#[tokio::test]
async fn empty_index_issues_no_graph_queries() {
    let fixture = Fixture::new(corpus_embedder(), config());
    fixture.search.create_collection().await.unwrap();

    let results = fixture.search.search("query").await.unwrap();

    assert!(results.is_empty());
    assert_eq!(fixture.embed_calls(), 1);
    assert_eq!(fixture.vector_searches(), 1);
    assert_eq!(fixture.graph_executes(), 0);
}

#[tokio::test]
async fn zero_limits_are_rejected_before_any_call() {
    let fixture = Fixture::new(corpus_embedder(), config());
    two_documents(&fixture).await;
    let embeds_before = fixture.embed_calls();

    let err = fixture.search.search_with("query", 0, 5).await.unwrap_err();
    assert!(matches!(err, HybridError::InvalidArgument(_)));
    let err = fixture.search.search_with("query", 3, 0).await.unwrap_err();
    assert!(matches!(err, HybridError::InvalidArgument(_)));
    let err = fixture.search.semantic_search("query", 0).await.unwrap_err();
    assert!(matches!(err, HybridError::InvalidArgument(_)));

    assert_eq!(fixture.embed_calls(), embeds_before);
    assert_eq!(fixture.vector_searches(), 0);
    assert_eq!(fixture.graph_executes(), 0);
}

#[tokio::test]
async fn ids_missing_from_graph_get_empty_context() {
    let fixture = Fixture::new(corpus_embedder(), config());
    two_documents(&fixture).await;
    fixture
        .vectors
        .inner
        .upsert(
            "docs",
            &[VectorRecord {
                id: "orphan".into(),
                text: "only in the index".into(),
                embedding: vec![1.0, 0.05],
                metadata: HashMap::new(),
            }],
        )
        .await
        .unwrap();

    let results = fixture.search.search("query").await.unwrap();

    let orphan = results.iter().find(|r| r.id == "orphan").unwrap();
    assert!(orphan.topics.is_empty());
    assert!(orphan.related.is_empty());
    assert_eq!(fixture.graph_executes(), 3);
}

#[tokio::test]
async fn adding_a_document_twice_is_idempotent() {
    let fixture = Fixture::new(corpus_embedder(), config());
    fixture.search.create_collection().await.unwrap();
    let document = Document::new("doc1", DOC1).with_topic("Databases").with_metadata("lang", "en");

    let first = fixture.search.add_document(&document).await.unwrap();
    let second = fixture.search.add_document(&document).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(fixture.vectors.inner.record_count("docs").await, Some(1));
    // One Document, one Topic, one COVERS.
    assert_eq!(fixture.graph.inner.counts().await, (2, 1));
    assert_eq!(first.property("lang"), Some(json!("en")));
    assert_eq!(first.document_id(), Some("doc1"));
}

#[tokio::test]
async fn search_keeps_vector_order_under_uneven_graph_latency() {
    let graph = CountingGraphStore {
        delays: HashMap::from([
            ("doc1".to_string(), Duration::from_millis(30)),
            ("doc2".to_string(), Duration::from_millis(10)),
        ]),
        ..Default::default()
    };
    let config = HybridConfig::builder().collection("docs").max_concurrency(2).build().unwrap();
    let fixture = Fixture::with_graph(corpus_embedder(), config, graph);
    fixture.search.create_collection().await.unwrap();
    fixture
        .search
        .add_documents(&[
            Document::new("doc1", DOC1).with_topic("Databases"),
            Document::new("doc2", DOC2).with_topic("Search"),
            Document::new("doc3", DOC3).with_topic("Cooking"),
        ])
        .await
        .unwrap();

    let results = fixture.search.search("query").await.unwrap();

    let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["doc1", "doc2", "doc3"]);
    let topics: Vec<&[String]> = results.iter().map(|r| r.topics.as_slice()).collect();
    assert_eq!(topics, [["Databases"], ["Search"], ["Cooking"]]);
}

#[tokio::test]
async fn dropping_a_search_aborts_graph_lookups() {
    let graph = CountingGraphStore {
        delays: HashMap::from([
            ("doc1".to_string(), Duration::from_millis(300)),
            ("doc2".to_string(), Duration::from_millis(300)),
        ]),
        ..Default::default()
    };
    let fixture = Fixture::with_graph(corpus_embedder(), config(), graph);
    two_documents(&fixture).await;

    let search = fixture.search.search_with("query", 2, 5);
    let outcome = tokio::time::timeout(Duration::from_millis(50), search).await;
    assert!(outcome.is_err());
    assert_eq!(fixture.graph_executes(), 2);

    // Aborted lookups release their store handles once the runtime drops them.
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(Arc::strong_count(&fixture.graph), 2);
}

#[tokio::test]
async fn oversized_concurrency_limit_is_clamped() {
    let config = HybridConfig { max_concurrency: usize::MAX, ..config() };
    let fixture = Fixture::new(corpus_embedder(), config);
    two_documents(&fixture).await;

    let results = fixture.search.search_with("query", 2, 5).await.unwrap();

    let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["doc1", "doc2"]);
}

#[tokio::test]
async fn embedder_failure_propagates() {
    let embedder = StaticEmbeddingProvider::new(2).with(DOC1, vec![1.0, 0.0]);
    let fixture = Fixture::new(embedder, config());
    fixture.search.create_collection().await.unwrap();
    fixture.search.add_document(&Document::new("doc1", DOC1)).await.unwrap();

    let err = fixture.search.search("unknown query").await.unwrap_err();

    assert!(matches!(err, HybridError::EmbeddingUnavailable { .. }));
    assert_eq!(fixture.vector_searches(), 0);
}

#[tokio::test]
async fn wrong_dimensionality_is_reported() {
    let embedder = StaticEmbeddingProvider::new(2).with("query", vec![1.0, 0.0, 0.0]);
    let fixture = Fixture::new(embedder, config());
    fixture.search.create_collection().await.unwrap();

    let err = fixture.search.search("query").await.unwrap_err();

    assert!(matches!(err, HybridError::DimensionMismatch { expected: 2, actual: 3 }));
}

#[tokio::test]
async fn vector_index_failure_skips_graph() {
    let fixture = Fixture::new(corpus_embedder(), config());
    two_documents(&fixture).await;
    fixture.vectors.fail_search.store(true, Ordering::SeqCst);

    let err = fixture.search.search("query").await.unwrap_err();

    assert!(matches!(err, HybridError::VectorIndexUnavailable { .. }));
    assert_eq!(fixture.graph_executes(), 0);
}

#[tokio::test]
async fn graph_failure_yields_no_partial_results() {
    let graph = CountingGraphStore { failing: Some("doc2".to_string()), ..Default::default() };
    let fixture = Fixture::with_graph(corpus_embedder(), config(), graph);
    two_documents(&fixture).await;

    let err = fixture.search.search("query").await.unwrap_err();

    assert!(matches!(err, HybridError::GraphStoreUnavailable { .. }));
}

#[tokio::test]
async fn searches_are_logged_in_the_graph() {
    let fixture = Fixture::new(corpus_embedder(), config());
    two_documents(&fixture).await;

    let results = fixture.search.search_for_user("alice", "query", Some("learn")).await.unwrap();
    assert_eq!(results.len(), 2);

    let graph = &fixture.graph.inner;
    let user = graph.find_node(NodeLabel::User, "alice").await.unwrap().unwrap();
    let searched = graph.related(&user, Some(RelationType::Searched)).await.unwrap();
    assert_eq!(searched.len(), 1);
    let (edge, query) = &searched[0];
    assert_eq!(query.name, "query");
    assert!(edge.properties.contains_key("timestamp"));

    let intents = graph.related(query, Some(RelationType::HasIntent)).await.unwrap();
    assert_eq!(intents[0].1.name, "learn");

    let returned = graph.related(query, Some(RelationType::Returned)).await.unwrap();
    let ranks: Vec<_> = returned
        .iter()
        .map(|(edge, doc)| {
            (doc.document_id().unwrap().to_string(), edge.properties["rank"].clone())
        })
        .collect();
    assert_eq!(ranks, [("doc1".to_string(), json!(1)), ("doc2".to_string(), json!(2))]);

    // Both documents were returned by the same query, so each is now related to the other.
    let results = fixture.search.search("query").await.unwrap();
    assert_eq!(results[0].related, ["doc2"]);
    assert_eq!(results[1].related, ["doc1"]);
}

#[tokio::test]
async fn interactions_relate_documents() {
    let fixture = Fixture::new(corpus_embedder(), config());
    two_documents(&fixture).await;

    let viewed = fixture
        .search
        .record_interaction("bob", "doc1", Interaction::Viewed, Properties::new())
        .await
        .unwrap();
    let mut props = Properties::new();
    props.insert("note".into(), json!("read later"));
    let bookmarked = fixture
        .search
        .record_interaction("bob", "doc2", Interaction::Bookmarked, props)
        .await
        .unwrap();
    let missing = fixture
        .search
        .record_interaction("bob", "nope", Interaction::Viewed, Properties::new())
        .await
        .unwrap();
    assert!(viewed && bookmarked && !missing);

    let bob = fixture.graph.inner.find_node(NodeLabel::User, "bob").await.unwrap().unwrap();
    let edges = fixture.graph.inner.related(&bob, None).await.unwrap();
    let kinds: Vec<RelationType> = edges.iter().map(|(e, _)| e.kind).collect();
    assert_eq!(kinds, [RelationType::Viewed, RelationType::Bookmarked]);
    assert_eq!(edges[1].0.properties["note"], json!("read later"));

    let results = fixture.search.search("query").await.unwrap();
    assert_eq!(results[0].related, ["doc2"]);
}

#[tokio::test]
async fn shared_topics_strategy() {
    let config = HybridConfig::builder()
        .collection("docs")
        .max_related(2)
        .related_via(RelatedVia::SharedTopics)
        .build()
        .unwrap();
    let fixture = Fixture::new(corpus_embedder(), config);
    fixture.search.create_collection().await.unwrap();
    fixture
        .search
        .add_documents(&[
            Document::new("doc1", DOC1).with_topic("AI").with_topic("Databases").with_topic("Rust"),
            Document::new("doc2", DOC2).with_topic("AI"),
            Document::new("doc3", DOC3).with_topic("Cooking"),
        ])
        .await
        .unwrap();

    let results = fixture.search.search("query").await.unwrap();

    assert_eq!(results[0].topics, ["AI", "Databases"]);
    assert_eq!(results[0].related, ["doc2"]);
    assert_eq!(results[1].related, ["doc1"]);
    assert!(results[2].related.is_empty());
}

#[tokio::test]
async fn reset_collection_drops_vectors() {
    let fixture = Fixture::new(corpus_embedder(), config());
    two_documents(&fixture).await;

    fixture.search.reset_collection().await.unwrap();

    assert_eq!(fixture.vectors.inner.record_count("docs").await, Some(0));
    assert!(fixture.search.search("query").await.unwrap().is_empty());
}

#[tokio::test]
async fn connecting_unknown_nodes_returns_false() {
    let fixture = Fixture::new(corpus_embedder(), config());
    two_documents(&fixture).await;

    let connected =
        fixture.search.connect_document_to_topic("doc1", "Nope", RelationType::Covers).await;
    assert!(!connected.unwrap());
    let connected =
        fixture.search.connect_document_to_topic("nope", "AI", RelationType::Covers).await;
    assert!(!connected.unwrap());
}

#[test]
fn builder_requires_every_component() {
    let err = vecgraph_search::HybridSearch::builder().config(config()).build().err().unwrap();
    assert!(matches!(err, HybridError::ConfigError(_)));
}
