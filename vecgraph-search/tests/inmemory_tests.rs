//! Property tests for search ordering over the in-memory backends.

use std::collections::HashMap;
use std::sync::Arc;

use proptest::prelude::*;
use vecgraph_search::{
    Document, HybridConfig, HybridSearch, InMemoryGraphStore, InMemoryVectorStore,
    MockEmbeddingProvider, VectorRecord, VectorStore,
};

/// Generate a non-zero L2-normalized embedding of the given dimension.
fn arb_normalized_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim).prop_filter_map(
        "non-zero embedding",
        |mut v| {
            let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm < 1e-8 {
                return None;
            }
            for val in &mut v {
                *val /= norm;
            }
            Some(v)
        },
    )
}

fn arb_record(dim: usize) -> impl Strategy<Value = VectorRecord> {
    ("[a-z]{3,8}", "[a-z ]{5,30}", arb_normalized_embedding(dim)).prop_map(
        |(id, text, embedding)| VectorRecord { id, text, embedding, metadata: HashMap::new() },
    )
}

/// Nearest-neighbour results are sorted by descending score and never
/// exceed `top_k`.
mod prop_vector_search_ordering {
    use super::*;

    const DIM: usize = 16;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn results_ordered_descending_and_bounded_by_top_k(
            records in proptest::collection::vec(arb_record(DIM), 1..20),
            query in arb_normalized_embedding(DIM),
            top_k in 1usize..25,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let hits = rt.block_on(async {
                let store = InMemoryVectorStore::new();
                store.create_collection("test", DIM).await.unwrap();
                store.upsert("test", &records).await.unwrap();
                store.search("test", &query, top_k).await.unwrap()
            });

            prop_assert!(hits.len() <= top_k);
            for pair in hits.windows(2) {
                prop_assert!(
                    pair[0].score >= pair[1].score,
                    "results not in descending order: {} < {}",
                    pair[0].score,
                    pair[1].score,
                );
            }
        }
    }
}

/// Hybrid results follow the vector index order exactly, whatever the
/// graph holds.
mod prop_hybrid_order_matches_vector_order {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(40))]

        #[test]
        fn hybrid_ids_equal_semantic_ids(
            texts in proptest::collection::hash_set("[a-z]{4,12}( [a-z]{3,9}){0,3}", 1..12),
            query in "[a-z]{4,12}",
            top_k in 1usize..15,
            max_related in 1usize..4,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let (hybrid, semantic) = rt.block_on(async {
                let search = HybridSearch::builder()
                    .config(HybridConfig::default())
                    .embedding_provider(Arc::new(MockEmbeddingProvider::new(8)))
                    .vector_store(Arc::new(InMemoryVectorStore::new()))
                    .graph_store(Arc::new(InMemoryGraphStore::new()))
                    .build()
                    .unwrap();
                search.create_collection().await.unwrap();
                for (i, text) in texts.iter().enumerate() {
                    let topic = format!("topic-{}", i % 3);
                    let document = Document::new(format!("doc{i}"), text.clone()).with_topic(topic);
                    search.add_document(&document).await.unwrap();
                }
                let hybrid = search.search_with(&query, top_k, max_related).await.unwrap();
                let semantic = search.semantic_search(&query, top_k).await.unwrap();
                (hybrid, semantic)
            });

            prop_assert!(hybrid.len() <= top_k);
            let hybrid_ids: Vec<&str> = hybrid.iter().map(|r| r.id.as_str()).collect();
            let semantic_ids: Vec<&str> = semantic.iter().map(|h| h.id.as_str()).collect();
            prop_assert_eq!(hybrid_ids, semantic_ids);
            for result in &hybrid {
                prop_assert!(result.topics.len() <= max_related);
                prop_assert!(result.related.len() <= max_related);
                prop_assert!(!result.related.contains(&result.id));
            }
        }
    }
}
