//! Deterministic embedding providers for demos and tests.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::embedding::EmbeddingProvider;
use crate::error::{HybridError, Result};

/// Hash-based embeddings: the same text always maps to the same
/// L2-normalised vector, with no model or API key involved.
#[derive(Debug, Clone, Copy)]
pub struct MockEmbeddingProvider {
    dimensions: usize,
}

impl MockEmbeddingProvider {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let hash = text.bytes().fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
        let mut embedding = vec![0.0f32; self.dimensions];
        for (i, v) in embedding.iter_mut().enumerate() {
            *v = (hash.wrapping_add(i as u64) as f32).sin();
        }
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            embedding.iter_mut().for_each(|x| *x /= norm);
        }
        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Embeddings looked up from a fixed table. Unknown text is reported as
/// [`HybridError::EmbeddingUnavailable`].
#[derive(Debug, Clone, Default)]
pub struct StaticEmbeddingProvider {
    dimensions: usize,
    table: HashMap<String, Vec<f32>>,
}

impl StaticEmbeddingProvider {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions, table: HashMap::new() }
    }

    /// Map `text` to `embedding`.
    pub fn with(mut self, text: impl Into<String>, embedding: Vec<f32>) -> Self {
        self.table.insert(text.into(), embedding);
        self
    }
}

#[async_trait]
impl EmbeddingProvider for StaticEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.table.get(text).cloned().ok_or_else(|| HybridError::EmbeddingUnavailable {
            provider: "Static".into(),
            message: format!("no embedding registered for '{text}'"),
        })
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
