//! Null embedding provider for offline tests and dry runs.

use async_trait::async_trait;

use crate::domain::Result;
use crate::ports::embedding::{EmbeddingProvider, EmbeddingResult};

/// Returns a fixed-size, fixed-value vector for every input. Grounded
/// directly in the teacher's `NullEmbeddingProvider`; never used as the
/// default outside of tests, since a real run needs vectors that actually
/// distinguish content (see [`crate::adapters::embedding::hash::HashEmbedder`]).
pub struct NullEmbeddingProvider {
    dimension: usize,
}

impl NullEmbeddingProvider {
    /// A null provider with the teacher's single-dimension default.
    pub fn new() -> Self {
        Self { dimension: 1 }
    }

    /// A null provider reporting a caller-chosen dimension, for tests
    /// that need to match a specific collection's vector size.
    pub fn with_dimension(dimension: usize) -> Self {
        Self { dimension: dimension.max(1) }
    }
}

impl Default for NullEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for NullEmbeddingProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingResult>> {
        Ok(texts
            .iter()
            .map(|_| EmbeddingResult {
                vector: vec![0.1; self.dimension],
                tokens_in: 0,
                tokens_out: 0,
                cost_usd: Some(0.0),
                truncated: false,
            })
            .collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "null"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn produces_constant_vectors_of_configured_dimension() {
        let provider = NullEmbeddingProvider::with_dimension(4);
        let results = provider.embed_batch(&["a".to_string(), "b".to_string()]).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].vector, vec![0.1, 0.1, 0.1, 0.1]);
    }
}
