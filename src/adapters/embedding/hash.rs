//! Deterministic local embedder used as the crate's own default and test
//! double — not a cloud provider integration (see `SPEC_FULL.md` §4.5).
//!
//! Produces a fixed-dimension vector from token shingles via the hashing
//! trick: each shingle's hash selects a bucket, whose sign and magnitude
//! accumulate, and the result is L2-normalized. This is deliberately not a
//! learned embedding — it exists so the indexing pipeline, dedup, and
//! vector-search behavior can be exercised end-to-end without a network
//! dependency, mirroring the teacher's "FastEmbed is the local,
//! API-key-free default" posture without vendoring an ONNX runtime.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::domain::Result;
use crate::ports::embedding::{EmbeddingProvider, EmbeddingResult};

/// Default output dimension, small enough for fast tests yet large enough
/// that distinct inputs rarely collide to the same vector.
pub const DEFAULT_DIMENSION: usize = 256;

/// Shingle size (in whitespace-delimited tokens).
const SHINGLE_SIZE: usize = 3;

/// A hashing-trick embedder: deterministic, offline, and stable across
/// runs for identical input text.
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    /// An embedder producing [`DEFAULT_DIMENSION`]-length vectors.
    pub fn new() -> Self {
        Self { dimension: DEFAULT_DIMENSION }
    }

    /// An embedder producing vectors of a caller-chosen dimension.
    pub fn with_dimension(dimension: usize) -> Self {
        Self { dimension: dimension.max(1) }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimension];
        let tokens: Vec<&str> = text.split_whitespace().collect();

        if tokens.is_empty() {
            return vector;
        }

        let windows: Vec<&[&str]> = if tokens.len() < SHINGLE_SIZE {
            vec![&tokens[..]]
        } else {
            tokens.windows(SHINGLE_SIZE).collect()
        };

        for shingle in windows {
            let joined = shingle.join(" ");
            let mut hasher = Sha256::new();
            hasher.update(joined.as_bytes());
            let digest = hasher.finalize();

            let mut index_bytes = [0u8; 8];
            index_bytes.copy_from_slice(&digest[0..8]);
            let index = (u64::from_le_bytes(index_bytes) as usize) % self.dimension;

            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[index] += sign;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingResult>> {
        Ok(texts
            .iter()
            .map(|text| EmbeddingResult {
                vector: self.embed_text(text),
                tokens_in: text.split_whitespace().count() as u32,
                tokens_out: text.split_whitespace().count() as u32,
                cost_usd: Some(0.0),
                truncated: false,
            })
            .collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "hash-shingle-v1"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn identical_text_produces_identical_vector() {
        let embedder = HashEmbedder::with_dimension(32);
        let a = embedder.embed("the quick brown fox").await.unwrap();
        let b = embedder.embed("the quick brown fox").await.unwrap();
        assert_eq!(a.vector, b.vector);
    }

    #[tokio::test]
    async fn different_text_produces_different_vector() {
        let embedder = HashEmbedder::with_dimension(32);
        let a = embedder.embed("the quick brown fox").await.unwrap();
        let b = embedder.embed("a totally different sentence here").await.unwrap();
        assert_ne!(a.vector, b.vector);
    }

    #[tokio::test]
    async fn vector_is_unit_normalized() {
        let embedder = HashEmbedder::with_dimension(16);
        let result = embedder.embed("some reasonably long piece of text to embed").await.unwrap();
        let norm = result.vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn empty_text_yields_zero_vector() {
        let embedder = HashEmbedder::with_dimension(8);
        let result = embedder.embed("").await.unwrap();
        assert!(result.vector.iter().all(|v| *v == 0.0));
    }
}
