//! The embedding provider contract (C5).

use async_trait::async_trait;

use crate::domain::Result;

/// A single text's embedding result, including the accounting the indexer
/// needs to report cost and flag truncation.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingResult {
    /// The embedding vector; `len() == EmbeddingProvider::dimension()`.
    pub vector: Vec<f32>,
    /// Tokens consumed from the input.
    pub tokens_in: u32,
    /// Tokens the provider reports having generated/billed (providers
    /// that don't distinguish output tokens mirror `tokens_in`).
    pub tokens_out: u32,
    /// Provider-reported or estimated cost in USD, if known.
    pub cost_usd: Option<f64>,
    /// Whether the input was truncated at a whitespace boundary to fit
    /// the provider's maximum input length.
    pub truncated: bool,
}

/// Batch text-to-vector embedding with model metadata and retry policy.
///
/// Implementations own their own rate limiting and retry/backoff; see
/// `crate::infrastructure::retry` and `crate::infrastructure::rate_limit`
/// for the building blocks the shipped providers compose.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of texts, preserving input order in the output.
    ///
    /// A single malformed input must not poison the whole batch: providers
    /// should surface a per-item failure (by returning `Err` only for
    /// batch-wide failures, and handling over-length inputs via
    /// truncation rather than erroring) per `SPEC_FULL.md` §4.5.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingResult>>;

    /// Embed a single text; default implementation delegates to
    /// [`EmbeddingProvider::embed_batch`].
    async fn embed(&self, text: &str) -> Result<EmbeddingResult> {
        let mut results = self.embed_batch(std::slice::from_ref(&text.to_string())).await?;
        results.pop().ok_or_else(|| crate::domain::IndexError::fatal("embed_batch returned no results for one input"))
    }

    /// Output vector dimensionality.
    fn dimension(&self) -> usize;

    /// Human-readable model identifier, used in logs and reports.
    fn model_name(&self) -> &str;

    /// Maximum batch size this provider accepts in one call.
    fn max_batch_size(&self) -> usize {
        128
    }

    /// Whether the provider backend is reachable; default is a no-op
    /// success, overridden by providers that can cheaply probe.
    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
