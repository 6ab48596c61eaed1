//! OpenAI-compatible HTTP embedding provider (C5).
//!
//! Grounded in the teacher's `adapters::providers::embedding::openai`
//! module (per its `embedding/mod.rs` provider table: "High Quality:
//! OpenAI text-embedding-3-small"). Any OpenAI-compatible `/embeddings`
//! endpoint works against this client by overriding `base_url` — this is
//! how the same code also serves as the grounding for a self-hosted or
//! gateway-fronted deployment without a second HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{IndexError, Result};
use crate::infrastructure::rate_limit::TokenBucket;
use crate::infrastructure::retry::RetryPolicy;
use crate::ports::embedding::{EmbeddingProvider, EmbeddingResult};

/// Default endpoint for the OpenAI embeddings API.
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Conservative per-input token cap; inputs longer than this are
/// truncated at a whitespace boundary before being sent, per
/// `SPEC_FULL.md` §4.5.
const MAX_INPUT_TOKENS: usize = 8_000;

/// An embedder backed by an OpenAI-compatible `/embeddings` HTTP endpoint.
///
/// Owns its own retry/backoff ([`RetryPolicy`]) and request-rate limiting
/// ([`TokenBucket`]); callers never see a transient network hiccup, only
/// the final success or a genuinely permanent failure.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    dimension: usize,
    max_batch_size: usize,
    retry: RetryPolicy,
    rate_limiter: TokenBucket,
}

impl OpenAiEmbedder {
    /// Build a client for `model` (e.g. `text-embedding-3-small`, 1536
    /// dimensions), authenticating with `api_key`. Requests are capped at
    /// 60/minute by default; call [`OpenAiEmbedder::with_requests_per_minute`]
    /// to match a different plan's limit.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, dimension: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
            dimension: dimension.max(1),
            max_batch_size: 128,
            retry: RetryPolicy::default(),
            rate_limiter: TokenBucket::new(60.0, 1.0),
        }
    }

    /// Point at a different OpenAI-compatible endpoint (self-hosted
    /// gateway, proxy, or a compatible third-party provider).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the provider's requests-per-minute rate limit.
    pub fn with_requests_per_minute(mut self, requests_per_minute: f64) -> Self {
        self.rate_limiter = TokenBucket::new(requests_per_minute, requests_per_minute / 60.0);
        self
    }

    fn truncate_if_needed(text: &str) -> (String, bool) {
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.len() <= MAX_INPUT_TOKENS {
            return (text.to_string(), false);
        }
        (words[..MAX_INPUT_TOKENS].join(" "), true)
    }

    async fn embed_one_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingResult>> {
        let (prepared, truncated): (Vec<String>, Vec<bool>) = texts.iter().map(|t| Self::truncate_if_needed(t)).unzip();

        let url = format!("{}/embeddings", self.base_url);
        let request_body = EmbeddingsRequest { model: &self.model, input: &prepared };

        self.rate_limiter.acquire().await;

        let response = self
            .retry
            .run(|| async {
                let sent = self
                    .client
                    .post(&url)
                    .bearer_auth(&self.api_key)
                    .json(&request_body)
                    .timeout(Duration::from_secs(30))
                    .send()
                    .await
                    .map_err(|err| IndexError::transient("openai-embeddings", err.to_string()))?;

                let status = sent.status();
                if status.as_u16() == 429 || status.is_server_error() {
                    return Err(IndexError::transient("openai-embeddings", format!("HTTP {status}")));
                }
                if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
                    return Err(IndexError::collection(format!("openai-embeddings authentication failed: HTTP {status}")));
                }
                if !status.is_success() {
                    return Err(IndexError::per_file("<batch>", format!("openai-embeddings returned HTTP {status}")));
                }

                sent.json::<EmbeddingsResponse>().await.map_err(|err| IndexError::per_file("<batch>", err.to_string()))
            })
            .await?;

        let mut by_index: Vec<Option<Vec<f32>>> = vec![None; prepared.len()];
        for item in response.data {
            if let Some(slot) = by_index.get_mut(item.index) {
                *slot = Some(item.embedding);
            }
        }

        let total_tokens = response.usage.map(|u| u.total_tokens).unwrap_or(0);
        let per_item_tokens = if prepared.is_empty() { 0 } else { total_tokens / prepared.len() as u32 };

        Ok(by_index
            .into_iter()
            .zip(truncated)
            .map(|(vector, was_truncated)| EmbeddingResult {
                vector: vector.unwrap_or_else(|| vec![0.0; self.dimension]),
                tokens_in: per_item_tokens,
                tokens_out: per_item_tokens,
                cost_usd: None,
                truncated: was_truncated,
            })
            .collect())
    }
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingDatum>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Deserialize)]
struct Usage {
    total_tokens: u32,
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingResult>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut results = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.max_batch_size) {
            results.extend(self.embed_one_batch(batch).await?);
        }
        Ok(results)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_not_truncated() {
        let (text, truncated) = OpenAiEmbedder::truncate_if_needed("a short sentence");
        assert_eq!(text, "a short sentence");
        assert!(!truncated);
    }

    #[test]
    fn overlong_text_is_truncated_at_a_whitespace_boundary() {
        let long_text = vec!["word"; MAX_INPUT_TOKENS + 10].join(" ");
        let (truncated_text, was_truncated) = OpenAiEmbedder::truncate_if_needed(&long_text);
        assert!(was_truncated);
        assert_eq!(truncated_text.split_whitespace().count(), MAX_INPUT_TOKENS);
    }

    #[test]
    fn builder_overrides_base_url_and_rate_limit() {
        let embedder = OpenAiEmbedder::new("sk-test", "text-embedding-3-small", 1536)
            .with_base_url("https://gateway.internal/v1")
            .with_requests_per_minute(600.0);
        assert_eq!(embedder.base_url, "https://gateway.internal/v1");
        assert_eq!(embedder.dimension(), 1536);
        assert_eq!(embedder.model_name(), "text-embedding-3-small");
    }
}
