//! Embedding client and vector utilities.
//!
//! [`EmbeddingClient`] wraps the OpenAI embeddings API behind a fail-soft
//! contract: [`EmbeddingClient::embed`] returns `None` — never an error —
//! when the provider is disabled, the API key is absent or malformed, or the
//! request fails. Callers treat `None` as "skip this item"; a stalled or
//! misconfigured embedding service must degrade the pipeline, not crash it.
//!
//! There is deliberately no retry loop: every call is a single attempt
//! bounded by the configured timeout, and the enrichment path layers its own
//! deadline on top.
//!
//! Also provides vector utilities for the SQLite chunk store:
//! - [`cosine_similarity`] — compute similarity between two embedding vectors
//! - [`vec_to_blob`] — encode a `Vec<f32>` as little-endian bytes for BLOB storage
//! - [`blob_to_vec`] — decode a BLOB back into a `Vec<f32>`

use async_trait::async_trait;
use std::time::Duration;

use crate::config::EmbeddingConfig;

const OPENAI_EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";

/// The embedding seam the pipeline depends on. Implemented by
/// [`EmbeddingClient`] in production and by deterministic stubs in tests.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed one text, or `None` when the service is unavailable.
    async fn embed(&self, text: &str) -> Option<Vec<f32>>;
}

/// Client for the configured embedding provider.
pub struct EmbeddingClient {
    config: EmbeddingConfig,
    client: reqwest::Client,
    api_url: String,
}

impl EmbeddingClient {
    pub fn new(config: &EmbeddingConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            config: config.clone(),
            client,
            api_url: OPENAI_EMBEDDINGS_URL.to_string(),
        }
    }

    /// Override the API endpoint (used by tests with a mock server).
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.config.is_enabled()
    }

    /// Embed a single text. Returns `None` when embeddings are unavailable
    /// for any reason; the cause is logged, never propagated.
    pub async fn embed(&self, text: &str) -> Option<Vec<f32>> {
        if !self.config.is_enabled() {
            return None;
        }

        let api_key = match std::env::var("OPENAI_API_KEY") {
            Ok(k) if k.starts_with("sk-") => k,
            _ => {
                tracing::warn!("OPENAI_API_KEY not set or invalid, skipping embeddings");
                return None;
            }
        };

        let model = self.config.model.as_deref()?;

        // The service rejects over-long inputs; truncate on a char boundary.
        let input: String = text.chars().take(self.config.max_input_chars).collect();

        let body = serde_json::json!({
            "model": model,
            "input": input,
        });

        let resp = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await;

        let response = match resp {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "embedding request failed");
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "embedding API error");
            return None;
        }

        let json: serde_json::Value = match response.json().await {
            Ok(j) => j,
            Err(e) => {
                tracing::warn!(error = %e, "embedding response decode failed");
                return None;
            }
        };

        let vector: Vec<f32> = json
            .get("data")
            .and_then(|d| d.get(0))
            .and_then(|item| item.get("embedding"))
            .and_then(|e| e.as_array())?
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();

        if vector.is_empty() {
            tracing::warn!("embedding response contained no vector");
            return None;
        }

        // A vector of the wrong dimensionality would score 0 against every
        // stored chunk; drop it at the boundary instead.
        if let Some(dims) = self.config.dims {
            if vector.len() != dims {
                tracing::warn!(got = vector.len(), expected = dims, "embedding dims mismatch");
                return None;
            }
        }

        Some(vector)
    }
}

#[async_trait]
impl Embedder for EmbeddingClient {
    async fn embed(&self, text: &str) -> Option<Vec<f32>> {
        EmbeddingClient::embed(self, text).await
    }
}

/// Encode a float vector as a BLOB (little-endian f32 bytes).
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`. Returns `0.0` for empty vectors,
/// vectors of different lengths, or degenerate (zero-norm) vectors —
/// never divides by zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmbeddingConfig;

    #[test]
    fn test_vec_blob_roundtrip() {
        let vec = vec![1.0f32, -2.5, 3.125, 0.0, -0.001];
        let blob = vec_to_blob(&vec);
        let restored = blob_to_vec(&blob);
        assert_eq!(vec, restored);
    }

    #[test]
    fn test_cosine_identical() {
        let v = vec![1.0, 2.0, 3.0];
        let sim = cosine_similarity(&v, &v);
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_zero_vector() {
        let a = vec![1.0, 2.0, 3.0];
        let z = vec![0.0, 0.0, 0.0];
        assert_eq!(cosine_similarity(&a, &z), 0.0);
    }

    #[test]
    fn test_cosine_different_lengths() {
        let a = vec![1.0, 2.0];
        let b = vec![1.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[tokio::test]
    async fn test_disabled_provider_embeds_nothing() {
        let client = EmbeddingClient::new(&EmbeddingConfig::default());
        assert_eq!(client.embed("any text at all").await, None);
    }

    // Exercises the missing-credential no-op and the mocked happy path in
    // one test; OPENAI_API_KEY is process-wide and must not race.
    #[tokio::test]
    async fn test_credential_gate_then_mocked_embed() {
        let cfg = EmbeddingConfig {
            provider: "openai".to_string(),
            model: Some("text-embedding-3-small".to_string()),
            dims: Some(3),
            ..EmbeddingConfig::default()
        };

        std::env::remove_var("OPENAI_API_KEY");
        let client = EmbeddingClient::new(&cfg);
        assert_eq!(client.embed("courses fees eligibility").await, None);

        let server = httpmock::MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(httpmock::Method::POST).path("/v1/embeddings");
                then.status(200).json_body(serde_json::json!({
                    "data": [{"embedding": [0.1, 0.2, 0.3]}]
                }));
            })
            .await;

        std::env::set_var("OPENAI_API_KEY", "sk-test");
        let client = EmbeddingClient::new(&cfg).with_api_url(server.url("/v1/embeddings"));
        let vector = client.embed("courses fees eligibility").await.unwrap();
        assert_eq!(vector.len(), 3);
        assert!((vector[0] - 0.1).abs() < 1e-6);

        // A wrong-dimensionality response is dropped at the boundary
        let strict = EmbeddingConfig { dims: Some(8), ..cfg };
        let client = EmbeddingClient::new(&strict).with_api_url(server.url("/v1/embeddings"));
        assert_eq!(client.embed("anything").await, None);

        std::env::remove_var("OPENAI_API_KEY");
    }
}
