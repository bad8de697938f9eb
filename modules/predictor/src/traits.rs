use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// External collaborator: maps free-form text to a fixed-width embedding
/// vector (`spec.md` §4.3 "Tier 2"). Implementations typically wrap a local
/// ONNX/sentence-transformer runtime or a remote embedding API; neither is
/// part of this crate.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError>;
}

#[derive(Debug, thiserror::Error)]
#[error("embedder error: {0}")]
pub struct EmbedderError(pub String);

/// The platform-scoped taxonomy entry passed into the Tier-3 prompt: a
/// label paired with its short human-readable description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxonomyEntry {
    pub label: String,
    pub description: String,
}

/// A single retrieved example used as few-shot context for Tier 3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FewShotExample {
    pub summary: String,
    pub labels: Vec<String>,
}

/// The deterministic prompt input built from the platform taxonomy and the
/// Tier-2 retrieval results (`spec.md` §4.3 "Tier 3").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    pub summary: String,
    pub taxonomy: Vec<TaxonomyEntry>,
    pub few_shot: Vec<FewShotExample>,
}

/// The LLM's self-reported labels and confidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub labels: Vec<String>,
    pub confidence: f32,
}

/// External collaborator: label inference over a deterministic prompt
/// (`spec.md` §4.3 "Tier 3"). The backend is responsible for honoring
/// `deadline` itself; [`crate::predictor::LabelPredictor`] also wraps the
/// call in `tokio::time::timeout` as a backstop.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn infer(&self, request: LlmRequest) -> Result<LlmResponse, LlmBackendError>;
}

#[derive(Debug, thiserror::Error)]
#[error("llm backend error: {0}")]
pub struct LlmBackendError(pub String);
