use serde::{Deserialize, Serialize};

/// Where a prediction's labels ultimately came from (`spec.md` §3
/// "LabelPrediction").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionSource {
    Store,
    Faiss,
    Llm,
}

/// Whether `confidence` came from the model itself, a heuristic fallback, or
/// is simply echoing a cached value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceSource {
    Model,
    Heuristic,
    Cache,
}

/// A nearest-neighbor hit surfaced for audit / few-shot context, paired with
/// its cosine similarity to the query embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedExample {
    pub external_id: String,
    pub labels: Vec<String>,
    pub similarity: f32,
}

/// The result of `LabelPredictor::predict` (`spec.md` §3, §4.3).
///
/// `needs_review` is sticky: once a tier sets it, later tiers must not clear
/// it, and the cache-write policy treats it as an absolute disqualifier
/// regardless of the raw confidence value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelPrediction {
    pub labels: Vec<String>,
    pub confidence: f32,
    pub confidence_source: ConfidenceSource,
    pub source: PredictionSource,
    pub cached: bool,
    pub needs_review: bool,
    pub retrieved_examples: Option<Vec<RetrievedExample>>,
}

impl LabelPrediction {
    pub(crate) fn from_store(labels: Vec<String>, confidence: f32) -> Self {
        Self {
            labels,
            confidence,
            confidence_source: ConfidenceSource::Cache,
            source: PredictionSource::Store,
            cached: true,
            needs_review: false,
            retrieved_examples: None,
        }
    }

    pub(crate) fn from_exact_faiss_match(labels: Vec<String>) -> Self {
        Self {
            labels,
            confidence: 1.0,
            confidence_source: ConfidenceSource::Cache,
            source: PredictionSource::Faiss,
            cached: true,
            needs_review: false,
            retrieved_examples: None,
        }
    }

    pub(crate) fn degraded() -> Self {
        Self {
            labels: Vec::new(),
            confidence: 0.0,
            confidence_source: ConfidenceSource::Heuristic,
            source: PredictionSource::Llm,
            cached: false,
            needs_review: true,
            retrieved_examples: None,
        }
    }

    /// Cache-write eligibility per §4.3, conditions 2-5 (condition 1,
    /// `external_id` present, is checked by the caller since this type
    /// carries no identity).
    pub(crate) fn is_cache_worthy(&self, confidence_floor: f32) -> bool {
        self.confidence >= confidence_floor
            && !self.labels.is_empty()
            && self.confidence_source == ConfidenceSource::Model
            && !self.needs_review
    }
}
