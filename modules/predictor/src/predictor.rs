use std::sync::Arc;

use fleetguard_common::config::Predictor as PredictorConfig;
use fleetguard_entity::{DbPatternKind, LabelsSource, Platform, VulnKind};
use fleetguard_module_store::VulnStore;
use fleetguard_module_store::model::NewVulnerability;
use tracing::{instrument, warn};

use crate::error::Error;
use crate::example_index::ExampleIndex;
use crate::prediction::{ConfidenceSource, LabelPrediction, PredictionSource, RetrievedExample};
use crate::taxonomy::Taxonomy;
use crate::traits::{Embedder, FewShotExample, LlmBackend, LlmRequest};

/// Severity assigned to a Tier-3 cache-write when the caller has no severity
/// of its own (free-form advisory prediction, not a loader-supplied
/// record). Lowest urgency on the 1-6 scale: this path exists to avoid
/// redundant LLM calls for *labels*, not to assert a severity the predictor
/// was never told.
const UNSPECIFIED_SEVERITY: i16 = 6;

/// Request to `LabelPredictor::predict` (`spec.md` §4.3).
pub struct PredictRequest<'a> {
    pub summary: &'a str,
    pub platform: Platform,
    pub external_id: Option<&'a str>,
    /// Used only if the prediction is cache-written as a brand-new
    /// `Vulnerability` row (no existing record for `external_id`).
    pub kind: VulnKind,
    pub severity_hint: Option<i16>,
}

/// Maps a free-form vulnerability summary to taxonomy labels through the
/// three-tier cache described in `spec.md` §4.3: a `VulnStore` lookup, an
/// in-memory nearest-example index, and an LLM as the fallback. The first
/// tier to answer definitively short-circuits the rest.
#[derive(Clone)]
pub struct LabelPredictor {
    store: VulnStore,
    index: Arc<ExampleIndex>,
    embedder: Arc<dyn Embedder>,
    llm: Arc<dyn LlmBackend>,
    taxonomy: Arc<Taxonomy>,
    config: PredictorConfig,
}

impl LabelPredictor {
    pub fn new(
        store: VulnStore,
        index: Arc<ExampleIndex>,
        embedder: Arc<dyn Embedder>,
        llm: Arc<dyn LlmBackend>,
        taxonomy: Arc<Taxonomy>,
        config: PredictorConfig,
    ) -> Self {
        Self {
            store,
            index,
            embedder,
            llm,
            taxonomy,
            config,
        }
    }

    #[instrument(skip(self, request), fields(platform = ?request.platform))]
    pub async fn predict(&self, request: PredictRequest<'_>) -> Result<LabelPrediction, Error> {
        if let Some(prediction) = self.tier1_store(request.external_id, request.platform).await? {
            return Ok(prediction);
        }

        let (tier2, retrieved, tier2_needs_review) = self
            .tier2_nearest_examples(request.summary, request.platform, request.external_id)
            .await?;

        if let Some(prediction) = tier2.exact_match {
            return Ok(prediction);
        }

        let mut prediction = self
            .tier3_llm(request.summary, request.platform, tier2.context)
            .await;
        prediction.retrieved_examples = Some(retrieved);
        if tier2_needs_review {
            prediction.needs_review = true;
        }

        if let Some(external_id) = request.external_id {
            self.maybe_cache_write(
                external_id,
                request.summary,
                request.platform,
                request.kind,
                request.severity_hint,
                &prediction,
            )
            .await;
        }

        Ok(prediction)
    }

    async fn tier1_store(
        &self,
        external_id: Option<&str>,
        platform: Platform,
    ) -> Result<Option<LabelPrediction>, Error> {
        let Some(external_id) = external_id else {
            return Ok(None);
        };

        let Some(record) = self.store.query_by_advisory(external_id, platform).await? else {
            return Ok(None);
        };

        let labels = record.labels();
        if labels.is_empty() {
            return Ok(None);
        }

        Ok(Some(LabelPrediction::from_store(labels, 1.0)))
    }

    async fn tier2_nearest_examples(
        &self,
        summary: &str,
        platform: Platform,
        external_id: Option<&str>,
    ) -> Result<(Tier2Outcome, Vec<RetrievedExample>, bool), Error> {
        let embedding = match self.embedder.embed(summary).await {
            Ok(v) => v,
            Err(err) => {
                warn!(error = %err, "embedder unavailable, skipping tier-2 retrieval");
                return Ok((
                    Tier2Outcome {
                        exact_match: None,
                        context: Vec::new(),
                    },
                    Vec::new(),
                    true,
                ));
            }
        };

        let neighbors = self
            .index
            .top_k(&embedding, platform, self.config.tier2_top_k);

        let retrieved: Vec<RetrievedExample> = neighbors
            .iter()
            .map(|n| RetrievedExample {
                external_id: n.example.external_id.clone(),
                labels: n.example.labels.clone(),
                similarity: n.similarity,
            })
            .collect();

        if let Some(best) = neighbors.first() {
            if let Some(external_id) = external_id {
                if best.example.external_id == external_id {
                    return Ok((
                        Tier2Outcome {
                            exact_match: Some(LabelPrediction::from_exact_faiss_match(
                                best.example.labels.clone(),
                            )),
                            context: Vec::new(),
                        },
                        retrieved,
                        false,
                    ));
                }
            }

            let low_similarity = best.similarity < self.config.tier2_similarity_threshold;
            let context = neighbors
                .iter()
                .map(|n| FewShotExample {
                    summary: n.example.summary.clone(),
                    labels: n.example.labels.clone(),
                })
                .collect();

            return Ok((
                Tier2Outcome {
                    exact_match: None,
                    context,
                },
                retrieved,
                low_similarity,
            ));
        }

        // No candidates at all (cold-start ExampleIndex) is distinct from
        // "we looked and the best match was below threshold" — only the
        // latter is the §4.3 low-similarity case that forces needs_review.
        Ok((
            Tier2Outcome {
                exact_match: None,
                context: Vec::new(),
            },
            retrieved,
            false,
        ))
    }

    async fn tier3_llm(
        &self,
        summary: &str,
        platform: Platform,
        few_shot: Vec<FewShotExample>,
    ) -> LabelPrediction {
        let request = LlmRequest {
            summary: summary.to_string(),
            taxonomy: self.taxonomy.entries_for(platform),
            few_shot,
        };

        let outcome = tokio::time::timeout(self.config.llm_deadline, self.llm.infer(request)).await;

        match outcome {
            Ok(Ok(response)) => {
                let confidence_source = if response.confidence >= self.config.needs_review_threshold {
                    ConfidenceSource::Model
                } else {
                    ConfidenceSource::Heuristic
                };
                LabelPrediction {
                    needs_review: response.confidence < self.config.needs_review_threshold,
                    labels: response.labels,
                    confidence: response.confidence,
                    confidence_source,
                    source: PredictionSource::Llm,
                    cached: false,
                    retrieved_examples: None,
                }
            }
            Ok(Err(err)) => {
                warn!(error = %err, "llm backend returned an error");
                LabelPrediction::degraded()
            }
            Err(_elapsed) => {
                warn!(deadline = ?self.config.llm_deadline, "llm backend timed out");
                LabelPrediction::degraded()
            }
        }
    }

    /// Tier-3 cache-write (§4.3 "Cache-write policy"). A fresh `Vulnerability`
    /// row is inserted rather than updated: there is by construction no
    /// existing row for `external_id` at this call site (Tier 1 would have
    /// short-circuited otherwise). A racing insert from a concurrent
    /// prediction for the same advisory is expected and benign (§5).
    async fn maybe_cache_write(
        &self,
        external_id: &str,
        summary: &str,
        platform: Platform,
        kind: VulnKind,
        severity_hint: Option<i16>,
        prediction: &LabelPrediction,
    ) {
        if !prediction.is_cache_worthy(self.config.cache_write_confidence_floor) {
            return;
        }

        let headline = summary.split('.').next().unwrap_or(summary).trim().to_string();

        let new_vuln = NewVulnerability {
            external_id: external_id.to_string(),
            kind,
            platform,
            hardware_model: None,
            severity: severity_hint.unwrap_or(UNSPECIFIED_SEVERITY),
            headline,
            summary: summary.to_string(),
            status: "predicted".to_string(),
            advisory_url: None,
            affected_versions_raw: String::new(),
            pattern_kind: DbPatternKind::Unknown,
            version_min: None,
            version_max: None,
            fixed_version: None,
            explicit_list: Vec::new(),
            labels: prediction.labels.clone(),
            labels_source: LabelsSource::Llm,
        };

        match self.store.insert_vulnerability(new_vuln).await {
            Ok(_) => {}
            Err(fleetguard_module_store::Error::DuplicateExternalId) => {
                // Concurrent Tier-3 write for the same advisory won the race.
            }
            Err(err) => warn!(error = %err, external_id, "tier-3 cache write failed"),
        }
    }
}

struct Tier2Outcome {
    exact_match: Option<LabelPrediction>,
    context: Vec<FewShotExample>,
}
