use std::time::Instant;

use chrono::Utc;
use fleetguard_entity::vulnerability;
use fleetguard_module_store::VulnStore;
use fleetguard_version::{AffectedQuery, PatternKind, Version};
use futures::TryStreamExt;
use tracing::instrument;
use uuid::Uuid;

use crate::error::Error;
use crate::model::{
    CollapsedMatch, DetailedMatch, MatchedVulnerability, ScanRequest, ScanResult, ScanSummary,
};

/// Critical/High severities, per `spec.md` §4.4 step 6.
const CRITICAL_HIGH: [i16; 2] = [1, 2];

/// Given `(platform, version, hardware, features)`, enumerates applicable
/// vulnerabilities via `VulnStore` and applies the filter cascade described
/// in `spec.md` §4.4. Read-only and stateless: concurrent scans share no
/// mutable state.
#[derive(Clone)]
pub struct ScanEngine {
    store: VulnStore,
}

impl ScanEngine {
    pub fn new(store: VulnStore) -> Self {
        Self { store }
    }

    #[instrument(skip(self, request), fields(platform = ?request.platform, version = %request.version))]
    pub async fn scan(&self, request: ScanRequest) -> Result<ScanResult, Error> {
        let started = Instant::now();
        let device_version = fleetguard_version::normalize(&request.version)?;

        let mut stream = self.store.query_by_platform(request.platform).await?;

        let mut total_checked = 0usize;
        let mut version_matches = 0usize;
        let mut hardware_filtered_count = 0usize;
        let mut feature_filtered_count = 0usize;
        let mut survivors: Vec<(vulnerability::Model, String, bool)> = Vec::new();

        while let Some(candidate) = stream.try_next().await.map_err(Error::Store)? {
            total_checked += 1;

            let Some((matched, reason)) = version_filter(&candidate, &device_version) else {
                continue;
            };
            if !matched {
                continue;
            }
            version_matches += 1;

            if let Some(hardware_model) = &request.hardware_model {
                if let Some(candidate_model) = &candidate.hardware_model {
                    if candidate_model != hardware_model {
                        hardware_filtered_count += 1;
                        continue;
                    }
                }
            }

            let mut unlabeled = false;
            if !request.features.is_empty() {
                let labels = candidate.labels();
                if labels.is_empty() {
                    unlabeled = true;
                } else if !labels.iter().any(|l| request.features.contains(l)) {
                    feature_filtered_count += 1;
                    continue;
                }
            }

            if let Some(severities) = &request.severity_filter {
                if !severities.contains(&candidate.severity) {
                    continue;
                }
            }

            survivors.push((candidate, reason, unlabeled));
        }

        drop(stream);

        let total_bugs = survivors
            .iter()
            .filter(|(c, _, _)| c.kind == fleetguard_entity::VulnKind::Bug)
            .count() as i32;
        let total_psirts = survivors
            .iter()
            .filter(|(c, _, _)| c.kind == fleetguard_entity::VulnKind::Advisory)
            .count() as i32;
        let bug_critical_high = survivors
            .iter()
            .filter(|(c, _, _)| {
                c.kind == fleetguard_entity::VulnKind::Bug && CRITICAL_HIGH.contains(&c.severity)
            })
            .count() as i32;
        let psirt_critical_high = survivors
            .iter()
            .filter(|(c, _, _)| {
                c.kind == fleetguard_entity::VulnKind::Advisory
                    && CRITICAL_HIGH.contains(&c.severity)
            })
            .count() as i32;

        let mut critical_high: Vec<MatchedVulnerability> = Vec::new();
        let mut medium_low: Vec<MatchedVulnerability> = Vec::new();

        for (candidate, reason, unlabeled) in survivors {
            if CRITICAL_HIGH.contains(&candidate.severity) {
                critical_high.push(MatchedVulnerability::Detailed(DetailedMatch {
                    vuln_id: candidate.vuln_id,
                    external_id: candidate.external_id.clone(),
                    kind: candidate.kind,
                    severity: candidate.severity,
                    headline: candidate.headline.clone(),
                    summary: candidate.summary.clone(),
                    labels: candidate.labels(),
                    affected_versions_raw: candidate.affected_versions_raw.clone(),
                    fixed_version: candidate.fixed_version.clone(),
                    advisory_url: candidate.advisory_url.clone(),
                    match_reason: reason,
                    unlabeled,
                }));
            } else {
                medium_low.push(MatchedVulnerability::Collapsed(CollapsedMatch {
                    vuln_id: candidate.vuln_id,
                    external_id: candidate.external_id.clone(),
                    severity: candidate.severity,
                    headline: candidate.headline.clone(),
                    summary: first_sentence(&candidate.summary),
                }));
            }
        }

        critical_high.sort_by(|a, b| {
            a.severity()
                .cmp(&b.severity())
                .then_with(|| a.external_id().cmp(b.external_id()))
        });
        medium_low.sort_by(|a, b| {
            a.severity()
                .cmp(&b.severity())
                .then_with(|| a.external_id().cmp(b.external_id()))
        });

        let mut combined: Vec<MatchedVulnerability> = critical_high;
        combined.extend(medium_low);

        let matches = paginate(combined, request.offset, request.limit);

        let scan_id = Uuid::new_v4();
        let summary = ScanSummary {
            scan_id,
            timestamp: Utc::now(),
            platform: request.platform,
            version: Some(request.version.clone()),
            hardware_model: request.hardware_model.clone(),
            total_bugs,
            bug_critical_high,
            total_psirts,
            psirt_critical_high,
            hardware_filtered_count: hardware_filtered_count as i32,
            feature_filtered_count: feature_filtered_count as i32,
            query_time_ms: started.elapsed().as_millis() as i64,
        };

        Ok(ScanResult {
            summary,
            matches,
            total_checked,
            version_matches,
        })
    }
}

/// Returns `None` for a candidate whose stored version fields don't parse
/// (itself a pre-existing `PatternKind::Unknown` record, or corrupted data);
/// `is_affected` would report `false` for these anyway, but skipping the
/// allocation here keeps the hot path cheap.
fn version_filter(
    candidate: &vulnerability::Model,
    device_version: &Version,
) -> Option<(bool, String)> {
    let pattern_kind: PatternKind = candidate.pattern_kind.into();

    let version_min = candidate
        .version_min
        .as_deref()
        .and_then(|raw| fleetguard_version::normalize(raw).ok());
    let version_max = candidate
        .version_max
        .as_deref()
        .and_then(|raw| fleetguard_version::normalize(raw).ok());
    let fixed_version = candidate
        .fixed_version
        .as_deref()
        .and_then(|raw| fleetguard_version::normalize(raw).ok());
    let explicit_list: Vec<Version> = candidate
        .explicit_list()
        .iter()
        .filter_map(|raw| fleetguard_version::normalize(raw).ok())
        .collect();

    let query = AffectedQuery {
        kind: pattern_kind,
        version_min: version_min.as_ref(),
        version_max: version_max.as_ref(),
        explicit_list: &explicit_list,
        fixed_version: fixed_version.as_ref(),
    };

    Some(fleetguard_version::is_affected(device_version, query))
}

fn first_sentence(summary: &str) -> String {
    summary
        .split_inclusive('.')
        .next()
        .unwrap_or(summary)
        .trim()
        .to_string()
}

fn paginate(
    items: Vec<MatchedVulnerability>,
    offset: Option<usize>,
    limit: Option<usize>,
) -> Vec<MatchedVulnerability> {
    let offset = offset.unwrap_or(0);
    let iter = items.into_iter().skip(offset);
    match limit {
        Some(limit) => iter.take(limit).collect(),
        None => iter.collect(),
    }
}
