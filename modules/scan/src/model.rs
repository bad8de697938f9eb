use chrono::{DateTime, Utc};
use fleetguard_entity::{Platform, VulnKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Input to `ScanEngine::scan` (`spec.md` §4.4).
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub platform: Platform,
    pub version: String,
    pub hardware_model: Option<String>,
    pub features: Vec<String>,
    pub severity_filter: Option<Vec<i16>>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// Critical/High match: full detail, per §4.4 step 6.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailedMatch {
    pub vuln_id: Uuid,
    pub external_id: String,
    pub kind: VulnKind,
    pub severity: i16,
    pub headline: String,
    pub summary: String,
    pub labels: Vec<String>,
    pub affected_versions_raw: String,
    pub fixed_version: Option<String>,
    pub advisory_url: Option<String>,
    pub match_reason: String,
    /// Set when this candidate had no labels and survived the feature
    /// filter only by the filter's conservative "keep if unlabeled" clause
    /// (§4.4 "Unlabeled-vulnerability policy").
    pub unlabeled: bool,
}

/// Medium/Low match: collapsed to identity, severity, and a one-line
/// summary, per §4.4 step 6.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollapsedMatch {
    pub vuln_id: Uuid,
    pub external_id: String,
    pub severity: i16,
    pub headline: String,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchedVulnerability {
    Detailed(DetailedMatch),
    Collapsed(CollapsedMatch),
}

impl MatchedVulnerability {
    pub fn severity(&self) -> i16 {
        match self {
            MatchedVulnerability::Detailed(m) => m.severity,
            MatchedVulnerability::Collapsed(m) => m.severity,
        }
    }

    pub fn external_id(&self) -> &str {
        match self {
            MatchedVulnerability::Detailed(m) => &m.external_id,
            MatchedVulnerability::Collapsed(m) => &m.external_id,
        }
    }
}

/// The flat projection of a `ScanResult`, persisted verbatim as
/// `fleetguard_module_store::model::NewScanResult` (`spec.md` §3
/// "ScanSummary").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSummary {
    pub scan_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub platform: Platform,
    pub version: Option<String>,
    pub hardware_model: Option<String>,
    pub total_bugs: i32,
    pub bug_critical_high: i32,
    pub total_psirts: i32,
    pub psirt_critical_high: i32,
    pub hardware_filtered_count: i32,
    pub feature_filtered_count: i32,
    pub query_time_ms: i64,
}

/// Full result of a scan (`spec.md` §3 "ScanResult"): the summary plus the
/// ordered, paginated match list, plus the raw funnel counters used for
/// observability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub summary: ScanSummary,
    pub matches: Vec<MatchedVulnerability>,
    pub total_checked: usize,
    pub version_matches: usize,
}
