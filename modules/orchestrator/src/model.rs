use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity + severity of a matched vulnerability, carried into a scan
/// comparison without the full `MatchedVulnerability` detail (`spec.md`
/// §4.5(c) "Scan comparison").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonEntry {
    pub external_id: String,
    pub severity: i16,
}

/// `last_scan` vs `previous_scan` for one device, diffed by `external_id`
/// (`spec.md` §4.5(c)). Both scans must exist; see
/// [`crate::Error::NoScanHistory`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanComparison {
    pub device_id: Uuid,
    pub previous_scan_id: Uuid,
    pub last_scan_id: Uuid,
    pub fixed: Vec<ComparisonEntry>,
    pub new: Vec<ComparisonEntry>,
    pub unchanged: Vec<ComparisonEntry>,
    pub fixed_by_severity: BTreeMap<i16, usize>,
    pub new_by_severity: BTreeMap<i16, usize>,
    pub unchanged_by_severity: BTreeMap<i16, usize>,
}

/// `spec.md` §4.5(c) "Version comparison" recommendation tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// The hypothetical-upgrade recommendation produced by comparing a fresh
/// scan at `target_version` against the device's current `last_scan`
/// (`spec.md` §4.5(c)).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionComparisonResult {
    pub device_id: Uuid,
    pub current_version: String,
    pub target_version: String,
    pub risk_level: RiskLevel,
    pub risk_score: u8,
    pub narrative: String,
    pub current_critical_count: usize,
    pub target_critical_count: usize,
    pub current_total_count: usize,
    pub target_total_count: usize,
}
