use chrono::{DateTime, Utc};
use fleetguard_entity::{DbPatternKind, DeviceSource, LabelsSource, Platform, VulnKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Input to `VulnStore::insert_vulnerability` — the caller-facing counterpart
/// of `entity::vulnerability::Model`, without the generated id/timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewVulnerability {
    pub external_id: String,
    pub kind: VulnKind,
    pub platform: Platform,
    pub hardware_model: Option<String>,
    pub severity: i16,
    pub headline: String,
    pub summary: String,
    pub status: String,
    pub advisory_url: Option<String>,
    pub affected_versions_raw: String,
    pub pattern_kind: DbPatternKind,
    pub version_min: Option<String>,
    pub version_max: Option<String>,
    pub fixed_version: Option<String>,
    pub explicit_list: Vec<String>,
    pub labels: Vec<String>,
    pub labels_source: LabelsSource,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDevice {
    pub external_id: Option<String>,
    pub hostname: String,
    pub ip: String,
    pub location: Option<String>,
    pub device_type: Option<String>,
    pub source: DeviceSource,
}

/// The flat `ScanSummary` fields plus the full serialized body, as written by
/// `insert_scan_result` (`spec.md` §3 "ScanSummary"/"ScanResult"). Kept
/// primitive here so this crate does not depend on `fleetguard-module-scan`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewScanResult {
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
    pub body_json: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryUpdate {
    pub platform: Option<Platform>,
    pub version: Option<String>,
    pub hardware_model: Option<String>,
    pub features: Vec<String>,
    pub status: fleetguard_entity::DiscoveryStatus,
    pub error: Option<String>,
}
