use std::collections::{BTreeMap, HashMap};

use fleetguard_module_scan::ScanEngine;
use fleetguard_module_scan::model::{ScanRequest, ScanResult};
use fleetguard_module_store::VulnStore;
use tracing::instrument;
use uuid::Uuid;

use crate::error::Error;
use crate::model::{ComparisonEntry, RiskLevel, ScanComparison, VersionComparisonResult};

/// Critical severity on the 1-6 scale (`spec.md` §3 "severity (integer
/// 1-6; 1 = Critical)"). The version-comparison risk table keys
/// specifically off Critical-count deltas, distinct from the
/// Critical+High grouping `ScanEngine` uses for detail-vs-collapsed
/// projection.
const CRITICAL: i16 = 1;

fn decode_body(body_json: &serde_json::Value) -> Result<ScanResult, Error> {
    serde_json::from_value(body_json.clone()).map_err(|err| Error::Store(err.into()))
}

fn entries(result: &ScanResult) -> HashMap<String, i16> {
    result
        .matches
        .iter()
        .map(|m| (m.external_id().to_string(), m.severity()))
        .collect()
}

fn count_by_severity(ids: &[ComparisonEntry]) -> BTreeMap<i16, usize> {
    let mut counts = BTreeMap::new();
    for entry in ids {
        *counts.entry(entry.severity).or_insert(0) += 1;
    }
    counts
}

fn critical_count(result: &ScanResult) -> usize {
    result
        .matches
        .iter()
        .filter(|m| m.severity() == CRITICAL)
        .count()
}

/// Diffs `device.last_scan` against `device.previous_scan` by `external_id`
/// (`spec.md` §4.5(c) "Scan comparison"). Both slots must be populated;
/// absence of either is [`Error::NoScanHistory`], not an empty comparison.
#[instrument(skip(store))]
pub async fn scan_comparison(store: &VulnStore, device_id: Uuid) -> Result<ScanComparison, Error> {
    let device = store
        .get_device(device_id)
        .await?
        .ok_or(Error::DeviceNotFound(device_id))?;

    let (Some(last_scan_id), Some(previous_scan_id)) = (device.last_scan_id, device.previous_scan_id)
    else {
        return Err(Error::NoScanHistory);
    };

    let last = store
        .get_scan_result(last_scan_id)
        .await?
        .ok_or(Error::NoScanHistory)?;
    let previous = store
        .get_scan_result(previous_scan_id)
        .await?
        .ok_or(Error::NoScanHistory)?;

    let last_body = decode_body(&last.body_json)?;
    let previous_body = decode_body(&previous.body_json)?;

    let last_entries = entries(&last_body);
    let previous_entries = entries(&previous_body);

    let mut fixed = Vec::new();
    let mut unchanged = Vec::new();
    for (external_id, severity) in &previous_entries {
        if last_entries.contains_key(external_id) {
            unchanged.push(ComparisonEntry {
                external_id: external_id.clone(),
                severity: *severity,
            });
        } else {
            fixed.push(ComparisonEntry {
                external_id: external_id.clone(),
                severity: *severity,
            });
        }
    }

    let mut new = Vec::new();
    for (external_id, severity) in &last_entries {
        if !previous_entries.contains_key(external_id) {
            new.push(ComparisonEntry {
                external_id: external_id.clone(),
                severity: *severity,
            });
        }
    }

    fixed.sort_by(|a, b| a.external_id.cmp(&b.external_id));
    new.sort_by(|a, b| a.external_id.cmp(&b.external_id));
    unchanged.sort_by(|a, b| a.external_id.cmp(&b.external_id));

    Ok(ScanComparison {
        device_id,
        previous_scan_id,
        last_scan_id,
        fixed_by_severity: count_by_severity(&fixed),
        new_by_severity: count_by_severity(&new),
        unchanged_by_severity: count_by_severity(&unchanged),
        fixed,
        new,
        unchanged,
    })
}

/// Runs a second `ScanEngine` pass at `target_version` and compares it with
/// the device's current `last_scan`, producing the `{risk_level,
/// risk_score, narrative}` recommendation of `spec.md` §4.5(c) "Version
/// comparison". The rule table is fixed: a positive Critical-count delta
/// is always High regardless of how much the overall total drops.
#[instrument(skip(store, scan_engine))]
pub async fn version_comparison(
    store: &VulnStore,
    scan_engine: &ScanEngine,
    device_id: Uuid,
    target_version: &str,
) -> Result<VersionComparisonResult, Error> {
    let device = store
        .get_device(device_id)
        .await?
        .ok_or(Error::DeviceNotFound(device_id))?;

    let (Some(platform), Some(current_version)) = (device.platform, device.version.clone()) else {
        return Err(Error::NotDiscovered);
    };

    let last_scan_id = device.last_scan_id.ok_or(Error::NoScanHistory)?;
    let current = store
        .get_scan_result(last_scan_id)
        .await?
        .ok_or(Error::NoScanHistory)?;
    let current_body = decode_body(&current.body_json)?;

    let target_request = ScanRequest {
        platform,
        version: target_version.to_string(),
        hardware_model: device.hardware_model.clone(),
        features: device.features(),
        severity_filter: None,
        limit: None,
        offset: None,
    };
    let target_body = scan_engine.scan(target_request).await?;

    let current_critical = critical_count(&current_body);
    let target_critical = critical_count(&target_body);
    let current_total = current_body.matches.len();
    let target_total = target_body.matches.len();

    let critical_delta = target_critical as i64 - current_critical as i64;
    let total_delta = target_total as i64 - current_total as i64;

    let (risk_level, risk_score, narrative) = if critical_delta > 0 {
        (
            RiskLevel::High,
            (60 + 10 * critical_delta).clamp(0, 100) as u8,
            format!(
                "upgrading to {target_version} introduces {critical_delta} additional Critical \
                 finding(s) not present at {current_version}"
            ),
        )
    } else if total_delta < 0 && critical_delta <= 0 {
        (
            RiskLevel::Low,
            (20 + 5 * total_delta).clamp(0, 100) as u8,
            format!(
                "upgrading to {target_version} reduces total findings from {current_total} to \
                 {target_total} with no new Critical issues"
            ),
        )
    } else {
        (
            RiskLevel::Medium,
            50,
            format!(
                "upgrading to {target_version} changes total findings from {current_total} to \
                 {target_total} without a clear net improvement"
            ),
        )
    };

    Ok(VersionComparisonResult {
        device_id,
        current_version,
        target_version: target_version.to_string(),
        risk_level,
        risk_score,
        narrative,
        current_critical_count: current_critical,
        target_critical_count: target_critical,
        current_total_count: current_total,
        target_total_count: target_total,
    })
}
