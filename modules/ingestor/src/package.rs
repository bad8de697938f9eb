use std::io::Read;
use std::path::Path;

use chrono::{DateTime, Utc};
use fleetguard_module_predictor::taxonomy::Taxonomy;
use fleetguard_module_store::VulnStore;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{instrument, warn};

use crate::error::Error;
use crate::record::RawRecord;

/// `manifest.json` inside an offline update package (`spec.md` §6.1).
#[derive(Debug, Deserialize)]
pub struct Manifest {
    pub schema_version: String,
    pub created: DateTime<Utc>,
    pub file: String,
    pub sha256: String,
    pub description: Option<String>,
    pub record_count: i64,
}

/// Per-package outcome (`spec.md` §6.1 apply step 3).
#[derive(Debug, Clone, Default)]
pub struct UpdateReport {
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
    pub unchanged: usize,
    pub errors: Vec<String>,
}

struct ExtractedPackage {
    manifest: Manifest,
    data: Vec<u8>,
}

/// Opens the zip archive and pulls out the manifest plus the raw bytes of
/// the data file it names, without touching the store. Kept synchronous and
/// run via `spawn_blocking` by the caller since the `zip` crate has no async
/// API.
fn extract(bytes: &[u8]) -> Result<ExtractedPackage, Error> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))?;

    let manifest: Manifest = {
        let mut entry = archive
            .by_name("manifest.json")
            .map_err(|_| Error::MissingEntry("manifest.json"))?;
        let mut raw = String::new();
        entry.read_to_string(&mut raw)?;
        serde_json::from_str(&raw).map_err(Error::Json)?
    };

    let data = {
        let mut entry = archive
            .by_name(&manifest.file)
            .map_err(|_| Error::MissingEntry("labeled_update.jsonl"))?;
        let mut buf = Vec::new();
        entry.read_to_end(&mut buf)?;
        buf
    };

    Ok(ExtractedPackage { manifest, data })
}

/// Verifies, parses, and applies an offline vulnerability update package
/// (`spec.md` §6.1). A hash mismatch aborts the whole package with
/// [`Error::HashMismatch`]; any other per-record problem is recorded in the
/// returned report and does not stop the batch.
#[instrument(skip(store, taxonomy), fields(path = %path.display()))]
pub async fn apply_update_package(
    store: &VulnStore,
    taxonomy: &Taxonomy,
    path: &Path,
    skip_hash_check: bool,
) -> Result<UpdateReport, Error> {
    let bytes = tokio::fs::read(path).await?;
    let ExtractedPackage { manifest, data } =
        tokio::task::spawn_blocking(move || extract(&bytes)).await.expect("extraction task panicked")?;

    if !skip_hash_check {
        let mut hasher = Sha256::new();
        hasher.update(&data);
        let actual = hex::encode(hasher.finalize());
        if !actual.eq_ignore_ascii_case(&manifest.sha256) {
            return Err(Error::HashMismatch {
                expected: manifest.sha256,
                actual,
            });
        }
    }

    let mut report = UpdateReport::default();

    for (line_no, line) in std::str::from_utf8(&data)?.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Err(err) = apply_record(store, taxonomy, line, &mut report).await {
            report.skipped += 1;
            report.errors.push(format!("line {}: {err}", line_no + 1));
        }
    }

    Ok(report)
}

async fn apply_record(
    store: &VulnStore,
    taxonomy: &Taxonomy,
    line: &str,
    report: &mut UpdateReport,
) -> Result<(), String> {
    let raw: RawRecord = serde_json::from_str(line).map_err(|err| format!("malformed JSON: {err}"))?;
    let mut parsed = raw.parse()?;

    let unknown: Vec<String> = taxonomy
        .unknown_labels(parsed.platform, &parsed.labels)
        .into_iter()
        .map(str::to_string)
        .collect();
    if !unknown.is_empty() {
        warn!(external_id = %parsed.external_id, ?unknown, "record references unknown taxonomy labels, dropping labels");
        parsed.labels.clear();
    }

    let existing = store
        .query_by_advisory(&parsed.external_id, parsed.platform)
        .await
        .map_err(|err| err.to_string())?;

    match existing {
        None => {
            store
                .insert_vulnerability(parsed.into_new_vulnerability())
                .await
                .map_err(|err| err.to_string())?;
            report.inserted += 1;
        }
        Some(existing) => {
            let existing_labels: Vec<String> =
                serde_json::from_value(existing.labels_json).unwrap_or_default();
            if existing_labels != parsed.labels {
                store
                    .update_vulnerability_labels(
                        existing.vuln_id,
                        parsed.labels,
                        fleetguard_entity::LabelsSource::Imported,
                    )
                    .await
                    .map_err(|err| err.to_string())?;
                report.updated += 1;
            } else {
                report.unchanged += 1;
            }
        }
    }

    Ok(())
}
