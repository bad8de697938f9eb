use std::collections::HashMap;
use std::io::Write;

use fleetguard_entity::Platform;
use fleetguard_module_ingestor::apply_update_package;
use fleetguard_module_predictor::taxonomy::Taxonomy;
use fleetguard_module_predictor::traits::TaxonomyEntry;
use fleetguard_test_context::FleetGuardContext;
use sha2::{Digest, Sha256};
use test_context::test_context;
use test_log::test;

fn taxonomy_with(platform: Platform, labels: &[&str]) -> Taxonomy {
    let mut by_platform = HashMap::new();
    by_platform.insert(
        platform,
        labels
            .iter()
            .map(|label| TaxonomyEntry {
                label: label.to_string(),
                description: format!("{label} description"),
            })
            .collect(),
    );
    Taxonomy::new(by_platform)
}

fn build_package(jsonl: &str, tamper_hash: bool) -> tempfile::NamedTempFile {
    let sha = {
        let mut hasher = Sha256::new();
        hasher.update(jsonl.as_bytes());
        hex::encode(hasher.finalize())
    };
    let sha = if tamper_hash {
        "0".repeat(64)
    } else {
        sha
    };

    let manifest = serde_json::json!({
        "schema_version": "1.0",
        "created": "2026-01-01T00:00:00Z",
        "file": "labeled_update.jsonl",
        "sha256": sha,
        "description": "test package",
        "record_count": jsonl.lines().count(),
    });

    let file = tempfile::NamedTempFile::new().expect("create temp file");
    {
        let mut zip = zip::ZipWriter::new(file.reopen().expect("reopen"));
        let options = zip::write::SimpleFileOptions::default();

        zip.start_file("manifest.json", options).expect("start manifest entry");
        zip.write_all(manifest.to_string().as_bytes()).expect("write manifest");

        zip.start_file("labeled_update.jsonl", options).expect("start data entry");
        zip.write_all(jsonl.as_bytes()).expect("write jsonl");

        zip.finish().expect("finish archive");
    }

    file
}

#[test_context(FleetGuardContext)]
#[test(tokio::test)]
async fn applies_new_records_and_reports_counts(ctx: &FleetGuardContext) {
    let jsonl = [
        r#"{"bug_id":"CSCwx30001","kind":"bug","platform":"IOS-XE","headline":"h","summary":"s","affected_versions":"17.3.1","severity":1,"labels":["crash"]}"#,
        r#"not json at all"#,
        r#"{"advisory_id":"cisco-sa-30002","type":"psirt","platform":"IOS-XE","headline":"h2","summary":"s2","affected_versions":["17.3.1","17.4.0"],"severity":"High","labels":["overflow"]}"#,
    ]
    .join("\n");

    let package = build_package(&jsonl, false);
    let taxonomy = taxonomy_with(Platform::IosXe, &["crash", "overflow"]);

    let report = apply_update_package(&ctx.store, &taxonomy, package.path(), false)
        .await
        .expect("apply package");

    assert_eq!(report.inserted, 2);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.errors.len(), 1);

    let first = ctx
        .store
        .query_by_advisory("CSCwx30001", Platform::IosXe)
        .await
        .expect("query")
        .expect("first record inserted");
    assert_eq!(first.severity, 1);

    let second = ctx
        .store
        .query_by_advisory("cisco-sa-30002", Platform::IosXe)
        .await
        .expect("query")
        .expect("second record inserted");
    assert_eq!(second.severity, 2);
    assert_eq!(second.kind, fleetguard_entity::VulnKind::Advisory);
}

#[test_context(FleetGuardContext)]
#[test(tokio::test)]
async fn unknown_labels_are_dropped_not_rejected(ctx: &FleetGuardContext) {
    let jsonl = r#"{"bug_id":"CSCwx30010","kind":"bug","platform":"IOS-XE","headline":"h","summary":"s","affected_versions":"17.3.1","severity":1,"labels":["not_a_real_label"]}"#;

    let package = build_package(jsonl, false);
    let taxonomy = taxonomy_with(Platform::IosXe, &["crash"]);

    let report = apply_update_package(&ctx.store, &taxonomy, package.path(), false)
        .await
        .expect("apply package");

    assert_eq!(report.inserted, 1);

    let row = ctx
        .store
        .query_by_advisory("CSCwx30010", Platform::IosXe)
        .await
        .expect("query")
        .expect("record inserted despite unknown label");
    let labels: Vec<String> = serde_json::from_value(row.labels_json).unwrap();
    assert!(labels.is_empty());
}

#[test_context(FleetGuardContext)]
#[test(tokio::test)]
async fn hash_mismatch_aborts_the_whole_package(ctx: &FleetGuardContext) {
    let jsonl = r#"{"bug_id":"CSCwx30020","kind":"bug","platform":"IOS-XE","headline":"h","summary":"s","affected_versions":"17.3.1","severity":1,"labels":[]}"#;
    let package = build_package(jsonl, true);
    let taxonomy = taxonomy_with(Platform::IosXe, &[]);

    let err = apply_update_package(&ctx.store, &taxonomy, package.path(), false)
        .await
        .expect_err("tampered hash should be rejected");

    assert!(matches!(err, fleetguard_module_ingestor::Error::HashMismatch { .. }));

    let missing = ctx
        .store
        .query_by_advisory("CSCwx30020", Platform::IosXe)
        .await
        .expect("query");
    assert!(missing.is_none());
}

#[test_context(FleetGuardContext)]
#[test(tokio::test)]
async fn re_applying_with_changed_labels_updates_in_place(ctx: &FleetGuardContext) {
    let taxonomy = taxonomy_with(Platform::IosXe, &["crash", "overflow"]);

    let first = r#"{"bug_id":"CSCwx30030","kind":"bug","platform":"IOS-XE","headline":"h","summary":"s","affected_versions":"17.3.1","severity":1,"labels":["crash"]}"#;
    apply_update_package(&ctx.store, &taxonomy, build_package(first, false).path(), false)
        .await
        .expect("first apply");

    let second = r#"{"bug_id":"CSCwx30030","kind":"bug","platform":"IOS-XE","headline":"h","summary":"s","affected_versions":"17.3.1","severity":1,"labels":["crash","overflow"]}"#;
    let report = apply_update_package(&ctx.store, &taxonomy, build_package(second, false).path(), false)
        .await
        .expect("second apply");

    assert_eq!(report.inserted, 0);
    assert_eq!(report.updated, 1);

    let row = ctx
        .store
        .query_by_advisory("CSCwx30030", Platform::IosXe)
        .await
        .expect("query")
        .expect("record present");
    let labels: Vec<String> = serde_json::from_value(row.labels_json).unwrap();
    assert_eq!(labels, vec!["crash".to_string(), "overflow".to_string()]);
}
