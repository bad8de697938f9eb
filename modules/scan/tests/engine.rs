use fleetguard_entity::{DbPatternKind, LabelsSource, Platform, VulnKind};
use fleetguard_module_scan::model::{MatchedVulnerability, ScanRequest};
use fleetguard_module_scan::ScanEngine;
use fleetguard_module_store::model::NewVulnerability;
use fleetguard_test_context::FleetGuardContext;
use test_context::test_context;
use test_log::test;

fn explicit(external_id: &str, severity: i16, versions: &[&str]) -> NewVulnerability {
    NewVulnerability {
        external_id: external_id.to_string(),
        kind: VulnKind::Bug,
        platform: Platform::IosXe,
        hardware_model: None,
        severity,
        headline: format!("{external_id} headline"),
        summary: "A crafted packet can trigger a crash. Workaround: none.".to_string(),
        status: "confirmed".to_string(),
        advisory_url: None,
        affected_versions_raw: versions.join(", "),
        pattern_kind: DbPatternKind::Explicit,
        version_min: None,
        version_max: None,
        fixed_version: None,
        explicit_list: versions.iter().map(|v| v.to_string()).collect(),
        labels: Vec::new(),
        labels_source: LabelsSource::Imported,
    }
}

#[test_context(FleetGuardContext)]
#[test(tokio::test)]
async fn version_filter_excludes_unaffected_devices(ctx: &FleetGuardContext) {
    ctx.insert_vulnerability(explicit("CSCvx10001", 1, &["17.3.1"]))
        .await
        .expect("insert");

    let engine = ScanEngine::new(ctx.store.clone());

    let result = engine
        .scan(ScanRequest {
            platform: Platform::IosXe,
            version: "17.3.2".to_string(),
            hardware_model: None,
            features: Vec::new(),
            severity_filter: None,
            limit: None,
            offset: None,
        })
        .await
        .expect("scan");

    assert_eq!(result.total_checked, 1);
    assert_eq!(result.version_matches, 0);
    assert!(result.matches.is_empty());
}

#[test_context(FleetGuardContext)]
#[test(tokio::test)]
async fn critical_high_matches_are_detailed_and_medium_low_collapsed(ctx: &FleetGuardContext) {
    ctx.insert_vulnerability(explicit("CSCvx10010", 1, &["17.3.1"]))
        .await
        .expect("insert critical");
    ctx.insert_vulnerability(explicit("CSCvx10011", 4, &["17.3.1"]))
        .await
        .expect("insert low");

    let engine = ScanEngine::new(ctx.store.clone());

    let result = engine
        .scan(ScanRequest {
            platform: Platform::IosXe,
            version: "17.3.1".to_string(),
            hardware_model: None,
            features: Vec::new(),
            severity_filter: None,
            limit: None,
            offset: None,
        })
        .await
        .expect("scan");

    assert_eq!(result.version_matches, 2);
    assert_eq!(result.matches.len(), 2);
    assert!(matches!(result.matches[0], MatchedVulnerability::Detailed(_)));
    assert!(matches!(result.matches[1], MatchedVulnerability::Collapsed(_)));
    assert_eq!(result.summary.bug_critical_high, 1);
    assert_eq!(result.summary.total_bugs, 2);
}

#[test_context(FleetGuardContext)]
#[test(tokio::test)]
async fn hardware_filter_excludes_mismatched_models(ctx: &FleetGuardContext) {
    let mut scoped = explicit("CSCvx10020", 1, &["17.3.1"]);
    scoped.hardware_model = Some("ASR1001-X".to_string());
    ctx.insert_vulnerability(scoped).await.expect("insert");

    let engine = ScanEngine::new(ctx.store.clone());

    let result = engine
        .scan(ScanRequest {
            platform: Platform::IosXe,
            version: "17.3.1".to_string(),
            hardware_model: Some("ASR1002-X".to_string()),
            features: Vec::new(),
            severity_filter: None,
            limit: None,
            offset: None,
        })
        .await
        .expect("scan");

    assert_eq!(result.summary.hardware_filtered_count, 1);
    assert!(result.matches.is_empty());
}

#[test_context(FleetGuardContext)]
#[test(tokio::test)]
async fn feature_filter_keeps_unlabeled_candidates_but_flags_them(ctx: &FleetGuardContext) {
    ctx.insert_vulnerability(explicit("CSCvx10030", 1, &["17.3.1"]))
        .await
        .expect("insert unlabeled");

    let mut labeled = explicit("CSCvx10031", 1, &["17.3.1"]);
    labeled.labels = vec!["bgp".to_string()];
    ctx.insert_vulnerability(labeled).await.expect("insert labeled");

    let mut mismatched = explicit("CSCvx10032", 1, &["17.3.1"]);
    mismatched.labels = vec!["ospf".to_string()];
    ctx.insert_vulnerability(mismatched)
        .await
        .expect("insert mismatched");

    let engine = ScanEngine::new(ctx.store.clone());

    let result = engine
        .scan(ScanRequest {
            platform: Platform::IosXe,
            version: "17.3.1".to_string(),
            hardware_model: None,
            features: vec!["bgp".to_string()],
            severity_filter: None,
            limit: None,
            offset: None,
        })
        .await
        .expect("scan");

    assert_eq!(result.summary.feature_filtered_count, 1);
    assert_eq!(result.matches.len(), 2);

    let unlabeled_match = result
        .matches
        .iter()
        .find(|m| m.external_id() == "CSCvx10030")
        .expect("unlabeled candidate survives");
    match unlabeled_match {
        MatchedVulnerability::Detailed(m) => assert!(m.unlabeled),
        MatchedVulnerability::Collapsed(_) => panic!("expected a detailed match at severity 1"),
    }
}

#[test_context(FleetGuardContext)]
#[test(tokio::test)]
async fn pagination_applies_after_grouping(ctx: &FleetGuardContext) {
    for i in 0..5 {
        ctx.insert_vulnerability(explicit(&format!("CSCvx1010{i}"), 1, &["17.3.1"]))
            .await
            .expect("insert");
    }

    let engine = ScanEngine::new(ctx.store.clone());

    let result = engine
        .scan(ScanRequest {
            platform: Platform::IosXe,
            version: "17.3.1".to_string(),
            hardware_model: None,
            features: Vec::new(),
            severity_filter: None,
            limit: Some(2),
            offset: Some(1),
        })
        .await
        .expect("scan");

    assert_eq!(result.version_matches, 5);
    assert_eq!(result.matches.len(), 2);
}
