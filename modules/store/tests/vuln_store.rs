use fleetguard_entity::{DbPatternKind, DeviceSource, LabelsSource, Platform, VulnKind};
use fleetguard_module_store::model::{NewDevice, NewScanResult, NewVulnerability};
use fleetguard_test_context::FleetGuardContext;
use futures::TryStreamExt;
use test_context::test_context;
use test_log::test;

fn sample_vuln(external_id: &str) -> NewVulnerability {
    NewVulnerability {
        external_id: external_id.to_string(),
        kind: VulnKind::Bug,
        platform: Platform::IosXe,
        hardware_model: None,
        severity: 1,
        headline: "heap overflow in SNMP subsystem".to_string(),
        summary: "details".to_string(),
        status: "confirmed".to_string(),
        advisory_url: None,
        affected_versions_raw: "17.3.1, 17.3.2".to_string(),
        pattern_kind: DbPatternKind::Explicit,
        version_min: None,
        version_max: None,
        fixed_version: Some("17.3.3".to_string()),
        explicit_list: vec!["17.3.1".to_string(), "17.3.2".to_string()],
        labels: vec!["snmp".to_string()],
        labels_source: LabelsSource::Imported,
    }
}

#[test_context(FleetGuardContext)]
#[test(tokio::test)]
async fn insert_and_query_by_advisory(ctx: &FleetGuardContext) {
    let vuln_id = ctx
        .insert_vulnerability(sample_vuln("CSCvx00001"))
        .await
        .expect("insert");

    let found = ctx
        .query_by_advisory("CSCvx00001", Platform::IosXe)
        .await
        .expect("query")
        .expect("present");

    assert_eq!(found.vuln_id, vuln_id);
    assert_eq!(found.labels(), vec!["snmp".to_string()]);
}

#[test_context(FleetGuardContext)]
#[test(tokio::test)]
async fn duplicate_external_id_rejected(ctx: &FleetGuardContext) {
    ctx.insert_vulnerability(sample_vuln("CSCvx00002"))
        .await
        .expect("first insert");

    let err = ctx
        .insert_vulnerability(sample_vuln("CSCvx00002"))
        .await
        .expect_err("second insert must fail");

    assert!(matches!(err, fleetguard_module_store::Error::DuplicateExternalId));
}

#[test_context(FleetGuardContext)]
#[test(tokio::test)]
async fn query_by_platform_orders_by_severity_ascending(ctx: &FleetGuardContext) {
    let mut low = sample_vuln("CSCvx00010");
    low.severity = 4;
    let mut critical = sample_vuln("CSCvx00011");
    critical.severity = 1;

    ctx.insert_vulnerability(low).await.expect("insert low");
    ctx.insert_vulnerability(critical)
        .await
        .expect("insert critical");

    let stream = ctx
        .query_by_platform(Platform::IosXe)
        .await
        .expect("query stream");
    let rows: Vec<_> = stream.try_collect().await.expect("collect");

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].external_id, "CSCvx00011");
    assert_eq!(rows[1].external_id, "CSCvx00010");
}

#[test_context(FleetGuardContext)]
#[test(tokio::test)]
async fn relabeling_rebuilds_label_index(ctx: &FleetGuardContext) {
    let vuln_id = ctx
        .insert_vulnerability(sample_vuln("CSCvx00020"))
        .await
        .expect("insert");

    ctx.update_vulnerability_labels(
        vuln_id,
        vec!["snmp".to_string(), "dos".to_string()],
        LabelsSource::Llm,
    )
    .await
    .expect("relabel");

    let updated = ctx
        .get_vulnerability(vuln_id)
        .await
        .expect("query")
        .expect("present");

    let mut labels = updated.labels();
    labels.sort();
    assert_eq!(labels, vec!["dos".to_string(), "snmp".to_string()]);
    assert_eq!(updated.labels_source, LabelsSource::Llm);
}

#[test_context(FleetGuardContext)]
#[test(tokio::test)]
async fn scan_result_rotates_device_slots(ctx: &FleetGuardContext) {
    let device_id = ctx
        .insert_device(NewDevice {
            external_id: None,
            hostname: "edge-router-1".to_string(),
            ip: "10.0.0.1".to_string(),
            location: None,
            device_type: None,
            source: DeviceSource::Manual,
        })
        .await
        .expect("insert device");

    let first_scan = uuid::Uuid::new_v4();
    ctx.insert_scan_result(
        device_id,
        NewScanResult {
            scan_id: first_scan,
            timestamp: chrono::Utc::now(),
            platform: Platform::IosXe,
            version: Some("17.3.1".to_string()),
            hardware_model: None,
            total_bugs: 3,
            bug_critical_high: 1,
            total_psirts: 0,
            psirt_critical_high: 0,
            hardware_filtered_count: 0,
            feature_filtered_count: 0,
            query_time_ms: 12,
            body_json: serde_json::json!({}),
        },
    )
    .await
    .expect("first scan result");

    let second_scan = uuid::Uuid::new_v4();
    ctx.insert_scan_result(
        device_id,
        NewScanResult {
            scan_id: second_scan,
            timestamp: chrono::Utc::now(),
            platform: Platform::IosXe,
            version: Some("17.3.3".to_string()),
            hardware_model: None,
            total_bugs: 1,
            bug_critical_high: 0,
            total_psirts: 0,
            psirt_critical_high: 0,
            hardware_filtered_count: 0,
            feature_filtered_count: 0,
            query_time_ms: 9,
            body_json: serde_json::json!({}),
        },
    )
    .await
    .expect("second scan result");

    let device = ctx.get_device(device_id).await.expect("query").expect("present");
    assert_eq!(device.last_scan_id, Some(second_scan));
    assert_eq!(device.previous_scan_id, Some(first_scan));
}

#[test_context(FleetGuardContext)]
#[test(tokio::test)]
async fn duplicate_device_identity_rejected(ctx: &FleetGuardContext) {
    let new_device = || NewDevice {
        external_id: None,
        hostname: "core-switch-1".to_string(),
        ip: "10.0.0.2".to_string(),
        location: None,
        device_type: None,
        source: DeviceSource::Directory,
    };

    ctx.insert_device(new_device()).await.expect("first insert");
    let err = ctx
        .insert_device(new_device())
        .await
        .expect_err("second insert must fail");

    assert!(matches!(err, fleetguard_module_store::Error::DuplicateDevice));
}
