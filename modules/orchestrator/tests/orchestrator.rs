use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fleetguard_entity::{DbPatternKind, DeviceSource, DiscoveryStatus, LabelsSource, Platform, VulnKind};
use fleetguard_module_orchestrator::job::JobStatus;
use fleetguard_module_orchestrator::traits::{
    Collector, CollectorError, DeviceSnapshot, InventorySource, InventorySourceError,
    TransportCredential,
};
use fleetguard_module_orchestrator::{BulkScanFilter, VerificationOrchestrator};
use fleetguard_module_orchestrator::traits::DeviceStub;
use fleetguard_module_predictor::example_index::ExampleIndex;
use fleetguard_module_predictor::taxonomy::Taxonomy;
use fleetguard_module_predictor::traits::{Embedder, EmbedderError, LlmBackend, LlmBackendError, LlmRequest, LlmResponse};
use fleetguard_module_predictor::LabelPredictor;
use fleetguard_module_store::model::{DiscoveryUpdate, NewDevice, NewVulnerability};
use fleetguard_test_context::FleetGuardContext;
use test_context::test_context;
use test_log::test;

struct StubEmbedder;

#[async_trait]
impl Embedder for StubEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbedderError> {
        Ok(vec![1.0, 0.0])
    }
}

struct StubLlm;

#[async_trait]
impl LlmBackend for StubLlm {
    async fn infer(&self, _request: LlmRequest) -> Result<LlmResponse, LlmBackendError> {
        Ok(LlmResponse {
            labels: vec!["snmp".to_string()],
            confidence: 0.9,
        })
    }
}

fn orchestrator_config() -> fleetguard_common::config::Orchestrator {
    fleetguard_common::config::Orchestrator {
        scan_workers: 4,
        collector_deadline: Duration::from_secs(5),
        job_deadline: Duration::from_secs(5),
    }
}

fn explicit_bug(external_id: &str, severity: i16, versions: &[&str]) -> NewVulnerability {
    NewVulnerability {
        external_id: external_id.to_string(),
        kind: VulnKind::Bug,
        platform: Platform::IosXe,
        hardware_model: None,
        severity,
        headline: format!("{external_id} headline"),
        summary: "Heap overflow in SNMP subsystem.".to_string(),
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

async fn discovered_device(ctx: &FleetGuardContext, hostname: &str, version: &str) -> uuid::Uuid {
    let device_id = ctx
        .insert_device(NewDevice {
            external_id: None,
            hostname: hostname.to_string(),
            ip: "10.0.0.1".to_string(),
            location: None,
            device_type: None,
            source: DeviceSource::Manual,
        })
        .await
        .expect("insert device");

    ctx.apply_discovery(
        device_id,
        DiscoveryUpdate {
            platform: Some(Platform::IosXe),
            version: Some(version.to_string()),
            hardware_model: None,
            features: Vec::new(),
            status: DiscoveryStatus::Success,
            error: None,
        },
    )
    .await
    .expect("apply discovery");

    device_id
}

#[test_context(FleetGuardContext)]
#[test(tokio::test)]
async fn bulk_scan_records_a_result_per_device(ctx: &FleetGuardContext) {
    ctx.insert_vulnerability(explicit_bug("CSCwx20001", 1, &["17.3.1"]))
        .await
        .expect("insert vuln");

    let device_id = discovered_device(ctx, "router-a", "17.3.1").await;

    let orchestrator = VerificationOrchestrator::new(ctx.store.clone(), orchestrator_config());
    let job_id = orchestrator
        .start_bulk_scan(BulkScanFilter::default())
        .await
        .expect("start bulk scan");

    let status = wait_for_completion(&orchestrator, job_id).await;
    assert_eq!(status.total, 1);
    assert_eq!(status.completed, 1);
    assert_eq!(status.failed, 0);
    assert_eq!(status.results_summary.len(), 1);
    assert!(status.results_summary[0].scan_id.is_some());

    let device = ctx.get_device(device_id).await.expect("query").expect("device exists");
    assert!(device.last_scan_id.is_some());
}

#[test_context(FleetGuardContext)]
#[test(tokio::test)]
async fn bulk_scan_partial_failure_does_not_abort_the_job(ctx: &FleetGuardContext) {
    let good = discovered_device(ctx, "router-good", "17.3.1").await;

    // A device stuck mid-discovery (no version) cannot be scanned and is
    // recorded as a per-device failure, not a job-aborting error
    // (`spec.md` §8 scenario 6 "Bulk scan partial failure").
    let bad_id = ctx
        .insert_device(NewDevice {
            external_id: None,
            hostname: "router-bad".to_string(),
            ip: "10.0.0.2".to_string(),
            location: None,
            device_type: None,
            source: DeviceSource::Manual,
        })
        .await
        .expect("insert device");
    ctx.apply_discovery(
        bad_id,
        DiscoveryUpdate {
            platform: Some(Platform::IosXe),
            version: None,
            hardware_model: None,
            features: Vec::new(),
            status: DiscoveryStatus::Success,
            error: None,
        },
    )
    .await
    .expect("apply discovery");

    let orchestrator = VerificationOrchestrator::new(ctx.store.clone(), orchestrator_config());
    let job_id = orchestrator
        .start_bulk_scan(BulkScanFilter::default())
        .await
        .expect("start bulk scan");

    let status = wait_for_completion(&orchestrator, job_id).await;
    assert_eq!(status.total, 2);
    assert_eq!(status.completed, 2);
    assert_eq!(status.failed, 1);

    let good_outcome = status
        .results_summary
        .iter()
        .find(|o| o.device_id == good)
        .expect("good device present");
    assert!(good_outcome.error.is_none());

    let bad_outcome = status
        .results_summary
        .iter()
        .find(|o| o.device_id == bad_id)
        .expect("bad device present");
    assert!(bad_outcome.error.is_some());
}

#[test_context(FleetGuardContext)]
#[test(tokio::test)]
async fn scan_comparison_reports_fixed_and_new(ctx: &FleetGuardContext) {
    let device_id = discovered_device(ctx, "router-c", "17.3.1").await;
    let orchestrator = VerificationOrchestrator::new(ctx.store.clone(), orchestrator_config());

    ctx.insert_vulnerability(explicit_bug("CSCwx20010", 1, &["17.3.1"]))
        .await
        .expect("insert first vuln");

    let job_id = orchestrator
        .start_bulk_scan(BulkScanFilter {
            device_ids: Some(vec![device_id]),
            ..Default::default()
        })
        .await
        .expect("first scan");
    wait_for_completion(&orchestrator, job_id).await;

    ctx.insert_vulnerability(explicit_bug("CSCwx20011", 2, &["17.3.1"]))
        .await
        .expect("insert second vuln");

    let job_id = orchestrator
        .start_bulk_scan(BulkScanFilter {
            device_ids: Some(vec![device_id]),
            ..Default::default()
        })
        .await
        .expect("second scan");
    wait_for_completion(&orchestrator, job_id).await;

    let comparison = orchestrator
        .scan_comparison(device_id)
        .await
        .expect("scan comparison");

    assert_eq!(comparison.unchanged.len(), 1);
    assert_eq!(comparison.new.len(), 1);
    assert!(comparison.fixed.is_empty());
    assert_eq!(comparison.new[0].external_id, "CSCwx20011");
}

#[test_context(FleetGuardContext)]
#[test(tokio::test)]
async fn version_comparison_flags_high_risk_on_new_critical(ctx: &FleetGuardContext) {
    let device_id = discovered_device(ctx, "router-d", "17.3.1").await;
    let orchestrator = VerificationOrchestrator::new(ctx.store.clone(), orchestrator_config());

    let job_id = orchestrator
        .start_bulk_scan(BulkScanFilter {
            device_ids: Some(vec![device_id]),
            ..Default::default()
        })
        .await
        .expect("baseline scan");
    wait_for_completion(&orchestrator, job_id).await;

    ctx.insert_vulnerability(explicit_bug("CSCwx20020", 1, &["17.4.0"]))
        .await
        .expect("insert vuln affecting target version only");

    let comparison = orchestrator
        .version_comparison(device_id, "17.4.0")
        .await
        .expect("version comparison");

    assert_eq!(
        comparison.risk_level,
        fleetguard_module_orchestrator::model::RiskLevel::High
    );
    assert_eq!(comparison.target_critical_count, 1);
    assert_eq!(comparison.current_critical_count, 0);
}

struct StubCollector {
    snapshot: Result<DeviceSnapshot, String>,
}

#[async_trait]
impl Collector for StubCollector {
    async fn collect(
        &self,
        _host: &str,
        _credential: &TransportCredential,
        _deadline: Duration,
    ) -> Result<DeviceSnapshot, CollectorError> {
        self.snapshot
            .clone()
            .map_err(CollectorError::Transport)
    }
}

#[test_context(FleetGuardContext)]
#[test(tokio::test)]
async fn discovery_failure_marks_device_failed_without_erroring(ctx: &FleetGuardContext) {
    let device_id = ctx
        .insert_device(NewDevice {
            external_id: None,
            hostname: "router-e".to_string(),
            ip: "10.0.0.3".to_string(),
            location: None,
            device_type: None,
            source: DeviceSource::Manual,
        })
        .await
        .expect("insert device");

    let orchestrator = VerificationOrchestrator::new(ctx.store.clone(), orchestrator_config());
    let collector = StubCollector {
        snapshot: Err("connection refused".to_string()),
    };

    orchestrator
        .discover_device(
            device_id,
            "router-e.example.com",
            &collector,
            &TransportCredential("irrelevant".to_string()),
        )
        .await
        .expect("discover_device itself never errors on a transport failure");

    let device = ctx.get_device(device_id).await.expect("query").expect("device exists");
    assert_eq!(device.discovery_status, DiscoveryStatus::Failed);
    assert!(device.discovery_error.is_some());
}

struct StubInventory {
    stubs: Vec<DeviceStub>,
}

#[async_trait]
impl InventorySource for StubInventory {
    async fn list(&self) -> Result<Vec<DeviceStub>, InventorySourceError> {
        Ok(self.stubs.clone())
    }
}

#[test_context(FleetGuardContext)]
#[test(tokio::test)]
async fn inventory_sync_skips_duplicates(ctx: &FleetGuardContext) {
    let orchestrator = VerificationOrchestrator::new(ctx.store.clone(), orchestrator_config());
    let source = StubInventory {
        stubs: vec![DeviceStub {
            hostname: "router-f".to_string(),
            ip: "10.0.0.4".to_string(),
            location: None,
            device_type: None,
        }],
    };

    let first = orchestrator.sync_inventory(&source).await.expect("first sync");
    assert_eq!(first.inserted, 1);
    assert_eq!(first.already_present, 0);

    let second = orchestrator.sync_inventory(&source).await.expect("second sync");
    assert_eq!(second.inserted, 0);
    assert_eq!(second.already_present, 1);
}

#[test_context(FleetGuardContext)]
#[test(tokio::test)]
async fn scan_by_advisory_uses_predicted_labels(ctx: &FleetGuardContext) {
    ctx.insert_vulnerability(explicit_bug("CSCwx20002", 1, &["17.3.1"]))
        .await
        .expect("insert vuln");
    let mut labeled = explicit_bug("CSCwx20003", 1, &["17.3.1"]);
    labeled.labels = vec!["snmp".to_string()];
    ctx.insert_vulnerability(labeled).await.expect("insert labeled vuln");

    let device_id = discovered_device(ctx, "router-advisory", "17.3.1").await;

    let predictor = LabelPredictor::new(
        ctx.store.clone(),
        Arc::new(ExampleIndex::default()),
        Arc::new(StubEmbedder),
        Arc::new(StubLlm),
        Arc::new(Taxonomy::default()),
        fleetguard_common::config::Predictor::default(),
    );

    let orchestrator =
        VerificationOrchestrator::new(ctx.store.clone(), orchestrator_config()).with_predictor(predictor);

    let (prediction, result) = orchestrator
        .scan_by_advisory(device_id, "Heap overflow observed in the SNMP subsystem.")
        .await
        .expect("scan by advisory");

    assert_eq!(prediction.labels, vec!["snmp".to_string()]);
    assert!(result.matches.iter().any(|m| m.external_id() == "CSCwx20003"));
}

#[test_context(FleetGuardContext)]
#[test(tokio::test)]
async fn scan_by_advisory_without_predictor_errors(ctx: &FleetGuardContext) {
    let device_id = discovered_device(ctx, "router-no-predictor", "17.3.1").await;
    let orchestrator = VerificationOrchestrator::new(ctx.store.clone(), orchestrator_config());

    let err = orchestrator
        .scan_by_advisory(device_id, "Heap overflow observed in the SNMP subsystem.")
        .await
        .expect_err("predictor not configured");

    assert!(matches!(err, fleetguard_module_orchestrator::Error::PredictorUnavailable));
}

async fn wait_for_completion(orchestrator: &VerificationOrchestrator, job_id: uuid::Uuid) -> JobStatus {
    for _ in 0..200 {
        let status = orchestrator.job_status(job_id).await.expect("job exists");
        if status.completed >= status.total {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("bulk scan job did not complete in time");
}
