use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use fleetguard_entity::{Platform, device};
use fleetguard_module_scan::ScanEngine;
use fleetguard_module_scan::model::ScanRequest;
use fleetguard_module_store::VulnStore;
use fleetguard_module_store::model::NewScanResult;
use tokio::sync::{RwLock, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::job::{DeviceScanOutcome, JobStatus};

/// Scans one `discovery_status == Success` device and persists the result,
/// per `spec.md` §4.5(a). A device missing `platform`/`version` despite a
/// `Success` status (shouldn't happen, but the type system allows it)
/// is recorded as a per-device failure rather than panicking — the job
/// keeps going either way.
#[instrument(skip(store, scan_engine, device), fields(device_id = %device.device_id))]
async fn scan_one_device(
    store: &VulnStore,
    scan_engine: &ScanEngine,
    device: &device::Model,
) -> DeviceScanOutcome {
    let outcome = async {
        let platform = device.platform.ok_or_else(|| "device has no discovered platform".to_string())?;
        let version = device
            .version
            .clone()
            .ok_or_else(|| "device has no discovered version".to_string())?;

        let request = ScanRequest {
            platform,
            version,
            hardware_model: device.hardware_model.clone(),
            features: device.features(),
            severity_filter: None,
            limit: None,
            offset: None,
        };

        let result = scan_engine
            .scan(request)
            .await
            .map_err(|err| err.to_string())?;

        let body_json = serde_json::to_value(&result).map_err(|err| err.to_string())?;
        let summary = result.summary;

        store
            .insert_scan_result(
                device.device_id,
                NewScanResult {
                    scan_id: summary.scan_id,
                    timestamp: summary.timestamp,
                    platform: summary.platform,
                    version: summary.version,
                    hardware_model: summary.hardware_model,
                    total_bugs: summary.total_bugs,
                    bug_critical_high: summary.bug_critical_high,
                    total_psirts: summary.total_psirts,
                    psirt_critical_high: summary.psirt_critical_high,
                    hardware_filtered_count: summary.hardware_filtered_count,
                    feature_filtered_count: summary.feature_filtered_count,
                    query_time_ms: summary.query_time_ms,
                    body_json,
                },
            )
            .await
            .map_err(|err| err.to_string())?;

        Ok::<Uuid, String>(summary.scan_id)
    }
    .await;

    match outcome {
        Ok(scan_id) => DeviceScanOutcome {
            device_id: device.device_id,
            hostname: device.hostname.clone(),
            scan_id: Some(scan_id),
            error: None,
        },
        Err(error) => {
            warn!(device_id = %device.device_id, %error, "device scan failed");
            DeviceScanOutcome {
                device_id: device.device_id,
                hostname: device.hostname.clone(),
                scan_id: None,
                error: Some(error),
            }
        }
    }
}

/// Drives a bounded-concurrency bulk scan across `devices` (`spec.md`
/// §4.5(a)). Mirrors the Semaphore-gated fan-out pattern used elsewhere in
/// this codebase for independent, partial-failure-tolerant concurrent
/// work: a fixed-width permit pool, one task per item, failures recorded
/// rather than propagated.
///
/// Cancellation (`cancel`) stops new tasks from being *started*; tasks
/// already running complete normally and their results are still recorded,
/// per §4.5 "Cancellation". The job's own parent deadline is enforced by
/// `job_deadline` wrapping the whole loop.
#[instrument(skip(store, scan_engine, devices, status, cancel))]
pub(crate) async fn run_bulk_scan(
    store: VulnStore,
    scan_engine: Arc<ScanEngine>,
    devices: Vec<device::Model>,
    status: Arc<RwLock<JobStatus>>,
    cancel: CancellationToken,
    workers: usize,
    job_deadline: Duration,
) {
    // The deadline watcher only ever *cancels* (stops not-yet-started
    // tasks); it never aborts the JoinSet, so in-flight scans always run
    // to completion and their results are always recorded, per §4.5
    // "Cancellation".
    let deadline_cancel = cancel.clone();
    let deadline_watcher = tokio::spawn(async move {
        tokio::time::sleep(job_deadline).await;
        warn!(?job_deadline, "bulk scan job exceeded its parent deadline");
        deadline_cancel.cancel();
    });

    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let mut tasks = tokio::task::JoinSet::new();

    for device in devices {
        if cancel.is_cancelled() {
            break;
        }

        let semaphore = semaphore.clone();
        let store = store.clone();
        let scan_engine = scan_engine.clone();

        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok();
            scan_one_device(&store, &scan_engine, &device).await
        });
    }

    while let Some(joined) = tasks.join_next().await {
        let outcome = match joined {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(error = %err, "bulk scan task panicked");
                continue;
            }
        };

        let mut guard = status.write().await;
        guard.completed += 1;
        if outcome.error.is_some() {
            guard.failed += 1;
        }
        guard.results_summary.push(outcome);
    }

    deadline_watcher.abort();

    if cancel.is_cancelled() {
        status.write().await.cancelled = true;
    }
}

/// Platform/device-id filters for `VerificationOrchestrator::start_bulk_scan`
/// (`spec.md` §4.5(a) "given an optional platform set and/or device-ID
/// list").
#[derive(Debug, Clone, Default)]
pub struct BulkScanFilter {
    pub platforms: Option<Vec<Platform>>,
    pub device_ids: Option<Vec<Uuid>>,
}
