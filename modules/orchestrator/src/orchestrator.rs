use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use fleetguard_common::config::Orchestrator as OrchestratorConfig;
use fleetguard_entity::VulnKind;
use fleetguard_module_predictor::{LabelPredictor, LabelPrediction, PredictRequest};
use fleetguard_module_scan::ScanEngine;
use fleetguard_module_scan::model::{ScanRequest, ScanResult};
use fleetguard_module_store::VulnStore;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use uuid::Uuid;

use crate::comparison;
use crate::discovery;
use crate::error::Error;
use crate::inventory::{self, InventorySyncReport};
use crate::job::JobStatus;
use crate::model::{ScanComparison, VersionComparisonResult};
use crate::traits::{Collector, DeviceSnapshot, InventorySource, TransportCredential};
use crate::verification::{self, BulkScanFilter};

/// Drives multi-device workflows: bulk scanning, device discovery, and the
/// scan/version comparison queries of `spec.md` §4.5. Owns no persisted
/// state of its own — `VulnStore` is the source of truth — but does hold
/// the in-memory `JobStatus` map a poller reads (`spec.md` §5 "job-status
/// value published through a thread-safe map keyed by job_id").
#[derive(Clone)]
pub struct VerificationOrchestrator {
    store: VulnStore,
    scan_engine: Arc<ScanEngine>,
    predictor: Option<Arc<LabelPredictor>>,
    config: OrchestratorConfig,
    jobs: Arc<DashMap<Uuid, Arc<RwLock<JobStatus>>>>,
    cancellations: Arc<DashMap<Uuid, CancellationToken>>,
}

impl VerificationOrchestrator {
    pub fn new(store: VulnStore, config: OrchestratorConfig) -> Self {
        let scan_engine = Arc::new(ScanEngine::new(store.clone()));
        Self {
            store,
            scan_engine,
            predictor: None,
            config,
            jobs: Arc::new(DashMap::new()),
            cancellations: Arc::new(DashMap::new()),
        }
    }

    /// Wires in the label predictor consulted by [`Self::scan_by_advisory`]
    /// (`spec.md` §2: "LabelPredictor is also invoked by Orchestrator when a
    /// scan is driven by a free-form advisory rather than a version tuple").
    /// Optional: an orchestrator with no predictor still serves every other
    /// operation, it just rejects advisory-driven scans.
    pub fn with_predictor(mut self, predictor: LabelPredictor) -> Self {
        self.predictor = Some(Arc::new(predictor));
        self
    }

    /// (a) Resolves the target device set and spawns a bounded-concurrency
    /// bulk scan (`spec.md` §4.5(a)). Returns immediately with a `job_id`;
    /// progress is polled via [`Self::job_status`].
    #[instrument(skip(self, filter))]
    pub async fn start_bulk_scan(&self, filter: BulkScanFilter) -> Result<Uuid, Error> {
        let devices = self
            .store
            .list_scannable_devices(filter.platforms.as_deref(), filter.device_ids.as_deref())
            .await?;

        let job_id = Uuid::new_v4();
        let status = Arc::new(RwLock::new(JobStatus::new(job_id, devices.len())));
        let cancel = CancellationToken::new();

        self.jobs.insert(job_id, status.clone());
        self.cancellations.insert(job_id, cancel.clone());

        let store = self.store.clone();
        let scan_engine = self.scan_engine.clone();
        let workers = self.config.scan_workers;
        let job_deadline = self.config.job_deadline;

        tokio::spawn(async move {
            verification::run_bulk_scan(store, scan_engine, devices, status, cancel, workers, job_deadline)
                .await;
        });

        Ok(job_id)
    }

    /// Reads the current state of a bulk-scan job (`spec.md` §4.5(a)
    /// "`JobStatus` ... that a poller can read at any time").
    pub async fn job_status(&self, job_id: Uuid) -> Result<JobStatus, Error> {
        let status = self.jobs.get(&job_id).ok_or(Error::JobNotFound(job_id))?;
        Ok(status.read().await.clone())
    }

    /// Stops not-yet-started workers for `job_id`; in-flight scans still
    /// complete and are recorded (`spec.md` §4.5 "Cancellation").
    pub fn cancel_job(&self, job_id: Uuid) -> Result<(), Error> {
        let cancel = self
            .cancellations
            .get(&job_id)
            .ok_or(Error::JobNotFound(job_id))?;
        cancel.cancel();
        Ok(())
    }

    /// (b) Live discovery against a single device through the external
    /// `Collector` (`spec.md` §4.5(b)).
    #[instrument(skip(self, collector, credential))]
    pub async fn discover_device(
        &self,
        device_id: Uuid,
        host: &str,
        collector: &dyn Collector,
        credential: &TransportCredential,
    ) -> Result<(), Error> {
        discovery::discover_device(
            &self.store,
            device_id,
            host,
            collector,
            credential,
            self.config.collector_deadline,
        )
        .await
    }

    /// (b) Air-gapped discovery alternative: consumes an already-obtained
    /// snapshot instead of calling a `Collector` (`spec.md` §6.2).
    pub async fn apply_snapshot(&self, device_id: Uuid, snapshot: DeviceSnapshot) -> Result<(), Error> {
        discovery::apply_snapshot(&self.store, device_id, snapshot).await
    }

    /// Seeds the inventory from an external directory (`spec.md` §2
    /// "InventorySource.List()").
    pub async fn sync_inventory(&self, source: &dyn InventorySource) -> Result<InventorySyncReport, Error> {
        inventory::sync_inventory(&self.store, source).await
    }

    /// (c) `last_scan` vs `previous_scan` diff for one device (`spec.md`
    /// §4.5(c) "Scan comparison").
    pub async fn scan_comparison(&self, device_id: Uuid) -> Result<ScanComparison, Error> {
        comparison::scan_comparison(&self.store, device_id).await
    }

    /// (c) Hypothetical-upgrade risk recommendation (`spec.md` §4.5(c)
    /// "Version comparison").
    pub async fn version_comparison(
        &self,
        device_id: Uuid,
        target_version: &str,
    ) -> Result<VersionComparisonResult, Error> {
        comparison::version_comparison(&self.store, &self.scan_engine, device_id, target_version).await
    }

    /// Scans a device against a free-form advisory summary rather than a
    /// known version tuple: predicts taxonomy labels for the summary, then
    /// runs those labels through the device's current platform/version as
    /// the feature filter (`spec.md` §2, §4.3, §4.4).
    #[instrument(skip(self, summary))]
    pub async fn scan_by_advisory(&self, device_id: Uuid, summary: &str) -> Result<(LabelPrediction, ScanResult), Error> {
        let predictor = self.predictor.as_ref().ok_or(Error::PredictorUnavailable)?;

        let device = self
            .store
            .get_device(device_id)
            .await?
            .ok_or(Error::DeviceNotFound(device_id))?;
        let (Some(platform), Some(version)) = (device.platform, device.version.clone()) else {
            return Err(Error::NotDiscovered);
        };

        let prediction = predictor
            .predict(PredictRequest {
                summary,
                platform,
                external_id: None,
                kind: VulnKind::Advisory,
                severity_hint: None,
            })
            .await?;

        let result = self
            .scan_engine
            .scan(ScanRequest {
                platform,
                version,
                hardware_model: device.hardware_model.clone(),
                features: prediction.labels.clone(),
                severity_filter: None,
                limit: None,
                offset: None,
            })
            .await?;

        Ok((prediction, result))
    }

    pub fn store(&self) -> &VulnStore {
        &self.store
    }

    pub fn scan_engine(&self) -> &ScanEngine {
        &self.scan_engine
    }
}

/// Default graceful-shutdown grace period for in-flight jobs (`spec.md` §5
/// "Resource lifecycle": "wait for in-flight jobs up to a grace period,
/// then force-cancel").
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Cancels every still-running job, matching `spec.md` §5's graceful
/// shutdown: stop accepting new jobs (the caller's responsibility — this
/// only reaches already-started ones), wait up to `grace`, then return
/// regardless so the process can exit.
#[instrument(skip(orchestrator))]
pub async fn graceful_shutdown(orchestrator: &VerificationOrchestrator, grace: Duration) {
    for entry in orchestrator.cancellations.iter() {
        entry.value().cancel();
    }

    let deadline = tokio::time::Instant::now() + grace;
    while tokio::time::Instant::now() < deadline {
        let still_running = {
            let mut running = false;
            for entry in orchestrator.jobs.iter() {
                let status = entry.value().read().await;
                if status.completed < status.total && !status.cancelled {
                    running = true;
                    break;
                }
            }
            running
        };
        if !still_running {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}
