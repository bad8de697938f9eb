use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use fleetguard_entity::{
    DiscoveryStatus, LabelsSource, Platform, device, label_index, scan_result, version_index,
    vulnerability,
};
use futures::Stream;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, TransactionTrait,
};
use tokio::sync::Mutex;
use tracing::instrument;
use uuid::Uuid;

use crate::error::Error;
use crate::model::{DiscoveryUpdate, NewDevice, NewScanResult, NewVulnerability};
use crate::retry::with_busy_retry;

/// The persistent store of vulnerability records, version/label indexes, and
/// device inventory (`spec.md` §4.2). Reads are lock-free under SQLite's
/// MVCC snapshotting; writes are serialized by the single-writer WAL
/// connection and retried through [`with_busy_retry`].
#[derive(Clone)]
pub struct VulnStore {
    db: DatabaseConnection,
    device_locks: Arc<DashMap<Uuid, Arc<Mutex<()>>>>,
}

impl VulnStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            device_locks: Arc::new(DashMap::new()),
        }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Populates `version_index` and `label_index` atomically alongside the
    /// vulnerability row (§4.2 invariants). Fails with
    /// `Error::DuplicateExternalId` if `external_id` is already present.
    #[instrument(skip(self, new))]
    pub async fn insert_vulnerability(&self, new: NewVulnerability) -> Result<Uuid, Error> {
        with_busy_retry(|| self.insert_vulnerability_once(new.clone())).await
    }

    async fn insert_vulnerability_once(&self, new: NewVulnerability) -> Result<Uuid, Error> {
        let vuln_id = Uuid::new_v4();
        let now = Utc::now();

        let txn = self.db.begin().await.map_err(Error::from_db_err)?;

        let model = vulnerability::ActiveModel {
            vuln_id: Set(vuln_id),
            external_id: Set(new.external_id.clone()),
            kind: Set(new.kind),
            platform: Set(new.platform),
            hardware_model: Set(new.hardware_model.clone()),
            severity: Set(new.severity),
            headline: Set(new.headline.clone()),
            summary: Set(new.summary.clone()),
            status: Set(new.status.clone()),
            advisory_url: Set(new.advisory_url.clone()),
            affected_versions_raw: Set(new.affected_versions_raw.clone()),
            pattern_kind: Set(new.pattern_kind),
            version_min: Set(new.version_min.clone()),
            version_max: Set(new.version_max.clone()),
            fixed_version: Set(new.fixed_version.clone()),
            explicit_list_json: Set(serde_json::to_value(&new.explicit_list)?),
            labels_json: Set(serde_json::to_value(&new.labels)?),
            labels_source: Set(new.labels_source),
            created_at: Set(now),
            last_modified: Set(now),
        };

        model.insert(&txn).await.map_err(Error::from_db_err)?;

        for raw in &new.explicit_list {
            if let Ok(normalized) = fleetguard_version::normalize(raw) {
                version_index::ActiveModel {
                    vuln_id: Set(vuln_id),
                    normalized_version: Set(normalized.to_string()),
                }
                .insert(&txn)
                .await
                .map_err(Error::from_db_err)?;
            }
        }

        for label in &new.labels {
            label_index::ActiveModel {
                vuln_id: Set(vuln_id),
                label: Set(label.clone()),
            }
            .insert(&txn)
            .await
            .map_err(Error::from_db_err)?;
        }

        txn.commit().await.map_err(Error::from_db_err)?;
        Ok(vuln_id)
    }

    /// Replaces the label set atomically: updates `labels_json` and rebuilds
    /// `label_index` so the two never diverge (§8 invariant).
    #[instrument(skip(self, labels))]
    pub async fn update_vulnerability_labels(
        &self,
        vuln_id: Uuid,
        labels: Vec<String>,
        source: LabelsSource,
    ) -> Result<(), Error> {
        with_busy_retry(|| {
            self.update_vulnerability_labels_once(vuln_id, labels.clone(), source)
        })
        .await
    }

    async fn update_vulnerability_labels_once(
        &self,
        vuln_id: Uuid,
        labels: Vec<String>,
        source: LabelsSource,
    ) -> Result<(), Error> {
        let txn = self.db.begin().await.map_err(Error::from_db_err)?;

        let existing = vulnerability::Entity::find_by_id(vuln_id)
            .one(&txn)
            .await
            .map_err(Error::from_db_err)?
            .ok_or(Error::NotFound)?;

        let mut active: vulnerability::ActiveModel = existing.into();
        active.labels_json = Set(serde_json::to_value(&labels)?);
        active.labels_source = Set(source);
        active.last_modified = Set(Utc::now());
        active.update(&txn).await.map_err(Error::from_db_err)?;

        label_index::Entity::delete_many()
            .filter(label_index::Column::VulnId.eq(vuln_id))
            .exec(&txn)
            .await
            .map_err(Error::from_db_err)?;

        for label in &labels {
            label_index::ActiveModel {
                vuln_id: Set(vuln_id),
                label: Set(label.clone()),
            }
            .insert(&txn)
            .await
            .map_err(Error::from_db_err)?;
        }

        txn.commit().await.map_err(Error::from_db_err)?;
        Ok(())
    }

    /// Ordered by severity ascending (Critical first), per §4.2. Returned as
    /// a stream rather than a `Vec` so `ScanEngine`'s enumeration stage
    /// (§4.4 step 1) can begin filtering before the whole platform's
    /// candidate set has been read off disk.
    #[instrument(skip(self))]
    pub async fn query_by_platform(
        &self,
        platform: Platform,
    ) -> Result<impl Stream<Item = Result<vulnerability::Model, Error>> + '_, Error> {
        use futures::TryStreamExt;

        let stream = vulnerability::Entity::find()
            .filter(vulnerability::Column::Platform.eq(platform))
            .order_by_asc(vulnerability::Column::Severity)
            .order_by_asc(vulnerability::Column::ExternalId)
            .stream(&self.db)
            .await
            .map_err(Error::from_db_err)?;

        Ok(stream.map_err(Error::from_db_err))
    }

    /// Equality lookup on `external_id`, used as the Tier-1 cache read by
    /// `LabelPredictor` (§4.3).
    #[instrument(skip(self))]
    pub async fn query_by_advisory(
        &self,
        external_id: &str,
        platform: Platform,
    ) -> Result<Option<vulnerability::Model>, Error> {
        vulnerability::Entity::find()
            .filter(vulnerability::Column::ExternalId.eq(external_id))
            .filter(vulnerability::Column::Platform.eq(platform))
            .one(&self.db)
            .await
            .map_err(Error::from_db_err)
    }

    pub async fn get_vulnerability(&self, vuln_id: Uuid) -> Result<Option<vulnerability::Model>, Error> {
        vulnerability::Entity::find_by_id(vuln_id)
            .one(&self.db)
            .await
            .map_err(Error::from_db_err)
    }

    /// Writes a `scan_results` row and rotates `last_scan_id` /
    /// `previous_scan_id` on the device row in one transaction, guarded by a
    /// per-device advisory lock held only for the rotation write itself
    /// (§5, "Ordering guarantees").
    #[instrument(skip(self, result))]
    pub async fn insert_scan_result(
        &self,
        device_id: Uuid,
        result: NewScanResult,
    ) -> Result<(), Error> {
        let lock = self
            .device_locks
            .entry(device_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        with_busy_retry(|| self.insert_scan_result_once(device_id, result.clone())).await
    }

    async fn insert_scan_result_once(
        &self,
        device_id: Uuid,
        result: NewScanResult,
    ) -> Result<(), Error> {
        let txn = self.db.begin().await.map_err(Error::from_db_err)?;

        scan_result::ActiveModel {
            scan_id: Set(result.scan_id),
            device_id: Set(device_id),
            timestamp: Set(result.timestamp),
            platform: Set(result.platform),
            version: Set(result.version.clone()),
            hardware_model: Set(result.hardware_model.clone()),
            total_bugs: Set(result.total_bugs),
            bug_critical_high: Set(result.bug_critical_high),
            total_psirts: Set(result.total_psirts),
            psirt_critical_high: Set(result.psirt_critical_high),
            hardware_filtered_count: Set(result.hardware_filtered_count),
            feature_filtered_count: Set(result.feature_filtered_count),
            query_time_ms: Set(result.query_time_ms),
            body_json: Set(result.body_json.clone()),
        }
        .insert(&txn)
        .await
        .map_err(Error::from_db_err)?;

        let device = device::Entity::find_by_id(device_id)
            .one(&txn)
            .await
            .map_err(Error::from_db_err)?
            .ok_or(Error::NotFound)?;

        let previous_scan_id = device.last_scan_id;
        let mut active: device::ActiveModel = device.into();
        active.previous_scan_id = Set(previous_scan_id);
        active.last_scan_id = Set(Some(result.scan_id));
        active.updated_at = Set(Utc::now());
        active.update(&txn).await.map_err(Error::from_db_err)?;

        txn.commit().await.map_err(Error::from_db_err)?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn get_scan_result(&self, scan_id: Uuid) -> Result<Option<scan_result::Model>, Error> {
        scan_result::Entity::find_by_id(scan_id)
            .one(&self.db)
            .await
            .map_err(Error::from_db_err)
    }

    #[instrument(skip(self, new))]
    pub async fn insert_device(&self, new: NewDevice) -> Result<Uuid, Error> {
        with_busy_retry(|| self.insert_device_once(new.clone())).await
    }

    async fn insert_device_once(&self, new: NewDevice) -> Result<Uuid, Error> {
        let device_id = Uuid::new_v4();
        let now = Utc::now();
        let model = device::ActiveModel {
            device_id: Set(device_id),
            external_id: Set(new.external_id.clone()),
            hostname: Set(new.hostname.clone()),
            ip: Set(new.ip.clone()),
            location: Set(new.location.clone()),
            device_type: Set(new.device_type.clone()),
            source: Set(new.source),
            platform: Set(None),
            version: Set(None),
            hardware_model: Set(None),
            features_json: Set(serde_json::to_value(Vec::<String>::new())?),
            discovery_status: Set(DiscoveryStatus::Pending),
            discovery_error: Set(None),
            last_scan_id: Set(None),
            previous_scan_id: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };
        model.insert(&self.db).await.map_err(|err| match Error::from_db_err(err) {
            Error::DuplicateExternalId => Error::DuplicateDevice,
            other => other,
        })?;
        Ok(device_id)
    }

    pub async fn get_device(&self, device_id: Uuid) -> Result<Option<device::Model>, Error> {
        device::Entity::find_by_id(device_id)
            .one(&self.db)
            .await
            .map_err(Error::from_db_err)
    }

    pub async fn find_device_by_identity(
        &self,
        hostname: &str,
        ip: &str,
    ) -> Result<Option<device::Model>, Error> {
        device::Entity::find()
            .filter(device::Column::Hostname.eq(hostname))
            .filter(device::Column::Ip.eq(ip))
            .one(&self.db)
            .await
            .map_err(Error::from_db_err)
    }

    /// Idempotent discovery write (§4.5(b)): replaces prior discovery state
    /// and resets rotation slots only if the device was never discovered.
    #[instrument(skip(self, update))]
    pub async fn apply_discovery(
        &self,
        device_id: Uuid,
        update: DiscoveryUpdate,
    ) -> Result<(), Error> {
        with_busy_retry(|| self.apply_discovery_once(device_id, update.clone())).await
    }

    async fn apply_discovery_once(
        &self,
        device_id: Uuid,
        update: DiscoveryUpdate,
    ) -> Result<(), Error> {
        let device = device::Entity::find_by_id(device_id)
            .one(&self.db)
            .await
            .map_err(Error::from_db_err)?
            .ok_or(Error::NotFound)?;

        let mut active: device::ActiveModel = device.into();
        active.platform = Set(update.platform);
        active.version = Set(update.version.clone());
        active.hardware_model = Set(update.hardware_model.clone());
        active.features_json = Set(serde_json::to_value(&update.features)?);
        active.discovery_status = Set(update.status);
        active.discovery_error = Set(update.error.clone());
        active.updated_at = Set(Utc::now());
        active.update(&self.db).await.map_err(Error::from_db_err)?;
        Ok(())
    }

    /// Devices eligible for a bulk scan: `discovery_status == Success`,
    /// optionally narrowed by platform or an explicit id list (§4.5(a)).
    #[instrument(skip(self))]
    pub async fn list_scannable_devices(
        &self,
        platforms: Option<&[Platform]>,
        device_ids: Option<&[Uuid]>,
    ) -> Result<Vec<device::Model>, Error> {
        let mut query = device::Entity::find()
            .filter(device::Column::DiscoveryStatus.eq(DiscoveryStatus::Success));

        if let Some(platforms) = platforms {
            query = query.filter(device::Column::Platform.is_in(platforms.iter().copied()));
        }
        if let Some(ids) = device_ids {
            query = query.filter(device::Column::DeviceId.is_in(ids.iter().copied()));
        }

        query.all(&self.db).await.map_err(Error::from_db_err)
    }

    pub async fn list_devices(&self) -> Result<Vec<device::Model>, Error> {
        device::Entity::find().all(&self.db).await.map_err(Error::from_db_err)
    }
}
