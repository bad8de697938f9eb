use async_trait::async_trait;
use fleetguard_entity::Platform;
use serde::{Deserialize, Serialize};

/// What a live device transport yields (`spec.md` §4.5(b)).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    pub platform: Platform,
    pub version: String,
    pub hardware_model: Option<String>,
    pub features: Vec<String>,
}

/// The air-gapped counterpart to a live `Collector.collect` call (`spec.md`
/// §6.2). Distinct from `DeviceSnapshot` in carrying extraction provenance
/// (`snapshot_id`, `extractor_version`) that a live collection never has.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfflineSnapshot {
    pub snapshot_id: String,
    pub platform: Platform,
    pub extracted_at: chrono::DateTime<chrono::Utc>,
    pub features_present: Vec<String>,
    pub feature_count: i32,
    pub total_checked: i32,
    pub extractor_version: String,
    pub version: Option<String>,
    pub hardware_model: Option<String>,
}

impl OfflineSnapshot {
    pub fn into_device_snapshot(self) -> Option<DeviceSnapshot> {
        Some(DeviceSnapshot {
            platform: self.platform,
            version: self.version?,
            hardware_model: self.hardware_model,
            features: self.features_present,
        })
    }
}

/// Identity-only record surfaced by an `InventorySource` before discovery has
/// enriched it with platform/version (`spec.md` §4.5 "External collaborators'
/// interfaces").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceStub {
    pub hostname: String,
    pub ip: String,
    pub location: Option<String>,
    pub device_type: Option<String>,
}

/// Opaque per-call transport credential. The orchestrator never inspects its
/// contents; it is handed verbatim to the `Collector`.
#[derive(Debug, Clone)]
pub struct TransportCredential(pub String);

#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("could not parse device response: {0}")]
    Parse(String),
    #[error("collection deadline exceeded")]
    Timeout,
}

#[derive(Debug, thiserror::Error)]
pub enum InventorySourceError {
    #[error("inventory source error: {0}")]
    Other(String),
}

/// External collaborator that talks to a real device (`spec.md` §4.5(b),
/// "External collaborators' interfaces"). Implementations own the transport
/// (SSH/NETCONF/REST); the core never depends on a specific protocol.
#[async_trait]
pub trait Collector: Send + Sync {
    async fn collect(
        &self,
        host: &str,
        credential: &TransportCredential,
        deadline: std::time::Duration,
    ) -> Result<DeviceSnapshot, CollectorError>;
}

/// External collaborator that enumerates device identities from an asset
/// system (CMDB, NetBox, a flat file) ahead of discovery.
#[async_trait]
pub trait InventorySource: Send + Sync {
    async fn list(&self) -> Result<Vec<DeviceStub>, InventorySourceError>;
}
