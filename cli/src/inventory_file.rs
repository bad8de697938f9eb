use std::path::PathBuf;

use async_trait::async_trait;
use fleetguard_module_orchestrator::traits::{DeviceStub, InventorySource, InventorySourceError};

/// A flat-file `InventorySource` (`spec.md` §1 "The identity/inventory
/// directory used to seed devices"): a JSON array of `DeviceStub` read from
/// disk, the simplest possible stand-in for a real CMDB/NetBox integration.
pub struct FileInventorySource {
    path: PathBuf,
}

impl FileInventorySource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl InventorySource for FileInventorySource {
    async fn list(&self) -> Result<Vec<DeviceStub>, InventorySourceError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|err| InventorySourceError::Other(err.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|err| InventorySourceError::Other(err.to_string()))
    }
}
