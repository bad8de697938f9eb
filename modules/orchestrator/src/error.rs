#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("store error: {0}")]
    Store(#[from] fleetguard_module_store::Error),
    #[error("scan error: {0}")]
    Scan(#[from] fleetguard_module_scan::Error),
    #[error("inventory source error: {0}")]
    Inventory(#[from] crate::traits::InventorySourceError),
    #[error("label prediction error: {0}")]
    Predictor(#[from] fleetguard_module_predictor::Error),
    #[error("device not found: {0}")]
    DeviceNotFound(uuid::Uuid),
    #[error("device has no completed scan to compare")]
    NoScanHistory,
    #[error("device has not been discovered (platform or version missing)")]
    NotDiscovered,
    #[error("job not found: {0}")]
    JobNotFound(uuid::Uuid),
    #[error("this orchestrator was not configured with a label predictor")]
    PredictorUnavailable,
}
