#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("store error: {0}")]
    Store(#[from] fleetguard_module_store::Error),
    #[error("invalid device version: {0}")]
    InvalidDeviceVersion(#[from] fleetguard_version::VersionError),
}
