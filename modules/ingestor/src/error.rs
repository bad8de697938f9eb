#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("store error: {0}")]
    Store(#[from] fleetguard_module_store::Error),
    #[error("orchestrator error: {0}")]
    Orchestrator(#[from] fleetguard_module_orchestrator::Error),
    #[error("package I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("document is not valid JSON: {0}")]
    Json(serde_json::Error),
    #[error("data file is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("package is missing {0}")]
    MissingEntry(&'static str),
    #[error("sha256 mismatch: manifest declares {expected}, archive contains {actual}")]
    HashMismatch { expected: String, actual: String },
    #[error("device snapshot has no discovered version")]
    SnapshotIncomplete,
}
