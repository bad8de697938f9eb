use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One device's outcome within a bulk-scan job. A failed scan never aborts
/// the job (`spec.md` §4.5(a)); it is recorded here instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceScanOutcome {
    pub device_id: Uuid,
    pub hostname: String,
    pub scan_id: Option<Uuid>,
    pub error: Option<String>,
}

/// Polled by a caller at any point during a bulk scan (`spec.md` §4.5(a)).
/// `completed` counts both successes and failures; `total - completed` is
/// always the number still queued or in flight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatus {
    pub job_id: Uuid,
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub results_summary: Vec<DeviceScanOutcome>,
    pub cancelled: bool,
}

impl JobStatus {
    pub(crate) fn new(job_id: Uuid, total: usize) -> Self {
        Self {
            job_id,
            total,
            completed: 0,
            failed: 0,
            results_summary: Vec::new(),
            cancelled: false,
        }
    }
}
