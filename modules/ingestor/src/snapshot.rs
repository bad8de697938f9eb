use fleetguard_module_orchestrator::VerificationOrchestrator;
use fleetguard_module_orchestrator::traits::OfflineSnapshot;
use tracing::instrument;
use uuid::Uuid;

use crate::error::Error;

/// Decodes an air-gapped `DeviceSnapshot` JSON document (`spec.md` §6.2) and
/// hands it to the orchestrator in place of a live `Collector` call.
#[instrument(skip(orchestrator, json))]
pub async fn apply_snapshot_json(
    orchestrator: &VerificationOrchestrator,
    device_id: Uuid,
    json: &[u8],
) -> Result<(), Error> {
    let offline: OfflineSnapshot = serde_json::from_slice(json).map_err(Error::Json)?;
    let snapshot = offline.into_device_snapshot().ok_or(Error::SnapshotIncomplete)?;
    orchestrator.apply_snapshot(device_id, snapshot).await?;
    Ok(())
}
