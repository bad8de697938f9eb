use fleetguard_entity::DiscoveryStatus;
use fleetguard_module_store::VulnStore;
use fleetguard_module_store::model::DiscoveryUpdate;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::error::Error;
use crate::traits::{Collector, DeviceSnapshot, TransportCredential};

/// Runs device discovery against a live `Collector` and writes the result
/// (`spec.md` §4.5(b)). Always succeeds at the `VulnStore` level: a transport
/// or parse failure is itself a valid discovery outcome (`discovery_status =
/// Failed`), not a propagated error. Idempotent — `apply_discovery` always
/// replaces prior discovery state.
#[instrument(skip(store, collector, credential))]
pub async fn discover_device(
    store: &VulnStore,
    device_id: Uuid,
    host: &str,
    collector: &dyn Collector,
    credential: &TransportCredential,
    deadline: std::time::Duration,
) -> Result<(), Error> {
    let outcome = collector.collect(host, credential, deadline).await;
    apply_outcome(store, device_id, outcome.map_err(|err| err.to_string())).await
}

/// Applies an already-obtained `DeviceSnapshot` (a live collection that
/// happened elsewhere, or an air-gapped snapshot converted via
/// `OfflineSnapshot::into_device_snapshot`) without invoking a `Collector`
/// (`spec.md` §6.2).
#[instrument(skip(store, snapshot))]
pub async fn apply_snapshot(
    store: &VulnStore,
    device_id: Uuid,
    snapshot: DeviceSnapshot,
) -> Result<(), Error> {
    apply_outcome(store, device_id, Ok(snapshot)).await
}

async fn apply_outcome(
    store: &VulnStore,
    device_id: Uuid,
    outcome: Result<DeviceSnapshot, String>,
) -> Result<(), Error> {
    let update = match outcome {
        Ok(snapshot) => DiscoveryUpdate {
            platform: Some(snapshot.platform),
            version: Some(snapshot.version),
            hardware_model: snapshot.hardware_model,
            features: snapshot.features,
            status: DiscoveryStatus::Success,
            error: None,
        },
        Err(error) => {
            warn!(device_id = %device_id, %error, "device discovery failed");
            DiscoveryUpdate {
                platform: None,
                version: None,
                hardware_model: None,
                features: Vec::new(),
                status: DiscoveryStatus::Failed,
                error: Some(error),
            }
        }
    };

    store.apply_discovery(device_id, update).await?;
    Ok(())
}
