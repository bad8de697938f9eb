use fleetguard_entity::DeviceSource;
use fleetguard_module_store::VulnStore;
use fleetguard_module_store::model::NewDevice;
use tracing::{instrument, warn};

use crate::error::Error;
use crate::traits::InventorySource;

/// One `InventorySource::list()` entry's outcome: inserted, or already
/// present under the `(hostname, ip)` identity key (`spec.md` §3
/// "DeviceStub ... Identity key is (hostname, ip)").
#[derive(Debug, Clone)]
pub struct InventorySyncReport {
    pub inserted: usize,
    pub already_present: usize,
    pub errors: Vec<String>,
}

/// Seeds the device inventory from an external `InventorySource` (`spec.md`
/// §2 "identity/inventory directory used to seed devices"). Never
/// overwrites an existing device row — the `(hostname, ip)` unique
/// constraint on `devices` is the only de-duplication this needs, matching
/// `VulnStore::insert_device`'s `DuplicateDevice` error.
#[instrument(skip(store, source))]
pub async fn sync_inventory(
    store: &VulnStore,
    source: &dyn InventorySource,
) -> Result<InventorySyncReport, Error> {
    let stubs = source.list().await?;

    let mut report = InventorySyncReport {
        inserted: 0,
        already_present: 0,
        errors: Vec::new(),
    };

    for stub in stubs {
        let new_device = NewDevice {
            external_id: None,
            hostname: stub.hostname.clone(),
            ip: stub.ip.clone(),
            location: stub.location.clone(),
            device_type: stub.device_type.clone(),
            source: DeviceSource::Directory,
        };

        match store.insert_device(new_device).await {
            Ok(_) => report.inserted += 1,
            Err(fleetguard_module_store::Error::DuplicateDevice) => {
                report.already_present += 1;
            }
            Err(err) => {
                warn!(hostname = %stub.hostname, ip = %stub.ip, error = %err, "inventory sync failed for device");
                report.errors.push(format!("{}/{}: {err}", stub.hostname, stub.ip));
            }
        }
    }

    Ok(report)
}
