use std::ops::Deref;

use fleetguard_common::config::Database as DatabaseConfig;
use fleetguard_module_store::VulnStore;
use sea_orm::DatabaseConnection;
use tempfile::TempDir;
use test_context::AsyncTestContext;
use tracing::instrument;

/// A throwaway SQLite database, migrated and wrapped in a [`VulnStore`], for
/// use with `#[test_context(FleetGuardContext)]`. Each test gets its own
/// file under a fresh temp directory so concurrent tests never contend on
/// the same WAL connection.
pub struct FleetGuardContext {
    pub store: VulnStore,
    _tmp: TempDir,
}

impl FleetGuardContext {
    pub fn connection(&self) -> &DatabaseConnection {
        self.store.connection()
    }
}

impl Deref for FleetGuardContext {
    type Target = VulnStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

impl AsyncTestContext for FleetGuardContext {
    #[instrument]
    async fn setup() -> Self {
        let tmp = tempfile::tempdir().expect("creating temp dir for test database");
        let path = tmp.path().join("fleetguard-test.sqlite3");

        let config = DatabaseConfig {
            path,
            max_connections: 1,
            busy_timeout: std::time::Duration::from_secs(5),
        };

        let db = fleetguard_module_store::db::connect(&config)
            .await
            .expect("connecting to test database");

        FleetGuardContext {
            store: VulnStore::new(db),
            _tmp: tmp,
        }
    }

    async fn teardown(self) {
        // dropping `_tmp` removes the backing file and its -wal/-shm siblings
    }
}
