use fleetguard_common::config::Database as DatabaseConfig;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database as SeaDatabase, DatabaseConnection, Statement,
};
use sea_orm_migration::MigratorTrait;
use tracing::instrument;

use crate::error::Error;

/// Opens the embedded SQLite store and brings it up to the latest schema.
///
/// `PRAGMA journal_mode=WAL` and `PRAGMA busy_timeout` are set here rather
/// than left to defaults: this is the literal mechanism behind §4.2's
/// "embedded relational engine supporting write-ahead logging for
/// single-writer/many-reader concurrency."
#[instrument(skip(config))]
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, Error> {
    let mut options = ConnectOptions::new(config.to_url());
    options
        .max_connections(config.max_connections)
        .sqlx_logging(false);

    let db = SeaDatabase::connect(options).await.map_err(Error::from_db_err)?;

    db.execute(Statement::from_string(
        db.get_database_backend(),
        "PRAGMA journal_mode=WAL;",
    ))
    .await
    .map_err(Error::from_db_err)?;

    db.execute(Statement::from_string(
        db.get_database_backend(),
        format!(
            "PRAGMA busy_timeout={};",
            config.busy_timeout.as_millis()
        ),
    ))
    .await
    .map_err(Error::from_db_err)?;

    db.execute(Statement::from_string(
        db.get_database_backend(),
        "PRAGMA foreign_keys=ON;",
    ))
    .await
    .map_err(Error::from_db_err)?;

    fleetguard_migration::Migrator::up(&db, None)
        .await
        .map_err(Error::from_db_err)?;

    Ok(db)
}
