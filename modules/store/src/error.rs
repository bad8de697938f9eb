use sea_orm::DbErr;

/// The `VulnStore` error taxonomy named in `spec.md` §7: only
/// `DuplicateExternalId` and `StoreBusy` are meaningful outside this crate,
/// everything else is an opaque `Database` failure the caller logs and
/// surfaces as an internal error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("external_id already exists")]
    DuplicateExternalId,
    #[error("hostname/ip pair already registered")]
    DuplicateDevice,
    #[error("store busy after retries")]
    StoreBusy,
    #[error("not found")]
    NotFound,
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// SQLite reports both a unique-constraint violation and a write-lock
    /// timeout as a generic `DbErr::Exec`/`DbErr::Query`; this inspects the
    /// underlying `sqlx` error to tell them apart, per §4.2 and §7.
    pub(crate) fn from_db_err(err: DbErr) -> Self {
        if let DbErr::Exec(sea_orm::RuntimeErr::SqlxError(sqlx_err))
        | DbErr::Query(sea_orm::RuntimeErr::SqlxError(sqlx_err)) = &err
        {
            if let Some(db_err) = sqlx_err.as_database_error() {
                if db_err.is_unique_violation() {
                    return Error::DuplicateExternalId;
                }
                if let Some(code) = db_err.code() {
                    // SQLITE_BUSY / SQLITE_LOCKED
                    if code == "5" || code == "6" {
                        return Error::StoreBusy;
                    }
                }
            }
        }
        Error::Database(err)
    }
}
