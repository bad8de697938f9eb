use actix_web::body::BoxBody;
use actix_web::{HttpResponse, ResponseError};
use fleetguard_common::ErrorInformation;

/// The HTTP-facing error taxonomy this crate adds on top of the core
/// crates' own `thiserror` enums. Only the variants a client can act on get
/// a specific status; everything else is logged and answered with a
/// generic 500, following `modules/fundamental/src/error.rs`'s
/// `ResponseError for Error` pattern.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Store(#[from] fleetguard_module_store::Error),
    #[error(transparent)]
    Scan(#[from] fleetguard_module_scan::Error),
    #[error(transparent)]
    Orchestrator(#[from] fleetguard_module_orchestrator::Error),
    #[error("invalid request: {0}")]
    BadRequest(String),
}

impl ResponseError for Error {
    fn error_response(&self) -> HttpResponse<BoxBody> {
        match self {
            Self::BadRequest(message) => {
                HttpResponse::BadRequest().json(ErrorInformation::new("BadRequest", message))
            }
            Self::Store(fleetguard_module_store::Error::StoreBusy) => {
                HttpResponse::ServiceUnavailable().json(ErrorInformation::new("StoreBusy", self))
            }
            Self::Store(fleetguard_module_store::Error::NotFound) => {
                HttpResponse::NotFound().json(ErrorInformation::new("NotFound", self))
            }
            Self::Store(fleetguard_module_store::Error::DuplicateExternalId) => {
                HttpResponse::Conflict().json(ErrorInformation::new("DuplicateExternalId", self))
            }
            Self::Store(fleetguard_module_store::Error::DuplicateDevice) => {
                HttpResponse::Conflict().json(ErrorInformation::new("DuplicateDevice", self))
            }
            Self::Scan(fleetguard_module_scan::Error::InvalidDeviceVersion(_)) => {
                HttpResponse::BadRequest().json(ErrorInformation::new("InvalidDeviceVersion", self))
            }
            Self::Orchestrator(fleetguard_module_orchestrator::Error::DeviceNotFound(_))
            | Self::Orchestrator(fleetguard_module_orchestrator::Error::JobNotFound(_)) => {
                HttpResponse::NotFound().json(ErrorInformation::new("NotFound", self))
            }
            Self::Orchestrator(fleetguard_module_orchestrator::Error::NoScanHistory)
            | Self::Orchestrator(fleetguard_module_orchestrator::Error::NotDiscovered) => {
                HttpResponse::PreconditionFailed().json(ErrorInformation::new("Precondition", self))
            }
            Self::Orchestrator(fleetguard_module_orchestrator::Error::PredictorUnavailable) => {
                HttpResponse::ServiceUnavailable().json(ErrorInformation::new("PredictorUnavailable", self))
            }
            err => {
                tracing::warn!(%err, "internal server error");
                HttpResponse::InternalServerError().json(ErrorInformation::new("Internal", ""))
            }
        }
    }
}
