mod error;
mod handlers;

use actix_web::web::{self, ServiceConfig};
use fleetguard_module_orchestrator::VerificationOrchestrator;
use fleetguard_module_scan::ScanEngine;
use fleetguard_module_store::VulnStore;

pub use error::Error;

/// Shared state handed to every handler. Each field is a thin handle
/// (`VulnStore`, `ScanEngine`, `VerificationOrchestrator` are all `Clone`
/// over `Arc`-backed internals), so `AppState` itself is cheap to clone into
/// `actix_web::web::Data`.
pub struct AppState {
    pub store: VulnStore,
    pub scan_engine: ScanEngine,
    pub orchestrator: VerificationOrchestrator,
}

/// Registers every route this crate exposes (§1 "HTTP/REST transport ...
/// trivial handler glue" — the matching, filtering, and orchestration logic
/// itself lives in the core crates; this wires it to `actix-web`).
pub fn configure(state: AppState) -> impl FnOnce(&mut ServiceConfig) {
    let state = web::Data::new(state);
    move |cfg: &mut ServiceConfig| {
        cfg.app_data(state)
            .service(handlers::healthz)
            .service(handlers::scan)
            .service(handlers::scan_by_advisory)
            .service(handlers::start_bulk_scan)
            .service(handlers::bulk_scan_status)
            .service(handlers::cancel_bulk_scan)
            .service(handlers::scan_comparison)
            .service(handlers::version_comparison)
            .service(handlers::get_device);
    }
}
