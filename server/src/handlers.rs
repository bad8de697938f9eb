use actix_web::web::{Data, Json, Path, Query};
use actix_web::{HttpResponse, get, post};
use fleetguard_entity::Platform;
use fleetguard_module_orchestrator::BulkScanFilter;
use fleetguard_module_scan::model::{ScanRequest, ScanResult};
use serde::Deserialize;
use uuid::Uuid;

use crate::AppState;
use crate::error::Error;

/// Request body for `POST /api/v1/scan`. Thin serialization glue over
/// `ScanEngine::scan`'s `ScanRequest` — the matching logic itself lives in
/// `fleetguard-module-scan` (§1 "HTTP/REST transport ... trivial handler
/// glue").
#[derive(Debug, Deserialize)]
pub struct ScanBody {
    pub platform: Platform,
    pub version: String,
    pub hardware_model: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
    pub severity_filter: Option<Vec<i16>>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl From<ScanBody> for ScanRequest {
    fn from(body: ScanBody) -> Self {
        ScanRequest {
            platform: body.platform,
            version: body.version,
            hardware_model: body.hardware_model,
            features: body.features,
            severity_filter: body.severity_filter,
            limit: body.limit,
            offset: body.offset,
        }
    }
}

#[post("/api/v1/scan")]
pub async fn scan(state: Data<AppState>, body: Json<ScanBody>) -> Result<Json<ScanResult>, Error> {
    let result = state.scan_engine.scan(body.into_inner().into()).await?;
    Ok(Json(result))
}

#[derive(Debug, Deserialize, Default)]
pub struct BulkScanBody {
    pub platforms: Option<Vec<Platform>>,
    pub device_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, serde::Serialize)]
pub struct BulkScanStarted {
    pub job_id: Uuid,
}

#[post("/api/v1/bulk-scan")]
pub async fn start_bulk_scan(
    state: Data<AppState>,
    body: Json<BulkScanBody>,
) -> Result<Json<BulkScanStarted>, Error> {
    let body = body.into_inner();
    let job_id = state
        .orchestrator
        .start_bulk_scan(BulkScanFilter {
            platforms: body.platforms,
            device_ids: body.device_ids,
        })
        .await?;
    Ok(Json(BulkScanStarted { job_id }))
}

#[get("/api/v1/bulk-scan/{job_id}")]
pub async fn bulk_scan_status(
    state: Data<AppState>,
    job_id: Path<Uuid>,
) -> Result<HttpResponse, Error> {
    let status = state.orchestrator.job_status(job_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(status))
}

#[post("/api/v1/bulk-scan/{job_id}/cancel")]
pub async fn cancel_bulk_scan(state: Data<AppState>, job_id: Path<Uuid>) -> Result<HttpResponse, Error> {
    state.orchestrator.cancel_job(job_id.into_inner())?;
    Ok(HttpResponse::Accepted().finish())
}

#[get("/api/v1/devices/{device_id}/scan-comparison")]
pub async fn scan_comparison(
    state: Data<AppState>,
    device_id: Path<Uuid>,
) -> Result<HttpResponse, Error> {
    let comparison = state.orchestrator.scan_comparison(device_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(comparison))
}

#[derive(Debug, Deserialize)]
pub struct VersionComparisonQuery {
    pub target_version: String,
}

#[get("/api/v1/devices/{device_id}/version-comparison")]
pub async fn version_comparison(
    state: Data<AppState>,
    device_id: Path<Uuid>,
    query: Query<VersionComparisonQuery>,
) -> Result<HttpResponse, Error> {
    let comparison = state
        .orchestrator
        .version_comparison(device_id.into_inner(), &query.target_version)
        .await?;
    Ok(HttpResponse::Ok().json(comparison))
}

#[derive(Debug, Deserialize)]
pub struct ScanByAdvisoryBody {
    pub summary: String,
}

#[derive(Debug, serde::Serialize)]
pub struct ScanByAdvisoryResponse {
    pub prediction: fleetguard_module_predictor::LabelPrediction,
    pub result: ScanResult,
}

#[post("/api/v1/devices/{device_id}/scan-by-advisory")]
pub async fn scan_by_advisory(
    state: Data<AppState>,
    device_id: Path<Uuid>,
    body: Json<ScanByAdvisoryBody>,
) -> Result<Json<ScanByAdvisoryResponse>, Error> {
    let (prediction, result) = state
        .orchestrator
        .scan_by_advisory(device_id.into_inner(), &body.summary)
        .await?;
    Ok(Json(ScanByAdvisoryResponse { prediction, result }))
}

#[get("/api/v1/devices/{device_id}")]
pub async fn get_device(state: Data<AppState>, device_id: Path<Uuid>) -> Result<HttpResponse, Error> {
    match state.store.get_device(device_id.into_inner()).await? {
        Some(device) => Ok(HttpResponse::Ok().json(device)),
        None => Err(Error::Store(fleetguard_module_store::Error::NotFound)),
    }
}

#[get("/api/v1/healthz")]
pub async fn healthz() -> HttpResponse {
    HttpResponse::Ok().finish()
}
