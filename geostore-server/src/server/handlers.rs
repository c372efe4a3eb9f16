use crate::core::{NewRecord, Record, Region, StoreError};
use crate::replication::{ReplicaStatusReport, Replicator};
use crate::service::ContentService;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Header a trusted edge proxy sets after classifying the client address.
/// Absent or unrecognized values fall back to EU, the master's region.
const REGION_HEADER: &str = "x-client-region";

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ContentService<Replicator>>,
}

// Request/Response types for the REST API

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub role: String,
    pub region: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub username: String,
    pub role: String,
    pub region: String,
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub region: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LatencyParams {
    pub region: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LatencyResponse {
    pub region: Region,
    pub latency: String,
    pub gain_ms: u64,
    pub measured: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub status: &'static str,
    pub id: i64,
}

#[derive(Debug, Serialize)]
pub struct RegionResponse {
    pub region: Region,
}

/// Classify the request's region: explicit query override first, then the
/// edge header, then the EU default (private or unclassifiable clients).
fn classify_region(params_region: Option<&str>, headers: &HeaderMap) -> Region {
    if let Some(code) = params_region {
        return Region::parse(code);
    }
    headers
        .get(REGION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(Region::parse)
        .unwrap_or_default()
}

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "geostore",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Auth stub: echoes the requested identity back with a throwaway token.
/// No credential verification happens anywhere in this system.
pub async fn login(
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, StoreError> {
    let username = req.username.trim().to_string();
    let role = req.role.trim().to_ascii_lowercase();
    let region = req.region.trim().to_ascii_lowercase();

    if username.is_empty() || role.is_empty() || region.is_empty() {
        return Err(StoreError::Constraint(
            "username, role, region required".into(),
        ));
    }

    Ok(Json(LoginResponse {
        token: Uuid::new_v4().to_string(),
        username,
        role,
        region,
    }))
}

pub async fn create_record(
    State(state): State<AppState>,
    Json(new): Json<NewRecord>,
) -> Result<(StatusCode, Json<Record>), StoreError> {
    let record = state.service.create(new).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn list_records(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
    headers: HeaderMap,
) -> Result<Json<Vec<Record>>, StoreError> {
    let region = classify_region(params.region.as_deref(), &headers);
    debug!(region = %region, "listing records");
    let records = state.service.list_by_region(region).await?;
    Ok(Json(records))
}

pub async fn delete_record(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DeleteResponse>, StoreError> {
    state.service.delete(id).await?;
    Ok(Json(DeleteResponse {
        status: "deleted",
        id,
    }))
}

pub async fn replication_status(
    State(state): State<AppState>,
) -> Json<Vec<ReplicaStatusReport>> {
    Json(state.service.replication_status())
}

pub async fn measure_latency(
    State(state): State<AppState>,
    Query(params): Query<LatencyParams>,
) -> Result<Json<LatencyResponse>, StoreError> {
    let Some(code) = params.region.as_deref() else {
        return Err(StoreError::Constraint("region parameter required".into()));
    };

    let measurement = state.service.measure_latency(Region::parse(code));
    Ok(Json(LatencyResponse {
        region: measurement.region,
        latency: measurement.summary,
        gain_ms: measurement.gain_ms,
        measured: Utc::now(),
    }))
}

/// Echo the region this request would be served from.
pub async fn client_region(headers: HeaderMap) -> Json<RegionResponse> {
    Json(RegionResponse {
        region: classify_region(None, &headers),
    })
}
