//! Endpoint handlers.

use crate::error::ApiError;
use crate::types::{AnalyzeDiseaseReq, ErrorRes, HealthRes, SaveScanReq, UserQuery};
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::Json,
};
use greenleaf_core::{DiagnosisRecord, ImageReference, ScanId, ScanRecord, ScanStats};

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for monitoring and load balancer probes.
#[axum::debug_handler]
pub async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "Greenleaf is alive".into(),
    })
}

#[utoipa::path(
    post,
    path = "/analyze-disease",
    request_body = AnalyzeDiseaseReq,
    responses(
        (status = 200, description = "Diagnosis, or the fallback record when the model reply was not JSON", body = DiagnosisRecord),
        (status = 400, description = "Missing image or malformed body", body = ErrorRes),
        (status = 413, description = "Request body too large", body = ErrorRes),
        (status = 402, description = "AI service credits exhausted", body = ErrorRes),
        (status = 429, description = "AI gateway rate limit exceeded", body = ErrorRes),
        (status = 500, description = "AI gateway failure", body = ErrorRes)
    )
)]
/// Diagnose the plant in one image.
///
/// The image is checked before anything is sent upstream, so a request without one never reaches
/// the AI gateway.
///
/// A missing image is answered with `400`, not the generic `500` used for upstream failures, so
/// callers can tell their own mistakes apart from gateway trouble.
///
/// # Errors
/// - `400` if the body is not JSON or `imageUrl` is absent or blank,
/// - `413` if the body exceeds the configured limit,
/// - `429` / `402` when the gateway reports a rate limit or exhausted credits,
/// - `500` for any other gateway failure, an empty reply, or a timeout.
#[axum::debug_handler]
pub async fn analyze_disease(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeDiseaseReq>, JsonRejection>,
) -> Result<Json<DiagnosisRecord>, ApiError> {
    let Json(req) = payload?;
    let image = ImageReference::from_optional(req.image_url)?;
    let record = state.relay.analyze(&image).await?;
    Ok(Json(record))
}

#[utoipa::path(
    get,
    path = "/scans",
    params(UserQuery),
    responses(
        (status = 200, description = "Scans of the user, newest first", body = [ScanRecord]),
        (status = 400, description = "Missing user id", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// List a user's saved scans, newest first.
#[axum::debug_handler]
pub async fn list_scans(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Vec<ScanRecord>>, ApiError> {
    let user_id = query.user_id.unwrap_or_default();
    Ok(Json(state.history.list_for_user(&user_id)?))
}

#[utoipa::path(
    post,
    path = "/scans",
    request_body = SaveScanReq,
    responses(
        (status = 201, description = "Scan saved", body = ScanRecord),
        (status = 400, description = "Bad request", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Save a diagnosis to the user's history.
#[axum::debug_handler]
pub async fn save_scan(
    State(state): State<AppState>,
    payload: Result<Json<SaveScanReq>, JsonRejection>,
) -> Result<(StatusCode, Json<ScanRecord>), ApiError> {
    let Json(req) = payload?;
    let record = state
        .history
        .save(&req.user_id, &req.image_url, req.diagnosis)?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[utoipa::path(
    get,
    path = "/scans/stats",
    params(UserQuery),
    responses(
        (status = 200, description = "Dashboard figures for the user", body = ScanStats),
        (status = 400, description = "Missing user id", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn scan_stats(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<ScanStats>, ApiError> {
    let user_id = query.user_id.unwrap_or_default();
    Ok(Json(state.history.stats_for_user(&user_id)?))
}

#[utoipa::path(
    get,
    path = "/scans/{id}",
    params(
        ("id" = String, Path, description = "Scan id, 32 lowercase hex characters"),
        UserQuery
    ),
    responses(
        (status = 200, description = "Scan retrieved", body = ScanRecord),
        (status = 400, description = "Invalid scan id or missing user id", body = ErrorRes),
        (status = 404, description = "Scan not found for this user", body = ErrorRes)
    )
)]
/// Fetch one of the user's scans. Scans of other users are reported as not found.
#[axum::debug_handler]
pub async fn get_scan(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<UserQuery>,
) -> Result<Json<ScanRecord>, ApiError> {
    let id = ScanId::parse(&id)?;
    let user_id = query.user_id.unwrap_or_default();
    Ok(Json(state.history.get(&user_id, &id)?))
}

#[utoipa::path(
    delete,
    path = "/scans/{id}",
    params(
        ("id" = String, Path, description = "Scan id, 32 lowercase hex characters"),
        UserQuery
    ),
    responses(
        (status = 204, description = "Scan deleted"),
        (status = 400, description = "Invalid scan id or missing user id", body = ErrorRes),
        (status = 404, description = "Scan not found for this user", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn delete_scan(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<UserQuery>,
) -> Result<StatusCode, ApiError> {
    let id = ScanId::parse(&id)?;
    let user_id = query.user_id.unwrap_or_default();
    state.history.delete(&user_id, &id)?;
    Ok(StatusCode::NO_CONTENT)
}
