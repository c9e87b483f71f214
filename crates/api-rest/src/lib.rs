//! # API REST
//!
//! REST API for Greenleaf.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON error bodies, CORS)
//!
//! Uses `greenleaf-core` for the relay and the scan history.

#![warn(rust_2018_idioms)]

pub mod error;
pub mod handlers;
pub mod types;

use axum::extract::DefaultBodyLimit;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::HeaderName;
use axum::routing::{get, post};
use axum::Router;
use greenleaf_core::{DiagnosisRecord, DiseaseRelay, HistoryService, ScanRecord, ScanStats};
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use error::ApiError;

/// Application state shared across REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub relay: DiseaseRelay,
    pub history: HistoryService,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::analyze_disease,
        handlers::list_scans,
        handlers::save_scan,
        handlers::scan_stats,
        handlers::get_scan,
        handlers::delete_scan,
    ),
    components(schemas(
        types::HealthRes,
        types::AnalyzeDiseaseReq,
        types::SaveScanReq,
        types::ErrorRes,
        DiagnosisRecord,
        ScanRecord,
        ScanStats,
    ))
)]
pub struct ApiDoc;

/// CORS policy for browser callers: any origin, and the headers the web client sends.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers([
            AUTHORIZATION,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
            CONTENT_TYPE,
        ])
}

/// Build the full REST router.
///
/// `max_body_bytes` replaces axum's default 2 MB cap on JSON bodies, since images arrive inline
/// as data URIs.
pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/analyze-disease", post(handlers::analyze_disease))
        .route(
            "/scans",
            get(handlers::list_scans).post(handlers::save_scan),
        )
        .route("/scans/stats", get(handlers::scan_stats))
        .route(
            "/scans/:id",
            get(handlers::get_scan).delete(handlers::delete_scan),
        )
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(cors_layer())
        .with_state(state)
}
