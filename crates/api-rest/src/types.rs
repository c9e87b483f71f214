//! Request and response bodies of the REST API.

use greenleaf_core::DiagnosisRecord;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Body of `POST /analyze-disease`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeDiseaseReq {
    /// Data URI or externally reachable URL of the plant photo
    #[schema(example = "data:image/jpeg;base64,/9j/4AAQSkZJRg==")]
    pub image_url: Option<String>,
}

/// Body of `POST /scans`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaveScanReq {
    pub user_id: String,
    pub image_url: String,
    pub diagnosis: DiagnosisRecord,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct UserQuery {
    /// Owner of the scans
    pub user_id: Option<String>,
}

/// Error body shared by every failing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub error: String,
}
