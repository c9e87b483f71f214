//! # Greenleaf Core
//!
//! Core logic for the Greenleaf plant disease diagnosis service:
//! - [`DiseaseRelay`]: forwards a plant image to the AI gateway and normalises the reply
//! - [`DiagnosisRecord`]: the six-field diagnosis, including the deterministic fallback
//! - [`HistoryService`]: file-backed scan history and dashboard statistics
//! - [`RelayConfig`] / [`HistoryConfig`] / [`ServerConfig`]: configuration resolved once at startup
//!
//! **No API concerns**: HTTP routing, CORS and error-to-status mapping belong in `api-rest`.

pub mod config;
pub mod constants;
pub mod diagnosis;
pub mod error;
pub mod history;
pub mod relay;
pub mod scan_id;

pub use config::{HistoryConfig, RelayConfig, ServerConfig};
pub use diagnosis::{parse_diagnosis, strip_code_fences, DiagnosisRecord, ImageReference};
pub use error::{
    ConfigError, ConfigResult, HistoryError, HistoryResult, RelayError, RelayResult,
};
pub use history::{HistoryService, ScanRecord, ScanStats};
pub use relay::DiseaseRelay;
pub use scan_id::ScanId;
