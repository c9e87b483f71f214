/// Errors raised while resolving startup configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("AI service is not configured")]
    MissingApiKey,
    #[error("invalid upstream timeout: {0}")]
    InvalidTimeout(String),
    #[error("invalid gateway URL: {0}")]
    InvalidGatewayUrl(String),
    #[error("invalid request body limit: {0}")]
    InvalidBodyLimit(String),
    #[error("failed to build HTTP client: {0}")]
    HttpClient(reqwest::Error),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Terminal outcomes of one relay invocation.
///
/// A reply that is not valid JSON is not an error: it becomes the fallback record.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Image URL is required")]
    MissingImage,
    #[error("Rate limit exceeded. Please try again in a moment.")]
    RateLimited,
    #[error("AI service credits exhausted. Please contact support.")]
    CreditsExhausted,
    #[error("AI Gateway error: {0}")]
    UpstreamStatus(u16),
    #[error("No response from AI")]
    EmptyResponse,
    #[error("AI Gateway timed out")]
    Timeout,
    #[error("AI Gateway request failed: {0}")]
    Transport(reqwest::Error),
    #[error("failed to decode AI Gateway response: {0}")]
    InvalidEnvelope(reqwest::Error),
}

pub type RelayResult<T> = std::result::Result<T, RelayError>;

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("scan not found: {0}")]
    NotFound(String),
    #[error("failed to create scan directory: {0}")]
    ScanDirCreation(std::io::Error),
    #[error("failed to write scan file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read scan file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to delete scan: {0}")]
    FileDelete(std::io::Error),
    #[error("failed to serialize scan: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize scan: {0}")]
    Deserialization(serde_json::Error),
}

pub type HistoryResult<T> = std::result::Result<T, HistoryError>;
