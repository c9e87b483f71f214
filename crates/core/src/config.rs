//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into the relay and the
//! history store. Request handling never reads process-wide environment variables, so a missing
//! credential is reported before the server accepts its first request.

use crate::constants::{
    DEFAULT_DATA_DIR, DEFAULT_GATEWAY_URL, DEFAULT_MAX_BODY_BYTES, DEFAULT_MODEL,
    DEFAULT_UPSTREAM_TIMEOUT_SECS,
};
use crate::{ConfigError, ConfigResult};
use reqwest::Url;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings for the disease analysis relay.
#[derive(Clone)]
pub struct RelayConfig {
    api_key: String,
    gateway_url: Url,
    model: String,
    timeout: Duration,
}

impl RelayConfig {
    /// Create a `RelayConfig` with the default gateway, model and timeout.
    ///
    /// Returns [`ConfigError::MissingApiKey`] if the key is empty or whitespace.
    pub fn new(api_key: impl Into<String>) -> ConfigResult<Self> {
        let api_key = api_key.into().trim().to_string();
        if api_key.is_empty() {
            return Err(ConfigError::MissingApiKey);
        }

        Ok(Self {
            api_key,
            gateway_url: parse_gateway_url(DEFAULT_GATEWAY_URL)?,
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_UPSTREAM_TIMEOUT_SECS),
        })
    }

    /// Build a `RelayConfig` from optional raw values, as read from the environment.
    ///
    /// Unset or blank optional values fall back to their defaults.
    ///
    /// # Errors
    /// Returns an error if:
    /// - `api_key` is missing or blank,
    /// - `gateway_url` is not an absolute http(s) URL, or
    /// - `timeout_secs` is not a positive integer.
    pub fn from_env_values(
        api_key: Option<String>,
        gateway_url: Option<String>,
        model: Option<String>,
        timeout_secs: Option<String>,
    ) -> ConfigResult<Self> {
        let mut cfg = Self::new(api_key.ok_or(ConfigError::MissingApiKey)?)?;

        if let Some(url) = non_blank(gateway_url) {
            cfg.gateway_url = parse_gateway_url(&url)?;
        }
        if let Some(model) = non_blank(model) {
            cfg.model = model;
        }
        if let Some(secs) = non_blank(timeout_secs) {
            cfg.timeout = parse_timeout_secs(&secs)?;
        }

        Ok(cfg)
    }

    pub fn with_gateway_url(mut self, url: &str) -> ConfigResult<Self> {
        self.gateway_url = parse_gateway_url(url)?;
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn gateway_url(&self) -> &Url {
        &self.gateway_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfig")
            .field("api_key", &"<redacted>")
            .field("gateway_url", &self.gateway_url.as_str())
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Settings for the scan history store.
#[derive(Clone, Debug)]
pub struct HistoryConfig {
    data_dir: PathBuf,
}

impl HistoryConfig {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    /// Resolve the data directory from an optional value, defaulting to [`DEFAULT_DATA_DIR`].
    pub fn from_env_value(data_dir: Option<String>) -> Self {
        let dir = non_blank(data_dir).unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());
        Self::new(PathBuf::from(dir))
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

/// Settings for the HTTP server.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl ServerConfig {
    /// Resolve the request body limit from an optional value, defaulting to
    /// [`DEFAULT_MAX_BODY_BYTES`].
    ///
    /// Returns [`ConfigError::InvalidBodyLimit`] unless the value is a positive integer.
    pub fn from_env_value(max_body_bytes: Option<String>) -> ConfigResult<Self> {
        let Some(raw) = non_blank(max_body_bytes) else {
            return Ok(Self::default());
        };
        match raw.parse::<usize>() {
            Ok(bytes) if bytes > 0 => Ok(Self {
                max_body_bytes: bytes,
            }),
            _ => Err(ConfigError::InvalidBodyLimit(format!(
                "expected a positive number of bytes, got '{raw}'"
            ))),
        }
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_gateway_url(raw: &str) -> ConfigResult<Url> {
    let url =
        Url::parse(raw).map_err(|e| ConfigError::InvalidGatewayUrl(format!("{raw}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::InvalidGatewayUrl(format!(
            "unsupported scheme '{other}'"
        ))),
    }
}

fn parse_timeout_secs(raw: &str) -> ConfigResult<Duration> {
    match raw.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidTimeout(format!(
            "expected a positive number of seconds, got '{raw}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_api_key_is_rejected() {
        let err = RelayConfig::from_env_values(None, None, None, None)
            .expect_err("missing key should fail");
        assert!(matches!(err, ConfigError::MissingApiKey));
        assert_eq!(err.to_string(), "AI service is not configured");
    }

    #[test]
    fn test_blank_api_key_is_rejected() {
        let err = RelayConfig::new("   ").expect_err("blank key should fail");
        assert!(matches!(err, ConfigError::MissingApiKey));
    }

    #[test]
    fn test_defaults_apply_when_optional_values_unset() {
        let cfg = RelayConfig::from_env_values(
            Some("secret".into()),
            None,
            Some("  ".into()),
            None,
        )
        .expect("config should resolve");

        assert_eq!(cfg.api_key(), "secret");
        assert_eq!(cfg.gateway_url().as_str(), DEFAULT_GATEWAY_URL);
        assert_eq!(cfg.model(), DEFAULT_MODEL);
        assert_eq!(
            cfg.timeout(),
            Duration::from_secs(DEFAULT_UPSTREAM_TIMEOUT_SECS)
        );
    }

    #[test]
    fn test_overrides_are_applied() {
        let cfg = RelayConfig::from_env_values(
            Some("secret".into()),
            Some("http://127.0.0.1:9999/v1/chat/completions".into()),
            Some("vendor/other-model".into()),
            Some("5".into()),
        )
        .expect("config should resolve");

        assert_eq!(cfg.gateway_url().port(), Some(9999));
        assert_eq!(cfg.model(), "vendor/other-model");
        assert_eq!(cfg.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_timeout_is_rejected() {
        for raw in ["0", "-3", "soon"] {
            let err = RelayConfig::from_env_values(
                Some("secret".into()),
                None,
                None,
                Some(raw.into()),
            )
            .expect_err("invalid timeout should fail");
            assert!(matches!(err, ConfigError::InvalidTimeout(_)), "{raw}");
        }
    }

    #[test]
    fn test_gateway_url_must_be_http() {
        let err = RelayConfig::new("secret")
            .unwrap()
            .with_gateway_url("ftp://example.com/chat")
            .expect_err("ftp should be rejected");
        assert!(matches!(err, ConfigError::InvalidGatewayUrl(_)));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let cfg = RelayConfig::new("super-secret-key").unwrap();
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("super-secret-key"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_history_config_defaults_data_dir() {
        assert_eq!(
            HistoryConfig::from_env_value(None).data_dir(),
            Path::new(DEFAULT_DATA_DIR)
        );
        assert_eq!(
            HistoryConfig::from_env_value(Some("/tmp/scans".into())).data_dir(),
            Path::new("/tmp/scans")
        );
    }

    #[test]
    fn test_server_config_body_limit() {
        assert_eq!(
            ServerConfig::from_env_value(None).unwrap().max_body_bytes(),
            DEFAULT_MAX_BODY_BYTES
        );
        assert_eq!(
            ServerConfig::from_env_value(Some("1048576".into()))
                .unwrap()
                .max_body_bytes(),
            1_048_576
        );
        for raw in ["0", "-1", "lots"] {
            let err = ServerConfig::from_env_value(Some(raw.into()))
                .expect_err("invalid limit should fail");
            assert!(matches!(err, ConfigError::InvalidBodyLimit(_)), "{raw}");
        }
    }
}
