//! Disease analysis relay.
//!
//! Forwards one image, together with a fixed diagnosis prompt, to the AI gateway's
//! chat-completion endpoint and turns the reply into a [`DiagnosisRecord`].
//!
//! ## Outcomes
//!
//! | Upstream | Result |
//! |---|---|
//! | 2xx with content | parsed record, or the fallback record if the content is not JSON |
//! | 2xx without content | [`RelayError::EmptyResponse`] |
//! | 429 | [`RelayError::RateLimited`] |
//! | 402 | [`RelayError::CreditsExhausted`] |
//! | other status | [`RelayError::UpstreamStatus`] |
//! | no reply within the configured timeout | [`RelayError::Timeout`] |
//!
//! Exactly one request is sent per call. Rate-limit and billing signals must reach the caller
//! unchanged, so nothing here retries.

use crate::config::RelayConfig;
use crate::constants::{SYSTEM_PROMPT, USER_INSTRUCTION};
use crate::diagnosis::{parse_diagnosis, DiagnosisRecord, ImageReference};
use crate::{ConfigError, ConfigResult, RelayError, RelayResult};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Stateless relay to the AI gateway.
///
/// Cloning is cheap: the HTTP client pools connections internally and the configuration is
/// shared.
#[derive(Clone, Debug)]
pub struct DiseaseRelay {
    client: reqwest::Client,
    cfg: Arc<RelayConfig>,
}

impl DiseaseRelay {
    /// Build a relay whose outbound calls are bounded by `cfg.timeout()`.
    pub fn new(cfg: Arc<RelayConfig>) -> ConfigResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(cfg.timeout())
            .build()
            .map_err(ConfigError::HttpClient)?;

        Ok(Self { client, cfg })
    }

    /// Analyse one plant image.
    ///
    /// # Errors
    /// Returns a [`RelayError`] for every upstream outcome other than a 2xx reply with content.
    /// A reply that is not valid JSON is not an error.
    pub async fn analyze(&self, image: &ImageReference) -> RelayResult<DiagnosisRecord> {
        tracing::info!("Analyzing disease from image {}", image);

        let request = ChatCompletionRequest::diagnosis(self.cfg.model(), image);
        let response = self
            .client
            .post(self.cfg.gateway_url().clone())
            .bearer_auth(self.cfg.api_key())
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("AI Gateway error: {} {}", status, error_text);
            return Err(match status {
                StatusCode::TOO_MANY_REQUESTS => RelayError::RateLimited,
                StatusCode::PAYMENT_REQUIRED => RelayError::CreditsExhausted,
                other => RelayError::UpstreamStatus(other.as_u16()),
            });
        }

        let completion: ChatCompletionResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                RelayError::Timeout
            } else {
                RelayError::InvalidEnvelope(e)
            }
        })?;

        let content = completion
            .into_first_content()
            .ok_or(RelayError::EmptyResponse)?;
        tracing::info!("AI analysis received: {}", content);

        Ok(parse_diagnosis(&content))
    }
}

fn transport_error(e: reqwest::Error) -> RelayError {
    if e.is_timeout() {
        tracing::error!("AI Gateway timed out: {}", e);
        RelayError::Timeout
    } else {
        tracing::error!("AI Gateway request failed: {}", e);
        RelayError::Transport(e)
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

impl<'a> ChatCompletionRequest<'a> {
    fn diagnosis(model: &'a str, image: &'a ImageReference) -> Self {
        Self {
            model,
            messages: vec![
                ChatMessage::System {
                    content: SYSTEM_PROMPT,
                },
                ChatMessage::User {
                    content: vec![
                        ContentPart::Text {
                            text: USER_INSTRUCTION,
                        },
                        ContentPart::ImageUrl {
                            image_url: ImageUrl {
                                url: image.as_str(),
                            },
                        },
                    ],
                },
            ],
            stream: false,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
enum ChatMessage<'a> {
    System { content: &'a str },
    User { content: Vec<ContentPart<'a>> },
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl<'a> },
}

#[derive(Debug, Serialize)]
struct ImageUrl<'a> {
    url: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl ChatCompletionResponse {
    fn into_first_content(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .filter(|content| !content.is_empty())
    }
}
