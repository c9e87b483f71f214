//! Constants used throughout the Greenleaf core crate.
//!
//! Prompt text, fallback strings and storage names live here so the relay, the history store and
//! their tests agree on exact values.

/// Default chat-completion endpoint of the AI gateway.
pub const DEFAULT_GATEWAY_URL: &str = "https://ai.gateway.lovable.dev/v1/chat/completions";

/// Default multimodal model used for diagnosis.
pub const DEFAULT_MODEL: &str = "google/gemini-2.5-flash";

/// Default upper bound on one upstream call, in seconds.
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 60;

/// Default upper bound on a REST request body, in bytes.
///
/// Images travel inline as base64 data URIs, so this must hold a full-size phone photo.
pub const DEFAULT_MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Default directory for scan history storage when no explicit directory is configured.
pub const DEFAULT_DATA_DIR: &str = "scan_data";

/// Directory name for scan records under the data directory.
pub const SCANS_DIR_NAME: &str = "scans";

/// Filename for a persisted scan record.
pub const SCAN_FILENAME: &str = "scan.json";

/// Sentinel disease value meaning no issue was found.
pub const HEALTHY_DISEASE: &str = "Healthy";

/// System instruction sent with every analysis request.
pub const SYSTEM_PROMPT: &str = r#"You are an expert plant pathologist AI. Analyze the provided plant image and identify any diseases, pests, or health issues.

Provide your response in the following JSON format (no markdown, just raw JSON):
{
  "plantName": "Common name of the plant",
  "disease": "Name of the disease or 'Healthy' if no issues found",
  "cause": "What causes this disease (pathogen, environmental factors, etc.)",
  "symptoms": "Visible symptoms and signs of the disease",
  "treatment": "Recommended treatment steps and remedies",
  "prevention": "How to prevent this disease in the future"
}

If you cannot identify the plant or disease with confidence, provide your best assessment and mention the uncertainty in the response."#;

/// User instruction that accompanies the image.
pub const USER_INSTRUCTION: &str =
    "Please analyze this plant image and identify any diseases or health issues.";

// Fallback record, used when the model reply is not JSON.
pub const FALLBACK_PLANT_NAME: &str = "Unknown Plant";
pub const FALLBACK_DISEASE: &str = "Analysis Incomplete";
pub const FALLBACK_CAUSE: &str = "Unable to complete analysis";
pub const FALLBACK_TREATMENT: &str = "Please try uploading a clearer image";
pub const FALLBACK_PREVENTION: &str = "Ensure good lighting and focus on affected areas";

/// Caller-facing message for an upstream 429.
pub const RATE_LIMIT_MESSAGE: &str = "Rate limit exceeded. Please try again in a moment.";

/// Caller-facing message for an upstream 402.
pub const CREDITS_EXHAUSTED_MESSAGE: &str =
    "AI service credits exhausted. Please contact support.";
