//! Diagnosis records and the parsing of model replies into them.
//!
//! The model is asked for a raw JSON object but frequently wraps it in a markdown code fence.
//! [`parse_diagnosis`] strips fences and parses the object; any reply that still is not a usable
//! JSON object becomes [`DiagnosisRecord::fallback`], which keeps the raw text in `symptoms` so a
//! person can still read the answer.

use crate::constants::{
    FALLBACK_CAUSE, FALLBACK_DISEASE, FALLBACK_PLANT_NAME, FALLBACK_PREVENTION,
    FALLBACK_TREATMENT, HEALTHY_DISEASE,
};
use crate::{RelayError, RelayResult};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// The six-field result of one analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisRecord {
    /// Common name of the plant, "Unknown Plant" when undeterminable
    pub plant_name: String,
    /// Disease name, or "Healthy" when no issue was found
    pub disease: String,
    pub cause: String,
    pub symptoms: String,
    pub treatment: String,
    pub prevention: String,
}

impl DiagnosisRecord {
    /// Placeholder record for a reply that could not be parsed.
    ///
    /// Every field except `symptoms` is fixed; `symptoms` carries `raw` verbatim.
    pub fn fallback(raw: impl Into<String>) -> Self {
        Self {
            plant_name: FALLBACK_PLANT_NAME.to_string(),
            disease: FALLBACK_DISEASE.to_string(),
            cause: FALLBACK_CAUSE.to_string(),
            symptoms: raw.into(),
            treatment: FALLBACK_TREATMENT.to_string(),
            prevention: FALLBACK_PREVENTION.to_string(),
        }
    }

    /// Case-insensitive match on "Healthy". Surrounding whitespace counts as a different value.
    pub fn is_healthy(&self) -> bool {
        self.disease.eq_ignore_ascii_case(HEALTHY_DISEASE)
    }
}

/// Field-by-field view of a model reply before defaults are applied.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelDiagnosis {
    plant_name: Option<String>,
    disease: Option<String>,
    cause: Option<String>,
    symptoms: Option<String>,
    treatment: Option<String>,
    prevention: Option<String>,
}

impl From<ModelDiagnosis> for DiagnosisRecord {
    fn from(d: ModelDiagnosis) -> Self {
        let plant_name = d
            .plant_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| FALLBACK_PLANT_NAME.to_string());

        Self {
            plant_name,
            disease: d.disease.unwrap_or_default(),
            cause: d.cause.unwrap_or_default(),
            symptoms: d.symptoms.unwrap_or_default(),
            treatment: d.treatment.unwrap_or_default(),
            prevention: d.prevention.unwrap_or_default(),
        }
    }
}

/// Remove markdown code-fence markers and trim the result.
///
/// Scans left to right and drops every opening marker (```` ```json ````, plus one newline if
/// present) and every closing marker (```` ``` ````, plus one preceding newline if present).
/// Matching is case-sensitive.
pub fn strip_code_fences(text: &str) -> String {
    const MARKERS: [&str; 4] = ["```json\n", "```json", "\n```", "```"];

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    'scan: while let Some(ch) = rest.chars().next() {
        for marker in MARKERS {
            if let Some(after) = rest.strip_prefix(marker) {
                rest = after;
                continue 'scan;
            }
        }
        out.push(ch);
        rest = &rest[ch.len_utf8()..];
    }

    out.trim().to_string()
}

/// Turn a model reply into a diagnosis, falling back when it is not a JSON object.
///
/// Absent fields are filled (`plantName` with "Unknown Plant", the rest with empty text) and
/// unknown fields are dropped. A reply whose six fields are not all strings counts as
/// unparseable.
pub fn parse_diagnosis(raw: &str) -> DiagnosisRecord {
    match try_parse_diagnosis(&strip_code_fences(raw)) {
        Ok(record) => record,
        Err(e) => {
            tracing::warn!("failed to parse AI response, using fallback: {}", e);
            DiagnosisRecord::fallback(raw)
        }
    }
}

fn try_parse_diagnosis(json: &str) -> Result<DiagnosisRecord, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    if !value.is_object() {
        return Err(serde::de::Error::custom("expected a JSON object"));
    }
    let parsed = ModelDiagnosis::deserialize(value)?;
    Ok(parsed.into())
}

/// A non-empty reference to the image under analysis: a data URI or a reachable URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference(String);

impl ImageReference {
    /// Returns [`RelayError::MissingImage`] if the trimmed input is empty.
    pub fn new(input: impl AsRef<str>) -> RelayResult<Self> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(RelayError::MissingImage);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Accept an optional field from a request body.
    pub fn from_optional(input: Option<String>) -> RelayResult<Self> {
        match input {
            Some(text) => Self::new(text),
            None => Err(RelayError::MissingImage),
        }
    }

    /// Encode raw image bytes as a base64 `data:` URI.
    pub fn from_bytes(bytes: &[u8], media_type: &str) -> RelayResult<Self> {
        if bytes.is_empty() {
            return Err(RelayError::MissingImage);
        }
        let payload = base64::engine::general_purpose::STANDARD.encode(bytes);
        Ok(Self(format!("data:{media_type};base64,{payload}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_data_uri(&self) -> bool {
        self.0.starts_with("data:")
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_data_uri() {
            // Data URIs can run to megabytes; show the header only.
            let header = self.0.split(',').next().unwrap_or_default();
            write!(f, "{header},<{} bytes>", self.0.len())
        } else {
            write!(f, "{}", self.0)
        }
    }
}
