//! Scan identifiers and sharded storage paths.
//!
//! Scans are stored under a directory derived from their id:
//! `parent_dir/<id[0..2]>/<id[2..4]>/<id>/`
//!
//! Ids use a canonical form, 32 lowercase hex characters without hyphens (the value of
//! `Uuid::new_v4().simple().to_string()`). Ids supplied from outside, for example a REST path
//! segment, must already be canonical; uppercase or hyphenated forms are rejected rather than
//! normalised so that one scan never has two spellings.

use crate::{HistoryError, HistoryResult};
use std::path::{Path, PathBuf};
use std::{fmt, str::FromStr};
use uuid::Uuid;

/// Canonical identifier of a persisted scan.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ScanId(Uuid);

impl Default for ScanId {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanId {
    /// Allocate a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Validate an externally supplied id.
    ///
    /// # Errors
    /// Returns [`HistoryError::InvalidInput`] if `input` is not canonical.
    pub fn parse(input: &str) -> HistoryResult<Self> {
        if !Self::is_canonical(input) {
            return Err(HistoryError::InvalidInput(format!(
                "scan id must be 32 lowercase hex characters without hyphens, got: '{}'",
                input
            )));
        }
        Uuid::parse_str(input)
            .map(Self)
            .map_err(|e| HistoryError::InvalidInput(format!("invalid scan id '{input}': {e}")))
    }

    /// Purely syntactic check for the canonical form.
    pub fn is_canonical(input: &str) -> bool {
        input.len() == 32
            && input
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }

    /// Returns `parent_dir/<s1>/<s2>/<id>/`.
    pub fn sharded_dir(&self, parent_dir: &Path) -> PathBuf {
        let canonical = self.0.simple().to_string();
        let s1 = &canonical[0..2];
        let s2 = &canonical[2..4];
        parent_dir.join(s1).join(s2).join(&canonical)
    }
}

impl fmt::Display for ScanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for ScanId {
    type Err = HistoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ScanId::parse(s)
    }
}

impl serde::Serialize for ScanId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for ScanId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = <String as serde::Deserialize>::deserialize(deserializer)?;
        ScanId::parse(&s).map_err(serde::de::Error::custom)
    }
}
