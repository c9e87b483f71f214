//! Scan history.
//!
//! Persists diagnoses together with the user and image they belong to, and derives the summary
//! figures shown on a dashboard.
//!
//! ## Storage Layout
//!
//! Each scan is one JSON file in a sharded directory:
//!
//! ```text
//! <data_dir>/
//!   scans/
//!     <s1>/
//!       <s2>/
//!         <id>/
//!           scan.json
//! ```
//!
//! where `s1` and `s2` are the first four hex characters of the scan id.
//!
//! Only data operations live here; HTTP concerns belong in `api-rest`.

use crate::config::HistoryConfig;
use crate::constants::{SCANS_DIR_NAME, SCAN_FILENAME};
use crate::diagnosis::DiagnosisRecord;
use crate::scan_id::ScanId;
use crate::{HistoryError, HistoryResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use utoipa::ToSchema;

/// A persisted analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScanRecord {
    #[schema(value_type = String, example = "550e8400e29b41d4a716446655440000")]
    pub id: ScanId,
    pub user_id: String,
    /// Data URI or URL of the analysed image
    pub image_url: String,
    #[serde(flatten)]
    pub diagnosis: DiagnosisRecord,
    pub created_at: DateTime<Utc>,
}

impl ScanRecord {
    /// Build a new record with a fresh id, stamped with the current time.
    ///
    /// # Errors
    /// Returns [`HistoryError::InvalidInput`] if `user_id` or `image_url` is blank.
    pub fn new(
        user_id: &str,
        image_url: &str,
        diagnosis: DiagnosisRecord,
    ) -> HistoryResult<Self> {
        let user_id = require_non_blank(user_id, "user id")?;
        let image_url = require_non_blank(image_url, "image url")?;

        Ok(Self {
            id: ScanId::new(),
            user_id,
            image_url,
            diagnosis,
            created_at: Utc::now(),
        })
    }
}

/// Summary figures for one user's scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScanStats {
    pub total: usize,
    /// Scans whose disease is anything other than "Healthy"
    pub issues: usize,
    /// Percentage of healthy scans, rounded; 100 when there are no scans
    pub healthy_rate: u32,
}

impl ScanStats {
    pub fn from_records(records: &[ScanRecord]) -> Self {
        let total = records.len();
        let issues = records
            .iter()
            .filter(|r| !r.diagnosis.is_healthy())
            .count();
        let healthy_rate = if total == 0 {
            100
        } else {
            ((total - issues) as f64 * 100.0 / total as f64).round() as u32
        };

        Self {
            total,
            issues,
            healthy_rate,
        }
    }
}

/// File-backed scan history.
#[derive(Clone, Debug)]
pub struct HistoryService {
    scans_dir: PathBuf,
}

impl HistoryService {
    pub fn new(cfg: &HistoryConfig) -> Self {
        Self {
            scans_dir: cfg.data_dir().join(SCANS_DIR_NAME),
        }
    }

    pub fn scans_dir(&self) -> &Path {
        &self.scans_dir
    }

    /// Persist a new scan for `user_id` and return it.
    pub fn save(
        &self,
        user_id: &str,
        image_url: &str,
        diagnosis: DiagnosisRecord,
    ) -> HistoryResult<ScanRecord> {
        let record = ScanRecord::new(user_id, image_url, diagnosis)?;
        self.save_record(&record)?;
        Ok(record)
    }

    /// Write `record` to its sharded location, replacing any previous copy.
    pub fn save_record(&self, record: &ScanRecord) -> HistoryResult<()> {
        let scan_dir = record.id.sharded_dir(&self.scans_dir);
        fs::create_dir_all(&scan_dir).map_err(HistoryError::ScanDirCreation)?;

        let json = serde_json::to_string_pretty(record).map_err(HistoryError::Serialization)?;
        fs::write(scan_dir.join(SCAN_FILENAME), json).map_err(HistoryError::FileWrite)?;

        tracing::info!("saved scan {} for user {}", record.id, record.user_id);
        Ok(())
    }

    /// Read one scan owned by `user_id`.
    ///
    /// # Errors
    /// Returns [`HistoryError::NotFound`] if no scan with this id exists or it belongs to another
    /// user.
    pub fn get(&self, user_id: &str, id: &ScanId) -> HistoryResult<ScanRecord> {
        let user_id = require_non_blank(user_id, "user id")?;
        let path = id.sharded_dir(&self.scans_dir).join(SCAN_FILENAME);
        if !path.is_file() {
            return Err(HistoryError::NotFound(id.to_string()));
        }

        let scan = read_scan(&path)?;
        if scan.user_id != user_id {
            tracing::warn!("user {} asked for scan {} owned by another user", user_id, id);
            return Err(HistoryError::NotFound(id.to_string()));
        }
        Ok(scan)
    }

    /// Delete one scan owned by `user_id`, together with its directory.
    ///
    /// Scans of other users are reported as [`HistoryError::NotFound`] and left in place.
    pub fn delete(&self, user_id: &str, id: &ScanId) -> HistoryResult<()> {
        self.get(user_id, id)?;
        fs::remove_dir_all(id.sharded_dir(&self.scans_dir)).map_err(HistoryError::FileDelete)?;

        tracing::info!("deleted scan {}", id);
        Ok(())
    }

    /// All scans belonging to `user_id`, newest first.
    ///
    /// A missing store yields an empty list. Files that cannot be read or parsed are logged and
    /// skipped.
    pub fn list_for_user(&self, user_id: &str) -> HistoryResult<Vec<ScanRecord>> {
        let user_id = require_non_blank(user_id, "user id")?;

        let mut scans: Vec<ScanRecord> = self
            .scan_files()
            .into_iter()
            .filter_map(|path| match read_scan(&path) {
                Ok(scan) => Some(scan),
                Err(e) => {
                    tracing::warn!("skipping unreadable scan {}: {}", path.display(), e);
                    None
                }
            })
            .filter(|scan| scan.user_id == user_id)
            .collect();

        scans.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(scans)
    }

    pub fn stats_for_user(&self, user_id: &str) -> HistoryResult<ScanStats> {
        let scans = self.list_for_user(user_id)?;
        Ok(ScanStats::from_records(&scans))
    }

    /// Paths of every `scan.json` under the sharded tree.
    fn scan_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();

        let s1_iter = match fs::read_dir(&self.scans_dir) {
            Ok(it) => it,
            Err(_) => return files,
        };
        for s1 in s1_iter.flatten() {
            let s2_iter = match fs::read_dir(s1.path()) {
                Ok(it) => it,
                Err(_) => continue,
            };
            for s2 in s2_iter.flatten() {
                let id_iter = match fs::read_dir(s2.path()) {
                    Ok(it) => it,
                    Err(_) => continue,
                };
                for id_ent in id_iter.flatten() {
                    let scan_path = id_ent.path().join(SCAN_FILENAME);
                    if scan_path.is_file() {
                        files.push(scan_path);
                    }
                }
            }
        }

        files
    }
}

fn read_scan(path: &Path) -> HistoryResult<ScanRecord> {
    let contents = fs::read_to_string(path).map_err(HistoryError::FileRead)?;
    serde_json::from_str(&contents).map_err(HistoryError::Deserialization)
}

fn require_non_blank(value: &str, what: &str) -> HistoryResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(HistoryError::InvalidInput(format!("{what} cannot be empty")));
    }
    Ok(trimmed.to_string())
}
