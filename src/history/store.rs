//! Local JSON document store for analysis history.
//!
//! Documents live at `{root}/{user_id}/{timestamp_id}.json`, mirroring the
//! `analysis_result/{user}/timestamps/{id}` layout of the hosted store.

use crate::models::{AnalysisKind, RawAnalysisPayload};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// One stored analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    /// Document id, derived from the timestamp.
    pub id: String,
    pub user_id: String,
    pub product_name: String,
    pub analysis_type: AnalysisKind,
    pub timestamp: DateTime<Utc>,
    /// The payload exactly as it will be replayed.
    pub results: RawAnalysisPayload,
}

/// Document id for a timestamp: RFC 3339 with `:` and `.` replaced by `_`.
pub fn timestamp_id(timestamp: &DateTime<Utc>) -> String {
    timestamp
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "_")
}

/// File-backed history store.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    root: PathBuf,
}

impl HistoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store a payload stamped with the current time.
    pub fn save(
        &self,
        user_id: &str,
        product_name: &str,
        kind: AnalysisKind,
        results: &RawAnalysisPayload,
    ) -> Result<HistoryRecord> {
        self.save_at(user_id, product_name, kind, results, Utc::now())
    }

    /// Store a payload with an explicit timestamp.
    pub fn save_at(
        &self,
        user_id: &str,
        product_name: &str,
        kind: AnalysisKind,
        results: &RawAnalysisPayload,
        timestamp: DateTime<Utc>,
    ) -> Result<HistoryRecord> {
        let dir = self.user_dir(user_id)?;
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create history directory: {}", dir.display()))?;

        let record = HistoryRecord {
            id: timestamp_id(&timestamp),
            user_id: user_id.to_string(),
            product_name: product_name.to_string(),
            analysis_type: kind,
            timestamp,
            results: results.clone(),
        };

        let path = dir.join(format!("{}.json", record.id));
        let content = serde_json::to_string_pretty(&record)?;
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write history record: {}", path.display()))?;

        info!("Saved analysis {} for user {}", record.id, user_id);
        Ok(record)
    }

    /// All records of a user, newest first.
    ///
    /// Documents that cannot be read or parsed are skipped.
    pub fn list(&self, user_id: &str) -> Result<Vec<HistoryRecord>> {
        let dir = self.user_dir(user_id)?;
        if !dir.is_dir() {
            debug!("No history directory for user {}", user_id);
            return Ok(Vec::new());
        }

        let mut records = Vec::new();

        for entry in WalkDir::new(&dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !entry.file_type().is_file()
                || path.extension().and_then(|e| e.to_str()) != Some("json")
            {
                continue;
            }

            match read_record(path) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping history document {}: {:#}", path.display(), e),
            }
        }

        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        debug!("Loaded {} history records for {}", records.len(), user_id);

        Ok(records)
    }

    /// A single record, if it exists.
    pub fn get(&self, user_id: &str, id: &str) -> Result<Option<HistoryRecord>> {
        let path = self.record_path(user_id, id)?;
        if !path.exists() {
            return Ok(None);
        }
        read_record(&path).map(Some)
    }

    /// Remove a record. Returns whether anything was deleted.
    pub fn delete(&self, user_id: &str, id: &str) -> Result<bool> {
        let path = self.record_path(user_id, id)?;
        if !path.exists() {
            return Ok(false);
        }

        std::fs::remove_file(&path)
            .with_context(|| format!("Failed to delete history record: {}", path.display()))?;
        info!("Deleted analysis {} for user {}", id, user_id);
        Ok(true)
    }

    fn user_dir(&self, user_id: &str) -> Result<PathBuf> {
        validate_segment("user id", user_id)?;
        Ok(self.root.join(user_id))
    }

    fn record_path(&self, user_id: &str, id: &str) -> Result<PathBuf> {
        validate_segment("record id", id)?;
        Ok(self.user_dir(user_id)?.join(format!("{}.json", id)))
    }
}

fn read_record(path: &Path) -> Result<HistoryRecord> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Ids become path segments, so they must not escape the store.
fn validate_segment(what: &str, value: &str) -> Result<()> {
    if value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(['/', '\\'])
    {
        bail!("Invalid {}: {:?}", what, value);
    }
    Ok(())
}
