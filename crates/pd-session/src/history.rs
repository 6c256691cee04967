//! JSON-file run history
//!
//! One pretty-printed JSON file per run under the store directory, capped at
//! 25 records with oldest-by-mtime eviction. Records carry the full model
//! snapshot and the generated replication script, so a run can be restored
//! or re-run later; corrupt files are skipped on listing, never fatal.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use pd_core::{ModelSnapshot, RunParams};

use crate::engine::PowerResult;
use crate::error::{Result, SessionError};

/// Maximum number of retained records
pub const MAX_RECORDS: usize = 25;

/// One persisted run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: String,
    /// RFC 3339 UTC timestamp of the save
    pub timestamp: String,
    /// "power" or "sample_size"
    pub mode: String,
    pub result: PowerResult,
    pub state_snapshot: ModelSnapshot,
    pub analysis_params: RunParams,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_file_path: Option<String>,
    /// Generated replication script
    pub script: String,
    /// User-assigned display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_name: Option<String>,
}

/// Lightweight listing entry
#[derive(Clone, Debug, PartialEq)]
pub struct HistorySummary {
    pub id: String,
    pub timestamp: String,
    pub mode: String,
    pub formula: String,
    pub custom_name: Option<String>,
}

/// File-per-record store rooted at one directory
pub struct HistoryStore {
    dir: PathBuf,
}

impl HistoryStore {
    /// Open (creating if needed) a store at `dir`
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(HistoryStore { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist one run and enforce the record cap
    pub fn save(
        &self,
        mode: &str,
        result: PowerResult,
        state_snapshot: ModelSnapshot,
        analysis_params: RunParams,
        data_file_path: Option<String>,
        script: String,
    ) -> Result<HistoryRecord> {
        let record = HistoryRecord {
            id: Uuid::new_v4().simple().to_string(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            mode: mode.to_string(),
            result,
            state_snapshot,
            analysis_params,
            data_file_path,
            script,
            custom_name: None,
        };
        self.write_record(&record)?;
        self.evict_over_cap()?;
        log::debug!("saved history record {}", record.id);
        Ok(record)
    }

    /// Summaries, newest first. Corrupt files are logged and skipped.
    pub fn list(&self) -> Result<Vec<HistorySummary>> {
        let mut summaries = Vec::new();
        for path in self.record_paths()? {
            match self.read_record(&path) {
                Ok(record) => summaries.push(HistorySummary {
                    id: record.id,
                    timestamp: record.timestamp,
                    mode: record.mode,
                    formula: record.state_snapshot.formula,
                    custom_name: record.custom_name,
                }),
                Err(err) => {
                    log::warn!("skipping unreadable history file {:?}: {}", path, err);
                }
            }
        }
        summaries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(summaries)
    }

    pub fn load(&self, id: &str) -> Result<HistoryRecord> {
        let path = self.record_path(id);
        if !path.exists() {
            return Err(SessionError::RecordNotFound(id.to_string()));
        }
        self.read_record(&path)
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        let path = self.record_path(id);
        if !path.exists() {
            return Err(SessionError::RecordNotFound(id.to_string()));
        }
        fs::remove_file(path)?;
        Ok(())
    }

    /// Assign or clear (empty string) a display name
    pub fn set_custom_name(&self, id: &str, name: &str) -> Result<()> {
        let mut record = self.load(id)?;
        let trimmed = name.trim();
        record.custom_name = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
        self.write_record(&record)
    }

    fn record_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    fn write_record(&self, record: &HistoryRecord) -> Result<()> {
        let json = serde_json::to_string_pretty(record)?;
        fs::write(self.record_path(&record.id), json)?;
        Ok(())
    }

    fn read_record(&self, path: &Path) -> Result<HistoryRecord> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    fn record_paths(&self) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        Ok(paths)
    }

    /// Delete oldest files (by modification time) beyond the cap
    fn evict_over_cap(&self) -> Result<()> {
        let mut paths: Vec<(SystemTime, PathBuf)> = self
            .record_paths()?
            .into_iter()
            .filter_map(|path| {
                let mtime = fs::metadata(&path).and_then(|m| m.modified()).ok()?;
                Some((mtime, path))
            })
            .collect();
        if paths.len() <= MAX_RECORDS {
            return Ok(());
        }
        paths.sort_by_key(|(mtime, _)| *mtime);
        for (_, path) in paths.iter().take(paths.len() - MAX_RECORDS) {
            log::debug!("evicting history record {:?}", path);
            fs::remove_file(path)?;
        }
        Ok(())
    }
}
