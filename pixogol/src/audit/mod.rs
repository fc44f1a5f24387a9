//! Append-only audit trail of completed analyses.
//!
//! Every analysis becomes one JSON line in `<log_dir>/pixogol_analysis_<YYYYMMDD>.jsonl`,
//! dated by the record's own local timestamp. The file is opened, appended
//! and closed on every call; nothing in the process reads it back.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::config::AuditConfig;
use crate::error::{PixogolError, Result};
use crate::models::AnalysisRecord;

pub trait AuditSink: Send + Sync {
    /// Persist one record and return where it went.
    fn append(&self, record: &AnalysisRecord) -> Result<PathBuf>;
}

#[derive(Debug, Clone)]
pub struct AuditLog {
    log_dir: PathBuf,
    write_snapshots: bool,
}

impl AuditLog {
    pub fn new(config: &AuditConfig) -> Self {
        Self {
            log_dir: config.log_dir.clone(),
            write_snapshots: config.write_snapshots,
        }
    }

    pub fn daily_file_name(date: NaiveDate) -> String {
        format!("pixogol_analysis_{}.jsonl", date.format("%Y%m%d"))
    }

    pub fn snapshot_file_name(record: &AnalysisRecord) -> String {
        format!(
            "analysis_{}_{}.json",
            record.analysis_id,
            record.timestamp.format("%Y%m%d_%H%M%S")
        )
    }

    fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.log_dir).map_err(|e| {
            PixogolError::Audit(format!(
                "Failed to create log directory {}: {e}",
                self.log_dir.display()
            ))
        })
    }

    fn append_line(&self, record: &AnalysisRecord) -> Result<PathBuf> {
        let path = self
            .log_dir
            .join(Self::daily_file_name(record.timestamp.date_naive()));

        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                PixogolError::Audit(format!("Failed to open {}: {e}", path.display()))
            })?;
        // One write call per line keeps concurrent appenders from interleaving.
        file.write_all(line.as_bytes()).map_err(|e| {
            PixogolError::Audit(format!("Failed to append to {}: {e}", path.display()))
        })?;

        Ok(path)
    }

    fn write_snapshot(&self, record: &AnalysisRecord) -> Result<PathBuf> {
        let path = self.log_dir.join(Self::snapshot_file_name(record));
        let body = serde_json::to_string_pretty(record)?;
        fs::write(&path, body)?;
        Ok(path)
    }
}

impl AuditSink for AuditLog {
    fn append(&self, record: &AnalysisRecord) -> Result<PathBuf> {
        self.ensure_dir()?;
        let path = self.append_line(record)?;
        debug!(analysis_id = %record.analysis_id, file = %path.display(), "Audit record appended");

        if self.write_snapshots {
            if let Err(e) = self.write_snapshot(record) {
                warn!(analysis_id = %record.analysis_id, error = %e, "Failed to write analysis snapshot");
            }
        }

        Ok(path)
    }
}
