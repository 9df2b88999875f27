//! EntryLog - Append-only Audit Trail
//!
//! One JSON object per line. Entries are never rewritten or deleted and
//! never reference each other. Each append opens, writes and closes the
//! file; appends from this process are serialized.

use crate::error::{Error, Result};
use crate::models::{unix_now, AnalysisResult, Decision};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// One audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Image path as handed to the decision system
    pub image: String,
    pub timestamp: f64,
    pub decision: Decision,
    pub analysis: String,
    /// Present (and true) only for operator decisions
    #[serde(
        rename = "override",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub is_override: Option<bool>,
}

impl LogEntry {
    /// Record for an automated analysis
    pub fn automated(image: impl Into<String>, result: &AnalysisResult) -> Self {
        Self {
            image: image.into(),
            timestamp: result.timestamp,
            decision: result.decision,
            analysis: result.analysis.clone(),
            is_override: None,
        }
    }

    /// Record for an operator override, stamped now
    pub fn manual_override(
        image: impl Into<String>,
        decision: Decision,
        reason: &str,
        operator_id: &str,
    ) -> Self {
        Self {
            image: image.into(),
            timestamp: unix_now(),
            decision,
            analysis: format!("MANUAL OVERRIDE by {}: {}", operator_id, reason),
            is_override: Some(true),
        }
    }

    pub fn is_override(&self) -> bool {
        self.is_override.unwrap_or(false)
    }
}

/// EntryLog instance
pub struct EntryLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl EntryLog {
    /// Create log writer; the parent directory is created if missing
    pub async fn new(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    /// Append one entry.
    ///
    /// A torn last line (no trailing newline) is terminated first so the
    /// new record starts on a line of its own.
    pub async fn append(&self, entry: &LogEntry) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let path = self.path.clone();
        let record = entry.clone();
        tokio::task::spawn_blocking(move || append_record(&path, record))
            .await
            .map_err(|e| Error::Log(format!("append task failed: {}", e)))??;

        tracing::debug!(
            image = %entry.image,
            decision = %entry.decision,
            is_override = entry.is_override(),
            "Entry logged"
        );
        Ok(())
    }

    /// Most recent entries, newest first.
    ///
    /// Lines that do not parse are skipped with a warning.
    pub async fn recent(&self, limit: usize) -> Result<Vec<LogEntry>> {
        let path = self.path.clone();
        let mut entries = tokio::task::spawn_blocking(move || read_entries(&path))
            .await
            .map_err(|e| Error::Log(format!("read task failed: {}", e)))??;

        entries.reverse();
        entries.truncate(limit);
        Ok(entries)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn append_record(path: &Path, record: LogEntry) -> std::io::Result<()> {
    if ends_mid_line(path)? {
        tracing::warn!(path = %path.display(), "Terminating torn log line before append");
        let mut file = OpenOptions::new().append(true).open(path)?;
        file.write_all(b"\n")?;
    }
    serde_jsonlines::append_json_lines(path, [record])
}

/// True when the file is non-empty and its last byte is not a newline
fn ends_mid_line(path: &Path) -> std::io::Result<bool> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }

    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

fn read_entries(path: &Path) -> Result<Vec<LogEntry>> {
    let lines = match serde_jsonlines::json_lines::<LogEntry, _>(path) {
        Ok(lines) => lines,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut entries = Vec::new();
    for (line_no, line) in lines.enumerate() {
        match line {
            Ok(entry) => entries.push(entry),
            // Torn lines surface as UnexpectedEof, garbage as InvalidData
            Err(e) if matches!(e.kind(), ErrorKind::InvalidData | ErrorKind::UnexpectedEof) => {
                tracing::warn!(
                    path = %path.display(),
                    line = line_no + 1,
                    error = %e,
                    "Skipping malformed log line"
                );
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(entries)
}
