//! Append-only history log.
//!
//! Each record is one JSON object on its own line:
//!
//! ```text
//! {"Time":"2024-05-01T12:00:00Z","Temperature":21.5,"Humidity":48.2}
//! ```
//!
//! Records are independent, so a damaged line only loses that one entry.
//! The file is never compacted and every query scans it from the start.

use crate::{Error, Reading, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// A timestamped reading as stored in the history log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LogEntry {
    #[serde(rename = "Time")]
    pub timestamp: DateTime<Utc>,
    pub temperature: f64,
    pub humidity: f64,
}

impl LogEntry {
    /// Creates an entry for `reading` taken at `timestamp`.
    pub fn new(timestamp: DateTime<Utc>, reading: Reading) -> Self {
        Self {
            timestamp,
            temperature: reading.temperature,
            humidity: reading.humidity,
        }
    }

    /// Returns the reading part of the entry.
    pub fn reading(&self) -> Reading {
        Reading::new(self.temperature, self.humidity)
    }

    /// Encodes the entry as a single log line, without the trailing newline.
    pub fn encode(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decodes a single log line.
    pub fn decode(line: &str) -> Result<Self> {
        Self::decode_bytes(line.as_bytes())
    }

    /// Decodes a single raw log line, which may not even be valid UTF-8.
    pub fn decode_bytes(line: &[u8]) -> Result<Self> {
        serde_json::from_slice(line).map_err(|source| Error::Deserialization {
            record: String::from_utf8_lossy(line).trim().to_string(),
            source,
        })
    }
}

/// File-backed history of readings.
#[derive(Debug)]
pub struct HistoryLog {
    path: PathBuf,
    /// Appends take the write side, scans the read side.
    lock: RwLock<()>,
}

impl HistoryLog {
    /// Creates a log stored at `path`. Nothing is touched until the first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: RwLock::new(()),
        }
    }

    /// Returns the log file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one entry and syncs it to disk before returning.
    pub async fn append(&self, entry: &LogEntry) -> Result<()> {
        let mut line = entry.encode().map_err(|e| self.storage_error(e.into()))?;
        line.push('\n');

        let _guard = self.lock.write().await;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| self.storage_error(e))?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| self.storage_error(e))?;

        file.write_all(line.as_bytes())
            .await
            .map_err(|e| self.storage_error(e))?;
        file.flush().await.map_err(|e| self.storage_error(e))?;
        file.sync_data().await.map_err(|e| self.storage_error(e))?;

        debug!("Appended history entry at {}", entry.timestamp);
        Ok(())
    }

    /// Reads every well-formed entry, oldest first.
    pub async fn read_all(&self) -> Result<Vec<LogEntry>> {
        self.scan(|_| true).await
    }

    /// Reads entries strictly newer than `since`, oldest first.
    pub async fn read_window(&self, since: DateTime<Utc>) -> Result<Vec<LogEntry>> {
        self.scan(|entry| entry.timestamp > since).await
    }

    async fn scan<F>(&self, keep: F) -> Result<Vec<LogEntry>>
    where
        F: Fn(&LogEntry) -> bool,
    {
        let _guard = self.lock.read().await;

        let file = match fs::File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("History log {} does not exist yet", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(self.storage_error(e)),
        };

        let mut lines = BufReader::new(file).split(b'\n');
        let mut entries = Vec::new();
        let mut skipped = 0usize;

        while let Some(line) = lines
            .next_segment()
            .await
            .map_err(|e| self.storage_error(e))?
        {
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            match LogEntry::decode_bytes(&line) {
                Ok(entry) if keep(&entry) => entries.push(entry),
                Ok(_) => {}
                Err(e) => {
                    skipped += 1;
                    warn!("Skipping history record: {}", e);
                }
            }
        }

        if skipped > 0 {
            debug!(
                "Read {} history entries, skipped {} malformed",
                entries.len(),
                skipped
            );
        }
        Ok(entries)
    }

    fn storage_error(&self, source: std::io::Error) -> Error {
        Error::Storage {
            path: self.path.clone(),
            source,
        }
    }
}
