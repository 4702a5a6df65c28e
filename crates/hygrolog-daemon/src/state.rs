//! Application state management.

use chrono::{DateTime, Utc};
use hygrolog_core::{HistoryLog, LogEntry, Reading, Result, SensorReader, SharedReading};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::Config;

/// Result of a single flush tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// The current reading was appended to the history log.
    Written,
    /// The current reading isn't a real sample yet.
    Skipped,
    /// The history log rejected the write.
    Failed,
}

/// Shared application state.
///
/// Built once in `main` and handed to the poll loop, the flush loop and the
/// web router. Request handlers only use the read accessors.
pub struct AppState {
    /// Sensor executable runner
    sensor: SensorReader,

    /// Latest reading
    reading: SharedReading,

    /// Durable reading history
    history: HistoryLog,

    /// How far back history queries look
    history_window: Duration,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(config: &Config) -> Self {
        let mut sensor = SensorReader::new(&config.sensor.path);
        if let Some(timeout) = config.sensor_timeout() {
            sensor = sensor.with_timeout(timeout);
        }

        info!("Sensor executable: {}", config.sensor.path.display());
        info!("History log: {}", config.history.path.display());

        Self::from_parts(
            sensor,
            HistoryLog::new(&config.history.path),
            config.history_window(),
        )
    }

    /// Creates a state from already-built components.
    pub fn from_parts(sensor: SensorReader, history: HistoryLog, history_window: Duration) -> Self {
        Self {
            sensor,
            reading: SharedReading::new(),
            history,
            history_window,
        }
    }

    /// Samples the sensor and, on success, replaces the current reading.
    pub async fn poll_once(&self) -> Result<Reading> {
        let reading = self.sensor.sample().await?;
        self.reading.update(reading);
        debug!("Current reading: {}", reading);
        Ok(reading)
    }

    /// Appends the current reading to the history log if it is a real sample.
    pub async fn flush_once(&self) -> FlushOutcome {
        let reading = self.reading.current();
        if !reading.is_valid() {
            info!("Skipping history write, no valid reading yet ({})", reading);
            return FlushOutcome::Skipped;
        }

        let entry = LogEntry::new(Utc::now(), reading);
        match self.history.append(&entry).await {
            Ok(()) => {
                debug!("Logged {}", reading);
                FlushOutcome::Written
            }
            Err(e) => {
                warn!("Failed to write history entry: {}", e);
                FlushOutcome::Failed
            }
        }
    }

    /// Returns the current reading, including the unsampled placeholder.
    pub fn latest(&self) -> Reading {
        self.reading.current()
    }

    /// Returns when the current reading was sampled.
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.reading.last_updated()
    }

    /// Returns history entries newer than `now - window`, oldest first.
    pub async fn recent_history(&self, window: Duration) -> Result<Vec<LogEntry>> {
        let since = match chrono::Duration::from_std(window) {
            Ok(window) => Utc::now()
                .checked_sub_signed(window)
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
            Err(_) => DateTime::<Utc>::MIN_UTC,
        };
        self.history.read_window(since).await
    }

    /// Returns the configured history window.
    pub fn history_window(&self) -> Duration {
        self.history_window
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use tempfile::TempDir;

    /// Builds a state whose sensor runs `body` as a shell script.
    pub(crate) fn state_with_sensor(dir: &TempDir, body: &str) -> AppState {
        let sensor = dir.path().join("sensor");
        fs::write(&sensor, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&sensor, fs::Permissions::from_mode(0o755)).unwrap();

        AppState::from_parts(
            SensorReader::new(sensor),
            HistoryLog::new(dir.path().join("temperature.log")),
            Duration::from_secs(24 * 60 * 60),
        )
    }

    fn log_lines(path: &Path) -> usize {
        fs::read_to_string(path)
            .map(|s| s.lines().count())
            .unwrap_or(0)
    }

    #[tokio::test]
    async fn test_latest_before_first_poll() {
        let dir = TempDir::new().unwrap();
        let state = state_with_sensor(&dir, "echo 21.5,48.2");
        assert_eq!(state.latest(), Reading::UNSAMPLED);
        assert!(state.last_updated().is_none());
    }

    #[tokio::test]
    async fn test_poll_updates_reading() {
        let dir = TempDir::new().unwrap();
        let state = state_with_sensor(&dir, "echo 21.5,48.2");

        assert_eq!(state.poll_once().await.unwrap(), Reading::new(21.5, 48.2));
        assert_eq!(state.latest(), Reading::new(21.5, 48.2));
        assert_eq!(state.latest().to_string(), "T = 21.5*C, H = 48.2%");
        assert!(state.last_updated().is_some());
    }

    #[tokio::test]
    async fn test_failed_poll_keeps_previous_reading() {
        let dir = TempDir::new().unwrap();
        let state = state_with_sensor(&dir, "echo 21.5,48.2");
        state.poll_once().await.unwrap();

        let state = AppState {
            sensor: SensorReader::new(dir.path().join("missing")),
            ..state
        };
        assert!(state.poll_once().await.unwrap_err().is_execution());
        assert_eq!(state.latest(), Reading::new(21.5, 48.2));
    }

    #[tokio::test]
    async fn test_unparseable_poll_keeps_reading() {
        let dir = TempDir::new().unwrap();
        let state = state_with_sensor(&dir, "echo abc,48.2");
        assert!(state.poll_once().await.unwrap_err().is_parse());
        assert_eq!(state.latest(), Reading::UNSAMPLED);
    }

    #[tokio::test]
    async fn test_flush_skips_invalid_reading() {
        let dir = TempDir::new().unwrap();
        let state = state_with_sensor(&dir, "echo 0,50");

        assert_eq!(state.flush_once().await, FlushOutcome::Skipped);

        state.poll_once().await.unwrap();
        assert_eq!(state.latest(), Reading::new(0.0, 50.0));
        assert_eq!(state.flush_once().await, FlushOutcome::Skipped);
        assert!(!dir.path().join("temperature.log").exists());
    }

    #[tokio::test]
    async fn test_flush_writes_valid_reading() {
        let dir = TempDir::new().unwrap();
        let state = state_with_sensor(&dir, "echo 21.5,48.2");
        state.poll_once().await.unwrap();

        assert_eq!(state.flush_once().await, FlushOutcome::Written);
        assert_eq!(state.flush_once().await, FlushOutcome::Written);
        assert_eq!(log_lines(&dir.path().join("temperature.log")), 2);

        let history = state.recent_history(state.history_window()).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|e| e.reading() == Reading::new(21.5, 48.2)));
    }

    #[tokio::test]
    async fn test_flush_failure_is_reported() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "").unwrap();

        let state = AppState::from_parts(
            state_with_sensor(&dir, "echo 21.5,48.2").sensor,
            HistoryLog::new(blocker.join("temperature.log")),
            Duration::from_secs(60),
        );
        state.poll_once().await.unwrap();

        assert_eq!(state.flush_once().await, FlushOutcome::Failed);
        assert_eq!(state.flush_once().await, FlushOutcome::Failed);
    }

    #[tokio::test]
    async fn test_recent_history_window() {
        let dir = TempDir::new().unwrap();
        let state = state_with_sensor(&dir, "echo 21.5,48.2");
        let now = Utc::now();
        let old = LogEntry::new(now - chrono::Duration::hours(25), Reading::new(18.0, 60.0));
        let recent = LogEntry::new(now - chrono::Duration::hours(1), Reading::new(21.0, 55.0));
        state.history.append(&old).await.unwrap();
        state.history.append(&recent).await.unwrap();

        let history = state
            .recent_history(Duration::from_secs(24 * 60 * 60))
            .await
            .unwrap();
        assert_eq!(history, vec![recent]);

        let everything = state
            .recent_history(Duration::from_secs(48 * 60 * 60))
            .await
            .unwrap();
        assert_eq!(everything.len(), 2);
    }
}
