//! External sensor executable invocation.
//!
//! The sensor is a black-box program that prints `temperature,humidity` on
//! stdout and exits zero. It may drive hardware that can't be shared, so only
//! one invocation runs at a time.

use crate::error::{ExecutionCause, ParseCause};
use crate::{Error, Reading, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::debug;

/// Runs the sensor executable and parses its output.
#[derive(Debug)]
pub struct SensorReader {
    path: PathBuf,
    timeout: Option<Duration>,
    /// Serializes access to the sensor hardware.
    hardware: Mutex<()>,
}

impl SensorReader {
    /// Creates a reader for the executable at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            timeout: None,
            hardware: Mutex::new(()),
        }
    }

    /// Kills the sensor process if it runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns the executable path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Runs the sensor once and returns its reading.
    pub async fn sample(&self) -> Result<Reading> {
        debug!("Executing sensor {}", self.path.display());

        let mut command = Command::new(&self.path);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = {
            // Held for the whole child lifetime, not just result handling.
            let _hardware = self.hardware.lock().await;
            match self.timeout {
                Some(limit) => match tokio::time::timeout(limit, command.output()).await {
                    Ok(result) => result,
                    Err(_) => return Err(self.execution_error(ExecutionCause::Timeout(limit))),
                },
                None => command.output().await,
            }
        }
        .map_err(|e| self.execution_error(ExecutionCause::Launch(e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            return Err(self.execution_error(ExecutionCause::Exit {
                status: output.status,
                stderr: stderr.trim().to_string(),
            }));
        }

        let reading = parse_output(&stdout, &stderr)?;
        debug!("Sensor returned {:?}", reading);
        Ok(reading)
    }

    fn execution_error(&self, cause: ExecutionCause) -> Error {
        Error::Execution {
            path: self.path.clone(),
            cause,
        }
    }
}

/// Parses `temperature,humidity` sensor output.
///
/// Surrounding whitespace on the whole output and on each field is ignored.
/// `stderr` is only used to make errors easier to diagnose.
pub fn parse_output(stdout: &str, stderr: &str) -> Result<Reading> {
    let output = stdout.trim();
    let fields: Vec<&str> = output.split(',').map(str::trim).collect();

    match fields.as_slice() {
        [temperature, humidity] => Ok(Reading::new(
            parse_field("temperature", temperature)?,
            parse_field("humidity", humidity)?,
        )),
        [_] => Err(ParseCause::MissingField {
            stdout: output.to_string(),
            stderr: stderr.trim().to_string(),
        }
        .into()),
        _ => Err(ParseCause::UnexpectedField {
            stdout: output.to_string(),
        }
        .into()),
    }
}

fn parse_field(field: &'static str, value: &str) -> Result<f64> {
    let parsed: f64 = value.parse().map_err(|source| ParseCause::InvalidNumber {
        field,
        value: value.to_string(),
        source,
    })?;

    if !parsed.is_finite() {
        return Err(ParseCause::NonFinite {
            field,
            value: value.to_string(),
        }
        .into());
    }

    Ok(parsed)
}
