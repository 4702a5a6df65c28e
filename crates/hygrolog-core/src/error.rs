//! Error types for the hygrolog core library.

use std::num::ParseFloatError;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while sampling the sensor or touching the history log.
#[derive(Error, Debug)]
pub enum Error {
    /// The sensor executable could not be run to completion.
    #[error("Sensor execution failed ({}): {cause}", .path.display())]
    Execution {
        path: PathBuf,
        #[source]
        cause: ExecutionCause,
    },

    /// The sensor ran but printed something we can't use.
    #[error("Sensor output parse error: {0}")]
    Parse(#[from] ParseCause),

    /// The history log could not be opened, written or read.
    #[error("History log error ({}): {source}", .path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A single stored history record is malformed.
    #[error("Malformed history record '{record}': {source}")]
    Deserialization {
        record: String,
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    /// Returns true if the sensor could not be run or exited unsuccessfully.
    pub fn is_execution(&self) -> bool {
        matches!(self, Error::Execution { .. })
    }

    /// Returns true if the sensor output could not be parsed.
    pub fn is_parse(&self) -> bool {
        matches!(self, Error::Parse(_))
    }
}

/// Why the sensor executable did not produce usable output.
#[derive(Error, Debug)]
pub enum ExecutionCause {
    /// The process could not be spawned.
    #[error("failed to launch: {0}")]
    Launch(#[source] std::io::Error),

    /// The process exited with a nonzero status.
    #[error("exited with {status}, stderr: '{stderr}'")]
    Exit { status: ExitStatus, stderr: String },

    /// The process did not finish within the configured timeout.
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// What was wrong with the sensor output.
#[derive(Error, Debug)]
pub enum ParseCause {
    /// Fewer than two comma-separated fields.
    #[error("can't parse output, stdout: '{stdout}', stderr: '{stderr}'")]
    MissingField { stdout: String, stderr: String },

    /// More than two comma-separated fields.
    #[error("expected two fields, stdout: '{stdout}'")]
    UnexpectedField { stdout: String },

    /// A field is not a decimal number.
    #[error("invalid {field} value '{value}': {source}")]
    InvalidNumber {
        field: &'static str,
        value: String,
        #[source]
        source: ParseFloatError,
    },

    /// A field parsed to NaN or infinity.
    #[error("{field} value '{value}' is not finite")]
    NonFinite { field: &'static str, value: String },
}
