//! hygrolog core library
//!
//! Samples a temperature/humidity sensor through an external executable,
//! keeps the latest reading in a shared cell, and persists readings to an
//! append-only history log that can be replayed over a time window.

pub mod error;
pub mod history;
pub mod reading;
pub mod sensor;

pub use error::{Error, ExecutionCause, ParseCause, Result};
pub use history::{HistoryLog, LogEntry};
pub use reading::{Reading, SharedReading};
pub use sensor::{parse_output, SensorReader};

/// Default sensor executable path.
pub const DEFAULT_SENSOR_PATH: &str = "/usr/local/bin/temperature.py";

/// Default history log location.
pub const DEFAULT_LOG_PATH: &str = "/var/lib/hygrolog/temperature.log";
