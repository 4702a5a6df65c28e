//! Sensor readings and the shared current-reading cell.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{PoisonError, RwLock};

/// A single temperature/humidity sample.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Reading {
    /// Temperature in degrees Celsius.
    pub temperature: f64,
    /// Relative humidity in percent.
    pub humidity: f64,
}

impl Reading {
    /// Placeholder held before the first successful sample.
    pub const UNSAMPLED: Reading = Reading {
        temperature: 0.0,
        humidity: 0.0,
    };

    /// Creates a reading from raw values.
    pub fn new(temperature: f64, humidity: f64) -> Self {
        Self {
            temperature,
            humidity,
        }
    }

    /// Returns true if this looks like a real sample.
    ///
    /// Non-positive values are how an unsampled reading is represented, so
    /// they never count as valid.
    pub fn is_valid(&self) -> bool {
        self.temperature.is_finite()
            && self.humidity.is_finite()
            && self.temperature > 0.0
            && self.humidity > 0.0
    }
}

impl std::fmt::Display for Reading {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "T = {}*C, H = {}%", self.temperature, self.humidity)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    reading: Reading,
    updated_at: Option<DateTime<Utc>>,
}

/// The current reading, shared between the poller, the flusher and request handlers.
///
/// Writers are exclusive, readers are shared. The reading and its update time
/// are replaced together, so a reader never sees a mix of old and new values.
#[derive(Debug, Default)]
pub struct SharedReading {
    slot: RwLock<Slot>,
}

impl SharedReading {
    /// Creates a cell holding [`Reading::UNSAMPLED`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the current reading.
    pub fn update(&self, reading: Reading) {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Slot {
            reading,
            updated_at: Some(Utc::now()),
        };
    }

    /// Returns a copy of the current reading.
    pub fn current(&self) -> Reading {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .reading
    }

    /// Returns when the reading was last updated, or `None` if it never was.
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .updated_at
    }

    /// Returns the current reading together with its update time.
    pub fn snapshot(&self) -> (Reading, Option<DateTime<Utc>>) {
        let slot = *self.slot.read().unwrap_or_else(PoisonError::into_inner);
        (slot.reading, slot.updated_at)
    }
}
