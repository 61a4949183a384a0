//! Epoch unit inference for stores that do not declare their timestamp scale.
//!
//! Calendar stores written by different client versions keep integer
//! timestamps in seconds, milliseconds or microseconds since the Unix epoch.
//! The scale is inferred once per store from the largest observed start value
//! and then applied to every timestamp read from that store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

const MICROS_THRESHOLD: i64 = 1_000_000_000_000_000;
const MILLIS_THRESHOLD: i64 = 1_000_000_000_000;
const SECONDS_THRESHOLD: i64 = 1_000_000_000;

/// Scale of a store's integer timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EpochUnit {
    Seconds,
    Milliseconds,
    #[default]
    Microseconds,
}

impl EpochUnit {
    /// Classify a store by the largest start magnitude it contains.
    ///
    /// `None` (empty or unreadable table) and magnitudes below 1e9 fall back
    /// to microseconds, the scale modern stores use.
    pub fn infer(max_magnitude: Option<i64>) -> Self {
        match max_magnitude.map(i64::unsigned_abs) {
            Some(m) if m >= MICROS_THRESHOLD as u64 => EpochUnit::Microseconds,
            Some(m) if m >= MILLIS_THRESHOLD as u64 => EpochUnit::Milliseconds,
            Some(m) if m >= SECONDS_THRESHOLD as u64 => EpochUnit::Seconds,
            _ => EpochUnit::default(),
        }
    }

    /// Interpret a raw stored value as a UTC instant.
    ///
    /// # Errors
    /// Returns [`EngineError::TimestampOutOfRange`] when the value does not map
    /// to a representable instant.
    pub fn to_instant(self, raw: i64) -> Result<DateTime<Utc>> {
        let instant = match self {
            EpochUnit::Seconds => DateTime::from_timestamp(raw, 0),
            EpochUnit::Milliseconds => DateTime::from_timestamp_millis(raw),
            EpochUnit::Microseconds => DateTime::from_timestamp_micros(raw),
        };
        instant.ok_or(EngineError::TimestampOutOfRange(raw))
    }

    /// Re-quantize an instant into this unit, truncating sub-unit precision.
    ///
    /// This is the inverse of [`EpochUnit::to_instant`] and is what exception
    /// keys are compared against.
    pub fn quantize<Tz: chrono::TimeZone>(self, instant: &DateTime<Tz>) -> i64 {
        match self {
            EpochUnit::Seconds => instant.timestamp(),
            EpochUnit::Milliseconds => instant.timestamp_millis(),
            EpochUnit::Microseconds => instant.timestamp_micros(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EpochUnit::Seconds => "seconds",
            EpochUnit::Milliseconds => "milliseconds",
            EpochUnit::Microseconds => "microseconds",
        }
    }
}

impl std::fmt::Display for EpochUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
