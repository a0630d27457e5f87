//! Absolute time model
//!
//! Every frame carries a universal timestamp in 100 ns ticks since
//! 1601-01-01 UTC. All sensors share this clock domain, so timestamps from
//! different sensors are compared by plain subtraction.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ticks per second (100 ns resolution).
pub const TICKS_PER_SECOND: i64 = 10_000_000;

/// Ticks between 1601-01-01 and 1970-01-01.
const UNIX_EPOCH_TICKS: i64 = 116_444_736_000_000_000;

/// Universal timestamp in 100 ns ticks.
///
/// The zero value is a sentinel meaning "no timestamp".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// "No match" sentinel.
    pub const ZERO: Timestamp = Timestamp(0);

    pub const fn from_ticks(ticks: i64) -> Self {
        Self(ticks)
    }

    pub const fn ticks(self) -> i64 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// `(self - other)` in seconds.
    ///
    /// Ticks from the wire may span the whole `i64` range, so the
    /// difference is taken in `i128`.
    pub fn seconds_since(self, other: Timestamp) -> f64 {
        (i128::from(self.0) - i128::from(other.0)) as f64 / TICKS_PER_SECOND as f64
    }

    /// Absolute difference to `other`, in seconds.
    pub fn abs_diff_seconds(self, other: Timestamp) -> f64 {
        self.seconds_since(other).abs()
    }

    /// Shift by a number of ticks.
    pub const fn offset_ticks(self, ticks: i64) -> Self {
        Self(self.0 + ticks)
    }

    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        let micros = at.timestamp_micros();
        Self(UNIX_EPOCH_TICKS + micros * 10)
    }

    /// Current wall clock as a universal timestamp.
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Wall clock time this timestamp refers to, if representable.
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        let micros = self.0.checked_sub(UNIX_EPOCH_TICKS)? / 10;
        DateTime::from_timestamp_micros(micros)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
