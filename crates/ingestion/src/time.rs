//! Relative-to-absolute clock conversion.

use contracts::Timestamp;

/// Maps since-boot reader timestamps into the universal clock domain.
///
/// The offset is measured once; every reader context of a session shares
/// the same converter so all sensors land in one clock domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeConverter {
    offset_ticks: i64,
}

impl TimeConverter {
    pub fn with_offset(offset_ticks: i64) -> Self {
        Self { offset_ticks }
    }

    /// Calibrate against the current wall clock, given the capture layer's
    /// current relative time.
    pub fn calibrate(relative_now_ticks: i64) -> Self {
        Self::calibrate_at(Timestamp::now(), relative_now_ticks)
    }

    pub fn calibrate_at(absolute_now: Timestamp, relative_now_ticks: i64) -> Self {
        Self {
            offset_ticks: absolute_now.ticks() - relative_now_ticks,
        }
    }

    pub fn offset_ticks(&self) -> i64 {
        self.offset_ticks
    }

    pub fn to_absolute(&self, relative_ticks: i64) -> Timestamp {
        Timestamp::from_ticks(self.offset_ticks + relative_ticks)
    }
}
