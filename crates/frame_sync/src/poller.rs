//! Per-consumer pair polling.
//!
//! Each consumer keeps its own "previous timestamp", so two consumers of the
//! same buffer (or two buffers in one test) never suppress each other's pairs.

use contracts::{SensorPair, SensorType, Timestamp};

use crate::{MultiFrameBuffer, SyncedPair};

/// Yields a synced pair only when it is newer than the last one yielded.
#[derive(Debug, Clone)]
pub struct PairPoller {
    a: SensorType,
    b: SensorType,
    tolerance_secs: f64,
    previous: Timestamp,
    yielded: u64,
    repeated: u64,
}

impl PairPoller {
    pub fn new(a: SensorType, b: SensorType, tolerance_secs: f64) -> Self {
        Self {
            a,
            b,
            tolerance_secs,
            previous: Timestamp::ZERO,
            yielded: 0,
            repeated: 0,
        }
    }

    pub fn from_pair(pair: SensorPair, tolerance_secs: f64) -> Self {
        Self::new(pair.a, pair.b, tolerance_secs)
    }

    pub fn sensors(&self) -> (SensorType, SensorType) {
        (self.a, self.b)
    }

    /// Next unseen pair, `None` when there is no pair or it was already yielded.
    pub fn poll(&mut self, buffer: &MultiFrameBuffer) -> Option<SyncedPair> {
        let pair = buffer.synced_pair(self.a, self.b, self.tolerance_secs)?;
        if pair.timestamp == self.previous {
            self.repeated += 1;
            return None;
        }
        self.previous = pair.timestamp;
        self.yielded += 1;
        Some(pair)
    }

    /// Pairs handed out so far.
    pub fn yielded(&self) -> u64 {
        self.yielded
    }

    /// Polls that found only the already-yielded pair.
    pub fn repeated(&self) -> u64 {
        self.repeated
    }
}
