//! Per-sensor frame ring.
//!
//! A fixed-capacity FIFO of shared frames in arrival order. Pushing into a
//! full ring evicts the oldest frame; consumers that already hold that frame
//! keep their reference.

use std::fmt;

use contracts::{SharedFrame, Timestamp};
use ringbuf::{traits::*, HeapRb};

/// Counters of a single ring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RingStats {
    /// Frames currently held
    pub len: usize,
    /// Frames pushed since creation
    pub sent_count: u64,
    /// Frames evicted to make room
    pub evicted_count: u64,
    /// Frames whose timestamp was older than their predecessor's
    pub out_of_order_count: u64,
}

/// Bounded per-sensor history, oldest first.
pub struct SensorRing {
    frames: HeapRb<SharedFrame>,
    latest: Option<SharedFrame>,
    capacity: usize,
    sent_count: u64,
    evicted_count: u64,
    out_of_order_count: u64,
}

impl fmt::Debug for SensorRing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SensorRing")
            .field("len", &self.frames.occupied_len())
            .field("capacity", &self.capacity)
            .field("evicted", &self.evicted_count)
            .finish()
    }
}

impl SensorRing {
    /// # Panics
    /// `capacity` must be at least 1.
    #[inline]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 1, "sensor ring capacity must be at least 1");
        Self {
            frames: HeapRb::new(capacity),
            latest: None,
            capacity,
            sent_count: 0,
            evicted_count: 0,
            out_of_order_count: 0,
        }
    }

    /// Append a frame, returning the evicted oldest frame if the ring was full.
    #[inline]
    pub fn push(&mut self, frame: SharedFrame) -> Option<SharedFrame> {
        if let Some(last) = &self.latest {
            if frame.timestamp() < last.timestamp() {
                self.out_of_order_count += 1;
            }
        }

        let evicted = if self.frames.is_full() {
            self.evicted_count += 1;
            self.frames.try_pop()
        } else {
            None
        };

        self.latest = Some(SharedFrame::clone(&frame));
        // cannot fail: a slot was freed above when full
        let _ = self.frames.try_push(frame);
        self.sent_count += 1;
        evicted
    }

    /// Most recently pushed frame.
    #[inline]
    pub fn latest(&self) -> Option<SharedFrame> {
        self.latest.clone()
    }

    /// First frame, oldest to newest, strictly within `tolerance_secs` of `timestamp`.
    pub fn first_within(&self, timestamp: Timestamp, tolerance_secs: f64) -> Option<SharedFrame> {
        self.frames
            .iter()
            .find(|frame| frame.timestamp().abs_diff_seconds(timestamp) < tolerance_secs)
            .cloned()
    }

    /// Timestamps in arrival order.
    pub fn timestamps(&self) -> Vec<Timestamp> {
        self.frames.iter().map(|frame| frame.timestamp()).collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.frames.occupied_len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> RingStats {
        RingStats {
            len: self.len(),
            sent_count: self.sent_count,
            evicted_count: self.evicted_count,
            out_of_order_count: self.out_of_order_count,
        }
    }
}
