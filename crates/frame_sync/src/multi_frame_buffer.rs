//! Multi-sensor frame buffer.

use std::sync::{Mutex, MutexGuard, PoisonError};

use contracts::{SensorFrameSink, SensorTable, SensorType, SharedFrame, Timestamp};
use observability::{record_buffer_depth, record_frame_evicted, record_pair_query};
use tracing::{instrument, trace};

use crate::buffer::{RingStats, SensorRing};
use crate::pairing::latest_matching_timestamp;

/// Two frames taken at the same moment.
#[derive(Debug, Clone)]
pub struct SyncedPair {
    /// Matched timestamp of the first sensor
    pub timestamp: Timestamp,
    pub a: SharedFrame,
    pub b: SharedFrame,
}

/// Per-sensor counters.
#[derive(Debug, Clone, Default)]
pub struct BufferStats {
    pub sensors: SensorTable<RingStats>,
}

impl BufferStats {
    pub fn total_sent(&self) -> u64 {
        self.sensors.values().map(|s| s.sent_count).sum()
    }

    pub fn total_evicted(&self) -> u64 {
        self.sensors.values().map(|s| s.evicted_count).sum()
    }
}

/// Bounded per-sensor history plus cross-sensor pair matching.
///
/// A single mutex guards every ring; each method holds it for its whole
/// body. No method blocks on I/O, so capture callbacks and pollers can call
/// in from any thread.
#[derive(Debug)]
pub struct MultiFrameBuffer {
    rings: Mutex<SensorTable<SensorRing>>,
    capacity: usize,
}

impl Default for MultiFrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl MultiFrameBuffer {
    pub const DEFAULT_CAPACITY: usize = 5;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// # Panics
    /// `capacity` must be at least 1.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            rings: Mutex::new(SensorTable::from_fn(|_| SensorRing::new(capacity))),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // A panicking holder cannot leave a ring half-updated, so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, SensorTable<SensorRing>> {
        self.rings.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append `frame` to its sensor's ring, evicting the oldest when full.
    pub fn send(&self, frame: SharedFrame) {
        let sensor = frame.sensor_type();
        let mut rings = self.lock();
        let ring = &mut rings[sensor];
        if let Some(evicted) = ring.push(frame) {
            trace!(sensor = %sensor, timestamp = %evicted.timestamp(), "Evicted oldest frame");
            record_frame_evicted(sensor);
        }
        record_buffer_depth(sensor, ring.len());
    }

    /// Most recently sent frame of `sensor`.
    pub fn latest_frame(&self, sensor: SensorType) -> Option<SharedFrame> {
        self.lock()[sensor].latest()
    }

    /// First frame, oldest to newest, whose timestamp differs from
    /// `timestamp` by strictly less than `tolerance_secs`.
    ///
    /// The oldest qualifying frame wins even if a newer one is closer.
    pub fn frame_for_time(
        &self,
        sensor: SensorType,
        timestamp: Timestamp,
        tolerance_secs: f64,
    ) -> Option<SharedFrame> {
        self.lock()[sensor].first_within(timestamp, tolerance_secs)
    }

    /// Latest timestamp of `a` with a frame of `b` strictly within
    /// `tolerance_secs`; [`Timestamp::ZERO`] when none.
    #[instrument(name = "pair_timestamp", level = "trace", skip(self))]
    pub fn timestamp_for_sensor_pair(
        &self,
        a: SensorType,
        b: SensorType,
        tolerance_secs: f64,
    ) -> Timestamp {
        let (ta, tb) = {
            let rings = self.lock();
            (rings[a].timestamps(), rings[b].timestamps())
        };
        let best = latest_matching_timestamp(&ta, &tb, tolerance_secs);
        record_pair_query(a, b, !best.is_zero());
        best
    }

    /// Pair query followed by both frame lookups, under one lock.
    pub fn synced_pair(
        &self,
        a: SensorType,
        b: SensorType,
        tolerance_secs: f64,
    ) -> Option<SyncedPair> {
        let rings = self.lock();
        let timestamp =
            latest_matching_timestamp(&rings[a].timestamps(), &rings[b].timestamps(), tolerance_secs);
        record_pair_query(a, b, !timestamp.is_zero());
        if timestamp.is_zero() {
            return None;
        }
        Some(SyncedPair {
            timestamp,
            a: rings[a].first_within(timestamp, tolerance_secs)?,
            b: rings[b].first_within(timestamp, tolerance_secs)?,
        })
    }

    /// Frames currently held for `sensor`.
    pub fn len(&self, sensor: SensorType) -> usize {
        self.lock()[sensor].len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().values().all(SensorRing::is_empty)
    }

    pub fn stats(&self) -> BufferStats {
        let rings = self.lock();
        BufferStats {
            sensors: SensorTable::from_fn(|sensor| rings[sensor].stats()),
        }
    }
}

impl SensorFrameSink for MultiFrameBuffer {
    fn send(&self, frame: SharedFrame) {
        MultiFrameBuffer::send(self, frame);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use contracts::{ImageBuffer, PixelFormat, SensorFrame, TICKS_PER_SECOND};

    use super::*;

    const A: SensorType = SensorType::VisibleLightLeftFront;
    const B: SensorType = SensorType::VisibleLightRightFront;

    fn at_secs(sensor: SensorType, secs: i64) -> SharedFrame {
        at_ticks(sensor, secs * TICKS_PER_SECOND)
    }

    fn at_ticks(sensor: SensorType, ticks: i64) -> SharedFrame {
        SensorFrame::new(
            sensor,
            Timestamp::from_ticks(ticks),
            ImageBuffer::blank(2, 1, PixelFormat::Gray8),
        )
        .shared()
    }

    fn ts(secs: i64) -> Timestamp {
        Timestamp::from_ticks(secs * TICKS_PER_SECOND)
    }

    #[test]
    fn test_bounded_history() {
        let buffer = MultiFrameBuffer::new();
        for i in 1..=12 {
            buffer.send(at_secs(A, i));
            assert_eq!(buffer.latest_frame(A).unwrap().timestamp(), ts(i));
        }
        assert_eq!(buffer.len(A), MultiFrameBuffer::DEFAULT_CAPACITY);
        assert_eq!(buffer.len(B), 0);
        assert_eq!(buffer.stats().sensors[A].evicted_count, 7);
    }

    #[test]
    fn test_fifo_eviction() {
        let buffer = MultiFrameBuffer::new();
        for i in 1..=6 {
            buffer.send(at_secs(A, i * 100));
        }
        assert!(buffer.frame_for_time(A, ts(100), 1.0).is_none());
        assert!(buffer.frame_for_time(A, ts(100), 50.0).is_none());
        for i in 2..=6 {
            assert!(buffer.frame_for_time(A, ts(i * 100), 1.0).is_some());
        }
    }

    #[test]
    fn test_tolerance_boundary_is_strict() {
        let buffer = MultiFrameBuffer::new();
        buffer.send(at_secs(A, 100));
        assert!(buffer.frame_for_time(A, ts(109), 10.0).is_some());
        assert!(buffer.frame_for_time(A, ts(110), 10.0).is_none());
        assert!(buffer.frame_for_time(A, ts(90), 10.0).is_none());
        assert!(buffer.frame_for_time(A, ts(111), 10.0).is_none());
    }

    #[test]
    fn test_frame_for_time_first_match_wins() {
        let buffer = MultiFrameBuffer::new();
        buffer.send(at_secs(A, 100));
        buffer.send(at_secs(A, 104));
        let found = buffer.frame_for_time(A, ts(104), 10.0).unwrap();
        assert_eq!(found.timestamp(), ts(100));
    }

    #[test]
    fn test_pair_matching_latest_wins() {
        let buffer = MultiFrameBuffer::new();
        for s in [100, 200, 300] {
            buffer.send(at_secs(A, s));
        }
        for s in [205, 310] {
            buffer.send(at_secs(B, s));
        }
        assert_eq!(buffer.timestamp_for_sensor_pair(A, B, 10.0), ts(300));
    }

    #[test]
    fn test_pair_no_match() {
        let buffer = MultiFrameBuffer::new();
        buffer.send(at_secs(A, 100));
        buffer.send(at_secs(B, 500));
        let t = buffer.timestamp_for_sensor_pair(A, B, 10.0);
        assert!(t.is_zero());
        assert!(buffer.frame_for_time(A, t, 10.0).is_none());
        assert!(buffer.frame_for_time(B, t, 10.0).is_none());
        assert!(buffer.synced_pair(A, B, 10.0).is_none());
    }

    #[test]
    fn test_pair_tolerates_out_of_order_arrival() {
        let buffer = MultiFrameBuffer::new();
        buffer.send(at_secs(B, 310));
        buffer.send(at_secs(A, 300));
        buffer.send(at_secs(B, 205));
        buffer.send(at_secs(A, 200));
        assert_eq!(buffer.timestamp_for_sensor_pair(A, B, 10.0), ts(300));
    }

    #[test]
    fn test_synced_pair_returns_both_frames() {
        let buffer = MultiFrameBuffer::new();
        buffer.send(at_secs(A, 300));
        buffer.send(at_secs(B, 305));
        let pair = buffer.synced_pair(A, B, 10.0).unwrap();
        assert_eq!(pair.timestamp, ts(300));
        assert_eq!(pair.a.sensor_type(), A);
        assert_eq!(pair.b.timestamp(), ts(305));
    }

    #[test]
    fn test_duplicate_timestamps_coexist() {
        let buffer = MultiFrameBuffer::new();
        buffer.send(at_secs(A, 1));
        buffer.send(at_secs(A, 1));
        assert_eq!(buffer.len(A), 2);
    }

    #[test]
    fn test_frame_survives_eviction() {
        let buffer = MultiFrameBuffer::with_capacity(1);
        buffer.send(at_secs(A, 1));
        let held = buffer.latest_frame(A).unwrap();
        buffer.send(at_secs(A, 2));
        assert_eq!(held.timestamp(), ts(1));
        assert!(buffer.frame_for_time(A, ts(1), 0.5).is_none());
    }

    #[test]
    fn test_sink_contract() {
        let buffer = MultiFrameBuffer::new();
        let sink: &dyn SensorFrameSink = &buffer;
        sink.send(at_secs(SensorType::PhotoVideo, 7));
        assert_eq!(buffer.len(SensorType::PhotoVideo), 1);
        assert!(!buffer.is_empty());
    }

    #[test]
    fn test_concurrent_send_and_query() {
        let buffer = Arc::new(MultiFrameBuffer::new());
        let sensors = [A, B, SensorType::ShortThrowToFDepth];
        // every frame's payload encodes its own timestamp so torn records are detectable
        let make = |sensor: SensorType, ticks: i64| {
            let image = ImageBuffer::new(8, 1, PixelFormat::Gray8, ticks.to_le_bytes().to_vec())
                .unwrap();
            SensorFrame::new(sensor, Timestamp::from_ticks(ticks), image).shared()
        };

        let producers: Vec<_> = sensors
            .iter()
            .map(|&sensor| {
                let buffer = Arc::clone(&buffer);
                thread::spawn(move || {
                    for i in 1..=2_000i64 {
                        buffer.send(make(sensor, i * 1_000));
                    }
                })
            })
            .collect();

        let consumers: Vec<_> = (0..3)
            .map(|_| {
                let buffer = Arc::clone(&buffer);
                thread::spawn(move || {
                    for _ in 0..2_000 {
                        let t = buffer.timestamp_for_sensor_pair(A, B, 0.0005);
                        for sensor in [A, B] {
                            if let Some(frame) = buffer.frame_for_time(sensor, t, 0.0005) {
                                let encoded = i64::from_le_bytes(
                                    frame.image().data()[..8].try_into().unwrap(),
                                );
                                assert_eq!(encoded, frame.timestamp().ticks());
                                assert_eq!(frame.sensor_type(), sensor);
                                assert_eq!(frame.timestamp().ticks() % 1_000, 0);
                            }
                        }
                    }
                })
            })
            .collect();

        for handle in producers.into_iter().chain(consumers) {
            handle.join().unwrap();
        }

        for sensor in sensors {
            assert_eq!(buffer.len(sensor), MultiFrameBuffer::DEFAULT_CAPACITY);
            assert_eq!(
                buffer.latest_frame(sensor).unwrap().timestamp().ticks(),
                2_000 * 1_000
            );
        }
        assert_eq!(buffer.stats().total_sent(), 6_000);
    }
}
