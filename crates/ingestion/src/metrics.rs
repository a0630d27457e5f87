//! Reader metrics

use std::sync::atomic::{AtomicU64, Ordering};

/// Per-reader counters.
#[derive(Debug, Default)]
pub struct ReaderMetrics {
    /// Raw frames delivered by the reader
    pub frames_received: AtomicU64,

    /// Frames dropped because the image payload was gone
    pub frames_dropped: AtomicU64,

    /// Frames forwarded with a zero origin transform
    pub frames_without_pose: AtomicU64,

    /// Frames handed to the sink
    pub frames_forwarded: AtomicU64,
}

impl ReaderMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_without_pose(&self) {
        self.frames_without_pose.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_forwarded(&self) {
        self.frames_forwarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            frames_without_pose: self.frames_without_pose.load(Ordering::Relaxed),
            frames_forwarded: self.frames_forwarded.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub frames_received: u64,
    pub frames_dropped: u64,
    pub frames_without_pose: u64,
    pub frames_forwarded: u64,
}
