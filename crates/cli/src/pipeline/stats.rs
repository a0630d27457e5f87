//! Session statistics.

use std::time::Duration;

use contracts::SensorType;
use frame_sync::BufferStats;
use ingestion::MetricsSnapshot;
use observability::PairMetricsAggregator;
use sinks::RecordingSummary;

/// Statistics from a session run
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    /// Total duration of the session
    pub duration: Duration,

    /// Sensors with a running reader
    pub active_sensors: usize,

    /// Synced pair offsets
    pub pairs: PairMetricsAggregator,

    /// Reader counters captured just before stop
    pub readers: Vec<(SensorType, MetricsSnapshot)>,

    /// Buffer counters at shutdown
    pub buffer: BufferStats,

    /// Finished recording, if recording was enabled
    pub recording: Option<RecordingSummary>,
}

impl SessionStats {
    /// Synced pairs per second
    pub fn pairs_per_second(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.pairs.total_pairs() as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    pub fn frames_received(&self) -> u64 {
        self.readers.iter().map(|(_, m)| m.frames_received).sum()
    }

    pub fn print_summary(&self) {
        println!("\n=== Session Statistics ===\n");
        println!("Overview");
        println!("  Duration: {:.2}s", self.duration.as_secs_f64());
        println!("  Active sensors: {}", self.active_sensors);
        println!("  Frames received: {}", self.frames_received());
        println!("  Frames evicted from buffer: {}", self.buffer.total_evicted());
        println!("  Pairs/s: {:.2}", self.pairs_per_second());

        if !self.readers.is_empty() {
            println!("\nReaders");
            for (sensor, m) in &self.readers {
                println!(
                    "  {sensor}: received={} forwarded={} dropped={} without_pose={}",
                    m.frames_received, m.frames_forwarded, m.frames_dropped, m.frames_without_pose
                );
            }
        }

        println!("\n{}", self.pairs.summary());

        if let Some(recording) = &self.recording {
            println!("Recording: {}", recording.folder.display());
            for (sensor, m) in &recording.frames {
                println!(
                    "  {sensor}: written={} duplicates={} dropped={} failed={}",
                    m.write_count, m.duplicate_count, m.dropped_count, m.failure_count
                );
            }
        }

        println!();
    }
}
