//! Frame pipeline metrics
//!
//! Prometheus-facing recording helpers plus an in-memory aggregator for
//! end-of-run summaries.

use std::collections::BTreeMap;
use std::fmt;

use contracts::SensorType;
use metrics::{counter, gauge, histogram};

/// Record a raw frame delivered by a reader
pub fn record_frame_received(sensor: SensorType) {
    counter!(
        "hololens_frames_received_total",
        "sensor" => sensor.recording_name()
    )
    .increment(1);
}

/// Record a frame dropped before reaching its sink
///
/// `reason` is a short static label such as `no_image` or `busy`.
pub fn record_frame_dropped(sensor: SensorType, reason: &'static str) {
    counter!(
        "hololens_frames_dropped_total",
        "sensor" => sensor.recording_name(),
        "reason" => reason
    )
    .increment(1);
}

/// Record a frame that arrived without a usable pose
pub fn record_pose_missing(sensor: SensorType) {
    counter!(
        "hololens_pose_missing_total",
        "sensor" => sensor.recording_name()
    )
    .increment(1);
}

/// Record current ring depth
pub fn record_buffer_depth(sensor: SensorType, depth: usize) {
    gauge!(
        "hololens_buffer_depth",
        "sensor" => sensor.recording_name()
    )
    .set(depth as f64);
}

/// Record a frame evicted from a full ring
pub fn record_frame_evicted(sensor: SensorType) {
    counter!(
        "hololens_frames_evicted_total",
        "sensor" => sensor.recording_name()
    )
    .increment(1);
}

/// Record a pair query and whether it matched
pub fn record_pair_query(a: SensorType, b: SensorType, matched: bool) {
    let status = if matched { "matched" } else { "none" };
    counter!(
        "hololens_pair_queries_total",
        "a" => a.recording_name(),
        "b" => b.recording_name(),
        "status" => status
    )
    .increment(1);
}

/// Record the offset between the two frames of a synced pair
pub fn record_pair_offset_ms(a: SensorType, b: SensorType, offset_ms: f64) {
    histogram!(
        "hololens_pair_offset_ms",
        "a" => a.recording_name(),
        "b" => b.recording_name()
    )
    .record(offset_ms);
}

/// Record a frame handed to a sink
pub fn record_sink_frame(sink_name: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "hololens_sink_frames_total",
        "sink" => sink_name.to_string(),
        "status" => status
    )
    .increment(1);
}

/// Record how long a sink write took
pub fn record_sink_write_ms(sink_name: &str, elapsed_ms: f64) {
    histogram!(
        "hololens_sink_write_ms",
        "sink" => sink_name.to_string()
    )
    .record(elapsed_ms);
}

/// Aggregates synced-pair statistics for a run summary.
#[derive(Debug, Clone, Default)]
pub struct PairMetricsAggregator {
    pairs: BTreeMap<(SensorType, SensorType), RunningStats>,
}

impl PairMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one synced pair with its absolute offset in milliseconds
    pub fn update(&mut self, a: SensorType, b: SensorType, offset_ms: f64) {
        self.pairs.entry((a, b)).or_default().push(offset_ms.abs());
    }

    pub fn total_pairs(&self) -> u64 {
        self.pairs.values().map(RunningStats::count).sum()
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_pairs: self.total_pairs(),
            offsets_ms: self
                .pairs
                .iter()
                .map(|(&(a, b), stats)| (format!("{a}/{b}"), StatsSummary::from(stats)))
                .collect(),
        }
    }
}

/// Metrics summary
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_pairs: u64,
    /// Pair offset statistics keyed by "a/b"
    pub offsets_ms: BTreeMap<String, StatsSummary>,
}

impl fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Pair Metrics Summary ===")?;
        writeln!(f, "Synced pairs: {}", self.total_pairs)?;
        for (pair, stats) in &self.offsets_ms {
            writeln!(f, "  {pair} offset (ms): {stats}")?;
        }
        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count(),
            min: stats.min(),
            max: stats.max(),
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "mean={:.3}, std={:.3}, min={:.3}, max={:.3} (n={})",
                self.mean, self.std_dev, self.min, self.max, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_groups_by_pair() {
        let mut aggregator = PairMetricsAggregator::new();
        let (l, r) = (
            SensorType::VisibleLightLeftFront,
            SensorType::VisibleLightRightFront,
        );
        aggregator.update(l, r, -1.0);
        aggregator.update(l, r, 3.0);
        aggregator.update(SensorType::PhotoVideo, SensorType::LongThrowToFDepth, 10.0);

        let summary = aggregator.summary();
        assert_eq!(summary.total_pairs, 3);
        let lr = &summary.offsets_ms["vlc_lf/vlc_rf"];
        assert_eq!(lr.count, 2);
        assert!((lr.mean - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_summary_display() {
        let mut aggregator = PairMetricsAggregator::new();
        aggregator.update(SensorType::PhotoVideo, SensorType::ShortThrowToFDepth, 4.0);
        let output = format!("{}", aggregator.summary());
        assert!(output.contains("Synced pairs: 1"));
        assert!(output.contains("pv/short_throw_depth"));
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_frame_received(SensorType::PhotoVideo);
        record_pair_query(SensorType::PhotoVideo, SensorType::ShortThrowToFDepth, false);
        record_sink_frame("recorder", true);
    }
}
