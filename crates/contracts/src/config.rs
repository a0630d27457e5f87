//! AppConfig - Config Loader output
//!
//! Describes a capture session: which source groups and sensors to open,
//! how the frame buffer pairs sensors, and where frames are streamed or
//! recorded.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{SensorTable, SensorType};

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete session configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct AppConfig {
    #[serde(default)]
    pub version: ConfigVersion,

    #[serde(default)]
    #[validate(nested)]
    pub capture: CaptureConfig,

    #[serde(default)]
    #[validate(nested)]
    pub buffer: BufferConfig,

    /// Per-sensor TCP streaming (disabled when absent)
    #[serde(default)]
    pub streaming: Option<StreamingConfig>,

    /// On-disk recording (disabled when absent)
    #[serde(default)]
    pub recording: Option<RecordingConfig>,

    #[serde(default)]
    #[validate(nested)]
    pub mock: MockCaptureConfig,

    #[serde(default)]
    pub observability: ObservabilitySettings,
}

impl AppConfig {
    /// Every sensor enabled by the capture groups, in sensor order.
    pub fn captured_sensors(&self) -> Vec<SensorType> {
        let mut enabled = SensorTable::<bool>::default();
        for group in &self.capture.groups {
            for &sensor in group.enabled_sensors() {
                enabled[sensor] = true;
            }
        }
        enabled
            .iter()
            .filter(|(_, enabled)| **enabled)
            .map(|(sensor, _)| sensor)
            .collect()
    }
}

/// Which kind of source group to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceGroupKind {
    /// The photo/video (RGB) camera group
    PhotoVideo,
    /// The research-mode depth and visible-light sensors
    ResearchMode,
}

impl SourceGroupKind {
    /// Sensors a group of this kind can expose.
    pub fn sensors(self) -> &'static [SensorType] {
        match self {
            SourceGroupKind::PhotoVideo => &[SensorType::PhotoVideo],
            SourceGroupKind::ResearchMode => &SensorType::RESEARCH_MODE,
        }
    }
}

/// Source groups to open.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CaptureConfig {
    #[validate(length(min = 1))]
    pub groups: Vec<GroupConfig>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            groups: vec![GroupConfig {
                kind: SourceGroupKind::ResearchMode,
                sensors: Vec::new(),
            }],
        }
    }
}

/// One source group and the sensors to enable in it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupConfig {
    pub kind: SourceGroupKind,

    /// Sensors to enable; empty enables every sensor of the group
    #[serde(default)]
    pub sensors: Vec<SensorType>,
}

impl GroupConfig {
    pub fn enabled_sensors(&self) -> &[SensorType] {
        if self.sensors.is_empty() {
            self.kind.sensors()
        } else {
            &self.sensors
        }
    }
}

/// Frame buffer and pair polling.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BufferConfig {
    /// Frames retained per sensor
    #[serde(default = "default_capacity")]
    #[validate(range(min = 1, max = 1024))]
    pub capacity: usize,

    /// Pair matching tolerance (seconds)
    #[serde(default = "default_pair_tolerance")]
    #[validate(range(exclusive_min = 0.0, max = 10.0))]
    pub pair_tolerance_secs: f64,

    /// Sensor pairs polled by the run loop
    #[serde(default = "default_pairs")]
    pub pairs: Vec<SensorPair>,

    /// Poll period (ms)
    #[serde(default = "default_poll_interval")]
    #[validate(range(min = 1))]
    pub poll_interval_ms: u64,
}

fn default_capacity() -> usize {
    5
}

fn default_pair_tolerance() -> f64 {
    0.005
}

fn default_pairs() -> Vec<SensorPair> {
    vec![SensorPair {
        a: SensorType::VisibleLightLeftFront,
        b: SensorType::VisibleLightRightFront,
    }]
}

fn default_poll_interval() -> u64 {
    33
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            pair_tolerance_secs: default_pair_tolerance(),
            pairs: default_pairs(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

/// Two sensors whose frames are paired by timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorPair {
    pub a: SensorType,
    pub b: SensorType,
}

/// TCP streaming servers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamingConfig {
    #[serde(default = "default_bind_host")]
    pub bind_host: String,

    /// Sensors to stream; empty streams every captured sensor
    #[serde(default)]
    pub sensors: Vec<SensorType>,

    /// Port overrides; other sensors use their default port
    #[serde(default)]
    pub ports: BTreeMap<SensorType, u16>,
}

fn default_bind_host() -> String {
    "0.0.0.0".to_string()
}

impl StreamingConfig {
    pub fn port_for(&self, sensor: SensorType) -> u16 {
        self.ports
            .get(&sensor)
            .copied()
            .unwrap_or_else(|| sensor.default_streaming_port())
    }
}

/// On-disk recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingConfig {
    /// Parent directory of recording folders
    pub output_dir: PathBuf,

    /// Sensors to record; empty records every captured sensor
    #[serde(default)]
    pub sensors: Vec<SensorType>,

    /// Frames queued per sensor before new ones are dropped
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_queue_capacity() -> usize {
    64
}

/// Synthetic capture device used when no hardware is present.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MockCaptureConfig {
    /// Frame rate of every synthetic reader (Hz)
    #[serde(default = "default_frame_rate")]
    #[validate(range(min = 0.1, max = 1000.0))]
    pub frame_rate_hz: f64,

    /// Fail capture device initialization
    #[serde(default)]
    pub fail_initialize: bool,

    /// Sensors whose reader refuses to start
    #[serde(default)]
    pub fail_start: Vec<SensorType>,

    /// Deliver a frame without image every N frames (0 = never)
    #[serde(default)]
    pub drop_image_every: u32,

    /// Report positional tracking as lost
    #[serde(default)]
    pub tracking_lost: bool,
}

fn default_frame_rate() -> f64 {
    30.0
}

impl Default for MockCaptureConfig {
    fn default() -> Self {
        Self {
            frame_rate_hz: default_frame_rate(),
            fail_initialize: false,
            fail_start: Vec::new(),
            drop_image_every: 0,
            tracking_lost: false,
        }
    }
}

/// Metrics settings. Logging is configured on the command line.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservabilitySettings {
    /// Prometheus port (None = disabled)
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.buffer.capacity, 5);
        assert_eq!(config.capture.groups[0].kind, SourceGroupKind::ResearchMode);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let mut config = AppConfig::default();
        config.buffer.capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_tolerance_rejected() {
        let mut config = AppConfig::default();
        config.buffer.pair_tolerance_secs = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_port_override() {
        let mut streaming = StreamingConfig {
            bind_host: default_bind_host(),
            sensors: vec![],
            ports: BTreeMap::new(),
        };
        streaming.ports.insert(SensorType::PhotoVideo, 30000);
        assert_eq!(streaming.port_for(SensorType::PhotoVideo), 30000);
        assert_eq!(streaming.port_for(SensorType::LongThrowToFDepth), 23947);
    }

    #[test]
    fn test_serde_json_round_trip() {
        let json = serde_json::to_string(&AppConfig::default()).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.buffer.pairs, default_pairs());
    }
}
