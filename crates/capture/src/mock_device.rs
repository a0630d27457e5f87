//! Mock capture device
//!
//! Emulates the HoloLens capture layer: a photo/video group and a
//! research-mode group with eight sensors. Failures can be injected for
//! enumeration, initialization, format selection and reader start.

use std::collections::HashMap;
use std::sync::Mutex;

use contracts::{
    FrameSourceInfo, MediaFormat, MockCaptureConfig, SensorType, SourceGroupInfo, SourceKind,
    Transform, TICKS_PER_SECOND,
};
use ingestion::StaticSpatialPerception;
use tracing::instrument;

use crate::device::{CaptureDevice, FrameReader};
use crate::error::{CaptureError, Result};
use crate::matching::{sensor_type_for_source, PHOTO_VIDEO_GROUP_NAME};
use crate::mock_reader::{mock_coordinate_system, MockClock, MockFrameReader, MockReaderConfig};

/// Mock device configuration
#[derive(Debug, Clone)]
pub struct MockDeviceConfig {
    /// Groups reported by enumeration
    pub groups: Vec<SourceGroupInfo>,
    /// Fail source group enumeration
    pub fail_enumeration: bool,
    /// Fail capture initialization
    pub fail_initialize: bool,
    /// Source ids whose format cannot be set
    pub fail_set_format: Vec<String>,
    /// Sensors whose reader refuses to start
    pub fail_start: Vec<SensorType>,
    /// Settings shared by every reader
    pub reader: MockReaderConfig,
}

impl Default for MockDeviceConfig {
    fn default() -> Self {
        Self {
            groups: hololens_source_groups(),
            fail_enumeration: false,
            fail_initialize: false,
            fail_set_format: Vec::new(),
            fail_start: Vec::new(),
            reader: MockReaderConfig::default(),
        }
    }
}

impl From<&MockCaptureConfig> for MockDeviceConfig {
    fn from(config: &MockCaptureConfig) -> Self {
        Self {
            fail_initialize: config.fail_initialize,
            fail_start: config.fail_start.clone(),
            reader: MockReaderConfig {
                frame_rate_hz: config.frame_rate_hz,
                drop_image_every: config.drop_image_every,
                jitter_ticks: 2_000,
                fail_start: false,
            },
            ..Default::default()
        }
    }
}

/// Source groups of a HoloLens with research mode enabled.
pub fn hololens_source_groups() -> Vec<SourceGroupInfo> {
    let photo_video = SourceGroupInfo {
        id: "pv".to_string(),
        display_name: PHOTO_VIDEO_GROUP_NAME.to_string(),
        sources: vec![
            FrameSourceInfo::new(
                "pv/preview",
                SourceKind::Color,
                vec![
                    MediaFormat::new("NV12", 640, 360, 30.0),
                    MediaFormat::new("NV12", 1280, 720, 30.0),
                ],
            ),
            FrameSourceInfo::new(
                "pv/record",
                SourceKind::Color,
                vec![MediaFormat::new("NV12", 1280, 720, 30.0)],
            ),
        ],
    };

    let research = |sensor: SensorType, kind: SourceKind, formats: Vec<MediaFormat>| {
        FrameSourceInfo::new(format!("rm/{}", sensor.recording_name()), kind, formats)
            .with_user_data_name(sensor.device_name())
    };
    let research_mode = SourceGroupInfo {
        id: "rm".to_string(),
        display_name: "Sensor Streaming".to_string(),
        sources: vec![
            research(
                SensorType::ShortThrowToFDepth,
                SourceKind::Depth,
                vec![MediaFormat::new("D16", 448, 450, 30.0)],
            ),
            research(
                SensorType::ShortThrowToFReflectivity,
                SourceKind::Infrared,
                vec![MediaFormat::new("L8", 448, 450, 30.0)],
            ),
            research(
                SensorType::LongThrowToFDepth,
                SourceKind::Depth,
                vec![MediaFormat::new("D16", 448, 450, 5.0)],
            ),
            research(
                SensorType::LongThrowToFReflectivity,
                SourceKind::Infrared,
                vec![MediaFormat::new("L8", 448, 450, 5.0)],
            ),
            research(
                SensorType::VisibleLightLeftLeft,
                SourceKind::Infrared,
                vec![MediaFormat::new("L8", 640, 480, 30.0)],
            ),
            research(
                SensorType::VisibleLightLeftFront,
                SourceKind::Infrared,
                vec![MediaFormat::new("L8", 640, 480, 30.0)],
            ),
            research(
                SensorType::VisibleLightRightFront,
                SourceKind::Infrared,
                vec![MediaFormat::new("L8", 640, 480, 30.0)],
            ),
            research(
                SensorType::VisibleLightRightRight,
                SourceKind::Infrared,
                vec![MediaFormat::new("L8", 640, 480, 30.0)],
            ),
        ],
    };

    vec![photo_video, research_mode]
}

/// Spatial perception with a fixed rig pose for every mock sensor.
pub fn mock_rig_spatial_perception() -> StaticSpatialPerception {
    let spatial = StaticSpatialPerception::new();
    for sensor in SensorType::ALL {
        let mut to_origin = Transform::identity();
        // 5 cm apart along x
        to_origin[(0, 3)] = sensor.index() as f32 * 0.05;
        to_origin[(1, 3)] = 1.6;
        spatial.set_transform_to_origin(mock_coordinate_system(sensor), to_origin);
    }
    spatial
}

/// Mock capture device
pub struct MockCaptureDevice {
    config: MockDeviceConfig,
    clock: MockClock,
    active: Option<ActiveGroup>,
    formats: Mutex<HashMap<String, MediaFormat>>,
}

struct ActiveGroup {
    info: SourceGroupInfo,
    sensors: HashMap<String, SensorType>,
}

impl MockCaptureDevice {
    pub fn new() -> Self {
        Self::with_config(MockDeviceConfig::default())
    }

    pub fn with_config(config: MockDeviceConfig) -> Self {
        Self {
            config,
            // pretend the device booted a minute ago
            clock: MockClock::new(60 * TICKS_PER_SECOND),
            active: None,
            formats: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.active.is_some()
    }

    fn formats(&self) -> std::sync::MutexGuard<'_, HashMap<String, MediaFormat>> {
        self.formats
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn active(&self, source_id: &str) -> Result<&ActiveGroup> {
        self.active
            .as_ref()
            .filter(|group| group.sensors.contains_key(source_id))
            .ok_or_else(|| CaptureError::unknown_source(source_id))
    }
}

impl Default for MockCaptureDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureDevice for MockCaptureDevice {
    #[instrument(name = "mock_capture_find_groups", skip(self))]
    async fn find_source_groups(&self) -> Result<Vec<SourceGroupInfo>> {
        if self.config.fail_enumeration {
            return Err(CaptureError::EnumerationFailed {
                message: "mock failure".into(),
            });
        }
        Ok(self.config.groups.clone())
    }

    #[instrument(
        name = "mock_capture_initialize",
        skip(self, group),
        fields(group = %group.display_name)
    )]
    async fn initialize(&mut self, group: &SourceGroupInfo) -> Result<()> {
        if self.config.fail_initialize {
            return Err(CaptureError::initialize(&group.display_name, "access denied"));
        }
        let kind = if group.display_name == PHOTO_VIDEO_GROUP_NAME {
            contracts::SourceGroupKind::PhotoVideo
        } else {
            contracts::SourceGroupKind::ResearchMode
        };
        let sensors = group
            .sources
            .iter()
            .filter_map(|source| {
                sensor_type_for_source(kind, source).map(|sensor| (source.id.clone(), sensor))
            })
            .collect();
        self.active = Some(ActiveGroup {
            info: group.clone(),
            sensors,
        });
        Ok(())
    }

    fn frame_sources(&self) -> Vec<FrameSourceInfo> {
        self.active
            .as_ref()
            .map(|group| group.info.sources.clone())
            .unwrap_or_default()
    }

    async fn set_format(&self, source_id: &str, format: &MediaFormat) -> Result<()> {
        self.active(source_id)?;
        if self.config.fail_set_format.iter().any(|id| id == source_id) {
            return Err(CaptureError::SetFormatFailed {
                source_id: source_id.to_string(),
                subtype: format.subtype.clone(),
                message: "mock failure".into(),
            });
        }
        self.formats().insert(source_id.to_string(), format.clone());
        Ok(())
    }

    async fn create_reader(
        &self,
        source_id: &str,
        _output_subtype: Option<&str>,
    ) -> Result<Box<dyn FrameReader>> {
        let sensor = self.active(source_id)?.sensors[source_id];
        let format = self
            .formats()
            .get(source_id)
            .cloned()
            .ok_or_else(|| CaptureError::ReaderCreateFailed {
                source_id: source_id.to_string(),
                message: "no format selected".into(),
            })?;

        let mut reader_config = self.config.reader.clone();
        reader_config.fail_start = self.config.fail_start.contains(&sensor);
        Ok(Box::new(MockFrameReader::new(
            sensor,
            format,
            reader_config,
            self.clock,
        )))
    }

    fn relative_now_ticks(&self) -> i64 {
        self.clock.now_ticks()
    }

    async fn release(&mut self) {
        self.active = None;
        self.formats().clear();
    }
}

#[cfg(test)]
mod tests {
    use contracts::{SourceGroupKind, SpatialPerception, Timestamp};

    use super::*;
    use crate::matching::select_source_group;

    #[tokio::test]
    async fn test_initialize_and_create_reader() {
        let mut device = MockCaptureDevice::new();
        let groups = device.find_source_groups().await.unwrap();
        let research = select_source_group(SourceGroupKind::ResearchMode, &groups)
            .unwrap()
            .clone();

        device.initialize(&research).await.unwrap();
        assert_eq!(device.frame_sources().len(), 8);

        let format = MediaFormat::new("D16", 448, 450, 30.0);
        device.set_format("rm/long_throw_depth", &format).await.unwrap();
        let reader = device.create_reader("rm/long_throw_depth", None).await.unwrap();
        assert!(!reader.is_running());

        device.release().await;
        assert!(!device.is_initialized());
        assert!(device.frame_sources().is_empty());
    }

    #[tokio::test]
    async fn test_reader_requires_format() {
        let mut device = MockCaptureDevice::new();
        let groups = device.find_source_groups().await.unwrap();
        device.initialize(&groups[1]).await.unwrap();
        let result = device.create_reader("rm/vlc_ll", None).await;
        assert!(matches!(result, Err(CaptureError::ReaderCreateFailed { .. })));
        assert!(matches!(
            device.create_reader("nope", None).await,
            Err(CaptureError::UnknownSource { .. })
        ));
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let mut device = MockCaptureDevice::with_config(MockDeviceConfig {
            fail_initialize: true,
            ..Default::default()
        });
        let groups = device.find_source_groups().await.unwrap();
        assert!(device.initialize(&groups[0]).await.is_err());
        assert!(!device.is_initialized());

        let device = MockCaptureDevice::with_config(MockDeviceConfig {
            fail_enumeration: true,
            ..Default::default()
        });
        assert!(device.find_source_groups().await.is_err());
    }

    #[test]
    fn test_rig_spatial_perception() {
        let spatial = mock_rig_spatial_perception();
        let pose = spatial
            .try_transform(
                mock_coordinate_system(SensorType::VisibleLightLeftLeft),
                spatial.origin(),
                Timestamp::from_ticks(1),
            )
            .unwrap();
        assert_eq!(pose[(3, 3)], 1.0);
        assert!((pose[(1, 3)] - 1.6).abs() < 1e-6);
    }
}
