//! Source group lifecycle
//!
//! Enumerates capture sources, matches them to sensors, negotiates formats
//! and runs one reader per enabled sensor.

use std::fmt;
use std::sync::Arc;

use contracts::{
    SensorFrameSinkGroup, SensorTable, SensorType, SharedFrame, SourceGroupKind,
    SpatialPerception,
};
use ingestion::{MediaFrameReaderContext, MetricsSnapshot, TimeConverter};
use slab::Slab;
use tracing::{debug, error, info, instrument, warn};

use crate::device::{CaptureDevice, FrameReader};
use crate::error::{CaptureError, Result};
use crate::matching::{select_source_group, sensor_type_for_source};
use crate::negotiation::{negotiate_format, FormatChoice};

/// Lifecycle state of a source group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceGroupState {
    Uninitialized,
    SourceGroupSelected,
    CapturePrepared,
    Running,
}

impl fmt::Display for SourceGroupState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceGroupState::Uninitialized => "uninitialized",
            SourceGroupState::SourceGroupSelected => "source_group_selected",
            SourceGroupState::CapturePrepared => "capture_prepared",
            SourceGroupState::Running => "running",
        };
        f.write_str(name)
    }
}

/// Outcome of [`MediaFrameSourceGroup::start`].
///
/// Partial success is normal: sensors that could not start are listed in
/// `skipped` with the reason.
#[derive(Debug, Clone, Default)]
pub struct StartReport {
    pub started: Vec<SensorType>,
    pub skipped: Vec<(String, String)>,
}

impl StartReport {
    pub fn is_empty(&self) -> bool {
        self.started.is_empty()
    }
}

struct Registration {
    sensor: SensorType,
    reader: Box<dyn FrameReader>,
}

/// One capture source group and its running readers.
///
/// The enable table and reader contexts are only touched while the group
/// is not running, which is why they need no lock.
pub struct MediaFrameSourceGroup<D: CaptureDevice> {
    kind: SourceGroupKind,
    device: D,
    spatial: Option<Arc<dyn SpatialPerception>>,
    sinks: Option<Arc<dyn SensorFrameSinkGroup>>,
    enabled: SensorTable<bool>,
    contexts: SensorTable<Option<Arc<MediaFrameReaderContext>>>,
    registrations: Slab<Registration>,
    state: SourceGroupState,
}

impl<D: CaptureDevice> MediaFrameSourceGroup<D> {
    pub fn new(
        kind: SourceGroupKind,
        device: D,
        spatial: Option<Arc<dyn SpatialPerception>>,
        sinks: Option<Arc<dyn SensorFrameSinkGroup>>,
    ) -> Self {
        Self {
            kind,
            device,
            spatial,
            sinks,
            enabled: SensorTable::default(),
            contexts: SensorTable::default(),
            registrations: Slab::new(),
            state: SourceGroupState::Uninitialized,
        }
    }

    pub fn kind(&self) -> SourceGroupKind {
        self.kind
    }

    pub fn state(&self) -> SourceGroupState {
        self.state
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// # Panics
    /// The group is running.
    pub fn enable(&mut self, sensor: SensorType) {
        self.assert_not_running("enable");
        self.enabled[sensor] = true;
    }

    /// # Panics
    /// The group is running.
    pub fn disable(&mut self, sensor: SensorType) {
        self.assert_not_running("disable");
        self.enabled[sensor] = false;
    }

    /// Enable every sensor this kind of group can expose.
    pub fn enable_all(&mut self) {
        for &sensor in self.kind.sensors() {
            self.enable(sensor);
        }
    }

    pub fn is_enabled(&self, sensor: SensorType) -> bool {
        self.enabled[sensor]
    }

    fn assert_not_running(&self, operation: &str) {
        assert!(
            self.state != SourceGroupState::Running,
            "cannot {operation} sensors while the source group is running"
        );
    }

    /// Open the device and start a reader for every enabled, matched and
    /// negotiated source.
    ///
    /// Enumeration and initialization failures roll the group back to
    /// `Uninitialized` and return the error. Failures of a single source
    /// only skip that source.
    ///
    /// # Panics
    /// The group is not `Uninitialized`.
    #[instrument(name = "source_group_start", skip(self), fields(kind = ?self.kind))]
    pub async fn start(&mut self) -> Result<StartReport> {
        assert_eq!(
            self.state,
            SourceGroupState::Uninitialized,
            "source group already started"
        );

        let groups = match self.device.find_source_groups().await {
            Ok(groups) => groups,
            Err(e) => {
                error!(error = %e, "source group enumeration failed");
                return Err(e);
            }
        };
        let Some(group) = select_source_group(self.kind, &groups).cloned() else {
            warn!(groups = groups.len(), "no matching source group");
            return Err(CaptureError::GroupNotFound { kind: self.kind });
        };
        self.state = SourceGroupState::SourceGroupSelected;
        info!(group = %group.display_name, sources = group.sources.len(), "source group selected");

        if let Err(e) = self.device.initialize(&group).await {
            error!(group = %group.display_name, error = %e, "capture initialization failed, rolling back");
            self.device.release().await;
            self.state = SourceGroupState::Uninitialized;
            return Err(e);
        }
        self.state = SourceGroupState::CapturePrepared;

        let time_converter = TimeConverter::calibrate(self.device.relative_now_ticks());
        let mut report = StartReport::default();

        for source in self.device.frame_sources() {
            let Some(sensor) = sensor_type_for_source(self.kind, &source) else {
                debug!(source = %source.id, "source matches no sensor");
                report.skipped.push((source.id, "unmatched".into()));
                continue;
            };
            if !self.enabled[sensor] {
                report.skipped.push((source.id, format!("{sensor} not enabled")));
                continue;
            }
            if self.contexts[sensor].is_some() {
                report.skipped.push((source.id, format!("{sensor} already started")));
                continue;
            }
            let Some(choice) = negotiate_format(self.kind, &source) else {
                warn!(source = %source.id, sensor = %sensor, "no acceptable format, skipping source");
                report.skipped.push((source.id, "no acceptable format".into()));
                continue;
            };

            match self
                .start_source(&source.id, sensor, &choice, time_converter)
                .await
            {
                Ok(()) => {
                    info!(
                        sensor = %sensor,
                        source = %source.id,
                        subtype = %choice.format.subtype,
                        width = choice.format.width,
                        height = choice.format.height,
                        "reader started"
                    );
                    report.started.push(sensor);
                }
                Err(e) => {
                    warn!(sensor = %sensor, source = %source.id, error = %e, "source failed to start");
                    report.skipped.push((source.id, e.to_string()));
                }
            }
        }

        self.state = SourceGroupState::Running;
        if report.is_empty() {
            warn!("source group running with no readers");
        } else {
            info!(readers = report.started.len(), "source group running");
        }
        Ok(report)
    }

    async fn start_source(
        &mut self,
        source_id: &str,
        sensor: SensorType,
        choice: &FormatChoice,
        time_converter: TimeConverter,
    ) -> Result<()> {
        self.device.set_format(source_id, &choice.format).await?;
        let reader = self
            .device
            .create_reader(source_id, choice.output_subtype)
            .await?;

        let sink = self.sinks.as_ref().and_then(|sinks| sinks.sink_for(sensor));
        let context = Arc::new(MediaFrameReaderContext::new(
            sensor,
            time_converter,
            self.spatial.clone(),
            sink,
        ));
        reader.start(context.callback())?;

        self.registrations.insert(Registration { sensor, reader });
        self.contexts[sensor] = Some(context);
        Ok(())
    }

    /// Stop every reader, then release the device.
    ///
    /// No frame callback runs once the readers are stopped, so sinks can be
    /// torn down after this returns. Stopping a group that is not running
    /// is a no-op.
    #[instrument(name = "source_group_stop", skip(self), fields(kind = ?self.kind, readers = self.registrations.len()))]
    pub async fn stop(&mut self) {
        if self.state == SourceGroupState::Uninitialized {
            return;
        }

        let registrations: Vec<Registration> = self.registrations.drain().collect();
        let stopped = tokio::task::spawn_blocking(move || {
            for registration in &registrations {
                registration.reader.stop();
                debug!(sensor = %registration.sensor, "reader stopped");
            }
            registrations.len()
        })
        .await;
        match stopped {
            Ok(count) => debug!(count, "all readers stopped"),
            Err(e) => error!(error = %e, "reader shutdown task failed"),
        }

        self.device.release().await;
        self.contexts = SensorTable::default();
        self.state = SourceGroupState::Uninitialized;
        info!("source group stopped");
    }

    /// Latest frame of `sensor`, if its reader delivered one.
    pub fn latest_sensor_frame(&self, sensor: SensorType) -> Option<SharedFrame> {
        self.contexts[sensor]
            .as_ref()
            .and_then(|context| context.latest_sensor_frame())
    }

    pub fn reader_metrics(&self, sensor: SensorType) -> Option<MetricsSnapshot> {
        self.contexts[sensor]
            .as_ref()
            .map(|context| context.metrics().snapshot())
    }

    /// Sensors with a running reader.
    pub fn active_sensors(&self) -> Vec<SensorType> {
        self.registrations
            .iter()
            .map(|(_, registration)| registration.sensor)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use contracts::{SensorFrameSink, Timestamp};

    use super::*;
    use crate::mock_device::{mock_rig_spatial_perception, MockCaptureDevice, MockDeviceConfig};
    use crate::mock_reader::MockReaderConfig;

    #[derive(Default)]
    struct Collect(Mutex<Vec<SharedFrame>>);

    impl SensorFrameSink for Collect {
        fn send(&self, frame: SharedFrame) {
            self.0.lock().unwrap().push(frame);
        }
    }

    struct EverySensor(Arc<Collect>);

    impl SensorFrameSinkGroup for EverySensor {
        fn sink_for(&self, _sensor: SensorType) -> Option<Arc<dyn SensorFrameSink>> {
            Some(self.0.clone())
        }
    }

    fn fast_device(config: MockDeviceConfig) -> MockCaptureDevice {
        MockCaptureDevice::with_config(MockDeviceConfig {
            reader: MockReaderConfig {
                frame_rate_hz: 200.0,
                ..Default::default()
            },
            ..config
        })
    }

    #[tokio::test]
    async fn test_start_enabled_sensors_only() {
        let collect = Arc::new(Collect::default());
        let mut group = MediaFrameSourceGroup::new(
            SourceGroupKind::ResearchMode,
            fast_device(MockDeviceConfig::default()),
            Some(Arc::new(mock_rig_spatial_perception())),
            Some(Arc::new(EverySensor(collect.clone()))),
        );
        group.enable(SensorType::VisibleLightLeftFront);
        group.enable(SensorType::VisibleLightRightFront);

        let report = group.start().await.unwrap();
        assert_eq!(group.state(), SourceGroupState::Running);
        assert_eq!(report.started.len(), 2);
        assert_eq!(report.skipped.len(), 6);

        tokio::time::sleep(Duration::from_millis(100)).await;
        let frame = group
            .latest_sensor_frame(SensorType::VisibleLightLeftFront)
            .unwrap();
        assert!(frame.has_pose());
        assert!(frame.timestamp() > Timestamp::ZERO);
        assert!(group
            .latest_sensor_frame(SensorType::LongThrowToFDepth)
            .is_none());

        group.stop().await;
        assert_eq!(group.state(), SourceGroupState::Uninitialized);
        assert!(!group.device().is_initialized());

        let delivered = collect.0.lock().unwrap().len();
        assert!(delivered > 0);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(collect.0.lock().unwrap().len(), delivered);
    }

    #[tokio::test]
    async fn test_photo_video_group_starts_once() {
        let mut group = MediaFrameSourceGroup::new(
            SourceGroupKind::PhotoVideo,
            fast_device(MockDeviceConfig::default()),
            None,
            None,
        );
        group.enable_all();
        let report = group.start().await.unwrap();
        assert_eq!(report.started, vec![SensorType::PhotoVideo]);
        assert!(report
            .skipped
            .iter()
            .any(|(_, reason)| reason.contains("already started")));
        group.stop().await;
    }

    #[tokio::test]
    async fn test_initialize_failure_rolls_back() {
        let mut group = MediaFrameSourceGroup::new(
            SourceGroupKind::ResearchMode,
            fast_device(MockDeviceConfig {
                fail_initialize: true,
                ..Default::default()
            }),
            None,
            None,
        );
        group.enable_all();
        let result = group.start().await;
        assert!(matches!(result, Err(CaptureError::InitializeFailed { .. })));
        assert_eq!(group.state(), SourceGroupState::Uninitialized);
        assert!(group.active_sensors().is_empty());
    }

    #[tokio::test]
    async fn test_source_failures_are_isolated() {
        let mut group = MediaFrameSourceGroup::new(
            SourceGroupKind::ResearchMode,
            fast_device(MockDeviceConfig {
                fail_start: vec![SensorType::ShortThrowToFDepth],
                fail_set_format: vec!["rm/vlc_ll".into()],
                ..Default::default()
            }),
            None,
            None,
        );
        group.enable_all();
        let report = group.start().await.unwrap();
        assert_eq!(report.started.len(), 6);
        assert!(!report.started.contains(&SensorType::ShortThrowToFDepth));
        assert!(!report.started.contains(&SensorType::VisibleLightLeftLeft));
        assert_eq!(group.active_sensors().len(), 6);
        group.stop().await;
    }

    #[tokio::test]
    async fn test_zero_readers_still_running() {
        let mut group = MediaFrameSourceGroup::new(
            SourceGroupKind::ResearchMode,
            fast_device(MockDeviceConfig::default()),
            None,
            None,
        );
        let report = group.start().await.unwrap();
        assert!(report.is_empty());
        assert_eq!(group.state(), SourceGroupState::Running);
        for sensor in SensorType::ALL {
            assert!(group.latest_sensor_frame(sensor).is_none());
        }
        group.stop().await;
    }

    #[tokio::test]
    async fn test_missing_group() {
        let mut group = MediaFrameSourceGroup::new(
            SourceGroupKind::PhotoVideo,
            fast_device(MockDeviceConfig {
                groups: Vec::new(),
                ..Default::default()
            }),
            None,
            None,
        );
        assert!(matches!(
            group.start().await,
            Err(CaptureError::GroupNotFound { .. })
        ));
        assert_eq!(group.state(), SourceGroupState::Uninitialized);
    }

    #[tokio::test]
    #[should_panic(expected = "while the source group is running")]
    async fn test_enable_while_running_panics() {
        let mut group = MediaFrameSourceGroup::new(
            SourceGroupKind::ResearchMode,
            fast_device(MockDeviceConfig::default()),
            None,
            None,
        );
        group.start().await.unwrap();
        group.enable(SensorType::LongThrowToFDepth);
    }
}
