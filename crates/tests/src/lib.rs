//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 模拟设备 e2e 测试（无需 HoloLens）
//! - 串流与录制的端到端校验

#[cfg(test)]
mod contract_tests {
    use contracts::{SensorType, SENSOR_TYPE_COUNT};

    #[test]
    fn test_sensor_catalogue_is_stable() {
        assert_eq!(SensorType::ALL.len(), SENSOR_TYPE_COUNT);
        assert_eq!(SensorType::PhotoVideo.wire_code(), 0);
        assert_eq!(SensorType::PhotoVideo.default_streaming_port(), 23940);
        for (i, sensor) in SensorType::ALL.into_iter().enumerate() {
            assert_eq!(sensor.index(), i);
            assert_eq!(SensorType::try_from(sensor.wire_code()).unwrap(), sensor);
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = contracts::AppConfig::default();
        config_loader::ConfigLoader::validate(&config).unwrap();
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use capture::{
        mock_rig_spatial_perception, MediaFrameSourceGroup, MockCaptureDevice, MockDeviceConfig,
    };
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{
        SensorFrameSink, SensorFrameSinkGroup, SensorType, SourceGroupKind, SpatialPerception,
    };
    use frame_sync::{MultiFrameBuffer, PairPoller};
    use sinks::{SensorFrameReceiver, SensorFrameRecorder, SensorFrameStreamer, SinkRouter};
    use tempfile::tempdir;

    const LF: SensorType = SensorType::VisibleLightLeftFront;
    const RF: SensorType = SensorType::VisibleLightRightFront;

    fn research_group(
        router: Arc<SinkRouter>,
        sensors: &[SensorType],
        tracking: bool,
    ) -> MediaFrameSourceGroup<MockCaptureDevice> {
        let spatial = Arc::new(mock_rig_spatial_perception());
        spatial.set_tracking(tracking);
        let mut group = MediaFrameSourceGroup::new(
            SourceGroupKind::ResearchMode,
            MockCaptureDevice::new(),
            Some(spatial as Arc<dyn SpatialPerception>),
            Some(router as Arc<dyn SensorFrameSinkGroup>),
        );
        for &sensor in sensors {
            group.enable(sensor);
        }
        group
    }

    /// Poll until a pair shows up or two seconds pass.
    async fn wait_for_pair(
        poller: &mut PairPoller,
        buffer: &MultiFrameBuffer,
    ) -> Option<frame_sync::SyncedPair> {
        for _ in 0..200 {
            if let Some(pair) = poller.poll(buffer) {
                return Some(pair);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        None
    }

    /// Mock device -> router -> buffer -> poller
    ///
    /// Both front cameras share the device clock, so their frames carry equal
    /// timestamps and pair up within the default tolerance.
    #[tokio::test(flavor = "multi_thread")]
    async fn test_e2e_mock_capture_pairs() {
        let buffer = Arc::new(MultiFrameBuffer::with_capacity(5));
        let mut router = SinkRouter::new();
        router.route_all([LF, RF], buffer.clone() as Arc<dyn SensorFrameSink>);

        let mut group = research_group(router.build(), &[LF, RF], true);
        let report = group.start().await.unwrap();
        assert_eq!(report.started.len(), 2, "skipped: {:?}", report.skipped);

        let mut poller = PairPoller::new(LF, RF, 0.005);
        let first = wait_for_pair(&mut poller, &buffer).await;
        let second = wait_for_pair(&mut poller, &buffer).await;
        group.stop().await;

        let first = first.expect("no pair within two seconds");
        assert_eq!(first.a.sensor_type(), LF);
        assert_eq!(first.b.sensor_type(), RF);
        assert!(first.a.timestamp().abs_diff_seconds(first.b.timestamp()) <= 0.005);
        assert!(first.a.has_pose());
        assert!(first.b.has_pose());
        assert_ne!(first.a.frame_to_origin(), first.b.frame_to_origin());

        // a poller never hands out the same pair twice
        let second = second.expect("no second pair");
        assert!(second.timestamp > first.timestamp);

        let stats = buffer.stats();
        assert!(stats.sensors[LF].sent_count >= 2);
        assert_eq!(stats.sensors[SensorType::PhotoVideo].sent_count, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_e2e_tracking_lost_frames_have_no_pose() {
        let buffer = Arc::new(MultiFrameBuffer::new());
        let mut router = SinkRouter::new();
        router.route(LF, buffer.clone() as Arc<dyn SensorFrameSink>);

        let mut group = research_group(router.build(), &[LF], false);
        group.start().await.unwrap();
        let mut frame = None;
        for _ in 0..200 {
            frame = buffer.latest_frame(LF);
            if frame.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        group.stop().await;

        let frame = frame.expect("no frame within two seconds");
        assert!(!frame.has_pose());
        assert!(frame.intrinsics().is_some());
    }

    /// Mock device -> streamer -> TCP -> receiver
    #[tokio::test(flavor = "multi_thread")]
    async fn test_e2e_streaming_round_trip() {
        let mut streamer = SensorFrameStreamer::new("127.0.0.1");
        streamer.enable_with_port(LF, 0);
        let streamer = Arc::new(streamer);
        streamer.listen_all().await.unwrap();
        let addr = streamer.server(LF).unwrap().local_addr().unwrap();

        let mut receiver = SensorFrameReceiver::connect(addr).await.unwrap();
        for _ in 0..100 {
            if streamer.server(LF).unwrap().is_connected() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let mut router = SinkRouter::new();
        router.route_group([LF], streamer.as_ref());
        let mut group = research_group(router.build(), &[LF], true);
        group.start().await.unwrap();

        let frame = tokio::time::timeout(Duration::from_secs(5), receiver.receive())
            .await
            .expect("no frame streamed")
            .unwrap();
        group.stop().await;
        streamer.shutdown_all();

        assert_eq!(frame.sensor_type(), LF);
        assert!(!frame.timestamp().is_zero());
        let image = frame.image();
        assert_eq!(image.format(), LF.stream_pixel_format());
        assert_eq!(
            image.data().len(),
            image.width() as usize * image.height() as usize
        );
    }

    /// Mock device -> recorder -> files on disk
    #[tokio::test(flavor = "multi_thread")]
    async fn test_e2e_recording_from_mock_capture() {
        let dir = tempdir().unwrap();
        let mut recorder = SensorFrameRecorder::new(dir.path());
        recorder.enable(SensorType::LongThrowToFDepth);
        let recorder = Arc::new(recorder);
        let folder = recorder.start_recording().await.unwrap();

        let mut router = SinkRouter::new();
        router.route_group([SensorType::LongThrowToFDepth], recorder.as_ref());
        let mut group = research_group(router.build(), &[SensorType::LongThrowToFDepth], true);
        group.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        group.stop().await;

        let summary = recorder.stop_recording().await.unwrap().unwrap();
        assert_eq!(summary.folder, folder);
        let (sensor, metrics) = summary.frames[0];
        assert_eq!(sensor, SensorType::LongThrowToFDepth);
        assert!(metrics.write_count > 0);

        let csv = std::fs::read_to_string(folder.join("long_throw_depth.csv")).unwrap();
        let rows: Vec<&str> = csv.lines().skip(1).collect();
        assert_eq!(rows.len() as u64, metrics.write_count);

        let image_file = rows[0].split(',').nth(1).unwrap();
        let pgm = std::fs::read(folder.join(image_file)).unwrap();
        assert!(pgm.starts_with(b"P5\n"));
        assert!(folder.join("recording_version_information.csv").exists());
        assert!(folder.join("camera_calibration.csv").exists());
    }

    /// Config text -> AppConfig -> components
    #[tokio::test]
    async fn test_e2e_config_drives_components() {
        let toml = r#"
[[capture.groups]]
kind = "research_mode"
sensors = ["vlc_lf", "vlc_rf", "long_throw_depth"]

[buffer]
capacity = 3
pair_tolerance_secs = 0.002

[streaming]
bind_host = "127.0.0.1"
sensors = ["vlc_lf"]

[streaming.ports]
vlc_lf = 0
"#;
        let app = ConfigLoader::load_from_str(toml, ConfigFormat::Toml).unwrap();
        let captured = app.captured_sensors();
        assert_eq!(captured, vec![SensorType::LongThrowToFDepth, LF, RF]);

        let buffer = MultiFrameBuffer::with_capacity(app.buffer.capacity);
        assert_eq!(buffer.capacity(), 3);

        let streamer = SensorFrameStreamer::from_config(app.streaming.as_ref().unwrap(), &captured);
        assert_eq!(streamer.enabled_sensors(), vec![LF]);
        streamer.listen_all().await.unwrap();
        assert!(streamer.server(LF).unwrap().local_addr().is_some());
        streamer.shutdown_all();

        let pollers: Vec<PairPoller> = app
            .buffer
            .pairs
            .iter()
            .map(|&pair| PairPoller::from_pair(pair, app.buffer.pair_tolerance_secs))
            .collect();
        assert_eq!(pollers.len(), 1);
        assert_eq!(pollers[0].sensors(), (LF, RF));
    }

    #[tokio::test]
    async fn test_e2e_start_failure_is_isolated_per_sensor() {
        let device = MockCaptureDevice::with_config(MockDeviceConfig {
            fail_start: vec![RF],
            ..Default::default()
        });
        let buffer = Arc::new(MultiFrameBuffer::new());
        let mut router = SinkRouter::new();
        router.route_all([LF, RF], buffer.clone() as Arc<dyn SensorFrameSink>);
        let mut group = MediaFrameSourceGroup::new(
            SourceGroupKind::ResearchMode,
            device,
            None,
            Some(router.build() as Arc<dyn SensorFrameSinkGroup>),
        );
        group.enable(LF);
        group.enable(RF);

        let report = group.start().await.unwrap();
        assert_eq!(report.started, vec![LF]);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(group.active_sensors(), vec![LF]);
        group.stop().await;
    }
}
