//! SensorFrameRecorder - records enabled sensors into a timestamped folder

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use contracts::{
    ContractError, RecordingConfig, SensorFrameSink, SensorFrameSinkGroup, SensorTable,
    SensorType, SharedFrame, SinkLifecycle,
};
use tokio::fs;
use tracing::{info, instrument, warn};

use super::writer::RecorderWriter;
use crate::error::{Result, SinkError};
use crate::handle::SinkHandle;
use crate::metrics::SinkMetricsSnapshot;

pub const RECORDING_VERSION_MAJOR: u8 = 0;
pub const RECORDING_VERSION_MINOR: u8 = 1;
pub const RECORDING_FOLDER_PREFIX: &str = "HoloLensRecording__";
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Recording sink of one sensor.
///
/// Exists for as long as the recorder; frames sent while no recording is
/// active are ignored.
pub struct SensorFrameRecorderSink {
    sensor: SensorType,
    handle: Mutex<Option<SinkHandle<RecorderWriter>>>,
}

impl SensorFrameRecorderSink {
    fn new(sensor: SensorType) -> Self {
        Self {
            sensor,
            handle: Mutex::new(None),
        }
    }

    pub fn sensor(&self) -> SensorType {
        self.sensor
    }

    pub fn is_recording(&self) -> bool {
        self.lock().is_some()
    }

    /// Counters of the active recording, if any.
    pub fn metrics(&self) -> Option<SinkMetricsSnapshot> {
        self.lock().as_ref().map(|handle| handle.metrics().snapshot())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<SinkHandle<RecorderWriter>>> {
        self.handle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SensorFrameSink for SensorFrameRecorderSink {
    fn send(&self, frame: SharedFrame) {
        if let Some(handle) = self.lock().as_ref() {
            handle.try_send(frame);
        }
    }
}

/// Summary of a finished recording.
#[derive(Debug, Clone)]
pub struct RecordingSummary {
    pub folder: PathBuf,
    /// Frames written per sensor
    pub frames: Vec<(SensorType, SinkMetricsSnapshot)>,
}

/// Records every enabled sensor into
/// `<output_dir>/HoloLensRecording__YYYY_MM_DD__HH_MM_SS/`.
///
/// Layout of a recording folder:
/// - `<sensor>/<timestamp>.pgm` (or `.png` for color frames)
/// - `<sensor>.csv`: timestamp, image file and the three transforms
/// - `recording_version_information.csv`
/// - `camera_calibration.csv`
pub struct SensorFrameRecorder {
    output_dir: PathBuf,
    queue_capacity: usize,
    sinks: SensorTable<Option<Arc<SensorFrameRecorderSink>>>,
    folder: tokio::sync::Mutex<Option<PathBuf>>,
}

impl SensorFrameRecorder {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            sinks: SensorTable::default(),
            folder: tokio::sync::Mutex::new(None),
        }
    }

    /// Recorder for the sensors of `config`, or `fallback` when it names none.
    pub fn from_config(config: &RecordingConfig, fallback: &[SensorType]) -> Self {
        let mut recorder = Self::new(&config.output_dir).with_queue_capacity(config.queue_capacity);
        let sensors = if config.sensors.is_empty() {
            fallback
        } else {
            &config.sensors
        };
        for &sensor in sensors {
            recorder.enable(sensor);
        }
        recorder
    }

    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity.max(1);
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn enable(&mut self, sensor: SensorType) {
        if self.sinks[sensor].is_none() {
            self.sinks[sensor] = Some(Arc::new(SensorFrameRecorderSink::new(sensor)));
        }
    }

    pub fn enable_all(&mut self) {
        for sensor in SensorType::ALL {
            self.enable(sensor);
        }
    }

    pub fn recorder_sink(&self, sensor: SensorType) -> Option<&Arc<SensorFrameRecorderSink>> {
        self.sinks[sensor].as_ref()
    }

    /// Folder of the active recording.
    pub async fn current_folder(&self) -> Option<PathBuf> {
        self.folder.lock().await.clone()
    }

    /// Create the recording folder and start every enabled sink.
    ///
    /// # Panics
    /// A recording is already active.
    #[instrument(name = "recorder_start", skip(self), fields(output_dir = %self.output_dir.display()))]
    pub async fn start_recording(&self) -> Result<PathBuf> {
        let mut active = self.folder.lock().await;
        assert!(active.is_none(), "recording already started");

        let folder = create_recording_folder(&self.output_dir).await?;
        for sink in self.sinks.values().flatten() {
            let writer = match RecorderWriter::create(sink.sensor, &folder).await {
                Ok(writer) => writer,
                Err(e) => {
                    self.abandon_recording(&folder).await;
                    return Err(e);
                }
            };
            *sink.lock() = Some(SinkHandle::spawn(writer, self.queue_capacity));
        }

        info!(folder = %folder.display(), "recording started");
        *active = Some(folder.clone());
        Ok(folder)
    }

    /// Stop the sinks started so far and delete the half-made folder.
    async fn abandon_recording(&self, folder: &Path) {
        for started in self.sinks.values().flatten() {
            let handle = started.lock().take();
            if let Some(handle) = handle {
                handle.shutdown().await;
            }
        }
        if let Err(e) = fs::remove_dir_all(folder).await {
            warn!(folder = %folder.display(), error = %e, "cannot remove abandoned recording folder");
        }
    }

    /// Drain every sink, then write the version and calibration files.
    ///
    /// Returns `None` if no recording was active.
    #[instrument(name = "recorder_stop", skip(self))]
    pub async fn stop_recording(&self) -> Result<Option<RecordingSummary>> {
        let mut active = self.folder.lock().await;
        let Some(folder) = active.take() else {
            return Ok(None);
        };

        let mut frames = Vec::new();
        let mut calibration = Vec::new();
        for sink in self.sinks.values().flatten() {
            let handle = sink.lock().take();
            let Some(handle) = handle else { continue };
            let metrics = Arc::clone(handle.metrics());
            match handle.shutdown().await {
                Some(writer) => {
                    if let Some(intrinsics) = writer.intrinsics() {
                        calibration.push(calibration_row(writer.sensor(), intrinsics));
                    }
                }
                None => warn!(sensor = %sink.sensor, "recorder sink lost"),
            }
            frames.push((sink.sensor, metrics.snapshot()));
        }

        write_file(
            &folder.join("recording_version_information.csv"),
            format!("VersionMajor,VersionMinor\n{RECORDING_VERSION_MAJOR},{RECORDING_VERSION_MINOR}\n"),
        )
        .await?;

        let mut contents = String::from(CALIBRATION_HEADER);
        contents.push('\n');
        for row in calibration {
            contents.push_str(&row);
            contents.push('\n');
        }
        write_file(&folder.join("camera_calibration.csv"), contents).await?;

        info!(
            folder = %folder.display(),
            written = frames.iter().map(|(_, m)| m.write_count).sum::<u64>(),
            "recording stopped"
        );
        Ok(Some(RecordingSummary { folder, frames }))
    }
}

const CALIBRATION_HEADER: &str = "SensorName,FocalLength.x,FocalLength.y,PrincipalPoint.x,PrincipalPoint.y,RadialDistortion.x,RadialDistortion.y,RadialDistortion.z,TangentialDistortion.x,TangentialDistortion.y";

fn calibration_row(sensor: SensorType, intrinsics: &contracts::CoreIntrinsics) -> String {
    let values = [
        intrinsics.focal_length[0],
        intrinsics.focal_length[1],
        intrinsics.principal_point[0],
        intrinsics.principal_point[1],
        intrinsics.radial_distortion[0],
        intrinsics.radial_distortion[1],
        intrinsics.radial_distortion[2],
        intrinsics.tangential_distortion[0],
        intrinsics.tangential_distortion[1],
    ];
    let mut row = sensor.recording_name().to_string();
    for value in values {
        row.push(',');
        row.push_str(&value.to_string());
    }
    row
}

async fn write_file(path: &Path, contents: String) -> Result<()> {
    fs::write(path, contents)
        .await
        .map_err(|e| SinkError::recording(path, e))
}

/// Create a fresh recording folder named after the current UTC time.
async fn create_recording_folder(output_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)
        .await
        .map_err(|e| SinkError::recording(output_dir, e))?;

    let stem = format!(
        "{RECORDING_FOLDER_PREFIX}{}",
        Utc::now().format("%Y_%m_%d__%H_%M_%S")
    );
    let mut candidate = output_dir.join(&stem);
    let mut attempt = 1;
    loop {
        match fs::create_dir(&candidate).await {
            Ok(()) => return Ok(candidate),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                attempt += 1;
                candidate = output_dir.join(format!("{stem}_{attempt}"));
            }
            Err(e) => return Err(SinkError::recording(&candidate, e)),
        }
    }
}

impl SensorFrameSinkGroup for SensorFrameRecorder {
    fn sink_for(&self, sensor_type: SensorType) -> Option<Arc<dyn SensorFrameSink>> {
        self.sinks[sensor_type]
            .as_ref()
            .map(|sink| Arc::clone(sink) as Arc<dyn SensorFrameSink>)
    }
}

impl SinkLifecycle for SensorFrameRecorder {
    fn name(&self) -> &str {
        "recorder"
    }

    async fn start(&self) -> std::result::Result<(), ContractError> {
        self.start_recording().await?;
        Ok(())
    }

    async fn stop(&self) -> std::result::Result<(), ContractError> {
        self.stop_recording().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use contracts::{
        CameraIntrinsics, CoreIntrinsics, ImageBuffer, PixelFormat, SensorFrame, Timestamp,
        Transform,
    };
    use tempfile::tempdir;

    use super::*;

    fn depth_frame(ticks: i64) -> SharedFrame {
        SensorFrame::new(
            SensorType::LongThrowToFDepth,
            Timestamp::from_ticks(ticks),
            ImageBuffer::blank(4, 2, PixelFormat::Gray16),
        )
        .with_frame_to_origin(Transform::identity())
        .shared()
    }

    fn pv_frame(ticks: i64) -> SharedFrame {
        SensorFrame::new(
            SensorType::PhotoVideo,
            Timestamp::from_ticks(ticks),
            ImageBuffer::blank(4, 2, PixelFormat::Bgra8),
        )
        .with_intrinsics(Some(CameraIntrinsics::Core(CoreIntrinsics {
            focal_length: [500.0, 501.0],
            principal_point: [2.0, 1.0],
            radial_distortion: [0.0; 3],
            tangential_distortion: [0.0; 2],
            image_width: 4,
            image_height: 2,
        })))
        .shared()
    }

    #[tokio::test]
    async fn test_recording_layout() {
        let dir = tempdir().unwrap();
        let mut recorder = SensorFrameRecorder::new(dir.path());
        recorder.enable(SensorType::LongThrowToFDepth);
        recorder.enable(SensorType::PhotoVideo);

        let folder = recorder.start_recording().await.unwrap();
        let name = folder.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with(RECORDING_FOLDER_PREFIX));
        assert_eq!(name.len(), RECORDING_FOLDER_PREFIX.len() + "YYYY_MM_DD__HH_MM_SS".len());

        let depth = recorder.sink_for(SensorType::LongThrowToFDepth).unwrap();
        depth.send(depth_frame(100));
        depth.send(depth_frame(100));
        depth.send(depth_frame(200));
        recorder
            .sink_for(SensorType::PhotoVideo)
            .unwrap()
            .send(pv_frame(150));

        let summary = recorder.stop_recording().await.unwrap().unwrap();
        assert_eq!(summary.folder, folder);

        let csv = std::fs::read_to_string(folder.join("long_throw_depth.csv")).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3, "header plus two deduplicated frames");
        assert!(lines[1].starts_with("100,long_throw_depth/00000000000000000100.pgm,1,0,0,0"));

        let pgm = std::fs::read(folder.join("long_throw_depth/00000000000000000200.pgm")).unwrap();
        assert!(pgm.starts_with(b"P5\n4 2\n65535\n"));
        assert!(folder.join("pv/00000000000000000150.png").exists());

        let version =
            std::fs::read_to_string(folder.join("recording_version_information.csv")).unwrap();
        assert_eq!(version, "VersionMajor,VersionMinor\n0,1\n");

        let calibration = std::fs::read_to_string(folder.join("camera_calibration.csv")).unwrap();
        let rows: Vec<&str> = calibration.lines().collect();
        assert_eq!(rows.len(), 2);
        assert!(rows[1].starts_with("pv,500,501,2,1"));
    }

    #[tokio::test]
    async fn test_frames_ignored_while_stopped() {
        let dir = tempdir().unwrap();
        let mut recorder = SensorFrameRecorder::new(dir.path());
        recorder.enable(SensorType::LongThrowToFDepth);
        let sink = recorder.recorder_sink(SensorType::LongThrowToFDepth).unwrap().clone();

        sink.send(depth_frame(1));
        assert!(!sink.is_recording());
        assert!(recorder.stop_recording().await.unwrap().is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_consecutive_recordings_get_distinct_folders() {
        let dir = tempdir().unwrap();
        let mut recorder = SensorFrameRecorder::new(dir.path());
        recorder.enable(SensorType::VisibleLightLeftLeft);

        let first = recorder.start_recording().await.unwrap();
        recorder.stop_recording().await.unwrap();
        let second = recorder.start_recording().await.unwrap();
        recorder.stop_recording().await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_abandoned_recording_leaves_no_folder() {
        let dir = tempdir().unwrap();
        let mut recorder = SensorFrameRecorder::new(dir.path());
        recorder.enable(SensorType::LongThrowToFDepth);
        recorder.enable(SensorType::PhotoVideo);

        let folder = recorder.start_recording().await.unwrap();
        recorder
            .sink_for(SensorType::LongThrowToFDepth)
            .unwrap()
            .send(depth_frame(100));
        recorder.abandon_recording(&folder).await;

        assert!(!folder.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        for sensor in [SensorType::LongThrowToFDepth, SensorType::PhotoVideo] {
            assert!(!recorder.recorder_sink(sensor).unwrap().is_recording());
        }

        // a missing folder is only logged
        recorder.abandon_recording(&folder).await;
    }

    #[tokio::test]
    #[should_panic(expected = "recording already started")]
    async fn test_double_start_panics() {
        let dir = tempdir().unwrap();
        let recorder = SensorFrameRecorder::new(dir.path());
        recorder.start_recording().await.unwrap();
        let _ = recorder.start_recording().await;
    }
}
