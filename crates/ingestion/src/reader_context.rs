//! Per-sensor frame adapter.

use std::sync::{Arc, Mutex, PoisonError};

use contracts::{
    FrameArrivedCallback, RawFrame, SensorFrame, SensorFrameSink, SensorType, SharedFrame,
    SpatialPerception,
};
use observability::{record_frame_dropped, record_frame_received, record_pose_missing};
use tracing::{debug, trace};

use crate::extract::{extract_intrinsics, extract_transforms};
use crate::metrics::ReaderMetrics;
use crate::time::TimeConverter;

/// Turns raw reader deliveries of one sensor into [`SensorFrame`]s.
///
/// `frame_arrived` runs on the reader's delivery thread. Only the latest
/// frame cache is shared with other threads and it has its own mutex.
pub struct MediaFrameReaderContext {
    sensor_type: SensorType,
    time_converter: TimeConverter,
    spatial: Option<Arc<dyn SpatialPerception>>,
    sink: Option<Arc<dyn SensorFrameSink>>,
    latest: Mutex<Option<SharedFrame>>,
    metrics: Arc<ReaderMetrics>,
}

impl MediaFrameReaderContext {
    pub fn new(
        sensor_type: SensorType,
        time_converter: TimeConverter,
        spatial: Option<Arc<dyn SpatialPerception>>,
        sink: Option<Arc<dyn SensorFrameSink>>,
    ) -> Self {
        Self {
            sensor_type,
            time_converter,
            spatial,
            sink,
            latest: Mutex::new(None),
            metrics: Arc::new(ReaderMetrics::new()),
        }
    }

    pub fn sensor_type(&self) -> SensorType {
        self.sensor_type
    }

    pub fn metrics(&self) -> Arc<ReaderMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Callback to register with a frame reader.
    pub fn callback(self: &Arc<Self>) -> FrameArrivedCallback {
        let context = Arc::clone(self);
        Arc::new(move |raw| context.frame_arrived(raw))
    }

    /// Build a frame from `raw`, forward it to the sink and cache it as latest.
    ///
    /// A delivery without image payload is dropped: the platform recycled the
    /// buffer and the next delivery recovers.
    pub fn frame_arrived(&self, raw: RawFrame) {
        self.metrics.record_received();
        record_frame_received(self.sensor_type);

        let Some(image) = raw.image.clone() else {
            debug!(sensor = %self.sensor_type, "Frame without image payload, dropping");
            self.metrics.record_dropped();
            record_frame_dropped(self.sensor_type, "no_image");
            return;
        };

        let timestamp = self.time_converter.to_absolute(raw.relative_ticks);
        let transforms = extract_transforms(&raw, timestamp, self.spatial.as_deref());
        let intrinsics = extract_intrinsics(self.sensor_type, &raw);

        let frame = SensorFrame::new(self.sensor_type, timestamp, image)
            .with_frame_to_origin(transforms.frame_to_origin)
            .with_camera_view_transform(transforms.camera_view)
            .with_camera_projection_transform(transforms.camera_projection)
            .with_intrinsics(intrinsics)
            .shared();

        if !frame.has_pose() {
            self.metrics.record_without_pose();
            record_pose_missing(self.sensor_type);
        }
        trace!(
            sensor = %self.sensor_type,
            timestamp = %timestamp,
            has_pose = frame.has_pose(),
            "Frame arrived"
        );

        if let Some(sink) = &self.sink {
            sink.send(SharedFrame::clone(&frame));
            self.metrics.record_forwarded();
        }

        *self.latest.lock().unwrap_or_else(PoisonError::into_inner) = Some(frame);
    }

    /// Most recent frame built by this context.
    pub fn latest_sensor_frame(&self) -> Option<SharedFrame> {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl std::fmt::Debug for MediaFrameReaderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaFrameReaderContext")
            .field("sensor_type", &self.sensor_type)
            .field("time_converter", &self.time_converter)
            .field("has_spatial", &self.spatial.is_some())
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}
