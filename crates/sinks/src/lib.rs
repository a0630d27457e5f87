//! # Sinks
//!
//! Consumers of sensor frames.
//!
//! - [`SinkRouter`]: routes each sensor's frames to any number of sinks
//! - [`SensorFrameStreamer`]: one TCP server per sensor
//! - [`SensorFrameRecorder`]: per-sensor image files plus CSV indexes
//!
//! Slow consumers sit behind a [`SinkHandle`] so they never block the
//! capture callback.

pub mod error;
pub mod handle;
pub mod metrics;
pub mod recording;
pub mod router;
pub mod streaming;

pub use error::{Result, SinkError};
pub use handle::{FrameWriter, LocalFrameWriter, SinkHandle, WriteOutcome};
pub use metrics::{SinkMetrics, SinkMetricsSnapshot};
pub use recording::{RecorderWriter, RecordingSummary, SensorFrameRecorder, SensorFrameRecorderSink};
pub use router::SinkRouter;
pub use streaming::{
    SensorFrameReceiver, SensorFrameStreamer, SensorFrameStreamingServer, MAX_PAYLOAD_LEN,
};
