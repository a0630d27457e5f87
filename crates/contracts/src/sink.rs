//! Sink contracts
//!
//! A sink accepts frames from reader contexts. The buffer, the recorder and
//! the streaming servers all implement [`SensorFrameSink`]; a
//! [`SensorFrameSinkGroup`] picks the sink for each sensor type.

use std::sync::Arc;

use crate::{ContractError, SensorType, SharedFrame};

/// Single-method frame consumer.
///
/// `send` is called from capture delivery threads and must never block on
/// I/O for long or await anything.
pub trait SensorFrameSink: Send + Sync {
    fn send(&self, frame: SharedFrame);
}

/// Per-sensor sink selection.
pub trait SensorFrameSinkGroup: Send + Sync {
    /// Sink for `sensor_type`, or `None` when frames of that sensor are not routed.
    fn sink_for(&self, sensor_type: SensorType) -> Option<Arc<dyn SensorFrameSink>>;
}

/// Start/stop for sinks that own external resources (sockets, files).
#[trait_variant::make(SinkLifecycle: Send)]
pub trait LocalSinkLifecycle {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Acquire resources and begin accepting frames.
    async fn start(&self) -> Result<(), ContractError>;

    /// Release resources. Frames sent afterwards are dropped.
    async fn stop(&self) -> Result<(), ContractError>;
}

impl<F> SensorFrameSink for F
where
    F: Fn(SharedFrame) + Send + Sync,
{
    fn send(&self, frame: SharedFrame) {
        self(frame)
    }
}
