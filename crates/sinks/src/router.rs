//! Per-sensor fan-out.

use std::sync::Arc;

use contracts::{SensorFrameSink, SensorFrameSinkGroup, SensorTable, SensorType, SharedFrame};

/// Routes each sensor's frames to every sink registered for it.
///
/// Built once before capture starts; the routes are immutable afterwards.
#[derive(Default)]
pub struct SinkRouter {
    routes: SensorTable<Vec<Arc<dyn SensorFrameSink>>>,
}

impl SinkRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route frames of `sensor` to `sink`.
    pub fn route(&mut self, sensor: SensorType, sink: Arc<dyn SensorFrameSink>) -> &mut Self {
        self.routes[sensor].push(sink);
        self
    }

    /// Route frames of every sensor in `sensors` to `sink`.
    pub fn route_all(
        &mut self,
        sensors: impl IntoIterator<Item = SensorType>,
        sink: Arc<dyn SensorFrameSink>,
    ) -> &mut Self {
        for sensor in sensors {
            self.route(sensor, Arc::clone(&sink));
        }
        self
    }

    /// Route each sensor to whatever `group` provides for it.
    pub fn route_group(
        &mut self,
        sensors: impl IntoIterator<Item = SensorType>,
        group: &dyn SensorFrameSinkGroup,
    ) -> &mut Self {
        for sensor in sensors {
            if let Some(sink) = group.sink_for(sensor) {
                self.route(sensor, sink);
            }
        }
        self
    }

    pub fn route_count(&self, sensor: SensorType) -> usize {
        self.routes[sensor].len()
    }

    pub fn build(self) -> Arc<Self> {
        Arc::new(self)
    }
}

struct FanOut(Vec<Arc<dyn SensorFrameSink>>);

impl SensorFrameSink for FanOut {
    fn send(&self, frame: SharedFrame) {
        for sink in &self.0 {
            sink.send(SharedFrame::clone(&frame));
        }
    }
}

impl SensorFrameSinkGroup for SinkRouter {
    fn sink_for(&self, sensor_type: SensorType) -> Option<Arc<dyn SensorFrameSink>> {
        match self.routes[sensor_type].as_slice() {
            [] => None,
            [single] => Some(Arc::clone(single)),
            many => Some(Arc::new(FanOut(many.to_vec()))),
        }
    }
}
