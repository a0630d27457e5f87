//! SensorFrameStreamer - a streaming server per enabled sensor

use std::sync::Arc;

use contracts::{
    ContractError, SensorFrameSink, SensorFrameSinkGroup, SensorTable, SensorType,
    SinkLifecycle, StreamingConfig,
};
use tracing::{info, instrument};

use super::server::SensorFrameStreamingServer;
use crate::error::Result;

/// One [`SensorFrameStreamingServer`] per enabled sensor.
pub struct SensorFrameStreamer {
    bind_host: String,
    servers: SensorTable<Option<Arc<SensorFrameStreamingServer>>>,
}

impl SensorFrameStreamer {
    pub fn new(bind_host: impl Into<String>) -> Self {
        Self {
            bind_host: bind_host.into(),
            servers: SensorTable::default(),
        }
    }

    /// Streamer for the sensors of `config`, or `fallback` when it names none.
    pub fn from_config(config: &StreamingConfig, fallback: &[SensorType]) -> Self {
        let mut streamer = Self::new(&config.bind_host);
        let sensors = if config.sensors.is_empty() {
            fallback
        } else {
            &config.sensors
        };
        for &sensor in sensors {
            streamer.enable_with_port(sensor, config.port_for(sensor));
        }
        streamer
    }

    /// Serve `sensor` on its default port.
    pub fn enable(&mut self, sensor: SensorType) {
        self.enable_with_port(sensor, sensor.default_streaming_port());
    }

    /// Serve `sensor` on `port` (0 picks a free port).
    pub fn enable_with_port(&mut self, sensor: SensorType, port: u16) {
        let addr = format!("{}:{port}", self.bind_host);
        self.servers[sensor] = Some(Arc::new(SensorFrameStreamingServer::new(sensor, addr)));
    }

    pub fn enable_all(&mut self) {
        for sensor in SensorType::ALL {
            self.enable(sensor);
        }
    }

    pub fn server(&self, sensor: SensorType) -> Option<&Arc<SensorFrameStreamingServer>> {
        self.servers[sensor].as_ref()
    }

    pub fn enabled_sensors(&self) -> Vec<SensorType> {
        self.servers
            .iter()
            .filter(|(_, server)| server.is_some())
            .map(|(sensor, _)| sensor)
            .collect()
    }

    /// Start every server; stops the ones already started if one fails.
    #[instrument(name = "streamer_start", skip(self))]
    pub async fn listen_all(&self) -> Result<()> {
        let mut started: Vec<&Arc<SensorFrameStreamingServer>> = Vec::new();
        for server in self.servers.values().flatten() {
            match server.listen().await {
                Ok(addr) => {
                    info!(sensor = %server.sensor(), %addr, "streaming enabled");
                    started.push(server);
                }
                Err(e) => {
                    for server in started {
                        server.shutdown();
                    }
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    pub fn shutdown_all(&self) {
        for server in self.servers.values().flatten() {
            server.shutdown();
        }
    }
}

impl SensorFrameSinkGroup for SensorFrameStreamer {
    fn sink_for(&self, sensor_type: SensorType) -> Option<Arc<dyn SensorFrameSink>> {
        self.servers[sensor_type]
            .as_ref()
            .map(|server| Arc::clone(server) as Arc<dyn SensorFrameSink>)
    }
}

impl SinkLifecycle for SensorFrameStreamer {
    fn name(&self) -> &str {
        "streamer"
    }

    async fn start(&self) -> std::result::Result<(), ContractError> {
        self.listen_all().await?;
        Ok(())
    }

    async fn stop(&self) -> std::result::Result<(), ContractError> {
        self.shutdown_all();
        Ok(())
    }
}
