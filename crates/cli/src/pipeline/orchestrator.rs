//! Session orchestrator - wires capture, buffer and sinks together.
//!
//! Runs against the mock capture device: every configured source group gets
//! its own device, all of them deliver into one [`SinkRouter`] that fans
//! frames out to the pair buffer, the streamer and the recorder.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use capture::{
    mock_rig_spatial_perception, MediaFrameSourceGroup, MockCaptureDevice, MockDeviceConfig,
};
use contracts::{
    AppConfig, SensorFrameSink, SensorFrameSinkGroup, SensorType, SpatialPerception,
};
use frame_sync::{MultiFrameBuffer, PairPoller};
use observability::record_pair_offset_ms;
use sinks::{SensorFrameRecorder, SensorFrameStreamer, SinkRouter};
use tracing::{debug, info, warn};

use super::SessionStats;
use crate::error::CliError;

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub app: AppConfig,

    /// Stop after this many synced pairs (None = unlimited)
    pub max_pairs: Option<u64>,

    /// Session timeout (None = no timeout)
    pub timeout: Option<Duration>,
}

/// Sinks that outlive a single source group.
struct Outputs {
    buffer: Arc<MultiFrameBuffer>,
    streamer: Option<Arc<SensorFrameStreamer>>,
    recorder: Option<Arc<SensorFrameRecorder>>,
}

/// Capture session
pub struct Session {
    config: SessionConfig,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    /// Run until `shutdown` resolves, the timeout expires or enough pairs
    /// were produced; then stop capture and flush every sink.
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<SessionStats> {
        let start_time = Instant::now();
        let app = &self.config.app;
        let captured = app.captured_sensors();

        if let Some(port) = app.observability.metrics_port {
            observability::init_metrics_only(port)?;
            info!(port, "Metrics endpoint available");
        }

        let outputs = self.start_outputs(&captured).await?;
        let router = build_router(&captured, &outputs);

        let spatial = Arc::new(mock_rig_spatial_perception());
        if app.mock.tracking_lost {
            warn!("Positional tracking reported as lost, frames carry no pose");
            spatial.set_tracking(false);
        }

        let mut groups = Vec::new();
        for group_config in &app.capture.groups {
            let device = MockCaptureDevice::with_config(MockDeviceConfig::from(&app.mock));
            let mut group = MediaFrameSourceGroup::new(
                group_config.kind,
                device,
                Some(spatial.clone() as Arc<dyn SpatialPerception>),
                Some(router.clone() as Arc<dyn SensorFrameSinkGroup>),
            );
            for &sensor in group_config.enabled_sensors() {
                group.enable(sensor);
            }

            match group.start().await {
                Ok(report) => {
                    for (source, reason) in &report.skipped {
                        debug!(kind = ?group_config.kind, source = %source, reason = %reason, "Source skipped");
                    }
                    info!(
                        kind = ?group_config.kind,
                        started = ?report.started,
                        skipped = report.skipped.len(),
                        "Source group running"
                    );
                    groups.push(group);
                }
                Err(e) => {
                    for group in &mut groups {
                        group.stop().await;
                    }
                    stop_outputs(&outputs).await;
                    return Err(CliError::session_start(
                        format!("{:?} source group", group_config.kind),
                        e,
                    )
                    .into());
                }
            }
        }

        let mut stats = SessionStats {
            active_sensors: groups.iter().map(|g| g.active_sensors().len()).sum(),
            ..Default::default()
        };

        let poll_loop = poll_pairs(
            &outputs.buffer,
            app,
            self.config.max_pairs,
            &mut stats,
        );
        let timeout = async {
            match self.config.timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            _ = poll_loop => {}
            _ = timeout => {
                info!("Session timeout reached");
            }
            _ = shutdown => {
                warn!("Received shutdown signal, stopping session...");
            }
        }

        info!("Shutting down session...");
        for group in &mut groups {
            for sensor in group.active_sensors() {
                if let Some(snapshot) = group.reader_metrics(sensor) {
                    stats.readers.push((sensor, snapshot));
                }
            }
            group.stop().await;
        }
        stats.buffer = outputs.buffer.stats();
        stats.recording = stop_outputs(&outputs).await;
        stats.duration = start_time.elapsed();

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            pairs = stats.pairs.total_pairs(),
            "Session shutdown complete"
        );
        Ok(stats)
    }

    async fn start_outputs(&self, captured: &[SensorType]) -> Result<Outputs> {
        let app = &self.config.app;
        let buffer = Arc::new(MultiFrameBuffer::with_capacity(app.buffer.capacity));

        let streamer = match &app.streaming {
            Some(config) => {
                let streamer = Arc::new(SensorFrameStreamer::from_config(config, captured));
                streamer
                    .listen_all()
                    .await
                    .map_err(|e| CliError::session_start("streaming servers", e))?;
                info!(sensors = ?streamer.enabled_sensors(), "Streaming enabled");
                Some(streamer)
            }
            None => None,
        };

        let recorder = match &app.recording {
            Some(config) => {
                let recorder = Arc::new(SensorFrameRecorder::from_config(config, captured));
                match recorder.start_recording().await {
                    Ok(folder) => info!(folder = %folder.display(), "Recording enabled"),
                    Err(e) => {
                        if let Some(streamer) = &streamer {
                            streamer.shutdown_all();
                        }
                        return Err(CliError::session_start("recording", e).into());
                    }
                }
                Some(recorder)
            }
            None => None,
        };

        Ok(Outputs {
            buffer,
            streamer,
            recorder,
        })
    }
}

fn build_router(captured: &[SensorType], outputs: &Outputs) -> Arc<SinkRouter> {
    let mut router = SinkRouter::new();
    router.route_all(
        captured.iter().copied(),
        outputs.buffer.clone() as Arc<dyn SensorFrameSink>,
    );
    if let Some(streamer) = &outputs.streamer {
        router.route_group(captured.iter().copied(), streamer.as_ref());
    }
    if let Some(recorder) = &outputs.recorder {
        router.route_group(captured.iter().copied(), recorder.as_ref());
    }
    router.build()
}

/// Stop streaming and finish the recording, returning its folder.
async fn stop_outputs(outputs: &Outputs) -> Option<sinks::RecordingSummary> {
    if let Some(streamer) = &outputs.streamer {
        streamer.shutdown_all();
    }
    let recorder = outputs.recorder.as_ref()?;
    match recorder.stop_recording().await {
        Ok(summary) => summary,
        Err(e) => {
            warn!(error = %e, "Failed to finish recording");
            None
        }
    }
}

async fn poll_pairs(
    buffer: &MultiFrameBuffer,
    app: &AppConfig,
    max_pairs: Option<u64>,
    stats: &mut SessionStats,
) {
    let mut pollers: Vec<PairPoller> = app
        .buffer
        .pairs
        .iter()
        .map(|&pair| PairPoller::from_pair(pair, app.buffer.pair_tolerance_secs))
        .collect();
    if pollers.is_empty() {
        info!("No sensor pairs configured, capturing only");
        return std::future::pending().await;
    }

    let mut interval = tokio::time::interval(Duration::from_millis(app.buffer.poll_interval_ms));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        interval.tick().await;
        for poller in &mut pollers {
            let Some(pair) = poller.poll(buffer) else {
                continue;
            };
            let (a, b) = poller.sensors();
            let offset_ms = pair.a.timestamp().seconds_since(pair.b.timestamp()) * 1000.0;
            record_pair_offset_ms(a, b, offset_ms);
            stats.pairs.update(a, b, offset_ms);
            debug!(
                a = %a,
                b = %b,
                timestamp = %pair.timestamp,
                offset_ms = format!("{offset_ms:.3}"),
                "Synced pair"
            );

            if let Some(max) = max_pairs {
                if stats.pairs.total_pairs() >= max {
                    info!(pairs = max, "Reached max pairs limit");
                    return;
                }
            }
        }
    }
}
