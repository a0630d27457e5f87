//! SinkHandle - a frame writer behind an isolated queue and worker task

use std::sync::Arc;
use std::time::Instant;

use contracts::{SensorFrame, SensorFrameSink, SharedFrame};
use observability::{record_sink_frame, record_sink_write_ms};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, trace};

use crate::error::Result;
use crate::metrics::SinkMetrics;

/// Outcome of a single write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// Same timestamp as the previous frame; nothing written
    Duplicate,
}

/// Slow, fallible frame consumer driven by a [`SinkHandle`] worker.
#[trait_variant::make(FrameWriter: Send)]
pub trait LocalFrameWriter {
    fn name(&self) -> &str;

    async fn write(&mut self, frame: &SensorFrame) -> Result<WriteOutcome>;

    /// Flush buffered output once the queue is drained.
    async fn finish(&mut self) -> Result<()>;
}

/// Handle to a running writer worker
///
/// `send` never blocks: a frame that does not fit in the queue is dropped,
/// so a slow disk never stalls capture delivery.
pub struct SinkHandle<W> {
    name: String,
    tx: mpsc::Sender<SharedFrame>,
    metrics: Arc<SinkMetrics>,
    worker: JoinHandle<W>,
}

impl<W: FrameWriter + Send + 'static> SinkHandle<W> {
    /// Spawn the worker on the current tokio runtime.
    pub fn spawn(writer: W, queue_capacity: usize) -> Self {
        let name = writer.name().to_string();
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let metrics = Arc::new(SinkMetrics::new());

        let worker = tokio::spawn(sink_worker(writer, rx, Arc::clone(&metrics)));

        Self {
            name,
            tx,
            metrics,
            worker,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    /// Queue a frame; returns false if it was dropped.
    pub fn try_send(&self, frame: SharedFrame) -> bool {
        match self.tx.try_send(frame) {
            Ok(()) => {
                self.metrics
                    .set_queue_len(self.tx.max_capacity() - self.tx.capacity());
                true
            }
            Err(mpsc::error::TrySendError::Full(frame)) => {
                self.metrics.inc_dropped_count();
                debug!(
                    sink = %self.name,
                    timestamp = %frame.timestamp(),
                    "queue full, frame dropped"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                error!(sink = %self.name, "sink worker closed unexpectedly");
                false
            }
        }
    }

    /// Drain the queue, finish the writer and hand it back.
    ///
    /// Returns `None` if the worker panicked.
    #[instrument(name = "sink_handle_shutdown", skip(self), fields(sink = %self.name))]
    pub async fn shutdown(self) -> Option<W> {
        drop(self.tx);
        match self.worker.await {
            Ok(writer) => {
                debug!("sink handle shutdown complete");
                Some(writer)
            }
            Err(e) => {
                error!(error = ?e, "sink worker panicked");
                None
            }
        }
    }
}

impl<W: FrameWriter + Send + 'static> SensorFrameSink for SinkHandle<W> {
    fn send(&self, frame: SharedFrame) {
        self.try_send(frame);
    }
}

async fn sink_worker<W: FrameWriter + Send>(
    mut writer: W,
    mut rx: mpsc::Receiver<SharedFrame>,
    metrics: Arc<SinkMetrics>,
) -> W {
    let name = writer.name().to_string();
    debug!(sink = %name, "sink worker started");

    while let Some(frame) = rx.recv().await {
        metrics.set_queue_len(rx.len());

        let started = Instant::now();
        match writer.write(&frame).await {
            Ok(WriteOutcome::Written) => {
                metrics.inc_write_count();
                record_sink_frame(&name, true);
                record_sink_write_ms(&name, started.elapsed().as_secs_f64() * 1000.0);
            }
            Ok(WriteOutcome::Duplicate) => {
                metrics.inc_duplicate_count();
                trace!(sink = %name, timestamp = %frame.timestamp(), "duplicate frame skipped");
            }
            Err(e) => {
                // keep going, the next frame may succeed
                metrics.inc_failure_count();
                record_sink_frame(&name, false);
                error!(
                    sink = %name,
                    timestamp = %frame.timestamp(),
                    error = %e,
                    "write failed"
                );
            }
        }
    }

    if let Err(e) = writer.finish().await {
        error!(sink = %name, error = %e, "finish failed on shutdown");
    }
    debug!(sink = %name, "sink worker stopped");
    writer
}
