//! SensorFrameStreamingServer - one sensor's frames over TCP

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use bytes::BytesMut;
use contracts::{
    ContractError, SensorFrameSink, SensorFrameStreamHeader, SensorType, SharedFrame,
    SinkLifecycle, STREAM_HEADER_LEN,
};
use observability::{record_frame_dropped, record_sink_frame};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, trace, warn};

use crate::error::{Result, SinkError};
use crate::metrics::SinkMetrics;

/// Serves the frames of one sensor to a single TCP client.
///
/// A newer connection replaces the current one. `send` drops the frame when
/// no client is connected or the previous frame is still being written; a
/// failed write disconnects the client.
pub struct SensorFrameStreamingServer {
    name: String,
    sensor: SensorType,
    bind_addr: String,
    shared: Arc<Shared>,
    accept_task: Mutex<Option<JoinHandle<()>>>,
    local_addr: Mutex<Option<SocketAddr>>,
}

struct Shared {
    connection: Mutex<Option<Connection>>,
    next_connection_id: AtomicU64,
    write_in_progress: AtomicBool,
    metrics: SinkMetrics,
}

struct Connection {
    id: u64,
    tx: mpsc::Sender<SharedFrame>,
}

impl Shared {
    fn connection(&self) -> std::sync::MutexGuard<'_, Option<Connection>> {
        self.connection.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drop the connection `id` unless a newer client already replaced it.
    fn disconnect(&self, id: u64) {
        let mut connection = self.connection();
        if connection.as_ref().is_some_and(|c| c.id == id) {
            *connection = None;
        }
    }
}

impl SensorFrameStreamingServer {
    pub fn new(sensor: SensorType, bind_addr: impl Into<String>) -> Self {
        Self {
            name: format!("stream_{}", sensor.recording_name()),
            sensor,
            bind_addr: bind_addr.into(),
            shared: Arc::new(Shared {
                connection: Mutex::new(None),
                next_connection_id: AtomicU64::new(1),
                write_in_progress: AtomicBool::new(false),
                metrics: SinkMetrics::new(),
            }),
            accept_task: Mutex::new(None),
            local_addr: Mutex::new(None),
        }
    }

    pub fn sensor(&self) -> SensorType {
        self.sensor
    }

    /// Bound address, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_connected(&self) -> bool {
        self.shared.connection().is_some()
    }

    pub fn metrics(&self) -> &SinkMetrics {
        &self.shared.metrics
    }

    /// Bind the listener and start accepting clients.
    ///
    /// Starting a started server is a no-op.
    #[instrument(name = "streaming_server_listen", skip(self), fields(sensor = %self.sensor, addr = %self.bind_addr))]
    pub async fn listen(&self) -> Result<SocketAddr> {
        if let Some(addr) = self.local_addr() {
            return Ok(addr);
        }

        let listener = TcpListener::bind(&self.bind_addr)
            .await
            .map_err(|e| SinkError::bind(&self.bind_addr, e))?;
        let addr = listener.local_addr()?;
        info!(%addr, "streaming server listening");

        let task = tokio::spawn(accept_loop(
            listener,
            Arc::clone(&self.shared),
            self.sensor,
        ));
        *self.accept_task.lock().unwrap_or_else(PoisonError::into_inner) = Some(task);
        *self.local_addr.lock().unwrap_or_else(PoisonError::into_inner) = Some(addr);
        Ok(addr)
    }

    /// Close the listener and the current client.
    #[instrument(name = "streaming_server_shutdown", skip(self), fields(sensor = %self.sensor))]
    pub fn shutdown(&self) {
        if let Some(task) = self
            .accept_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
        // dropping the sender ends the writer task
        *self.shared.connection() = None;
        *self.local_addr.lock().unwrap_or_else(PoisonError::into_inner) = None;
        debug!("streaming server shut down");
    }

    fn drop_frame(&self, reason: &'static str) {
        self.shared.metrics.inc_dropped_count();
        record_frame_dropped(self.sensor, reason);
    }
}

impl SensorFrameSink for SensorFrameStreamingServer {
    fn send(&self, frame: SharedFrame) {
        let connection = self.shared.connection();
        let Some(connection) = connection.as_ref() else {
            trace!(sensor = %self.sensor, "frame dropped, no connection");
            self.drop_frame("no_client");
            return;
        };
        if self.shared.write_in_progress.swap(true, Ordering::AcqRel) {
            debug!(sensor = %self.sensor, "frame dropped, previous write in progress");
            self.drop_frame("busy");
            return;
        }
        if connection.tx.try_send(frame).is_err() {
            self.shared.write_in_progress.store(false, Ordering::Release);
            self.drop_frame("busy");
        }
    }
}

impl SinkLifecycle for SensorFrameStreamingServer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&self) -> std::result::Result<(), ContractError> {
        self.listen().await?;
        Ok(())
    }

    async fn stop(&self) -> std::result::Result<(), ContractError> {
        self.shutdown();
        Ok(())
    }
}

impl Drop for SensorFrameStreamingServer {
    fn drop(&mut self) {
        if let Some(task) = self
            .accept_task
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
    }
}

async fn accept_loop(listener: TcpListener, shared: Arc<Shared>, sensor: SensorType) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(sensor = %sensor, error = %e, "accept failed");
                continue;
            }
        };
        if let Err(e) = stream.set_nodelay(true) {
            debug!(sensor = %sensor, error = %e, "set_nodelay failed");
        }

        let id = shared.next_connection_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(1);
        *shared.connection() = Some(Connection { id, tx });
        shared.write_in_progress.store(false, Ordering::Release);
        info!(sensor = %sensor, %peer, "client connected");

        tokio::spawn(write_loop(stream, rx, Arc::clone(&shared), sensor, id));
    }
}

async fn write_loop(
    mut stream: TcpStream,
    mut rx: mpsc::Receiver<SharedFrame>,
    shared: Arc<Shared>,
    sensor: SensorType,
    id: u64,
) {
    let name = format!("stream_{}", sensor.recording_name());
    let mut buf = BytesMut::with_capacity(STREAM_HEADER_LEN);

    while let Some(frame) = rx.recv().await {
        buf.clear();
        SensorFrameStreamHeader::for_frame(&frame).encode(&mut buf);

        let result = async {
            stream.write_all(&buf).await?;
            stream.write_all(frame.image().data()).await?;
            stream.flush().await
        }
        .await;

        match result {
            Ok(()) => {
                shared.metrics.inc_write_count();
                record_sink_frame(&name, true);
                shared.write_in_progress.store(false, Ordering::Release);
            }
            Err(e) => {
                shared.metrics.inc_failure_count();
                record_sink_frame(&name, false);
                warn!(sensor = %sensor, error = %e, "write failed, dropping client");
                shared.disconnect(id);
                shared.write_in_progress.store(false, Ordering::Release);
                break;
            }
        }
    }
    debug!(sensor = %sensor, connection = id, "writer stopped");
}
