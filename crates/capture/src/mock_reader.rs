//! Mock frame reader
//!
//! Delivers synthetic raw frames from a background thread at a fixed rate.
//! Timestamps sit on a shared grid of frame periods so readers running at
//! the same rate produce matching timestamps, as hardware-synced sensors do.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use bytes::Bytes;
use contracts::{
    CoordinateSystemId, CoreIntrinsics, FrameArrivedCallback, ImageBuffer, MediaFormat,
    PixelFormat, RawFrame, SensorType, Transform, UnitPlaneMapper, TICKS_PER_SECOND,
};
use rand::Rng;
use tracing::{debug, trace};

use crate::device::FrameReader;
use crate::error::{CaptureError, Result};

/// Coordinate system a mock sensor reports its frames in.
pub fn mock_coordinate_system(sensor: SensorType) -> CoordinateSystemId {
    CoordinateSystemId(100 + sensor.index() as u64)
}

/// Shared mock clock.
#[derive(Debug, Clone, Copy)]
pub struct MockClock {
    epoch: Instant,
    boot_ticks: i64,
}

impl MockClock {
    pub fn new(boot_ticks: i64) -> Self {
        Self {
            epoch: Instant::now(),
            boot_ticks,
        }
    }

    pub fn now_ticks(&self) -> i64 {
        self.boot_ticks + (self.epoch.elapsed().as_nanos() / 100) as i64
    }
}

/// Per-reader settings.
#[derive(Debug, Clone)]
pub struct MockReaderConfig {
    pub frame_rate_hz: f64,
    /// Every Nth delivery has no image (0 = never)
    pub drop_image_every: u32,
    /// Uniform timestamp jitter, +/- ticks
    pub jitter_ticks: i64,
    /// Refuse to start
    pub fail_start: bool,
}

impl Default for MockReaderConfig {
    fn default() -> Self {
        Self {
            frame_rate_hz: 30.0,
            drop_image_every: 0,
            jitter_ticks: 0,
            fail_start: false,
        }
    }
}

/// Pinhole-style mapper for research-mode sensors.
#[derive(Debug, Clone, Copy)]
struct MockUnitPlaneMapper {
    focal: f32,
    center: [f32; 2],
}

impl UnitPlaneMapper for MockUnitPlaneMapper {
    fn map_image_point_to_unit_plane(&self, point: [f32; 2]) -> Option<[f32; 2]> {
        Some([
            (point[0] - self.center[0]) / self.focal,
            (point[1] - self.center[1]) / self.focal,
        ])
    }
}

/// Synthetic reader for one sensor.
pub struct MockFrameReader {
    sensor: SensorType,
    format: MediaFormat,
    config: MockReaderConfig,
    clock: MockClock,
    running: Arc<AtomicBool>,
    delivered: Arc<AtomicU64>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl MockFrameReader {
    pub fn new(
        sensor: SensorType,
        format: MediaFormat,
        config: MockReaderConfig,
        clock: MockClock,
    ) -> Self {
        Self {
            sensor,
            format,
            config,
            clock,
            running: Arc::new(AtomicBool::new(false)),
            delivered: Arc::new(AtomicU64::new(0)),
            worker: Mutex::new(None),
        }
    }

    pub fn sensor(&self) -> SensorType {
        self.sensor
    }

    /// Deliveries made so far, including ones without image.
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Image as the reader delivers it for `sensor`.
    ///
    /// Photo/video arrives converted to BGRA8; visible-light frames pack
    /// four grayscale columns per BGRA pixel.
    fn generate_image(sensor: SensorType, format: &MediaFormat, frame_index: u64) -> ImageBuffer {
        let (width, pixel_format) = match sensor {
            SensorType::PhotoVideo => (format.width, PixelFormat::Bgra8),
            s if s.is_visible_light() => (format.width / s.packed_width_multiplier(), PixelFormat::Bgra8),
            s if s.is_depth() => (format.width, PixelFormat::Gray16),
            _ => (format.width, PixelFormat::Gray8),
        };
        let len = width as usize * format.height as usize * pixel_format.pixel_stride() as usize;
        let seed = frame_index as u8;
        let data: Vec<u8> = (0..len).map(|i| (i as u8).wrapping_add(seed)).collect();
        ImageBuffer::new(width, format.height, pixel_format, Bytes::from(data))
            .unwrap_or_else(|_| ImageBuffer::blank(width, format.height, pixel_format))
    }

    fn frame_metadata(sensor: SensorType, format: &MediaFormat, raw: &mut RawFrame) {
        raw.coordinate_system = Some(mock_coordinate_system(sensor));
        match sensor {
            SensorType::PhotoVideo => {
                let focal = format.width as f32;
                raw.camera_view_transform = Some(Transform::identity());
                let mut projection = Transform::identity();
                projection[(0, 0)] = 2.0 * focal / format.width as f32;
                projection[(1, 1)] = 2.0 * focal / format.height as f32;
                raw.camera_projection_transform = Some(projection);
                raw.core_intrinsics = Some(CoreIntrinsics {
                    focal_length: [focal, focal],
                    principal_point: [format.width as f32 / 2.0, format.height as f32 / 2.0],
                    radial_distortion: [0.0; 3],
                    tangential_distortion: [0.0; 2],
                    image_width: format.width,
                    image_height: format.height,
                });
            }
            _ => {
                raw.sensor_intrinsics = Some(Arc::new(MockUnitPlaneMapper {
                    focal: format.width as f32 / 2.0,
                    center: [format.width as f32 / 2.0, format.height as f32 / 2.0],
                }));
            }
        }
    }
}

impl FrameReader for MockFrameReader {
    fn start(&self, callback: FrameArrivedCallback) -> Result<()> {
        if self.config.fail_start {
            return Err(CaptureError::reader_start(self.sensor, "DeviceNotAvailable"));
        }
        // Idempotent: if already running, don't start again
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let sensor = self.sensor;
        let format = self.format.clone();
        let config = self.config.clone();
        let clock = self.clock;
        let running = Arc::clone(&self.running);
        let delivered = Arc::clone(&self.delivered);
        let period_ticks = (TICKS_PER_SECOND as f64 / config.frame_rate_hz).round().max(1.0) as i64;

        let handle = thread::spawn(move || {
            let mut rng = rand::rng();
            let mut slot = clock.now_ticks() / period_ticks + 1;
            debug!(sensor = %sensor, frame_rate_hz = config.frame_rate_hz, "mock reader started");

            while running.load(Ordering::Relaxed) {
                let due = slot * period_ticks;
                let wait = due - clock.now_ticks();
                if wait > 0 {
                    thread::sleep(Duration::from_nanos(wait as u64 * 100));
                }

                let index = delivered.fetch_add(1, Ordering::Relaxed) + 1;
                let jitter = if config.jitter_ticks > 0 {
                    rng.random_range(-config.jitter_ticks..=config.jitter_ticks)
                } else {
                    0
                };
                let mut raw = RawFrame {
                    relative_ticks: due + jitter,
                    ..Default::default()
                };
                let recycled = config.drop_image_every > 0
                    && index % u64::from(config.drop_image_every) == 0;
                if !recycled {
                    raw.image = Some(Self::generate_image(sensor, &format, index));
                }
                Self::frame_metadata(sensor, &format, &mut raw);

                callback(raw);
                trace!(sensor = %sensor, slot, recycled, "mock frame delivered");

                slot += 1;
            }

            debug!(sensor = %sensor, "mock reader stopped");
        });

        *self.worker.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        Ok(())
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                debug!(sensor = %self.sensor, "mock reader thread panicked");
            }
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}

impl Drop for MockFrameReader {
    fn drop(&mut self) {
        self.stop();
    }
}
