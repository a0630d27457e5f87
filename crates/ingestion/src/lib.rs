//! # Ingestion
//!
//! Turns raw capture deliveries into shared [`contracts::SensorFrame`]s.
//!
//! Responsibilities:
//! - Convert since-boot reader timestamps into the universal clock
//! - Attach frame-to-origin, camera view and projection transforms,
//!   zero-filling any that are unavailable
//! - Attach sensor or generic intrinsics
//! - Forward to the configured sink and cache the latest frame
//!
//! ## Usage
//!
//! ```ignore
//! use ingestion::{MediaFrameReaderContext, TimeConverter};
//!
//! let context = Arc::new(MediaFrameReaderContext::new(
//!     SensorType::ShortThrowToFDepth,
//!     TimeConverter::calibrate(device.relative_now()),
//!     Some(spatial),
//!     Some(buffer),
//! ));
//! reader.start(context.callback())?;
//! ```

mod extract;
mod metrics;
mod reader_context;
mod spatial;
mod time;

// Re-exports
pub use extract::{extract_intrinsics, extract_transforms, FrameTransforms, TransformSlot};
pub use metrics::{MetricsSnapshot, ReaderMetrics};
pub use reader_context::MediaFrameReaderContext;
pub use spatial::StaticSpatialPerception;
pub use time::TimeConverter;
