//! Capture device abstraction
//!
//! The platform capture layer as seen by a source group: enumerate groups,
//! open one, configure its sources and create one frame reader per source.
//! Implemented by the mock device here and by platform bindings elsewhere.

use std::future::Future;

use contracts::{FrameArrivedCallback, FrameSourceInfo, MediaFormat, SourceGroupInfo};

use crate::error::Result;

/// Capture device trait
///
/// Long-running operations (initialization may prompt the user for
/// permission) are futures so they never block the calling thread.
pub trait CaptureDevice: Send + Sync {
    /// All source groups currently present
    fn find_source_groups(&self) -> impl Future<Output = Result<Vec<SourceGroupInfo>>> + Send;

    /// Open `group` for capture
    fn initialize(&mut self, group: &SourceGroupInfo) -> impl Future<Output = Result<()>> + Send;

    /// Sources of the initialized group
    fn frame_sources(&self) -> Vec<FrameSourceInfo>;

    /// Select the format a source delivers
    fn set_format(
        &self,
        source_id: &str,
        format: &MediaFormat,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Create a reader for a source
    ///
    /// `output_subtype` asks the platform to convert frames, e.g. to BGRA8.
    fn create_reader(
        &self,
        source_id: &str,
        output_subtype: Option<&str>,
    ) -> impl Future<Output = Result<Box<dyn FrameReader>>> + Send;

    /// The device's since-boot clock, in 100 ns ticks
    fn relative_now_ticks(&self) -> i64;

    /// Release the device
    ///
    /// Idempotent: releasing an uninitialized device is a no-op.
    fn release(&mut self) -> impl Future<Output = ()> + Send;
}

/// Frame reader of a single source
pub trait FrameReader: Send + Sync {
    /// Start delivering frames to `callback`
    ///
    /// # Errors
    /// The platform reported a non-success start status.
    fn start(&self, callback: FrameArrivedCallback) -> Result<()>;

    /// Stop delivering frames
    ///
    /// Blocks until an in-flight callback has returned; no callback runs
    /// after `stop` returns.
    fn stop(&self);

    fn is_running(&self) -> bool;
}
