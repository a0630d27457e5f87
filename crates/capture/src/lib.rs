//! # Capture
//!
//! Source group lifecycle on top of an abstract capture device.
//!
//! Responsibilities:
//! - Select the photo/video or research-mode source group
//! - Match sources to sensors and negotiate a format per source kind
//! - Start one reader per enabled sensor, isolating per-source failures
//! - Two-phase stop: readers first, then the device
//! - Provide a mock device for tests and hardware-free runs
//!
//! ## Usage
//!
//! ```ignore
//! let mut group = MediaFrameSourceGroup::new(
//!     SourceGroupKind::ResearchMode,
//!     MockCaptureDevice::new(),
//!     Some(spatial),
//!     Some(router),
//! );
//! group.enable_all();
//! let report = group.start().await?;
//! // ...
//! group.stop().await;
//! ```

pub mod device;
pub mod error;
pub mod matching;
pub mod mock_device;
pub mod mock_reader;
pub mod negotiation;
pub mod source_group;

pub use device::{CaptureDevice, FrameReader};
pub use error::{CaptureError, Result};
pub use matching::{select_source_group, sensor_type_for_source, PHOTO_VIDEO_GROUP_NAME};
pub use mock_device::{
    hololens_source_groups, mock_rig_spatial_perception, MockCaptureDevice, MockDeviceConfig,
};
pub use mock_reader::{mock_coordinate_system, MockClock, MockFrameReader, MockReaderConfig};
pub use negotiation::{negotiate_format, FormatChoice};
pub use source_group::{MediaFrameSourceGroup, SourceGroupState, StartReport};
