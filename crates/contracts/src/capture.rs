//! Capture collaborator types
//!
//! What the platform capture layer hands the core: source descriptions used
//! during enumeration and format negotiation, and the raw per-frame delivery.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{CoordinateSystemId, CoreIntrinsics, ImageBuffer, Transform, UnitPlaneMapper};

/// Frame delivery callback, called from the reader's delivery thread.
pub type FrameArrivedCallback = Arc<dyn Fn(RawFrame) + Send + Sync>;

/// Kind of a frame source, which drives format negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Color,
    Depth,
    Infrared,
    Other,
}

/// One format a source can deliver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaFormat {
    /// Media subtype, e.g. "NV12", "D16", "L8".
    pub subtype: String,
    pub width: u32,
    pub height: u32,
    pub frame_rate: f32,
}

impl MediaFormat {
    pub fn new(subtype: impl Into<String>, width: u32, height: u32, frame_rate: f32) -> Self {
        Self {
            subtype: subtype.into(),
            width,
            height,
            frame_rate,
        }
    }
}

/// A capture source inside a source group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSourceInfo {
    pub id: String,
    pub kind: SourceKind,
    /// Opaque user-data attribute; research-mode sources store their
    /// UTF-16LE name here.
    #[serde(default)]
    pub user_data: Option<Vec<u8>>,
    pub formats: Vec<MediaFormat>,
}

impl FrameSourceInfo {
    pub fn new(id: impl Into<String>, kind: SourceKind, formats: Vec<MediaFormat>) -> Self {
        Self {
            id: id.into(),
            kind,
            user_data: None,
            formats,
        }
    }

    /// Attach a UTF-16LE encoded name as user data.
    pub fn with_user_data_name(mut self, name: &str) -> Self {
        let blob = name
            .encode_utf16()
            .chain(std::iter::once(0))
            .flat_map(u16::to_le_bytes)
            .collect();
        self.user_data = Some(blob);
        self
    }

    /// Decode the user-data blob as a NUL-terminated UTF-16LE string.
    pub fn user_data_name(&self) -> Option<String> {
        let blob = self.user_data.as_deref()?;
        if blob.len() % 2 != 0 {
            return None;
        }
        let units: Vec<u16> = blob
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .take_while(|unit| *unit != 0)
            .collect();
        String::from_utf16(&units).ok()
    }
}

/// A group of sources that can be captured together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceGroupInfo {
    pub id: String,
    pub display_name: String,
    pub sources: Vec<FrameSourceInfo>,
}

/// Raw frame as delivered by a frame reader.
///
/// Every metadata channel is independently optional.
#[derive(Clone, Default)]
pub struct RawFrame {
    /// Since-boot timestamp in 100 ns ticks.
    pub relative_ticks: i64,
    /// Decoded pixels; `None` when the platform recycled the buffer.
    pub image: Option<ImageBuffer>,
    pub coordinate_system: Option<CoordinateSystemId>,
    pub camera_view_transform: Option<Transform>,
    pub camera_projection_transform: Option<Transform>,
    pub sensor_intrinsics: Option<Arc<dyn UnitPlaneMapper>>,
    pub core_intrinsics: Option<CoreIntrinsics>,
}

impl fmt::Debug for RawFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawFrame")
            .field("relative_ticks", &self.relative_ticks)
            .field("image", &self.image)
            .field("coordinate_system", &self.coordinate_system)
            .field("has_view", &self.camera_view_transform.is_some())
            .field("has_projection", &self.camera_projection_transform.is_some())
            .field("has_sensor_intrinsics", &self.sensor_intrinsics.is_some())
            .field("core_intrinsics", &self.core_intrinsics)
            .finish()
    }
}
