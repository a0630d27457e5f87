//! SensorFrame - reader context output
//!
//! An immutable, timestamped sensor sample with its pose and intrinsics.
//! Frames are shared as [`SharedFrame`]: the buffer and any number of
//! consumers hold references, and a consumer's reference stays valid after
//! the buffer has evicted its own.

use std::sync::Arc;

use bytes::Bytes;
use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};

use crate::{CameraIntrinsics, ContractError, SensorType, Timestamp};

/// 4x4 transform, indexed `(row, col)`.
///
/// Storage is column-major: `as_slice()` yields columns, not rows.
pub type Transform = Matrix4<f32>;

/// Shared, immutable frame handle.
pub type SharedFrame = Arc<SensorFrame>;

/// The all-zero matrix used to mark "no pose".
pub fn zero_transform() -> Transform {
    Transform::zeros()
}

/// True when every one of the 16 entries is exactly zero.
pub fn is_zero_transform(transform: &Transform) -> bool {
    transform.iter().all(|v| *v == 0.0)
}

/// Pixel layout of an image payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    Bgra8,
    Gray16,
    Gray8,
}

impl PixelFormat {
    /// Bytes per pixel.
    pub const fn pixel_stride(self) -> u32 {
        match self {
            PixelFormat::Bgra8 => 4,
            PixelFormat::Gray16 => 2,
            PixelFormat::Gray8 => 1,
        }
    }

    /// Largest sample value, as written into PGM headers.
    pub const fn max_value(self) -> u32 {
        match self {
            PixelFormat::Gray16 => 65535,
            PixelFormat::Bgra8 | PixelFormat::Gray8 => 255,
        }
    }
}

/// Owned pixel buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBuffer {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Bytes,
}

impl ImageBuffer {
    /// Wrap a tightly packed payload.
    ///
    /// # Errors
    /// Fails when the payload length is not `height * row_stride`.
    pub fn new(
        width: u32,
        height: u32,
        format: PixelFormat,
        data: impl Into<Bytes>,
    ) -> Result<Self, ContractError> {
        let data = data.into();
        let expected = height as usize * width as usize * format.pixel_stride() as usize;
        if data.len() != expected {
            return Err(ContractError::invalid_image(format!(
                "{width}x{height} {format:?} needs {expected} bytes, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            format,
            data,
        })
    }

    /// Zero-filled image.
    pub fn blank(width: u32, height: u32, format: PixelFormat) -> Self {
        let len = height as usize * width as usize * format.pixel_stride() as usize;
        Self {
            width,
            height,
            format,
            data: Bytes::from(vec![0u8; len]),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn pixel_stride(&self) -> u32 {
        self.format.pixel_stride()
    }

    pub fn row_stride(&self) -> u32 {
        self.width * self.format.pixel_stride()
    }

    /// Raw payload (zero-copy clone).
    pub fn data(&self) -> &Bytes {
        &self.data
    }
}

/// Timestamped sensor sample.
///
/// Transforms that could not be obtained are the all-zero matrix, never
/// left unset.
#[derive(Debug, Clone)]
pub struct SensorFrame {
    sensor_type: SensorType,
    timestamp: Timestamp,
    image: ImageBuffer,
    frame_to_origin: Transform,
    camera_view_transform: Transform,
    camera_projection_transform: Transform,
    intrinsics: Option<CameraIntrinsics>,
}

impl SensorFrame {
    /// Frame with zero transforms and no intrinsics.
    pub fn new(sensor_type: SensorType, timestamp: Timestamp, image: ImageBuffer) -> Self {
        Self {
            sensor_type,
            timestamp,
            image,
            frame_to_origin: zero_transform(),
            camera_view_transform: zero_transform(),
            camera_projection_transform: zero_transform(),
            intrinsics: None,
        }
    }

    pub fn with_frame_to_origin(mut self, transform: Transform) -> Self {
        self.frame_to_origin = transform;
        self
    }

    pub fn with_camera_view_transform(mut self, transform: Transform) -> Self {
        self.camera_view_transform = transform;
        self
    }

    pub fn with_camera_projection_transform(mut self, transform: Transform) -> Self {
        self.camera_projection_transform = transform;
        self
    }

    pub fn with_intrinsics(mut self, intrinsics: Option<CameraIntrinsics>) -> Self {
        self.intrinsics = intrinsics;
        self
    }

    /// Freeze into a shared handle.
    pub fn shared(self) -> SharedFrame {
        Arc::new(self)
    }

    pub fn sensor_type(&self) -> SensorType {
        self.sensor_type
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn image(&self) -> &ImageBuffer {
        &self.image
    }

    pub fn frame_to_origin(&self) -> &Transform {
        &self.frame_to_origin
    }

    pub fn camera_view_transform(&self) -> &Transform {
        &self.camera_view_transform
    }

    pub fn camera_projection_transform(&self) -> &Transform {
        &self.camera_projection_transform
    }

    pub fn intrinsics(&self) -> Option<&CameraIntrinsics> {
        self.intrinsics.as_ref()
    }

    /// False when the origin transform is the zero sentinel.
    pub fn has_pose(&self) -> bool {
        !is_zero_transform(&self.frame_to_origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_indexing_is_row_col_over_column_storage() {
        let mut transform = Transform::identity();
        transform[(0, 3)] = 5.0;
        // translation sits in the last column, stored after the first three
        assert_eq!(transform.as_slice()[12], 5.0);
        assert_eq!(transform.row(0)[3], 5.0);
    }

    #[test]
    fn test_image_rejects_bad_length() {
        let err = ImageBuffer::new(4, 2, PixelFormat::Gray16, vec![0u8; 15]).unwrap_err();
        assert!(matches!(err, ContractError::InvalidImage { .. }));
        let ok = ImageBuffer::new(4, 2, PixelFormat::Gray16, vec![0u8; 16]).unwrap();
        assert_eq!(ok.row_stride(), 8);
    }

    #[test]
    fn test_new_frame_has_no_pose() {
        let frame = SensorFrame::new(
            SensorType::ShortThrowToFDepth,
            Timestamp::from_ticks(1),
            ImageBuffer::blank(2, 2, PixelFormat::Gray16),
        );
        assert!(!frame.has_pose());
        assert!(is_zero_transform(frame.camera_view_transform()));
        assert!(is_zero_transform(frame.camera_projection_transform()));

        let posed = frame.with_frame_to_origin(Transform::identity());
        assert!(posed.has_pose());
        assert_eq!(posed.frame_to_origin()[(3, 3)], 1.0);
    }

    #[test]
    fn test_shared_frame_outlives_original_owner() {
        let frame = SensorFrame::new(
            SensorType::PhotoVideo,
            Timestamp::from_ticks(5),
            ImageBuffer::blank(1, 1, PixelFormat::Bgra8),
        )
        .shared();
        let held = Arc::clone(&frame);
        drop(frame);
        assert_eq!(held.timestamp().ticks(), 5);
    }
}
