//! Frame metadata extraction.
//!
//! Each transform channel is an independent step: try to extract it, and
//! fall back to the all-zero matrix when the channel is absent or cannot be
//! resolved. One channel failing never affects another.

use contracts::{
    zero_transform, CameraIntrinsics, RawFrame, SensorIntrinsics, SensorType, SpatialPerception,
    Timestamp, Transform,
};

/// A transform-carrying metadata channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformSlot {
    /// Frame coordinate system resolved against the spatial origin
    FrameToOrigin,
    /// Raw camera view transform
    CameraView,
    /// Raw camera projection transform
    CameraProjection,
}

impl TransformSlot {
    /// Extraction order.
    pub const ALL: [TransformSlot; 3] = [
        TransformSlot::FrameToOrigin,
        TransformSlot::CameraView,
        TransformSlot::CameraProjection,
    ];

    fn try_extract(
        self,
        raw: &RawFrame,
        at: Timestamp,
        spatial: Option<&dyn SpatialPerception>,
    ) -> Option<Transform> {
        match self {
            TransformSlot::FrameToOrigin => {
                let spatial = spatial?;
                let frame_system = raw.coordinate_system?;
                spatial.try_transform(frame_system, spatial.origin(), at)
            }
            TransformSlot::CameraView => raw.camera_view_transform,
            TransformSlot::CameraProjection => raw.camera_projection_transform,
        }
    }
}

/// The three transforms of a frame, zero-filled where unavailable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTransforms {
    pub frame_to_origin: Transform,
    pub camera_view: Transform,
    pub camera_projection: Transform,
}

impl Default for FrameTransforms {
    fn default() -> Self {
        Self {
            frame_to_origin: zero_transform(),
            camera_view: zero_transform(),
            camera_projection: zero_transform(),
        }
    }
}

impl FrameTransforms {
    fn slot_mut(&mut self, slot: TransformSlot) -> &mut Transform {
        match slot {
            TransformSlot::FrameToOrigin => &mut self.frame_to_origin,
            TransformSlot::CameraView => &mut self.camera_view,
            TransformSlot::CameraProjection => &mut self.camera_projection,
        }
    }
}

/// Run every [`TransformSlot`] against `raw`.
pub fn extract_transforms(
    raw: &RawFrame,
    at: Timestamp,
    spatial: Option<&dyn SpatialPerception>,
) -> FrameTransforms {
    let mut transforms = FrameTransforms::default();
    for slot in TransformSlot::ALL {
        if let Some(transform) = slot.try_extract(raw, at, spatial) {
            *transforms.slot_mut(slot) = transform;
        }
    }
    transforms
}

/// Sensor-specific intrinsics when present, else the generic ones.
///
/// Sensor intrinsics are sized to the native image: packed visible-light
/// frames are widened by the sensor's packing factor.
pub fn extract_intrinsics(sensor: SensorType, raw: &RawFrame) -> Option<CameraIntrinsics> {
    if let (Some(mapper), Some(image)) = (&raw.sensor_intrinsics, &raw.image) {
        return Some(CameraIntrinsics::Sensor(SensorIntrinsics::new(
            mapper.clone(),
            image.width() * sensor.packed_width_multiplier(),
            image.height(),
        )));
    }
    raw.core_intrinsics.map(CameraIntrinsics::Core)
}
