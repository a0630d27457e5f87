//! Camera intrinsics
//!
//! A frame carries one of two intrinsics representations depending on the
//! capture path: a pinhole model with distortion coefficients, or an opaque
//! platform mapper that projects image points onto the unit plane.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Platform-provided image-to-unit-plane projection.
pub trait UnitPlaneMapper: Send + Sync {
    /// Map a pixel coordinate to the camera's z = 1 plane.
    fn map_image_point_to_unit_plane(&self, point: [f32; 2]) -> Option<[f32; 2]>;
}

/// Pinhole intrinsics with Brown-Conrady distortion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoreIntrinsics {
    pub focal_length: [f32; 2],
    pub principal_point: [f32; 2],
    pub radial_distortion: [f32; 3],
    pub tangential_distortion: [f32; 2],
    pub image_width: u32,
    pub image_height: u32,
}

impl CoreIntrinsics {
    const UNDISTORT_ITERATIONS: usize = 8;

    fn map(&self, point: [f32; 2]) -> Option<[f32; 2]> {
        let [fx, fy] = self.focal_length;
        if fx == 0.0 || fy == 0.0 {
            return None;
        }
        let xd = (point[0] - self.principal_point[0]) / fx;
        let yd = (point[1] - self.principal_point[1]) / fy;
        let [k1, k2, k3] = self.radial_distortion;
        let [p1, p2] = self.tangential_distortion;

        // fixed-point undistortion
        let (mut x, mut y) = (xd, yd);
        for _ in 0..Self::UNDISTORT_ITERATIONS {
            let r2 = x * x + y * y;
            let radial = 1.0 + k1 * r2 + k2 * r2 * r2 + k3 * r2 * r2 * r2;
            let dx = 2.0 * p1 * x * y + p2 * (r2 + 2.0 * x * x);
            let dy = p1 * (r2 + 2.0 * y * y) + 2.0 * p2 * x * y;
            x = (xd - dx) / radial;
            y = (yd - dy) / radial;
        }
        (x.is_finite() && y.is_finite()).then_some([x, y])
    }
}

/// Sensor-specific intrinsics wrapped with the native image size.
#[derive(Clone)]
pub struct SensorIntrinsics {
    mapper: Arc<dyn UnitPlaneMapper>,
    image_width: u32,
    image_height: u32,
}

impl SensorIntrinsics {
    pub fn new(mapper: Arc<dyn UnitPlaneMapper>, image_width: u32, image_height: u32) -> Self {
        Self {
            mapper,
            image_width,
            image_height,
        }
    }

    fn map(&self, point: [f32; 2]) -> Option<[f32; 2]> {
        let inside = point[0] >= 0.0
            && point[1] >= 0.0
            && point[0] < self.image_width as f32
            && point[1] < self.image_height as f32;
        if !inside {
            return None;
        }
        self.mapper.map_image_point_to_unit_plane(point)
    }
}

impl fmt::Debug for SensorIntrinsics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SensorIntrinsics")
            .field("image_width", &self.image_width)
            .field("image_height", &self.image_height)
            .finish_non_exhaustive()
    }
}

/// Intrinsics attached to a frame.
#[derive(Debug, Clone)]
pub enum CameraIntrinsics {
    Core(CoreIntrinsics),
    Sensor(SensorIntrinsics),
}

impl CameraIntrinsics {
    pub fn image_width(&self) -> u32 {
        match self {
            CameraIntrinsics::Core(core) => core.image_width,
            CameraIntrinsics::Sensor(sensor) => sensor.image_width,
        }
    }

    pub fn image_height(&self) -> u32 {
        match self {
            CameraIntrinsics::Core(core) => core.image_height,
            CameraIntrinsics::Sensor(sensor) => sensor.image_height,
        }
    }

    /// Project an image point onto the unit plane, `None` if it can't be mapped.
    pub fn map_image_point_to_unit_plane(&self, point: [f32; 2]) -> Option<[f32; 2]> {
        match self {
            CameraIntrinsics::Core(core) => core.map(point),
            CameraIntrinsics::Sensor(sensor) => sensor.map(point),
        }
    }

    pub fn as_core(&self) -> Option<&CoreIntrinsics> {
        match self {
            CameraIntrinsics::Core(core) => Some(core),
            CameraIntrinsics::Sensor(_) => None,
        }
    }
}
