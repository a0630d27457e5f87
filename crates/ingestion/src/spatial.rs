//! In-memory spatial perception.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

use contracts::{CoordinateSystemId, SpatialPerception, Timestamp, Transform};

/// Spatial perception backed by a fixed table of transforms to the origin.
///
/// Transforms use the column-vector convention: `p_origin = T * p_local`.
/// While tracking is off every query fails, as with a headset that lost
/// positional tracking.
#[derive(Debug)]
pub struct StaticSpatialPerception {
    origin: CoordinateSystemId,
    to_origin: RwLock<HashMap<CoordinateSystemId, Transform>>,
    tracking: AtomicBool,
}

impl Default for StaticSpatialPerception {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticSpatialPerception {
    pub const ORIGIN: CoordinateSystemId = CoordinateSystemId(0);

    pub fn new() -> Self {
        Self {
            origin: Self::ORIGIN,
            to_origin: RwLock::new(HashMap::new()),
            tracking: AtomicBool::new(true),
        }
    }

    pub fn set_transform_to_origin(&self, system: CoordinateSystemId, transform: Transform) {
        self.to_origin
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(system, transform);
    }

    pub fn set_tracking(&self, tracking: bool) {
        self.tracking.store(tracking, Ordering::Relaxed);
    }

    fn transform_to_origin(&self, system: CoordinateSystemId) -> Option<Transform> {
        if system == self.origin {
            return Some(Transform::identity());
        }
        self.to_origin
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&system)
            .copied()
    }
}

impl SpatialPerception for StaticSpatialPerception {
    fn origin(&self) -> CoordinateSystemId {
        self.origin
    }

    fn try_transform(
        &self,
        from: CoordinateSystemId,
        to: CoordinateSystemId,
        _at: Timestamp,
    ) -> Option<Transform> {
        if !self.tracking.load(Ordering::Relaxed) {
            return None;
        }
        let from_to_origin = self.transform_to_origin(from)?;
        let to_to_origin = self.transform_to_origin(to)?;
        Some(to_to_origin.try_inverse()? * from_to_origin)
    }
}
