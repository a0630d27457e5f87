//! Spatial perception collaborator
//!
//! Provides the shared origin coordinate system and transforms between
//! coordinate systems. A transform is unavailable when positional tracking
//! is lost for the requested time.

use serde::{Deserialize, Serialize};

use crate::{Timestamp, Transform};

/// Opaque coordinate system handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CoordinateSystemId(pub u64);

pub trait SpatialPerception: Send + Sync {
    /// The shared world origin every frame pose is expressed in.
    fn origin(&self) -> CoordinateSystemId;

    /// Transform mapping `from` coordinates into `to` at time `at`.
    fn try_transform(
        &self,
        from: CoordinateSystemId,
        to: CoordinateSystemId,
        at: Timestamp,
    ) -> Option<Transform>;
}
