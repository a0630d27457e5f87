//! # Frame Sync
//!
//! Multi-sensor frame buffering and timestamp pairing.
//!
//! Responsibilities:
//! - Bounded FIFO history per sensor type
//! - Latest-frame and frame-for-time lookups
//! - Cross-sensor pair matching within a tolerance window
//!
//! ## Usage
//!
//! ```ignore
//! use frame_sync::MultiFrameBuffer;
//!
//! let buffer = MultiFrameBuffer::new();
//! // reader contexts call buffer.send(frame)
//!
//! let t = buffer.timestamp_for_sensor_pair(left, right, 0.005);
//! if !t.is_zero() {
//!     let l = buffer.frame_for_time(left, t, 0.005);
//!     let r = buffer.frame_for_time(right, t, 0.005);
//! }
//! ```

mod buffer;
mod multi_frame_buffer;
mod pairing;
mod poller;

pub use buffer::RingStats;
pub use multi_frame_buffer::{BufferStats, MultiFrameBuffer, SyncedPair};
pub use pairing::latest_matching_timestamp;
pub use poller::PairPoller;
