//! TCP streaming of sensor frames
//!
//! Each sensor is served on its own port. A frame on the wire is the 32-byte
//! [`contracts::SensorFrameStreamHeader`] followed by the raw image payload.

mod receiver;
mod server;
mod streamer;

pub use receiver::{SensorFrameReceiver, MAX_PAYLOAD_LEN};
pub use server::SensorFrameStreamingServer;
pub use streamer::SensorFrameStreamer;
