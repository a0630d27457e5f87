//! # Contracts
//!
//! Frozen interface contracts shared by every crate of the workspace: sensor
//! catalogue, frame records, sink traits, capture collaborator types and the
//! session configuration. Business crates depend on this crate only, never on
//! each other's internals.
//!
//! ## Time Model
//! - Every frame carries a universal [`Timestamp`] (100 ns ticks since 1601)
//! - All sensors share this clock domain, so cross-sensor comparison is
//!   plain subtraction

mod capture;
mod config;
mod error;
mod frame;
mod intrinsics;
mod sensor;
mod sink;
mod spatial;
mod stream;
mod time;

pub use capture::*;
pub use config::*;
pub use error::*;
pub use frame::*;
pub use intrinsics::*;
pub use sensor::*;
pub use sink::*;
pub use spatial::*;
pub use stream::*;
pub use time::*;

/// Result type alias for contract operations
pub type Result<T> = std::result::Result<T, ContractError>;
