//! Capture error types

use contracts::{ContractError, SensorType, SourceGroupKind};
use thiserror::Error;

/// Capture specific error
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Source group enumeration failed
    #[error("failed to enumerate source groups: {message}")]
    EnumerationFailed { message: String },

    /// No enumerated group matches the requested kind
    #[error("no {kind:?} source group present")]
    GroupNotFound { kind: SourceGroupKind },

    /// Capture device initialization failed
    #[error("failed to initialize capture for group '{group}': {message}")]
    InitializeFailed { group: String, message: String },

    /// Media format could not be applied to a source
    #[error("failed to set format '{subtype}' on source '{source_id}': {message}")]
    SetFormatFailed {
        source_id: String,
        subtype: String,
        message: String,
    },

    /// Frame reader could not be created
    #[error("failed to create reader for source '{source_id}': {message}")]
    ReaderCreateFailed { source_id: String, message: String },

    /// Frame reader refused to start
    #[error("reader for {sensor} failed to start: {status}")]
    ReaderStartFailed { sensor: SensorType, status: String },

    /// Source id not known to the device
    #[error("unknown source '{source_id}'")]
    UnknownSource { source_id: String },

    /// Wrapped ContractError
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl CaptureError {
    pub fn initialize(group: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InitializeFailed {
            group: group.into(),
            message: message.into(),
        }
    }

    pub fn reader_start(sensor: SensorType, status: impl Into<String>) -> Self {
        Self::ReaderStartFailed {
            sensor,
            status: status.into(),
        }
    }

    pub fn unknown_source(source_id: impl Into<String>) -> Self {
        Self::UnknownSource {
            source_id: source_id.into(),
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, CaptureError>;
