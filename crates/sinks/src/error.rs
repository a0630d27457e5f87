//! Sink error types

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Sink specific errors
#[derive(Debug, Error)]
pub enum SinkError {
    /// Listener could not bind
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Receiver could not connect
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Peer closed the stream
    #[error("connection closed by peer")]
    Disconnected,

    /// Recording folder could not be created or written
    #[error("recording io error at {}: {source}", .path.display())]
    Recording {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Image encoding failed
    #[error("failed to encode image: {message}")]
    Encode { message: String },

    /// Wire or frame contract violation
    #[error(transparent)]
    Contract(#[from] contracts::ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SinkError {
    pub fn bind(addr: impl Into<String>, source: std::io::Error) -> Self {
        Self::Bind {
            addr: addr.into(),
            source,
        }
    }

    pub fn recording(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Recording {
            path: path.into(),
            source,
        }
    }

    pub fn encode(message: impl Into<String>) -> Self {
        Self::Encode {
            message: message.into(),
        }
    }
}

impl From<SinkError> for contracts::ContractError {
    fn from(error: SinkError) -> Self {
        match error {
            SinkError::Contract(inner) => inner,
            SinkError::Bind { addr, source } => {
                contracts::ContractError::sink_connection(addr, source.to_string())
            }
            SinkError::Connect { addr, source } => {
                contracts::ContractError::sink_connection(addr.to_string(), source.to_string())
            }
            other => contracts::ContractError::sink_write("sinks", other.to_string()),
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, SinkError>;
