//! Errors shared across crates.
//!
//! Transient absence (no frame, no pair) is never an error; it is `Option`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContractError {
    /// Config text that does not parse
    #[error("cannot parse config: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Config that parses but is inconsistent
    #[error("invalid config field '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    /// Sensor code outside the known set
    #[error("unknown sensor type code {code}")]
    UnknownSensorType { code: u16 },

    /// Image payload inconsistent with its dimensions
    #[error("invalid image: {message}")]
    InvalidImage { message: String },

    /// Malformed streaming header or payload
    #[error("stream protocol violation: {message}")]
    Protocol { message: String },

    #[error("sink '{sink}' failed to write: {message}")]
    SinkWrite { sink: String, message: String },

    #[error("sink '{sink}' cannot reach its peer: {message}")]
    SinkConnection { sink: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ContractError {
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn invalid_image(message: impl Into<String>) -> Self {
        Self::InvalidImage {
            message: message.into(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    pub fn sink_write(sink: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink: sink.into(),
            message: message.into(),
        }
    }

    pub fn sink_connection(sink: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkConnection {
            sink: sink.into(),
            message: message.into(),
        }
    }
}
