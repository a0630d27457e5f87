//! Error types for CLI operations.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {}", .path.display())]
    ConfigNotFound { path: PathBuf },

    /// An output or source group failed to start
    #[error("Failed to start {component}: {message}")]
    SessionStart { component: String, message: String },
}

impl CliError {
    pub fn config_not_found(path: &Path) -> Self {
        Self::ConfigNotFound {
            path: path.to_path_buf(),
        }
    }

    pub fn session_start(component: impl Into<String>, message: impl ToString) -> Self {
        Self::SessionStart {
            component: component.into(),
            message: message.to_string(),
        }
    }
}
