//! Command implementations.

mod info;
mod receive;
mod run;
mod validate;

pub use info::run_info;
pub use receive::run_receive;
pub use run::run_session;
pub use validate::run_validate;

use anyhow::{Context, Result};
use contracts::AppConfig;
use std::path::Path;
use tracing::info;

use crate::error::CliError;

/// Load and validate `path`, or fall back to the built-in defaults.
pub(crate) fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let Some(path) = path else {
        info!("No configuration file given, using defaults");
        return Ok(AppConfig::default());
    };
    info!(config = %path.display(), "Loading configuration");
    if !path.exists() {
        return Err(CliError::config_not_found(path).into());
    }
    config_loader::ConfigLoader::load_from_path(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}
