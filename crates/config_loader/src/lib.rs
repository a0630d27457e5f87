//! # Config Loader
//!
//! Loads the capture session configuration.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Validate ranges and cross-field consistency
//! - Produce an [`AppConfig`]
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::load_from_path(Path::new("session.toml")).unwrap();
//! println!("buffer capacity: {}", config.buffer.capacity);
//! ```

mod parser;
mod validator;

pub use contracts::AppConfig;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<AppConfig, ContractError> {
        let format = Self::detect_format(path)?;
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load configuration from string
    pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<AppConfig, ContractError> {
        let config = parser::parse(content, format)?;
        validator::validate(&config)?;
        Ok(config)
    }

    /// Validate a configuration built in code
    pub fn validate(config: &AppConfig) -> Result<(), ContractError> {
        validator::validate(config)
    }

    pub fn to_toml(config: &AppConfig) -> Result<String, ContractError> {
        toml::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    pub fn to_json(config: &AppConfig) -> Result<String, ContractError> {
        serde_json::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }

    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use contracts::SensorType;

    use super::*;

    const SESSION_TOML: &str = r#"
[[capture.groups]]
kind = "research_mode"

[buffer]
capacity = 5
pair_tolerance_secs = 0.005

[streaming]
bind_host = "127.0.0.1"
sensors = ["vlc_lf", "vlc_rf"]

[streaming.ports]
vlc_lf = 24001
vlc_rf = 24002

[recording]
output_dir = "/tmp/recordings"
sensors = ["long_throw_depth"]

[observability]
metrics_port = 9100
"#;

    #[test]
    fn test_load_from_str_toml() {
        let config = ConfigLoader::load_from_str(SESSION_TOML, ConfigFormat::Toml).unwrap();
        assert_eq!(config.observability.metrics_port, Some(9100));
        assert_eq!(
            config.streaming.as_ref().unwrap().port_for(SensorType::VisibleLightRightFront),
            24002
        );
    }

    #[test]
    fn test_round_trip_toml() {
        let config = ConfigLoader::load_from_str(SESSION_TOML, ConfigFormat::Toml).unwrap();
        let serialized = ConfigLoader::to_toml(&config).unwrap();
        let reparsed = ConfigLoader::load_from_str(&serialized, ConfigFormat::Toml).unwrap();
        assert_eq!(reparsed.buffer.pairs, config.buffer.pairs);
        assert_eq!(
            reparsed.recording.unwrap().sensors,
            vec![SensorType::LongThrowToFDepth]
        );
    }

    #[test]
    fn test_round_trip_json() {
        let config = ConfigLoader::load_from_str(SESSION_TOML, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&config).unwrap();
        let reparsed = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(reparsed.streaming.unwrap().ports.len(), 2);
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let content = r#"
[streaming]
sensors = ["vlc_lf", "vlc_rf"]

[streaming.ports]
vlc_lf = 24001
vlc_rf = 24001
"#;
        let err = ConfigLoader::load_from_str(content, ConfigFormat::Toml).unwrap_err();
        assert!(err.to_string().contains("port 24001"), "got: {err}");
    }

    #[test]
    fn test_unsupported_extension() {
        let err = ConfigLoader::load_from_path(Path::new("session.yaml")).unwrap_err();
        assert!(err.to_string().contains("unsupported"), "got: {err}");
    }
}
