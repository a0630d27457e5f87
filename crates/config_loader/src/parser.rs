//! 配置解析模块
//!
//! 支持 TOML (主要) 和 JSON (可选) 格式。

use contracts::{AppConfig, ContractError};

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML 格式 (推荐)
    Toml,
    /// JSON 格式
    Json,
}

impl ConfigFormat {
    /// 从文件扩展名推断格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

pub fn parse_toml(content: &str) -> Result<AppConfig, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

pub fn parse_json(content: &str) -> Result<AppConfig, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 根据格式解析配置
pub fn parse(content: &str, format: ConfigFormat) -> Result<AppConfig, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use contracts::{SensorType, SourceGroupKind};

    use super::*;

    #[test]
    fn test_parse_toml_empty_uses_defaults() {
        let config = parse_toml("").unwrap();
        assert_eq!(config.buffer.capacity, 5);
        assert_eq!(config.capture.groups.len(), 1);
        assert!(config.streaming.is_none());
        assert!(config.recording.is_none());
    }

    #[test]
    fn test_parse_toml_sections() {
        let content = r#"
[[capture.groups]]
kind = "research_mode"
sensors = ["vlc_lf", "vlc_rf", "long_throw_depth"]

[[capture.groups]]
kind = "photo_video"

[buffer]
capacity = 8

[[buffer.pairs]]
a = "vlc_lf"
b = "vlc_rf"

[streaming]
bind_host = "127.0.0.1"
sensors = ["pv"]

[streaming.ports]
pv = 30000

[recording]
output_dir = "recordings"
"#;
        let config = parse_toml(content).unwrap();
        assert_eq!(config.capture.groups[1].kind, SourceGroupKind::PhotoVideo);
        assert_eq!(config.capture.groups[0].sensors[2], SensorType::LongThrowToFDepth);
        assert_eq!(config.buffer.capacity, 8);
        assert_eq!(config.buffer.poll_interval_ms, 33);
        let streaming = config.streaming.unwrap();
        assert_eq!(streaming.port_for(SensorType::PhotoVideo), 30000);
        assert_eq!(config.recording.unwrap().queue_capacity, 64);
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "capture": { "groups": [{ "kind": "photo_video" }] },
            "mock": { "frame_rate_hz": 15.0, "fail_start": ["vlc_ll"] }
        }"#;
        let config = parse_json(content).unwrap();
        assert_eq!(config.mock.frame_rate_hz, 15.0);
        assert_eq!(config.mock.fail_start, vec![SensorType::VisibleLightLeftLeft]);
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let result = parse_toml("invalid toml [[[");
        assert!(matches!(result, Err(ContractError::ConfigParse { .. })));
    }

    #[test]
    fn test_unknown_sensor_rejected() {
        let content = r#"
[[capture.groups]]
kind = "research_mode"
sensors = ["thermal"]
"#;
        assert!(parse_toml(content).is_err());
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_extension("toml"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("TOML"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("json"), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
