//! 配置校验模块
//!
//! 校验规则：
//! - 字段范围 (`validator` derive: buffer capacity, tolerance, frame rate)
//! - source group kind 唯一, 且 sensors 属于该 group
//! - buffer pair 的两个传感器不同且都被采集
//! - streaming 端口互不冲突
//! - recording 目录非空, queue_capacity > 0

use std::collections::{HashMap, HashSet};

use contracts::{AppConfig, ContractError, SensorType};
use validator::{Validate, ValidationErrors};

/// 校验 AppConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &AppConfig) -> Result<(), ContractError> {
    config.validate().map_err(field_error)?;
    validate_groups(config)?;
    validate_pairs(config)?;
    validate_streaming(config)?;
    validate_recording(config)?;
    Ok(())
}

fn field_error(errors: ValidationErrors) -> ContractError {
    let field = errors
        .errors()
        .keys()
        .next()
        .map(|key| key.to_string())
        .unwrap_or_default();
    ContractError::config_validation(field, errors.to_string())
}

fn validate_groups(config: &AppConfig) -> Result<(), ContractError> {
    let mut kinds = HashSet::new();
    for (idx, group) in config.capture.groups.iter().enumerate() {
        if !kinds.insert(group.kind) {
            return Err(ContractError::config_validation(
                format!("capture.groups[{idx}].kind"),
                format!("duplicate source group {:?}", group.kind),
            ));
        }
        if let Some(sensor) = group
            .sensors
            .iter()
            .find(|sensor| !group.kind.sensors().contains(sensor))
        {
            return Err(ContractError::config_validation(
                format!("capture.groups[{idx}].sensors"),
                format!("{sensor} is not part of a {:?} source group", group.kind),
            ));
        }
    }
    Ok(())
}

fn validate_pairs(config: &AppConfig) -> Result<(), ContractError> {
    let captured = config.captured_sensors();
    for (idx, pair) in config.buffer.pairs.iter().enumerate() {
        if pair.a == pair.b {
            return Err(ContractError::config_validation(
                format!("buffer.pairs[{idx}]"),
                format!("pair must name two distinct sensors, got {} twice", pair.a),
            ));
        }
        for sensor in [pair.a, pair.b] {
            if !captured.contains(&sensor) {
                return Err(ContractError::config_validation(
                    format!("buffer.pairs[{idx}]"),
                    format!("{sensor} is not captured by any source group"),
                ));
            }
        }
    }
    Ok(())
}

fn validate_streaming(config: &AppConfig) -> Result<(), ContractError> {
    let Some(streaming) = &config.streaming else {
        return Ok(());
    };
    if streaming.bind_host.trim().is_empty() {
        return Err(ContractError::config_validation(
            "streaming.bind_host",
            "bind host cannot be empty",
        ));
    }

    let sensors = if streaming.sensors.is_empty() {
        config.captured_sensors()
    } else {
        streaming.sensors.clone()
    };
    let mut ports: HashMap<u16, SensorType> = HashMap::new();
    for sensor in sensors {
        let port = streaming.port_for(sensor);
        if port == 0 {
            // ephemeral ports never collide
            continue;
        }
        if let Some(other) = ports.insert(port, sensor) {
            return Err(ContractError::config_validation(
                "streaming.ports",
                format!("{other} and {sensor} both use port {port}"),
            ));
        }
    }
    Ok(())
}

fn validate_recording(config: &AppConfig) -> Result<(), ContractError> {
    let Some(recording) = &config.recording else {
        return Ok(());
    };
    if recording.output_dir.as_os_str().is_empty() {
        return Err(ContractError::config_validation(
            "recording.output_dir",
            "output directory cannot be empty",
        ));
    }
    if recording.queue_capacity == 0 {
        return Err(ContractError::config_validation(
            "recording.queue_capacity",
            "queue_capacity must be > 0",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    use contracts::{GroupConfig, RecordingConfig, SensorPair, SourceGroupKind, StreamingConfig};

    use super::*;

    fn streaming(ports: &[(SensorType, u16)]) -> StreamingConfig {
        StreamingConfig {
            bind_host: "127.0.0.1".into(),
            sensors: Vec::new(),
            ports: ports.iter().copied().collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_range_violation_names_field() {
        let mut config = AppConfig::default();
        config.buffer.capacity = 0;
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("buffer"), "got: {err}");
    }

    #[test]
    fn test_duplicate_group_kind() {
        let mut config = AppConfig::default();
        config.capture.groups.push(config.capture.groups[0].clone());
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("duplicate source group"), "got: {err}");
    }

    #[test]
    fn test_sensor_outside_group() {
        let mut config = AppConfig::default();
        config.capture.groups = vec![GroupConfig {
            kind: SourceGroupKind::ResearchMode,
            sensors: vec![SensorType::PhotoVideo],
        }];
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("not part of"), "got: {err}");
    }

    #[test]
    fn test_pair_of_same_sensor() {
        let mut config = AppConfig::default();
        config.buffer.pairs = vec![SensorPair {
            a: SensorType::VisibleLightLeftLeft,
            b: SensorType::VisibleLightLeftLeft,
        }];
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("distinct"), "got: {err}");
    }

    #[test]
    fn test_pair_sensor_not_captured() {
        let mut config = AppConfig::default();
        config.capture.groups = vec![GroupConfig {
            kind: SourceGroupKind::PhotoVideo,
            sensors: Vec::new(),
        }];
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("not captured"), "got: {err}");
    }

    #[test]
    fn test_port_collision() {
        let mut config = AppConfig::default();
        config.streaming = Some(streaming(&[
            (SensorType::VisibleLightLeftLeft, 9000),
            (SensorType::VisibleLightRightRight, 9000),
        ]));
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("port 9000"), "got: {err}");
    }

    #[test]
    fn test_ephemeral_ports_allowed() {
        let mut config = AppConfig::default();
        config.streaming = Some(streaming(&[
            (SensorType::VisibleLightLeftLeft, 0),
            (SensorType::VisibleLightRightRight, 0),
        ]));
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_empty_recording_dir() {
        let mut config = AppConfig::default();
        config.recording = Some(RecordingConfig {
            output_dir: PathBuf::new(),
            sensors: Vec::new(),
            queue_capacity: 4,
        });
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("cannot be empty"), "got: {err}");
    }
}
