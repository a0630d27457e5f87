//! `validate`: load a session config and report problems without capturing.

use anyhow::{Context, Result};
use contracts::AppConfig;
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;
use crate::error::CliError;

/// Report printed as JSON with `--json`
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    group_count: usize,
    sensor_count: usize,
    pair_count: usize,
    streaming: bool,
    recording: bool,
}

pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "checking session config");

    let report = check_config(args);

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("cannot encode report")?
        );
    } else {
        print_report(&report);
    }

    anyhow::ensure!(report.valid, "{} is not a usable session config", report.config_path);
    Ok(())
}

fn check_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(CliError::config_not_found(&args.config).to_string()),
            warnings: Vec::new(),
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(app) => ValidationResult {
            valid: true,
            config_path,
            error: None,
            warnings: collect_warnings(&app),
            summary: Some(ConfigSummary {
                version: format!("{:?}", app.version),
                group_count: app.capture.groups.len(),
                sensor_count: app.captured_sensors().len(),
                pair_count: app.buffer.pairs.len(),
                streaming: app.streaming.is_some(),
                recording: app.recording.is_some(),
            }),
        },
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: Vec::new(),
            summary: None,
        },
    }
}

/// Non-fatal issues
fn collect_warnings(app: &AppConfig) -> Vec<String> {
    let mut warnings: Vec<String> = Vec::new();

    if app.buffer.pairs.is_empty() {
        warnings.push("No sensor pairs configured - frames are captured but never paired".into());
    }
    if app.streaming.is_none() && app.recording.is_none() {
        warnings.push("Neither streaming nor recording is enabled".into());
    }

    // a tolerance above half the frame period lets adjacent frames pair up
    let half_period = 0.5 / app.mock.frame_rate_hz;
    if app.buffer.pair_tolerance_secs > half_period {
        warnings.push(format!(
            "pair_tolerance_secs ({}) exceeds half the frame period ({half_period:.4} s)",
            app.buffer.pair_tolerance_secs
        ));
    }

    let captured = app.captured_sensors();
    let uncaptured = |sensors: &[contracts::SensorType]| -> Vec<String> {
        sensors
            .iter()
            .filter(|sensor| !captured.contains(sensor))
            .map(ToString::to_string)
            .collect()
    };
    if let Some(streaming) = &app.streaming {
        let missing = uncaptured(&streaming.sensors);
        if !missing.is_empty() {
            warnings.push(format!("Streamed sensors never captured: {}", missing.join(", ")));
        }
    }
    if let Some(recording) = &app.recording {
        let missing = uncaptured(&recording.sensors);
        if !missing.is_empty() {
            warnings.push(format!("Recorded sensors never captured: {}", missing.join(", ")));
        }
    }

    warnings
}

fn print_report(result: &ValidationResult) {
    if result.valid {
        println!("✓ {} is valid", result.config_path);

        if let Some(summary) = &result.summary {
            println!("\n  Config version: {}", summary.version);
            println!("  Source groups: {}", summary.group_count);
            println!("  Captured sensors: {}", summary.sensor_count);
            println!("  Pairs: {}", summary.pair_count);
            println!("  Streaming: {}", summary.streaming);
            println!("  Recording: {}", summary.recording);
        }

        if !result.warnings.is_empty() {
            println!("\n⚠ {} warning(s):", result.warnings.len());
            for warning in &result.warnings {
                println!("  • {warning}");
            }
        }
    } else {
        println!("✗ {} is invalid", result.config_path);
        if let Some(error) = &result.error {
            println!("\n  {error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use contracts::{GroupConfig, RecordingConfig, SensorType, SourceGroupKind};

    use super::*;

    #[test]
    fn test_default_config_warns_about_no_outputs() {
        let warnings = collect_warnings(&AppConfig::default());
        assert!(warnings.iter().any(|w| w.contains("Neither streaming")));
    }

    #[test]
    fn test_uncaptured_recording_sensor_warns() {
        let mut app = AppConfig::default();
        app.capture.groups = vec![GroupConfig {
            kind: SourceGroupKind::ResearchMode,
            sensors: vec![SensorType::VisibleLightLeftFront, SensorType::VisibleLightRightFront],
        }];
        app.recording = Some(RecordingConfig {
            output_dir: "out".into(),
            sensors: vec![SensorType::LongThrowToFDepth],
            queue_capacity: 8,
        });
        let warnings = collect_warnings(&app);
        assert!(
            warnings.iter().any(|w| w.contains("long_throw_depth")),
            "got: {warnings:?}"
        );
    }

    #[test]
    fn test_wide_tolerance_warns() {
        let mut app = AppConfig::default();
        app.buffer.pair_tolerance_secs = 0.5;
        let warnings = collect_warnings(&app);
        assert!(warnings.iter().any(|w| w.contains("half the frame period")));
    }
}
