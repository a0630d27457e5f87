//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{AppConfig, SensorType};
use serde::Serialize;

use crate::cli::InfoArgs;
use crate::commands::load_config;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    groups: Vec<GroupInfo>,
    buffer: BufferInfo,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    streams: Vec<StreamInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    recording_dir: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sensors: Vec<SensorInfo>,
}

#[derive(Serialize)]
struct GroupInfo {
    kind: String,
    sensors: Vec<String>,
}

#[derive(Serialize)]
struct BufferInfo {
    capacity: usize,
    pair_tolerance_secs: f64,
    pairs: Vec<String>,
}

#[derive(Serialize)]
struct StreamInfo {
    sensor: String,
    address: String,
}

#[derive(Serialize)]
struct SensorInfo {
    name: String,
    device_name: String,
    wire_code: u16,
    default_port: u16,
    stream_format: String,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    let app = load_config(args.config.as_deref())?;
    let info = build_config_info(&app, args);

    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }
    Ok(())
}

fn build_config_info(app: &AppConfig, args: &InfoArgs) -> ConfigInfo {
    let groups = app
        .capture
        .groups
        .iter()
        .map(|group| GroupInfo {
            kind: format!("{:?}", group.kind),
            sensors: group.enabled_sensors().iter().map(ToString::to_string).collect(),
        })
        .collect();

    let streams = match &app.streaming {
        Some(streaming) => {
            let sensors = if streaming.sensors.is_empty() {
                app.captured_sensors()
            } else {
                streaming.sensors.clone()
            };
            sensors
                .into_iter()
                .map(|sensor| StreamInfo {
                    sensor: sensor.to_string(),
                    address: format!("{}:{}", streaming.bind_host, streaming.port_for(sensor)),
                })
                .collect()
        }
        None => Vec::new(),
    };

    let sensors = if args.sensors {
        SensorType::ALL
            .into_iter()
            .map(|sensor| SensorInfo {
                name: sensor.to_string(),
                device_name: sensor.device_name().to_string(),
                wire_code: sensor.wire_code(),
                default_port: sensor.default_streaming_port(),
                stream_format: format!("{:?}", sensor.stream_pixel_format()),
            })
            .collect()
    } else {
        Vec::new()
    };

    ConfigInfo {
        version: format!("{:?}", app.version),
        groups,
        buffer: BufferInfo {
            capacity: app.buffer.capacity,
            pair_tolerance_secs: app.buffer.pair_tolerance_secs,
            pairs: app
                .buffer
                .pairs
                .iter()
                .map(|pair| format!("{}/{}", pair.a, pair.b))
                .collect(),
        },
        streams,
        recording_dir: app
            .recording
            .as_ref()
            .map(|recording| recording.output_dir.display().to_string()),
        sensors,
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               HoloLens Sensor Configuration                  ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("📷 Source groups ({})", info.groups.len());
    for (i, group) in info.groups.iter().enumerate() {
        let prefix = if i == info.groups.len() - 1 { "└─" } else { "├─" };
        println!("   {} {}: {}", prefix, group.kind, group.sensors.join(", "));
    }

    println!("\n⚙️  Buffer");
    println!("   ├─ Capacity: {} frames per sensor", info.buffer.capacity);
    println!("   ├─ Pair tolerance: {} s", info.buffer.pair_tolerance_secs);
    if info.buffer.pairs.is_empty() {
        println!("   └─ Pairs: none");
    } else {
        println!("   └─ Pairs: {}", info.buffer.pairs.join(", "));
    }

    if !info.streams.is_empty() {
        println!("\n📡 Streaming ({})", info.streams.len());
        for (i, stream) in info.streams.iter().enumerate() {
            let prefix = if i == info.streams.len() - 1 { "└─" } else { "├─" };
            println!("   {} {} on {}", prefix, stream.sensor, stream.address);
        }
    }

    if let Some(dir) = &info.recording_dir {
        println!("\n💾 Recording into {}", dir);
    }

    if !info.sensors.is_empty() {
        println!("\n🔭 Sensors");
        for (i, sensor) in info.sensors.iter().enumerate() {
            let prefix = if i == info.sensors.len() - 1 { "└─" } else { "├─" };
            println!(
                "   {} {} ({}): code {}, port {}, streamed as {}",
                prefix,
                sensor.name,
                sensor.device_name,
                sensor.wire_code,
                sensor.default_port,
                sensor.stream_format
            );
        }
    }

    println!();
}
