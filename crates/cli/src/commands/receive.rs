//! `receive` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use sinks::{SensorFrameReceiver, SinkError};
use tracing::info;

use crate::cli::ReceiveArgs;

/// One received frame, for JSON output
#[derive(Serialize)]
struct FrameLine {
    sensor: String,
    timestamp: i64,
    width: u32,
    height: u32,
    format: String,
    bytes: usize,
}

/// Execute the `receive` command
pub async fn run_receive(args: &ReceiveArgs) -> Result<()> {
    let mut receiver = SensorFrameReceiver::connect(args.addr)
        .await
        .with_context(|| format!("Failed to connect to {}", args.addr))?;
    info!(addr = %args.addr, "Connected to streaming server");

    let mut received = 0u64;
    loop {
        let frame = match receiver.receive().await {
            Ok(frame) => frame,
            Err(SinkError::Disconnected) => {
                info!(received, "Server closed the stream");
                break;
            }
            Err(e) => return Err(e).context("Failed to receive frame"),
        };
        received += 1;

        let image = frame.image();
        let line = FrameLine {
            sensor: frame.sensor_type().to_string(),
            timestamp: frame.timestamp().ticks(),
            width: image.width(),
            height: image.height(),
            format: format!("{:?}", image.format()),
            bytes: image.data().len(),
        };
        if args.json {
            println!("{}", serde_json::to_string(&line)?);
        } else {
            println!(
                "{} @ {}: {}x{} {} ({} bytes)",
                line.sensor, line.timestamp, line.width, line.height, line.format, line.bytes
            );
        }

        if args.count > 0 && received >= args.count {
            break;
        }
    }
    Ok(())
}
