//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::{AppConfig, RecordingConfig, StreamingConfig};
use std::time::Duration;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::commands::load_config;
use crate::pipeline::{Session, SessionConfig};

/// Execute the `run` command
pub async fn run_session(args: &RunArgs) -> Result<()> {
    let mut app = load_config(args.config.as_deref())?;
    apply_overrides(&mut app, args);
    config_loader::ConfigLoader::validate(&app).context("Invalid configuration after CLI overrides")?;

    info!(
        groups = app.capture.groups.len(),
        sensors = ?app.captured_sensors(),
        pairs = app.buffer.pairs.len(),
        streaming = app.streaming.is_some(),
        recording = app.recording.is_some(),
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&app);
        return Ok(());
    }

    let session = Session::new(SessionConfig {
        app,
        max_pairs: (args.max_pairs > 0).then_some(args.max_pairs),
        timeout: (args.timeout > 0).then(|| Duration::from_secs(args.timeout)),
    });

    info!("Starting capture session...");
    let stats = session
        .run(shutdown_signal())
        .await
        .context("Capture session failed")?;

    info!(
        pairs = stats.pairs.total_pairs(),
        frames = stats.frames_received(),
        duration_secs = stats.duration.as_secs_f64(),
        pairs_per_second = format!("{:.2}", stats.pairs_per_second()),
        "Session completed"
    );
    stats.print_summary();
    Ok(())
}

fn apply_overrides(app: &mut AppConfig, args: &RunArgs) {
    if let Some(dir) = &args.record {
        info!(dir = %dir.display(), "Overriding recording directory from CLI");
        match &mut app.recording {
            Some(recording) => recording.output_dir = dir.clone(),
            None => {
                app.recording = Some(RecordingConfig {
                    output_dir: dir.clone(),
                    sensors: Vec::new(),
                    queue_capacity: sinks::recording::DEFAULT_QUEUE_CAPACITY,
                })
            }
        }
    }
    if args.stream && app.streaming.is_none() {
        app.streaming = Some(StreamingConfig {
            bind_host: "0.0.0.0".to_string(),
            sensors: Vec::new(),
            ports: Default::default(),
        });
    }
    if let Some(port) = args.metrics_port {
        app.observability.metrics_port = (port > 0).then_some(port);
    }
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(app: &AppConfig) {
    println!("\n=== Configuration Summary ===\n");
    println!("Source groups ({}):", app.capture.groups.len());
    for group in &app.capture.groups {
        let sensors: Vec<String> = group
            .enabled_sensors()
            .iter()
            .map(ToString::to_string)
            .collect();
        println!("  - {:?}: {}", group.kind, sensors.join(", "));
    }

    println!("\nBuffer:");
    println!("  Capacity: {} frames per sensor", app.buffer.capacity);
    println!("  Pair tolerance: {} s", app.buffer.pair_tolerance_secs);
    for pair in &app.buffer.pairs {
        println!("  Pair: {} / {}", pair.a, pair.b);
    }

    if let Some(streaming) = &app.streaming {
        println!("\nStreaming on {}", streaming.bind_host);
    }
    if let Some(recording) = &app.recording {
        println!("\nRecording into {}", recording.output_dir.display());
    }
    println!();
}
