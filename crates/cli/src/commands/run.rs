//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use contracts::ScenarioBlueprint;

use crate::cli::RunArgs;
use crate::error::ensure_config_exists;
use crate::session::{Session, SessionConfig};

/// Execute the `run` command
pub async fn run_session(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "loading configuration");

    ensure_config_exists(&args.config)?;

    let mut blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("failed to load config from {}", args.config.display()))?;

    config_loader::ConfigLoader::apply_session_overrides(
        &mut blueprint,
        args.host.as_deref(),
        args.port,
    )
    .context("invalid session override")?;

    info!(
        host = %blueprint.session.host,
        port = blueprint.session.port,
        vehicles = blueprint.vehicles.len(),
        sensors = blueprint.sensor_count(),
        "configuration loaded"
    );

    if args.dry_run {
        info!("dry run mode - configuration is valid, exiting");
        print_plan_summary(&blueprint);
        return Ok(());
    }

    let mut config = SessionConfig::new(blueprint);
    config.max_packets = (args.max_packets > 0).then_some(args.max_packets);
    config.duration = (args.duration > 0).then(|| Duration::from_secs(args.duration));
    config.buffer_size = args.buffer_size;
    config.metrics_port = (args.metrics_port > 0).then_some(args.metrics_port);

    info!("starting session...");
    let stats = Session::new(config)
        .run(shutdown_signal())
        .await
        .context("session execution failed")?;

    info!(
        packets = stats.packets_received,
        dropped = stats.packets_dropped,
        reason = %stats.stop_reason,
        "session completed"
    );
    stats.print_summary();

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
///
/// A handler that cannot be installed never resolves.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
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
                warn!(error = %e, "failed to install SIGTERM handler");
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

/// Print the subscription plan for dry-run mode
fn print_plan_summary(blueprint: &ScenarioBlueprint) {
    println!("\n=== Subscription Plan ===\n");
    println!(
        "Simulator: {}:{} (timeout {} ms, ros bridge {})",
        blueprint.session.host,
        blueprint.session.port,
        blueprint.session.timeout_ms,
        if blueprint.session.ros_bridge_available {
            "available"
        } else {
            "unavailable"
        }
    );

    for vehicle in &blueprint.vehicles {
        println!(
            "\n{} ({}) - {} sensors",
            vehicle.id,
            vehicle.blueprint,
            vehicle.sensors.len()
        );
        for sensor in &vehicle.sensors {
            let mut streams = Vec::new();
            if sensor.listen {
                streams.push("primary".to_string());
            }
            streams.extend(sensor.gbuffers.iter().map(|id| format!("gbuffer[{id}]")));
            if streams.is_empty() {
                streams.push("none".to_string());
            }

            println!(
                "  - {} [{}] @ {} Hz: {}{}",
                sensor.id,
                sensor.sensor_type.blueprint_id(),
                sensor.frequency_hz,
                streams.join(", "),
                if sensor.enable_ros { " + ros" } else { "" }
            );
        }
    }

    println!();
}
