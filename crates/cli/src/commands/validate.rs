//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::{GBufferTexture, ScenarioBlueprint, SensorType};

use crate::cli::ValidateArgs;

/// Validation result for JSON output
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
    endpoint: String,
    vehicle_count: usize,
    sensor_count: usize,
    stream_count: usize,
    ros_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("file not found: {}", args.config.display())),
            warnings: Vec::new(),
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => ValidationResult {
            valid: true,
            config_path,
            error: None,
            warnings: collect_warnings(&blueprint),
            summary: Some(summarize(&blueprint)),
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

fn summarize(blueprint: &ScenarioBlueprint) -> ConfigSummary {
    let sensors = || blueprint.sensors().map(|(_, sensor)| sensor);

    ConfigSummary {
        version: format!("{:?}", blueprint.version),
        endpoint: format!("{}:{}", blueprint.session.host, blueprint.session.port),
        vehicle_count: blueprint.vehicles.len(),
        sensor_count: blueprint.sensor_count(),
        stream_count: sensors()
            .map(|s| usize::from(s.listen) + s.gbuffers.len())
            .sum(),
        ros_count: sensors().filter(|s| s.enable_ros).count(),
    }
}

/// Collect configuration warnings (non-fatal issues)
///
/// Anything here is accepted by the loader but is likely to be refused by
/// the simulator or to produce no data.
fn collect_warnings(blueprint: &ScenarioBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    for vehicle in &blueprint.vehicles {
        if vehicle.sensors.is_empty() {
            warnings.push(format!("vehicle '{}' has no sensors configured", vehicle.id));
        }
    }

    for (_, sensor) in blueprint.sensors() {
        if !sensor.listen && sensor.gbuffers.is_empty() && !sensor.enable_ros {
            warnings.push(format!(
                "sensor '{}' subscribes to nothing and is not forwarded to ROS",
                sensor.id
            ));
        }

        if !sensor.gbuffers.is_empty() && !sensor.sensor_type.supports_gbuffers() {
            warnings.push(format!(
                "sensor '{}' ({}) requests gbuffers but only cameras render them",
                sensor.id,
                sensor.sensor_type.blueprint_id()
            ));
        }

        for &id in &sensor.gbuffers {
            if GBufferTexture::from_id(id).is_none() {
                warnings.push(format!(
                    "sensor '{}' requests unknown gbuffer id {} (known ids are 0..{})",
                    sensor.id,
                    id,
                    GBufferTexture::ALL.len()
                ));
            }
        }

        if sensor.sensor_type == SensorType::LaneInvasion && sensor.frequency_hz > 100.0 {
            warnings.push(format!(
                "sensor '{}' runs lane detection at {} Hz",
                sensor.id, sensor.frequency_hz
            ));
        }
    }

    if !blueprint.session.ros_bridge_available && blueprint.sensors().any(|(_, s)| s.enable_ros) {
        warnings.push(
            "ROS forwarding requested but session.ros_bridge_available is false".to_string(),
        );
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Simulator: {}", summary.endpoint);
            println!("  Vehicles: {}", summary.vehicle_count);
            println!("  Sensors: {}", summary.sensor_count);
            println!("  Streams: {}", summary.stream_count);
            println!("  ROS forwarded: {}", summary.ros_count);
        }

        if !result.warnings.is_empty() {
            println!("\n⚠ Warnings:");
            for warning in &result.warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
