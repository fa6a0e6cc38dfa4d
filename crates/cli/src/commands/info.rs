//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::{GBufferTexture, ScenarioBlueprint, SensorSide, SensorSpec};

use crate::cli::InfoArgs;
use crate::error::ensure_config_exists;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    session: SessionInfo,
    vehicles: Vec<VehicleInfo>,
}

#[derive(Serialize)]
struct SessionInfo {
    host: String,
    port: u16,
    timeout_ms: u64,
    ros_bridge_available: bool,
}

#[derive(Serialize)]
struct VehicleInfo {
    id: String,
    blueprint: String,
    sensor_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sensors: Vec<SensorInfo>,
}

#[derive(Serialize)]
struct SensorInfo {
    id: String,
    blueprint: &'static str,
    side: &'static str,
    frequency_hz: f64,
    listen: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    gbuffers: Vec<GBufferInfo>,
    enable_ros: bool,
    #[serde(skip_serializing_if = "std::collections::HashMap::is_empty")]
    attributes: std::collections::HashMap<String, String>,
}

#[derive(Serialize)]
struct GBufferInfo {
    id: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    texture: Option<GBufferTexture>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "loading configuration info");

    ensure_config_exists(&args.config)?;

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&blueprint, args.sensors);
        let json =
            serde_json::to_string_pretty(&info).context("failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, args.sensors);
    }

    Ok(())
}

fn side_name(spec: &SensorSpec) -> &'static str {
    match spec.sensor_type.side() {
        SensorSide::Server => "server",
        SensorSide::Client => "client",
    }
}

fn sensor_info(spec: &SensorSpec) -> SensorInfo {
    SensorInfo {
        id: spec.id.clone(),
        blueprint: spec.sensor_type.blueprint_id(),
        side: side_name(spec),
        frequency_hz: spec.frequency_hz,
        listen: spec.listen,
        gbuffers: spec
            .gbuffers
            .iter()
            .map(|&id| GBufferInfo {
                id,
                texture: GBufferTexture::from_id(id),
            })
            .collect(),
        enable_ros: spec.enable_ros,
        attributes: spec.attributes.clone(),
    }
}

fn build_config_info(blueprint: &ScenarioBlueprint, with_sensors: bool) -> ConfigInfo {
    let vehicles = blueprint
        .vehicles
        .iter()
        .map(|v| VehicleInfo {
            id: v.id.clone(),
            blueprint: v.blueprint.clone(),
            sensor_count: v.sensors.len(),
            sensors: if with_sensors {
                v.sensors.iter().map(sensor_info).collect()
            } else {
                Vec::new()
            },
        })
        .collect();

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        session: SessionInfo {
            host: blueprint.session.host.clone(),
            port: blueprint.session.port,
            timeout_ms: blueprint.session.timeout_ms,
            ros_bridge_available: blueprint.session.ros_bridge_available,
        },
        vehicles,
    }
}

fn print_config_info(blueprint: &ScenarioBlueprint, with_sensors: bool) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Sensor Streams Configuration                   ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let session = &blueprint.session;
    println!("📍 Session");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   ├─ Simulator: {}:{}", session.host, session.port);
    println!("   ├─ Timeout: {} ms", session.timeout_ms);
    println!(
        "   └─ ROS bridge: {}",
        if session.ros_bridge_available {
            "available"
        } else {
            "unavailable"
        }
    );

    println!("\n🚗 Vehicles ({})", blueprint.vehicles.len());
    for (i, vehicle) in blueprint.vehicles.iter().enumerate() {
        let is_last = i == blueprint.vehicles.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };

        println!("   {} {} ({})", prefix, vehicle.id, vehicle.blueprint);

        if !with_sensors || vehicle.sensors.is_empty() {
            println!("   {}  └─ {} sensors", child_prefix, vehicle.sensors.len());
            continue;
        }

        println!("   {}  📷 Sensors ({}):", child_prefix, vehicle.sensors.len());
        for (j, sensor) in vehicle.sensors.iter().enumerate() {
            let sensor_prefix = if j == vehicle.sensors.len() - 1 {
                "└─"
            } else {
                "├─"
            };
            println!(
                "   {}     {} {} ({}, {} side, {} Hz)",
                child_prefix,
                sensor_prefix,
                sensor.id,
                sensor.sensor_type.blueprint_id(),
                side_name(sensor),
                sensor.frequency_hz
            );

            let gbuffers: Vec<String> = sensor
                .gbuffers
                .iter()
                .map(|&id| match GBufferTexture::from_id(id) {
                    Some(texture) => format!("{id} ({texture:?})"),
                    None => format!("{id} (unknown)"),
                })
                .collect();
            println!(
                "   {}          listen={} ros={} gbuffers=[{}]",
                child_prefix,
                sensor.listen,
                sensor.enable_ros,
                gbuffers.join(", ")
            );
        }
    }

    println!();
}
