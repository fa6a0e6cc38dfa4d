//! 配置校验模块
//!
//! 校验规则：
//! - 字段级规则 (validator derive)：ID 非空、frequency_hz > 0、port >= 1
//! - vehicle_id 唯一
//! - sensor_id 全局唯一 (用作 role_name)
//! - 同一传感器的 GBuffer ID 不重复
//! - GBuffer 订阅与 ROS 转发仅限服务器端传感器

use std::collections::HashSet;

use contracts::{ContractError, ScenarioBlueprint, SensorSide};
use validator::Validate;

/// 校验 ScenarioBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &ScenarioBlueprint) -> Result<(), ContractError> {
    validate_fields(blueprint)?;
    validate_vehicle_ids(blueprint)?;
    validate_sensor_ids(blueprint)?;
    validate_subscription_plans(blueprint)?;
    Ok(())
}

/// 字段级规则
fn validate_fields(blueprint: &ScenarioBlueprint) -> Result<(), ContractError> {
    blueprint
        .validate()
        .map_err(|e| ContractError::config_validation("blueprint", e.to_string()))
}

/// 校验 vehicle_id 唯一性
fn validate_vehicle_ids(blueprint: &ScenarioBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for vehicle in &blueprint.vehicles {
        if !seen.insert(&vehicle.id) {
            return Err(ContractError::config_validation(
                format!("vehicles[id={}]", vehicle.id),
                "duplicate vehicle_id",
            ));
        }
    }
    Ok(())
}

/// 校验 sensor_id 唯一性 (全局)
fn validate_sensor_ids(blueprint: &ScenarioBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (vehicle, sensor) in blueprint.sensors() {
        if !seen.insert(&sensor.id) {
            return Err(ContractError::config_validation(
                format!("vehicles[{}].sensors[id={}]", vehicle.id, sensor.id),
                "duplicate sensor_id",
            ));
        }
    }
    Ok(())
}

/// 校验订阅计划
fn validate_subscription_plans(blueprint: &ScenarioBlueprint) -> Result<(), ContractError> {
    for (vehicle, sensor) in blueprint.sensors() {
        let field = |name: &str| format!("vehicles[{}].sensors[{}].{name}", vehicle.id, sensor.id);
        let server_side = sensor.sensor_type.side() == SensorSide::Server;

        if !sensor.gbuffers.is_empty() && !server_side {
            return Err(ContractError::config_validation(
                field("gbuffers"),
                format!("{:?} sensors have no gbuffer streams", sensor.sensor_type),
            ));
        }

        let mut seen = HashSet::new();
        if let Some(dup) = sensor.gbuffers.iter().find(|id| !seen.insert(**id)) {
            return Err(ContractError::config_validation(
                field("gbuffers"),
                format!("duplicate gbuffer id {dup}"),
            ));
        }

        if sensor.enable_ros && !server_side {
            return Err(ContractError::config_validation(
                field("enable_ros"),
                format!("{:?} sensors cannot be bridged to ROS", sensor.sensor_type),
            ));
        }
    }
    Ok(())
}
