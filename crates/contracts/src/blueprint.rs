//! ScenarioBlueprint - Config Loader 输出
//!
//! 描述一次运行的完整配置：会话参数、车辆及其挂载的传感器、每个传感器的订阅计划。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的场景配置蓝图
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ScenarioBlueprint {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 会话设置
    #[serde(default)]
    #[validate(nested)]
    pub session: SessionConfig,

    /// 车辆定义列表
    #[validate(nested)]
    pub vehicles: Vec<VehicleConfig>,
}

impl ScenarioBlueprint {
    /// 所有传感器 (附带所属车辆 ID)
    pub fn sensors(&self) -> impl Iterator<Item = (&VehicleConfig, &SensorSpec)> {
        self.vehicles
            .iter()
            .flat_map(|vehicle| vehicle.sensors.iter().map(move |sensor| (vehicle, sensor)))
    }

    /// 传感器总数
    pub fn sensor_count(&self) -> usize {
        self.vehicles.iter().map(|v| v.sensors.len()).sum()
    }

    /// 按 ID 查找传感器
    pub fn find_sensor(&self, sensor_id: &str) -> Option<&SensorSpec> {
        self.sensors()
            .map(|(_, sensor)| sensor)
            .find(|sensor| sensor.id == sensor_id)
    }
}

/// 会话配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SessionConfig {
    /// 仿真服务器地址
    #[serde(default = "default_host")]
    #[validate(length(min = 1, message = "host must not be empty"))]
    pub host: String,

    /// 仿真服务器端口
    #[serde(default = "default_port")]
    #[validate(range(min = 1, message = "port must be >= 1"))]
    pub port: u16,

    /// 请求超时 (毫秒)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// ROS bridge 是否可用
    #[serde(default = "default_true")]
    pub ros_bridge_available: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout_ms: default_timeout_ms(),
            ros_bridge_available: true,
        }
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    2000
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_true() -> bool {
    true
}

/// 车辆配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct VehicleConfig {
    /// 唯一标识符
    #[validate(length(min = 1, message = "vehicle id must not be empty"))]
    pub id: String,

    /// 蓝图名称 (e.g., "vehicle.tesla.model3")
    pub blueprint: String,

    /// 挂载的传感器列表
    #[serde(default)]
    #[validate(nested)]
    pub sensors: Vec<SensorSpec>,
}

/// 传感器配置与订阅计划
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SensorSpec {
    /// 唯一标识符 (用作 role_name)
    #[validate(length(min = 1, message = "sensor id must not be empty"))]
    pub id: String,

    /// 传感器类型
    pub sensor_type: SensorType,

    /// 采样频率 (Hz)，必须 > 0
    #[validate(range(exclusive_min = 0.0, message = "frequency_hz must be > 0"))]
    pub frequency_hz: f64,

    /// 是否订阅主数据流
    #[serde(default = "default_true")]
    pub listen: bool,

    /// 需要订阅的 GBuffer ID (仅服务器端传感器)
    #[serde(default)]
    pub gbuffers: Vec<u32>,

    /// 是否启用 ROS 转发 (仅服务器端传感器)
    #[serde(default)]
    pub enable_ros: bool,

    /// 传感器特定属性
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

/// 传感器类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorType {
    Camera,
    Lidar,
    Imu,
    Gnss,
    Radar,
    LaneInvasion,
}

/// 数据过滤发生的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorSide {
    /// 仿真服务器端产出数据
    Server,
    /// 客户端进程内产出数据
    Client,
}

impl SensorType {
    /// 仿真器蓝图名称
    pub fn blueprint_id(self) -> &'static str {
        match self {
            Self::Camera => "sensor.camera.rgb",
            Self::Lidar => "sensor.lidar.ray_cast",
            Self::Imu => "sensor.other.imu",
            Self::Gnss => "sensor.other.gnss",
            Self::Radar => "sensor.other.radar",
            Self::LaneInvasion => "sensor.other.lane_invasion",
        }
    }

    pub fn side(self) -> SensorSide {
        match self {
            Self::LaneInvasion => SensorSide::Client,
            _ => SensorSide::Server,
        }
    }

    /// 是否能输出 GBuffer 纹理
    pub fn supports_gbuffers(self) -> bool {
        matches!(self, Self::Camera)
    }
}
