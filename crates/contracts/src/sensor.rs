//! SensorPacket - 传感器回调载荷
//!
//! Transport 产出、回调消费的数据包结构。

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{ActorId, SensorType, StreamKey};

/// 传感器数据包
///
/// 由 transport 的生产线程构造，经 `DeliveryTarget::deliver` 投递给回调。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorPacket {
    /// 产生数据的 actor
    pub actor_id: ActorId,

    /// 所属数据流 (primary / gbuffer)
    pub stream: StreamKey,

    /// 传感器类型
    pub sensor_type: SensorType,

    /// 仿真帧号
    pub frame: u64,

    /// 仿真时间戳 (seconds)
    pub timestamp: f64,

    /// 数据载荷 (零拷贝)
    pub payload: SensorPayload,
}

impl SensorPacket {
    /// 载荷字节数 (用于统计)
    pub fn payload_len(&self) -> usize {
        match &self.payload {
            SensorPayload::Image(img) => img.data.len(),
            SensorPayload::PointCloud(pc) => pc.data.len(),
            SensorPayload::Radar(radar) => radar.data.len(),
            SensorPayload::Raw(bytes) => bytes.len(),
            SensorPayload::Imu(_) | SensorPayload::Gnss(_) | SensorPayload::LaneInvasion(_) => 0,
        }
    }
}

/// 传感器数据载荷
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SensorPayload {
    /// 图像数据 (RGB / GBuffer 纹理)
    Image(ImageData),

    /// LiDAR 点云
    PointCloud(PointCloudData),

    /// IMU 数据
    Imu(ImuData),

    /// GNSS 数据
    Gnss(GnssData),

    /// Radar 数据
    Radar(RadarData),

    /// 车道入侵事件 (客户端传感器)
    LaneInvasion(LaneInvasionEvent),

    /// 原始字节 (fallback)
    Raw(Bytes),
}

/// 图像数据
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    pub data: Bytes,
}

/// 图像格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageFormat {
    Bgra8,
    /// 单通道 float32 (深度 / 模板)
    R32F,
}

/// LiDAR 点云数据
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointCloudData {
    /// 点数量
    pub num_points: u32,

    /// 每点字节数 (通常 16: x,y,z,intensity)
    pub point_stride: u32,

    pub data: Bytes,
}

/// IMU 数据
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ImuData {
    /// 加速度计 (m/s²)
    pub accelerometer: Vector3,

    /// 陀螺仪 (rad/s)
    pub gyroscope: Vector3,

    /// 指南针 (rad)
    pub compass: f64,
}

/// GNSS 数据
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GnssData {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
}

/// Radar 数据
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RadarData {
    pub num_detections: u32,
    pub data: Bytes,
}

/// 车道入侵事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaneInvasionEvent {
    /// 本帧越过的车道线
    pub crossed_markings: Vec<LaneMarking>,
}

/// 车道线类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaneMarking {
    Broken,
    Solid,
    SolidSolid,
    SolidBroken,
    BrokenSolid,
    Curb,
    Grass,
}

/// 3D 向量
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}
