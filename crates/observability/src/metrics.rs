//! 传感器数据流指标收集模块
//!
//! 记录订阅状态变化、数据包接收、ROS 转发开关和下游消费队列的运行指标，
//! 并在内存中聚合每个数据流的统计信息用于运行摘要。

use std::collections::BTreeMap;
use std::fmt;

use contracts::{SensorPacket, StreamKey};
use metrics::{counter, gauge, histogram};

/// 记录传感器数据包接收
pub fn record_packet_received(sensor_id: &str, stream: StreamKey, bytes: usize) {
    counter!(
        "sensor_streams_packets_received_total",
        "sensor_id" => sensor_id.to_string(),
        "stream" => stream.to_string()
    )
    .increment(1);

    if bytes > 0 {
        counter!(
            "sensor_streams_bytes_received_total",
            "sensor_id" => sensor_id.to_string(),
            "stream" => stream.to_string()
        )
        .increment(bytes as u64);
    }
}

/// 记录数据流订阅状态 (1 = listening)
pub fn record_stream_state(sensor_id: &str, stream: StreamKey, listening: bool) {
    gauge!(
        "sensor_streams_stream_listening",
        "sensor_id" => sensor_id.to_string(),
        "stream" => stream.to_string()
    )
    .set(if listening { 1.0 } else { 0.0 });
}

/// 记录 ROS 转发状态 (1 = enabled)
pub fn record_ros_state(sensor_id: &str, enabled: bool) {
    gauge!(
        "sensor_streams_ros_enabled",
        "sensor_id" => sensor_id.to_string()
    )
    .set(if enabled { 1.0 } else { 0.0 });
}

/// 记录发往 transport 的请求结果
pub fn record_command_result(sensor_id: &str, request: &str, success: bool) {
    let status = if success { "success" } else { "rejected" };
    counter!(
        "sensor_streams_transport_requests_total",
        "sensor_id" => sensor_id.to_string(),
        "request" => request.to_string(),
        "status" => status
    )
    .increment(1);
}

/// 记录消费队列已满导致的丢弃
pub fn record_consumer_drop(sensor_id: &str) {
    counter!(
        "sensor_streams_consumer_dropped_total",
        "sensor_id" => sensor_id.to_string()
    )
    .increment(1);
}

/// 记录消费队列深度
pub fn record_queue_depth(depth: usize) {
    gauge!("sensor_streams_queue_depth").set(depth as f64);
}

/// 记录从回调到消费的延迟
pub fn record_consume_latency_ms(latency_ms: f64) {
    histogram!("sensor_streams_consume_latency_ms").record(latency_ms);
}

/// 单个数据流的聚合统计
#[derive(Debug, Clone, Default)]
pub struct StreamStats {
    /// 接收包数
    pub packets: u64,
    /// 接收字节数
    pub bytes: u64,
    /// 最后一帧编号
    pub last_frame: Option<u64>,
    /// 包间隔 (毫秒，基于仿真时间戳)
    pub interval_ms: RunningStats,
    last_timestamp: Option<f64>,
}

impl StreamStats {
    fn update(&mut self, packet: &SensorPacket) {
        self.packets += 1;
        self.bytes += packet.payload_len() as u64;
        self.last_frame = Some(packet.frame);

        if let Some(previous) = self.last_timestamp {
            self.interval_ms.push((packet.timestamp - previous) * 1000.0);
        }
        self.last_timestamp = Some(packet.timestamp);
    }
}

/// 数据流指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。按 (sensor_id, stream) 分组。
#[derive(Debug, Clone, Default)]
pub struct DeliveryStatsAggregator {
    streams: BTreeMap<(String, StreamKey), StreamStats>,
    dropped: BTreeMap<String, u64>,
}

impl DeliveryStatsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一个已消费的数据包
    pub fn update(&mut self, sensor_id: &str, packet: &SensorPacket) {
        self.streams
            .entry((sensor_id.to_string(), packet.stream))
            .or_default()
            .update(packet);
    }

    /// 记录一次消费侧丢弃
    pub fn record_drop(&mut self, sensor_id: &str) {
        *self.dropped.entry(sensor_id.to_string()).or_insert(0) += 1;
    }

    pub fn stream(&self, sensor_id: &str, stream: StreamKey) -> Option<&StreamStats> {
        self.streams.get(&(sensor_id.to_string(), stream))
    }

    pub fn total_packets(&self) -> u64 {
        self.streams.values().map(|s| s.packets).sum()
    }

    pub fn total_dropped(&self) -> u64 {
        self.dropped.values().sum()
    }

    /// 生成摘要报告
    pub fn summary(&self) -> DeliverySummary {
        let total_packets = self.total_packets();
        let total_dropped = self.total_dropped();
        let offered = total_packets + total_dropped;

        DeliverySummary {
            total_packets,
            total_bytes: self.streams.values().map(|s| s.bytes).sum(),
            total_dropped,
            drop_rate: if offered > 0 {
                total_dropped as f64 / offered as f64 * 100.0
            } else {
                0.0
            },
            streams: self
                .streams
                .iter()
                .map(|((sensor_id, stream), stats)| StreamSummary {
                    sensor_id: sensor_id.clone(),
                    stream: *stream,
                    packets: stats.packets,
                    bytes: stats.bytes,
                    interval_ms: StatsSummary::from(&stats.interval_ms),
                })
                .collect(),
            dropped: self.dropped.clone(),
        }
    }
}

/// 单流摘要
#[derive(Debug, Clone)]
pub struct StreamSummary {
    pub sensor_id: String,
    pub stream: StreamKey,
    pub packets: u64,
    pub bytes: u64,
    pub interval_ms: StatsSummary,
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct DeliverySummary {
    pub total_packets: u64,
    pub total_bytes: u64,
    pub total_dropped: u64,
    pub drop_rate: f64,
    pub streams: Vec<StreamSummary>,
    pub dropped: BTreeMap<String, u64>,
}

impl fmt::Display for DeliverySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Delivery Summary ===")?;
        writeln!(f, "Total packets: {}", self.total_packets)?;
        writeln!(f, "Total bytes: {}", self.total_bytes)?;
        writeln!(
            f,
            "Dropped by consumer: {} ({:.2}%)",
            self.total_dropped, self.drop_rate
        )?;

        if !self.streams.is_empty() {
            writeln!(f, "Streams:")?;
            for stream in &self.streams {
                writeln!(
                    f,
                    "  {}/{}: {} packets, {} bytes, interval(ms) {}",
                    stream.sensor_id, stream.stream, stream.packets, stream.bytes, stream.interval_ms
                )?;
            }
        }

        if !self.dropped.is_empty() {
            writeln!(f, "Dropped per sensor:")?;
            for (sensor, count) in &self.dropped {
                writeln!(f, "  {}: {}", sensor, count)?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
            return;
        }

        self.min = self.min.min(value);
        self.max = self.max.max(value);

        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use contracts::{SensorPayload, SensorType};

    fn packet(stream: StreamKey, frame: u64, timestamp: f64, len: usize) -> SensorPacket {
        SensorPacket {
            actor_id: 1000,
            stream,
            sensor_type: SensorType::Camera,
            frame,
            timestamp,
            payload: SensorPayload::Raw(Bytes::from(vec![0u8; len])),
        }
    }

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for value in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(value);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_groups_by_stream() {
        let mut aggregator = DeliveryStatsAggregator::new();
        aggregator.update("cam", &packet(StreamKey::Primary, 1, 0.00, 10));
        aggregator.update("cam", &packet(StreamKey::Primary, 2, 0.05, 10));
        aggregator.update("cam", &packet(StreamKey::GBuffer(1), 1, 0.00, 4));
        aggregator.record_drop("cam");

        let primary = aggregator.stream("cam", StreamKey::Primary).unwrap();
        assert_eq!(primary.packets, 2);
        assert_eq!(primary.bytes, 20);
        assert_eq!(primary.last_frame, Some(2));
        assert!((primary.interval_ms.mean() - 50.0).abs() < 1e-9);

        let gbuffer = aggregator.stream("cam", StreamKey::GBuffer(1)).unwrap();
        assert_eq!(gbuffer.packets, 1);
        assert_eq!(gbuffer.interval_ms.count(), 0);

        assert_eq!(aggregator.total_packets(), 3);
        assert_eq!(aggregator.total_dropped(), 1);
    }

    #[test]
    fn test_summary_display() {
        let mut aggregator = DeliveryStatsAggregator::new();
        for frame in 0..3 {
            aggregator.update("cam", &packet(StreamKey::Primary, frame, frame as f64, 1));
        }
        aggregator.record_drop("cam");

        let summary = aggregator.summary();
        assert!((summary.drop_rate - 25.0).abs() < 1e-9);

        let output = summary.to_string();
        assert!(output.contains("Total packets: 3"));
        assert!(output.contains("25.00%"));
        assert!(output.contains("cam/primary: 3 packets"));
    }

    #[test]
    fn test_empty_summary() {
        let summary = DeliveryStatsAggregator::new().summary();
        assert_eq!(summary.total_packets, 0);
        assert_eq!(summary.drop_rate, 0.0);
        assert!(summary.streams.is_empty());
    }
}
