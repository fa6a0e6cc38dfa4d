//! Session statistics.

use std::fmt;
use std::time::Duration;

use observability::DeliveryStatsAggregator;

/// Why the consume loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopReason {
    /// Packet limit reached
    PacketLimit,
    /// Configured duration elapsed
    Duration,
    /// Ctrl+C / SIGTERM
    Signal,
    /// Every sender is gone
    #[default]
    StreamsClosed,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::PacketLimit => "packet limit reached",
            Self::Duration => "duration elapsed",
            Self::Signal => "shutdown signal",
            Self::StreamsClosed => "all streams closed",
        };
        f.write_str(text)
    }
}

/// Statistics from a session run
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    /// Packets consumed
    pub packets_received: u64,

    /// Packets dropped because the consumer queue was full
    pub packets_dropped: u64,

    /// Total duration of the run
    pub duration: Duration,

    /// Sensors spawned
    pub active_sensors: usize,

    /// Streams subscribed (primary + GBuffer)
    pub active_streams: usize,

    /// Sensors forwarded to ROS
    pub ros_enabled: usize,

    pub stop_reason: StopReason,

    /// Per-stream delivery statistics
    pub delivery: DeliveryStatsAggregator,
}

impl SessionStats {
    /// Consumed packets per second
    pub fn throughput(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.packets_received as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Session Statistics                        ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Stopped: {}", self.stop_reason);
        println!("   ├─ Packets received: {}", self.packets_received);
        println!("   ├─ Packets dropped: {}", self.packets_dropped);
        println!("   ├─ Throughput: {:.2} packets/s", self.throughput());
        println!("   ├─ Sensors: {}", self.active_sensors);
        println!("   ├─ Streams: {}", self.active_streams);
        println!("   └─ ROS forwarded: {}", self.ros_enabled);

        println!("\n{}", self.delivery.summary());
    }
}
