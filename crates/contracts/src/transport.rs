//! Transport boundary
//!
//! The transport collaborator moves simulation data between the simulator and
//! this process. The sensor core consumes it through [`Transport`] and exposes
//! [`DeliveryTarget`] back to it.

use bytes::Bytes;
use std::fmt;

use crate::{ActorId, Result, SensorIdentity, SensorPacket, StreamKey};

/// Request kinds the transport may refuse (used in error reporting)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportRequest {
    StartDelivery(StreamKey),
    StopDelivery(StreamKey),
    SendCommand,
    SetRosBridge(bool),
}

impl fmt::Display for TransportRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StartDelivery(key) => write!(f, "start_delivery({key})"),
            Self::StopDelivery(key) => write!(f, "stop_delivery({key})"),
            Self::SendCommand => write!(f, "send_command"),
            Self::SetRosBridge(enabled) => write!(f, "set_ros_bridge({enabled})"),
        }
    }
}

/// Transport collaborator consumed by sensors
///
/// All calls are in-memory notifications except [`Transport::send_command`],
/// which may block awaiting acknowledgment.
pub trait Transport: Send + Sync {
    /// Begin (or keep) delivering `key` for this sensor
    fn start_delivery(&self, key: StreamKey, sensor: &SensorIdentity) -> Result<()>;

    /// Stop delivering `key` for this sensor
    fn stop_delivery(&self, key: StreamKey, sensor: &SensorIdentity) -> Result<()>;

    /// Forward an opaque outbound message
    ///
    /// Fails with `NotConnected` when the session is closed.
    fn send_command(&self, sensor: &SensorIdentity, message: Bytes) -> Result<()>;

    /// Toggle forwarding of this sensor's data to the ROS bridge
    fn set_ros_bridge(&self, sensor: &SensorIdentity, enabled: bool) -> Result<()>;
}

/// Delivery entry point exposed to the transport
///
/// Implementations look up the current callback for `(actor_id, key)` and
/// invoke it, or silently drop the packet when none is registered.
pub trait DeliveryTarget: Send + Sync {
    /// Returns `true` when a callback consumed the packet
    fn deliver(&self, actor_id: ActorId, key: StreamKey, packet: SensorPacket) -> bool;
}
