//! ServerSideSensor - sensors whose data is produced by the simulator
//!
//! Adds two capabilities on top of [`SensorStream`]:
//! - [`AuxiliaryStreams`]: per-id GBuffer subscriptions
//! - [`RosBridge`]: forwarding toggle towards the ROS bridge
//!
//! All transitions are independent: ROS state never affects GBuffer slots and
//! GBuffer slots never affect the primary stream.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use contracts::{
    Result, SensorDataCallback, SensorIdentity, SensorType, StreamKey, Transport,
};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::sensor::{delegate_sensor_stream, Sensor, SensorStream};

/// GBuffer subscription capability
pub trait AuxiliaryStreams: SensorStream {
    /// Register `callback` for GBuffer `id`, replacing any previous one.
    ///
    /// Ids are not validated here; the transport may reject unknown ones.
    fn listen_to_gbuffer(&self, id: u32, callback: SensorDataCallback) -> Result<()>;

    /// `false` for ids that were never registered
    fn is_listening_gbuffer(&self, id: u32) -> bool;

    /// Clear GBuffer `id`. No-op for ids that were never registered.
    fn stop_gbuffer(&self, id: u32) -> Result<()>;
}

/// ROS bridge toggle capability
pub trait RosBridge {
    /// Idempotent: the bridge is contacted only on an actual transition
    fn enable_for_ros(&self) -> Result<()>;

    /// Idempotent: the bridge is contacted only on an actual transition
    fn disable_for_ros(&self) -> Result<()>;

    fn is_enabled_for_ros(&self) -> bool;
}

/// Server-side sensor
pub struct ServerSideSensor {
    sensor: Sensor,
    ros_enabled: Mutex<bool>,
}

impl ServerSideSensor {
    pub fn new(
        identity: SensorIdentity,
        sensor_type: SensorType,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            sensor: Sensor::new(identity, sensor_type, transport),
            ros_enabled: Mutex::new(false),
        }
    }

    /// Underlying base sensor
    pub fn sensor(&self) -> &Sensor {
        &self.sensor
    }

    /// Forward an opaque message to the simulator for this sensor.
    ///
    /// May block until the transport acknowledges it.
    pub fn send(&self, message: impl Into<Bytes>) -> Result<()> {
        self.sensor.ensure_alive()?;
        let message = message.into();
        let len = message.len();
        self.sensor
            .transport()
            .send_command(self.identity(), message)
            .inspect(|_| {
                debug!(actor_id = self.identity().actor_id, bytes = len, "command sent");
            })
    }

    /// GBuffer ids that currently have a callback
    pub fn listening_gbuffers(&self) -> Vec<u32> {
        self.sensor
            .active_streams()
            .into_iter()
            .filter_map(StreamKey::gbuffer_id)
            .collect()
    }

    /// Tear down all streams and switch the ROS bridge off (best effort).
    pub fn destroy(&self) -> Vec<StreamKey> {
        let keys = self.sensor.destroy();

        let mut ros_enabled = self.ros_enabled.lock();
        if *ros_enabled {
            if let Err(e) = self
                .sensor
                .transport()
                .set_ros_bridge(self.identity(), false)
            {
                warn!(
                    actor_id = self.identity().actor_id,
                    error = %e,
                    "failed to disable ROS bridge during teardown"
                );
            }
            *ros_enabled = false;
        }

        keys
    }

    fn set_ros(&self, enabled: bool) -> Result<()> {
        // Held across the transport call so toggles are serialized
        let mut ros_enabled = self.ros_enabled.lock();
        // destroy() closes the registry before taking this lock
        self.sensor.ensure_alive()?;
        if *ros_enabled == enabled {
            return Ok(());
        }

        if let Err(e) = self
            .sensor
            .transport()
            .set_ros_bridge(self.identity(), enabled)
        {
            warn!(
                actor_id = self.identity().actor_id,
                enabled,
                error = %e,
                "ROS bridge toggle rejected"
            );
            return Err(e);
        }

        *ros_enabled = enabled;
        info!(
            actor_id = self.identity().actor_id,
            enabled, "ROS bridge toggled"
        );
        Ok(())
    }
}

delegate_sensor_stream!(ServerSideSensor, sensor);

impl AuxiliaryStreams for ServerSideSensor {
    fn listen_to_gbuffer(&self, id: u32, callback: SensorDataCallback) -> Result<()> {
        self.sensor.subscribe(StreamKey::GBuffer(id), callback)
    }

    fn is_listening_gbuffer(&self, id: u32) -> bool {
        self.sensor.is_subscribed(StreamKey::GBuffer(id))
    }

    fn stop_gbuffer(&self, id: u32) -> Result<()> {
        self.sensor.unsubscribe(StreamKey::GBuffer(id))
    }
}

impl RosBridge for ServerSideSensor {
    fn enable_for_ros(&self) -> Result<()> {
        self.set_ros(true)
    }

    fn disable_for_ros(&self) -> Result<()> {
        self.set_ros(false)
    }

    fn is_enabled_for_ros(&self) -> bool {
        *self.ros_enabled.lock()
    }
}

impl fmt::Display for ServerSideSensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ServerSideSensor({}, listening={}, gbuffers={:?}, ros={})",
            self.identity(),
            self.is_listening(),
            self.listening_gbuffers(),
            self.is_enabled_for_ros()
        )
    }
}
