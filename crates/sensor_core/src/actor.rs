//! SensorActor - tagged handle over the sensor variants
//!
//! Replaces the inheritance chain with composition: every variant exposes the
//! [`SensorStream`] capability, only server-side sensors expose
//! [`AuxiliaryStreams`] and [`RosBridge`].

use std::fmt;
use std::sync::Arc;

use contracts::{SensorIdentity, SensorSide, SensorType, StreamKey, Transport};

use crate::client_side::{ClientSideSensor, LaneInvasionSensor};
use crate::sensor::{Sensor, SensorStream};
use crate::server_side::{AuxiliaryStreams, RosBridge, ServerSideSensor};

/// Cheap-to-clone handle to a spawned sensor
#[derive(Clone)]
pub enum SensorActor {
    ServerSide(Arc<ServerSideSensor>),
    ClientSide(Arc<ClientSideSensor>),
    LaneInvasion(Arc<LaneInvasionSensor>),
}

impl SensorActor {
    /// Wrap a freshly spawned actor as the variant matching its type
    pub fn wrap(
        identity: SensorIdentity,
        sensor_type: SensorType,
        transport: Arc<dyn Transport>,
    ) -> Self {
        match (sensor_type, sensor_type.side()) {
            (SensorType::LaneInvasion, _) => {
                Self::LaneInvasion(Arc::new(LaneInvasionSensor::new(identity, transport)))
            }
            (_, SensorSide::Client) => Self::ClientSide(Arc::new(ClientSideSensor::new(
                identity,
                sensor_type,
                transport,
            ))),
            (_, SensorSide::Server) => Self::ServerSide(Arc::new(ServerSideSensor::new(
                identity,
                sensor_type,
                transport,
            ))),
        }
    }

    /// Base sensor of any variant
    pub fn base(&self) -> &Sensor {
        match self {
            Self::ServerSide(sensor) => sensor.sensor(),
            Self::ClientSide(sensor) => sensor.sensor(),
            Self::LaneInvasion(sensor) => sensor.sensor(),
        }
    }

    /// Primary-stream capability
    pub fn stream(&self) -> &dyn SensorStream {
        match self {
            Self::ServerSide(sensor) => &**sensor as &dyn SensorStream,
            Self::ClientSide(sensor) => &**sensor as &dyn SensorStream,
            Self::LaneInvasion(sensor) => &**sensor as &dyn SensorStream,
        }
    }

    /// GBuffer capability (server-side only)
    pub fn auxiliary(&self) -> Option<&dyn AuxiliaryStreams> {
        match self {
            Self::ServerSide(sensor) => Some(&**sensor as &dyn AuxiliaryStreams),
            _ => None,
        }
    }

    /// ROS bridge capability (server-side only)
    pub fn ros_bridge(&self) -> Option<&dyn RosBridge> {
        match self {
            Self::ServerSide(sensor) => Some(&**sensor as &dyn RosBridge),
            _ => None,
        }
    }

    pub fn as_server_side(&self) -> Option<&Arc<ServerSideSensor>> {
        match self {
            Self::ServerSide(sensor) => Some(sensor),
            _ => None,
        }
    }

    pub fn identity(&self) -> &SensorIdentity {
        self.stream().identity()
    }

    /// Tear the sensor down; returns the streams that were active
    pub fn destroy(&self) -> Vec<StreamKey> {
        match self {
            Self::ServerSide(sensor) => sensor.destroy(),
            _ => self.base().destroy(),
        }
    }
}

impl fmt::Display for SensorActor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServerSide(sensor) => fmt::Display::fmt(&**sensor, f),
            Self::ClientSide(sensor) => fmt::Display::fmt(&**sensor, f),
            Self::LaneInvasion(sensor) => fmt::Display::fmt(&**sensor, f),
        }
    }
}

impl fmt::Debug for SensorActor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SensorActor({self})")
    }
}
