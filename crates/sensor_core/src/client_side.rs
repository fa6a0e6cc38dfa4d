//! Client-side sensors
//!
//! Data for these sensors is computed in the client process by the transport;
//! they carry no subscription state beyond the primary stream.

use std::fmt;
use std::sync::Arc;

use contracts::{SensorIdentity, SensorType, Transport};

use crate::sensor::{delegate_sensor_stream, Sensor, SensorStream};

/// Sensor whose data is produced client-side
pub struct ClientSideSensor {
    sensor: Sensor,
}

impl ClientSideSensor {
    pub fn new(
        identity: SensorIdentity,
        sensor_type: SensorType,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            sensor: Sensor::new(identity, sensor_type, transport),
        }
    }

    pub fn sensor(&self) -> &Sensor {
        &self.sensor
    }
}

delegate_sensor_stream!(ClientSideSensor, sensor);

impl fmt::Display for ClientSideSensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ClientSideSensor({}, listening={})",
            self.identity(),
            self.is_listening()
        )
    }
}

/// Client-side sensor whose primary payload is a lane invasion event
pub struct LaneInvasionSensor {
    inner: ClientSideSensor,
}

impl LaneInvasionSensor {
    pub fn new(identity: SensorIdentity, transport: Arc<dyn Transport>) -> Self {
        Self {
            inner: ClientSideSensor::new(identity, SensorType::LaneInvasion, transport),
        }
    }

    pub fn sensor(&self) -> &Sensor {
        self.inner.sensor()
    }
}

delegate_sensor_stream!(LaneInvasionSensor, inner);

impl fmt::Display for LaneInvasionSensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LaneInvasionSensor({}, listening={})",
            self.identity(),
            self.is_listening()
        )
    }
}
