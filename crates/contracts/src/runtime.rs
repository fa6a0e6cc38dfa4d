//! Runtime identities handed out by the actor model.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Simulator actor handle type
pub type ActorId = u32;

/// Identity of a spawned sensor actor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SensorIdentity {
    /// Actor handle assigned by the simulator
    pub actor_id: ActorId,

    /// Blueprint type id (e.g. "sensor.camera.rgb")
    pub type_id: String,

    /// Scenario-level name of the sensor
    pub role_name: String,
}

impl SensorIdentity {
    pub fn new(actor_id: ActorId, type_id: impl Into<String>, role_name: impl Into<String>) -> Self {
        Self {
            actor_id,
            type_id: type_id.into(),
            role_name: role_name.into(),
        }
    }
}

impl fmt::Display for SensorIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}(id={}, role={})",
            self.type_id, self.actor_id, self.role_name
        )
    }
}
