//! SensorWorld - arena of live sensors keyed by actor id
//!
//! Sensors are looked up by their stable [`ActorId`] instead of being shared
//! as raw pointers. The world is also the delivery entry point handed to the
//! transport, and the receiver of actor destruction notifications.

use std::collections::HashMap;

use contracts::{ActorId, DeliveryTarget, SensorPacket, StreamKey};
use parking_lot::RwLock;
use tracing::{info, warn};

use crate::actor::SensorActor;

/// Arena of spawned sensors
#[derive(Default)]
pub struct SensorWorld {
    sensors: RwLock<HashMap<ActorId, SensorActor>>,
}

impl SensorWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sensor. Returns the handle previously stored under the same
    /// actor id, which the caller is expected to destroy.
    pub fn register(&self, actor: SensorActor) -> Option<SensorActor> {
        let actor_id = actor.identity().actor_id;
        let previous = self.sensors.write().insert(actor_id, actor);
        if previous.is_some() {
            warn!(actor_id, "actor id registered twice, replacing handle");
        }
        previous
    }

    pub fn get(&self, actor_id: ActorId) -> Option<SensorActor> {
        self.sensors.read().get(&actor_id).cloned()
    }

    pub fn contains(&self, actor_id: ActorId) -> bool {
        self.sensors.read().contains_key(&actor_id)
    }

    pub fn len(&self) -> usize {
        self.sensors.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.read().is_empty()
    }

    /// Sorted ids of all live sensors
    pub fn actor_ids(&self) -> Vec<ActorId> {
        let mut ids: Vec<_> = self.sensors.read().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Destruction notification from the actor model.
    ///
    /// Removes the sensor and clears all of its callback slots. Returns the
    /// streams that were active, or `None` for an unknown actor.
    pub fn on_actor_destroyed(&self, actor_id: ActorId) -> Option<Vec<StreamKey>> {
        let actor = self.sensors.write().remove(&actor_id)?;
        let cleared = actor.destroy();
        info!(actor_id, cleared = cleared.len(), "sensor removed from world");
        Some(cleared)
    }

    /// Destroy every sensor. Returns how many were removed.
    pub fn destroy_all(&self) -> usize {
        let drained: Vec<_> = self.sensors.write().drain().collect();
        for (_, actor) in &drained {
            actor.destroy();
        }
        drained.len()
    }
}

impl DeliveryTarget for SensorWorld {
    fn deliver(&self, actor_id: ActorId, key: StreamKey, packet: SensorPacket) -> bool {
        // Clone the handle so the lock is not held while the callback runs
        let actor = self.sensors.read().get(&actor_id).cloned();
        match actor {
            Some(actor) => actor.base().deliver(key, packet),
            None => false,
        }
    }
}
