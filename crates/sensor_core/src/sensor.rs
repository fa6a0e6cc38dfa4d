//! Sensor - base entity for every simulated sensor
//!
//! Owns the sensor's [`CallbackRegistry`] and forwards subscription changes to
//! the transport. Specialised sensors compose a `Sensor` and expose it through
//! the [`SensorStream`] capability.
//!
//! Every slot change is made under the sensor's subscription lock together
//! with the matching transport call, so the transport's last notification for
//! a stream always agrees with the registry. Deliveries never take that lock.

use std::fmt;
use std::sync::Arc;

use contracts::{
    ContractError, Result, SensorDataCallback, SensorIdentity, SensorPacket, SensorType,
    StreamKey, Transport,
};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::registry::{CallbackRegistry, SetOutcome};

/// Primary-stream capability shared by all sensors
///
/// # Example
///
/// ```ignore
/// sensor.listen(Arc::new(|packet| {
///     println!("frame {}", packet.frame);
/// }))?;
/// // ... use sensor ...
/// sensor.stop()?;
/// ```
pub trait SensorStream: Send + Sync {
    /// Identity assigned by the actor model
    fn identity(&self) -> &SensorIdentity;

    /// Register the primary-stream callback, replacing any previous one
    fn listen(&self, callback: SensorDataCallback) -> Result<()>;

    /// Clear the primary-stream callback. Idempotent.
    fn stop(&self) -> Result<()>;

    fn is_listening(&self) -> bool;
}

/// Base sensor
pub struct Sensor {
    identity: SensorIdentity,
    sensor_type: SensorType,
    registry: CallbackRegistry<SensorPacket>,
    transport: Arc<dyn Transport>,
    // serializes registry mutations with their transport calls
    subscriptions: Mutex<()>,
}

impl Sensor {
    pub fn new(
        identity: SensorIdentity,
        sensor_type: SensorType,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            identity,
            sensor_type,
            registry: CallbackRegistry::new(),
            transport,
            subscriptions: Mutex::new(()),
        }
    }

    pub fn sensor_type(&self) -> SensorType {
        self.sensor_type
    }

    pub(crate) fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    /// Register `callback` for `key` and ask the transport to deliver it.
    ///
    /// If the transport refuses, the slot goes back to its previous state.
    pub(crate) fn subscribe(&self, key: StreamKey, callback: SensorDataCallback) -> Result<()> {
        let _guard = self.subscriptions.lock();
        let previous = match self.registry.set(key, callback) {
            Some(SetOutcome::Replaced(previous)) => Some(previous),
            Some(SetOutcome::Inserted) => None,
            None => {
                return Err(ContractError::ActorDestroyed {
                    actor_id: self.identity.actor_id,
                })
            }
        };
        let replaced = previous.is_some();

        if let Err(e) = self.transport.start_delivery(key, &self.identity) {
            warn!(
                actor_id = self.identity.actor_id,
                stream = %key,
                error = %e,
                "transport refused stream start"
            );
            self.registry.restore(key, previous);
            return Err(e);
        }

        debug!(
            actor_id = self.identity.actor_id,
            stream = %key,
            replaced,
            "stream listening"
        );
        Ok(())
    }

    /// Clear `key`. No-op when nothing is registered for it.
    pub(crate) fn unsubscribe(&self, key: StreamKey) -> Result<()> {
        let _guard = self.subscriptions.lock();
        if self.registry.clear(key).is_none() {
            return Ok(());
        }

        debug!(actor_id = self.identity.actor_id, stream = %key, "stream stopped");

        self.transport
            .stop_delivery(key, &self.identity)
            .inspect_err(|e| {
                warn!(
                    actor_id = self.identity.actor_id,
                    stream = %key,
                    error = %e,
                    "transport refused stream stop"
                );
            })
    }

    pub(crate) fn is_subscribed(&self, key: StreamKey) -> bool {
        self.registry.is_set(key)
    }

    /// Fail with `ActorDestroyed` once [`Sensor::destroy`] has run
    pub(crate) fn ensure_alive(&self) -> Result<()> {
        if self.registry.is_closed() {
            Err(ContractError::ActorDestroyed {
                actor_id: self.identity.actor_id,
            })
        } else {
            Ok(())
        }
    }

    /// Hand a packet to the callback registered for `key`.
    ///
    /// Called from the transport's producer context. Packets for keys without
    /// a callback are dropped silently.
    pub fn deliver(&self, key: StreamKey, packet: SensorPacket) -> bool {
        self.registry.deliver(key, packet)
    }

    /// Streams that currently have a callback
    pub fn active_streams(&self) -> Vec<StreamKey> {
        self.registry.active_keys()
    }

    /// Tear down: clear every slot and stop every active stream.
    ///
    /// Transport failures are logged, never returned. Further registrations
    /// fail with `ActorDestroyed`.
    pub fn destroy(&self) -> Vec<StreamKey> {
        let _guard = self.subscriptions.lock();
        let keys = self.registry.close();
        for key in &keys {
            if let Err(e) = self.transport.stop_delivery(*key, &self.identity) {
                warn!(
                    actor_id = self.identity.actor_id,
                    stream = %key,
                    error = %e,
                    "failed to stop stream during teardown"
                );
            }
        }

        info!(
            actor_id = self.identity.actor_id,
            cleared = keys.len(),
            "sensor destroyed"
        );
        keys
    }

    pub fn is_destroyed(&self) -> bool {
        self.registry.is_closed()
    }
}

impl SensorStream for Sensor {
    fn identity(&self) -> &SensorIdentity {
        &self.identity
    }

    fn listen(&self, callback: SensorDataCallback) -> Result<()> {
        self.subscribe(StreamKey::Primary, callback)
    }

    fn stop(&self) -> Result<()> {
        self.unsubscribe(StreamKey::Primary)
    }

    fn is_listening(&self) -> bool {
        self.is_subscribed(StreamKey::Primary)
    }
}

impl fmt::Display for Sensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Sensor({}, listening={})",
            self.identity,
            self.is_listening()
        )
    }
}

/// Implement [`SensorStream`] for a wrapper by delegating to an inner field
macro_rules! delegate_sensor_stream {
    ($wrapper:ty, $field:ident) => {
        impl $crate::sensor::SensorStream for $wrapper {
            fn identity(&self) -> &contracts::SensorIdentity {
                $crate::sensor::SensorStream::identity(&self.$field)
            }

            fn listen(&self, callback: contracts::SensorDataCallback) -> contracts::Result<()> {
                $crate::sensor::SensorStream::listen(&self.$field, callback)
            }

            fn stop(&self) -> contracts::Result<()> {
                $crate::sensor::SensorStream::stop(&self.$field)
            }

            fn is_listening(&self) -> bool {
                $crate::sensor::SensorStream::is_listening(&self.$field)
            }
        }
    };
}

pub(crate) use delegate_sensor_stream;
