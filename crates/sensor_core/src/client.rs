//! Simulator client abstraction
//!
//! Defines the actor-model side of the simulator: connecting, spawning and
//! destroying sensor actors. Supports real and mock implementations behind
//! one interface.

use std::future::Future;
use std::sync::Arc;

use contracts::{ActorId, DeliveryTarget, SensorIdentity, SensorSpec, Transport, VehicleConfig};

use crate::error::Result;

/// Simulator client trait
///
/// A client is also the transport for the sensors it spawns.
pub trait SimulatorClient: Send + Sync {
    /// Connect to simulator server
    fn connect(&mut self, host: &str, port: u16) -> impl Future<Output = Result<()>> + Send;

    /// Spawn a sensor actor
    ///
    /// # Arguments
    /// * `spec` - Sensor configuration (type, frequency, attributes)
    /// * `parent` - Actor the sensor is attached to, if any
    ///
    /// # Returns
    /// Identity of the newly created sensor actor
    fn spawn_sensor(
        &self,
        spec: &SensorSpec,
        parent: Option<ActorId>,
    ) -> impl Future<Output = Result<SensorIdentity>> + Send;

    /// Spawn a vehicle actor
    ///
    /// # Returns
    /// Newly created actor ID
    fn spawn_vehicle(&self, config: &VehicleConfig) -> impl Future<Output = Result<ActorId>> + Send;

    /// Destroy actor
    ///
    /// Idempotent operation: returns Ok if actor doesn't exist
    fn destroy_actor(&self, actor_id: ActorId) -> impl Future<Output = Result<()>> + Send;

    /// Check if actor exists
    fn actor_exists(&self, actor_id: ActorId) -> impl Future<Output = Result<bool>> + Send;

    /// Transport used by sensors spawned through this client
    fn transport(&self) -> Arc<dyn Transport>;

    /// Route produced data to `target`
    ///
    /// The client must not keep `target` alive.
    fn attach_delivery_target(&self, target: &Arc<dyn DeliveryTarget>);
}
