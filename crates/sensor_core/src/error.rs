//! Sensor core error types

use contracts::{ActorId, ContractError};
use thiserror::Error;

/// Spawn / teardown specific error
#[derive(Debug, Error)]
pub enum FactoryError {
    /// Simulator connection error
    #[error("failed to connect to simulator: {message}")]
    ConnectionFailed { message: String },

    /// Vehicle spawn error
    #[error("failed to spawn vehicle '{vehicle_id}': {message}")]
    VehicleSpawnFailed { vehicle_id: String, message: String },

    /// Sensor spawn error
    #[error("failed to spawn sensor '{sensor_id}': {message}")]
    SensorSpawnFailed { sensor_id: String, message: String },

    /// Subscription setup error after spawn
    #[error("failed to subscribe sensor '{sensor_id}': {source}")]
    SubscribeFailed {
        sensor_id: String,
        #[source]
        source: ContractError,
    },

    /// Destroy error
    #[error("failed to destroy actor {actor_id}: {message}")]
    DestroyFailed { actor_id: ActorId, message: String },

    /// Wrapped ContractError
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl FactoryError {
    /// Create sensor spawn error
    pub fn sensor_spawn(sensor_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SensorSpawnFailed {
            sensor_id: sensor_id.into(),
            message: message.into(),
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, FactoryError>;
