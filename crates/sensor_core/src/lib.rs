//! # Sensor Core
//!
//! Sensor event subscription and stream multiplexing.
//!
//! Responsibilities:
//! - Per-sensor callback registry keyed by stream (primary / GBuffer)
//! - Sensor capabilities: listen / stop, GBuffer sub-streams, ROS bridge toggle
//! - Actor arena routing transport deliveries to the owning sensor
//! - Spawn, subscribe and teardown from `ScenarioBlueprint`
//! - Mock simulator for running without a simulator server

pub mod actor;
pub mod client;
pub mod client_side;
pub mod error;
pub mod factory;
pub mod mock_client;
pub mod mock_producer;
pub mod registry;
pub mod sensor;
pub mod server_side;
pub mod world;

pub use actor::SensorActor;
pub use client::SimulatorClient;
pub use client_side::{ClientSideSensor, LaneInvasionSensor};
pub use contracts::{ActorId, ScenarioBlueprint, SensorIdentity, StreamKey};
pub use error::{FactoryError, Result};
pub use factory::{SensorFactory, SpawnedScenario};
pub use mock_client::{MockSimulator, MockSimulatorConfig, TransportCommand};
pub use mock_producer::ProducerConfig;
pub use registry::{CallbackRegistry, SetOutcome};
pub use sensor::{Sensor, SensorStream};
pub use server_side::{AuxiliaryStreams, RosBridge, ServerSideSensor};
pub use world::SensorWorld;
