//! # Contracts
//!
//! Frozen interface contracts shared by every crate of the workspace: stream
//! keys, sensor payloads, callback types, the transport boundary and the
//! scenario configuration. Business crates depend on this crate only, never
//! on each other in reverse.
//!
//! ## Delivery model
//! - A transport producer calls [`DeliveryTarget::deliver`] with a
//!   [`StreamKey`] and a [`SensorPacket`]
//! - The target resolves the registered callback and invokes it, or drops the
//!   packet silently when nothing is listening

mod blueprint;
mod callback;
mod error;
mod runtime;
mod sensor;
mod stream;
mod transport;

pub use blueprint::*;
pub use callback::{make_callback, Callback, SensorDataCallback};
pub use error::*;
pub use runtime::*;
pub use sensor::*;
pub use stream::{GBufferTexture, StreamKey};
pub use transport::{DeliveryTarget, Transport, TransportRequest};
