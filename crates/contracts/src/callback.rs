//! Callback types - consumer side of a sensor stream
//!
//! Callbacks are statically typed over the payload. The only dynamic check
//! happens at the binding boundary in [`make_callback`], where a type-erased
//! value coming from foreign code is turned into a typed callback.

use std::any::Any;
use std::sync::Arc;

use crate::{ContractError, Result, SensorPacket};

/// Single-argument callback over payload type `P`
///
/// Uses `Arc` so a delivery can keep invoking a callback it already looked up
/// while the registry replaces or clears the slot.
pub type Callback<P> = Arc<dyn Fn(P) + Send + Sync>;

/// Sensor data callback type
pub type SensorDataCallback = Callback<SensorPacket>;

/// Convert a type-erased value into a [`SensorDataCallback`].
///
/// Accepts either a `SensorDataCallback` or a plain `fn(SensorPacket)`.
/// Anything else fails with [`ContractError::InvalidCallback`].
///
/// # Example
///
/// ```
/// use contracts::{make_callback, SensorPacket};
///
/// fn on_packet(_packet: SensorPacket) {}
///
/// assert!(make_callback(Box::new(on_packet as fn(SensorPacket))).is_ok());
/// assert!(make_callback(Box::new(42_u32)).is_err());
/// ```
pub fn make_callback(value: Box<dyn Any + Send + Sync>) -> Result<SensorDataCallback> {
    let value = match value.downcast::<SensorDataCallback>() {
        Ok(callback) => return Ok(*callback),
        Err(value) => value,
    };

    match value.downcast::<fn(SensorPacket)>() {
        Ok(func) => {
            let func = *func;
            Ok(Arc::new(move |packet| func(packet)))
        }
        Err(_) => Err(ContractError::InvalidCallback {
            expected: "Fn(SensorPacket) + Send + Sync",
        }),
    }
}
