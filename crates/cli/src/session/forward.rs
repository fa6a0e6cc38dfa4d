//! Callback-to-channel bridge.
//!
//! Sensor callbacks run on transport threads and must never block, so every
//! payload is handed to the async consumer with `try_send`. A full queue drops
//! the packet and counts it.

use std::sync::Arc;
use std::time::Instant;

use async_channel::{Sender, TrySendError};
use contracts::{SensorDataCallback, SensorPacket};
use parking_lot::Mutex;
use tracing::{trace, warn};

use observability::DeliveryStatsAggregator;

/// Packet handed from a sensor callback to the consumer
#[derive(Debug)]
pub struct ForwardedPacket {
    /// Sensor config id (role name)
    pub sensor_id: Arc<str>,
    pub packet: SensorPacket,
    /// When the callback fired
    pub received_at: Instant,
}

/// Build the callback for one stream of one sensor
pub fn forward_callback(
    sensor_id: &str,
    tx: Sender<ForwardedPacket>,
    stats: Arc<Mutex<DeliveryStatsAggregator>>,
) -> SensorDataCallback {
    let sensor_id: Arc<str> = Arc::from(sensor_id);

    Arc::new(move |packet: SensorPacket| {
        let forwarded = ForwardedPacket {
            sensor_id: sensor_id.clone(),
            packet,
            received_at: Instant::now(),
        };

        match tx.try_send(forwarded) {
            Ok(()) => {
                trace!(sensor_id = %sensor_id, "packet forwarded");
            }
            Err(TrySendError::Full(_)) => {
                observability::record_consumer_drop(&sensor_id);
                stats.lock().record_drop(&sensor_id);
                trace!(sensor_id = %sensor_id, "packet dropped, consumer queue full");
            }
            Err(TrySendError::Closed(_)) => {
                warn!(sensor_id = %sensor_id, "consumer queue closed");
            }
        }
    })
}
