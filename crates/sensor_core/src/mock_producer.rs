//! Mock stream producer
//!
//! One background thread per active (actor, stream) pair. Generates simulated
//! payloads at the sensor frequency and pushes them into the attached
//! `DeliveryTarget`, the same way a real transport would from its network
//! threads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::{Duration, Instant};

use bytes::Bytes;
use contracts::{
    ActorId, DeliveryTarget, GBufferTexture, GnssData, ImageData, ImageFormat, ImuData,
    LaneInvasionEvent, LaneMarking, PointCloudData, RadarData, SensorPacket, SensorPayload,
    SensorType, StreamKey, Vector3,
};
use tracing::{debug, trace};

/// Producer payload settings
#[derive(Debug, Clone)]
pub struct ProducerConfig {
    /// Image width (Camera / GBuffer)
    pub image_width: u32,
    /// Image height (Camera / GBuffer)
    pub image_height: u32,
    /// LiDAR point count
    pub lidar_points: u32,
    /// Every n-th frame produces a lane invasion event
    pub lane_invasion_every: u64,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            image_width: 320,
            image_height: 240,
            lidar_points: 2048,
            lane_invasion_every: 5,
        }
    }
}

/// Running producer thread handle
///
/// Dropping the handle stops the producer. The thread is never joined: a stop
/// may be requested from inside a callback running on that very thread.
pub struct ProducerHandle {
    running: Arc<AtomicBool>,
}

impl ProducerHandle {
    /// Signal the producer loop to exit after the current packet
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}

impl Drop for ProducerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Start a producer for one stream of one actor
pub fn spawn_producer(
    actor_id: ActorId,
    key: StreamKey,
    sensor_type: SensorType,
    frequency_hz: f64,
    config: ProducerConfig,
    target: Weak<dyn DeliveryTarget>,
) -> ProducerHandle {
    let running = Arc::new(AtomicBool::new(true));
    let flag = running.clone();
    let interval = Duration::from_secs_f64(1.0 / frequency_hz.max(0.1));

    thread::spawn(move || {
        let start_time = Instant::now();
        let mut frame: u64 = 0;

        debug!(actor_id, stream = %key, frequency_hz, "mock producer started");

        while flag.load(Ordering::Relaxed) {
            // world gone: nobody left to deliver to
            let Some(target) = target.upgrade() else {
                break;
            };
            frame += 1;

            if let Some(payload) = generate_payload(&config, sensor_type, key, frame) {
                let packet = SensorPacket {
                    actor_id,
                    stream: key,
                    sensor_type,
                    frame,
                    timestamp: start_time.elapsed().as_secs_f64(),
                    payload,
                };
                if target.deliver(actor_id, key, packet) {
                    trace!(actor_id, stream = %key, frame, "mock packet delivered");
                }
            }
            drop(target);

            thread::sleep(interval);
        }

        debug!(actor_id, stream = %key, frames = frame, "mock producer stopped");
    });

    ProducerHandle { running }
}

/// Frame size for both image formats, 4 bytes per pixel
fn image_bytes(config: &ProducerConfig) -> usize {
    config.image_width as usize * config.image_height as usize * 4
}

/// Generate a simulated payload
///
/// Lane invasion sensors only emit on frames where a marking is crossed.
pub fn generate_payload(
    config: &ProducerConfig,
    sensor_type: SensorType,
    key: StreamKey,
    frame: u64,
) -> Option<SensorPayload> {
    if let Some(id) = key.gbuffer_id() {
        let single_channel = GBufferTexture::from_id(id).is_some_and(|t| t.is_single_channel());
        let format = if single_channel {
            ImageFormat::R32F
        } else {
            ImageFormat::Bgra8
        };
        let size = image_bytes(config);
        return Some(SensorPayload::Image(ImageData {
            width: config.image_width,
            height: config.image_height,
            format,
            data: Bytes::from(vec![(id as u8).wrapping_mul(16); size]),
        }));
    }

    let payload = match sensor_type {
        SensorType::Camera => {
            let size = image_bytes(config);
            SensorPayload::Image(ImageData {
                width: config.image_width,
                height: config.image_height,
                format: ImageFormat::Bgra8,
                data: Bytes::from(vec![128u8; size]),
            })
        }
        SensorType::Lidar => {
            let size = config.lidar_points as usize * 16;
            SensorPayload::PointCloud(PointCloudData {
                num_points: config.lidar_points,
                point_stride: 16,
                data: Bytes::from(vec![0u8; size]),
            })
        }
        SensorType::Imu => SensorPayload::Imu(ImuData {
            accelerometer: Vector3 {
                x: 0.0,
                y: 0.0,
                z: 9.81,
            },
            gyroscope: Vector3::default(),
            compass: 0.0,
        }),
        SensorType::Gnss => SensorPayload::Gnss(GnssData {
            latitude: 49.0 + (frame as f64 * 0.0001),
            longitude: 8.0 + (frame as f64 * 0.0001),
            altitude: 100.0,
        }),
        SensorType::Radar => SensorPayload::Radar(RadarData {
            num_detections: 5,
            data: Bytes::from(vec![0u8; 5 * 16]),
        }),
        SensorType::LaneInvasion => {
            let every = config.lane_invasion_every.max(1);
            if frame % every != 0 {
                return None;
            }
            let marking = if (frame / every) % 2 == 0 {
                LaneMarking::Solid
            } else {
                LaneMarking::Broken
            };
            SensorPayload::LaneInvasion(LaneInvasionEvent {
                crossed_markings: vec![marking],
            })
        }
    };
    Some(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;

    struct CountingTarget {
        count: AtomicU64,
    }

    impl DeliveryTarget for CountingTarget {
        fn deliver(&self, actor_id: ActorId, key: StreamKey, packet: SensorPacket) -> bool {
            assert_eq!(packet.actor_id, actor_id);
            assert_eq!(packet.stream, key);
            self.count.fetch_add(1, Ordering::SeqCst);
            true
        }
    }

    #[test]
    fn test_gbuffer_depth_is_single_channel() {
        let config = ProducerConfig {
            image_width: 4,
            image_height: 2,
            ..Default::default()
        };
        let depth = GBufferTexture::SceneDepth.stream_key();
        let payload = generate_payload(&config, SensorType::Camera, depth, 1).unwrap();
        match payload {
            SensorPayload::Image(image) => {
                assert_eq!(image.format, ImageFormat::R32F);
                assert_eq!(image.data.len(), 32);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_image_size_beyond_u32() {
        let config = ProducerConfig {
            image_width: 65_536,
            image_height: 65_536,
            ..Default::default()
        };
        assert_eq!(image_bytes(&config), 1usize << 34);
    }

    #[test]
    fn test_lane_invasion_is_sparse() {
        let config = ProducerConfig::default();
        let emitted = (1..=10)
            .filter_map(|f| {
                generate_payload(&config, SensorType::LaneInvasion, StreamKey::Primary, f)
            })
            .count();
        assert_eq!(emitted, 2);
    }

    #[test]
    fn test_producer_delivers_until_stopped() {
        let target = Arc::new(CountingTarget {
            count: AtomicU64::new(0),
        });
        let dyn_target: Arc<dyn DeliveryTarget> = target.clone();

        let handle = spawn_producer(
            7,
            StreamKey::Primary,
            SensorType::Imu,
            200.0,
            ProducerConfig::default(),
            Arc::downgrade(&dyn_target),
        );
        thread::sleep(Duration::from_millis(60));
        handle.stop();
        assert!(!handle.is_running());

        thread::sleep(Duration::from_millis(20));
        let after_stop = target.count.load(Ordering::SeqCst);
        assert!(after_stop > 0);
        thread::sleep(Duration::from_millis(30));
        assert_eq!(target.count.load(Ordering::SeqCst), after_stop);
    }
}
