//! Session orchestrator - connects, spawns, subscribes, consumes, tears down.
//!
//! Sensor callbacks forward into a bounded queue; a single async consumer
//! drains it until the packet limit, the run duration, or a shutdown signal.
//! Teardown always runs once sensors were spawned.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_channel::Receiver;
use contracts::{ScenarioBlueprint, SensorPayload, StreamKey};
use observability::DeliveryStatsAggregator;
use parking_lot::Mutex;
use sensor_core::{
    FactoryError, MockSimulator, MockSimulatorConfig, SensorFactory, SensorWorld,
    SimulatorClient,
};
use tracing::{info, warn};

use super::{forward_callback, ForwardedPacket, SessionStats, StopReason};
use crate::error::CliError;

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// The scenario to run
    pub blueprint: ScenarioBlueprint,

    /// Stop after this many consumed packets (None = unlimited)
    pub max_packets: Option<u64>,

    /// Run duration (None = until signal or packet limit)
    pub duration: Option<Duration>,

    /// Callback-to-consumer queue capacity
    pub buffer_size: usize,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,

    /// Mock simulator settings
    pub simulator: MockSimulatorConfig,
}

impl SessionConfig {
    pub fn new(blueprint: ScenarioBlueprint) -> Self {
        Self {
            blueprint,
            max_packets: None,
            duration: None,
            buffer_size: 256,
            metrics_port: None,
            simulator: MockSimulatorConfig {
                produce_data: true,
                ..Default::default()
            },
        }
    }
}

/// Main session orchestrator
pub struct Session {
    config: SessionConfig,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    /// Run the session to completion
    ///
    /// `shutdown` resolving ends the consume phase early; teardown still runs.
    pub async fn run<S>(self, shutdown: S) -> Result<SessionStats>
    where
        S: Future<Output = ()>,
    {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;
        let session = &blueprint.session;

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!(port, "metrics endpoint available");
        }

        // Connect
        let mut simulator_config = self.config.simulator.clone();
        simulator_config.ros_bridge_available &= session.ros_bridge_available;

        info!(host = %session.host, port = session.port, "connecting to mock simulator");
        let mut client = MockSimulator::with_config(simulator_config);
        client
            .connect(&session.host, session.port)
            .await
            .map_err(|e| CliError::simulator_connection(&session.host, session.port, e.to_string()))?;

        // Spawn
        let world = Arc::new(SensorWorld::new());
        let factory = SensorFactory::new(client, world.clone());
        let scenario = factory
            .spawn_from_blueprint(blueprint)
            .await
            .context("failed to spawn sensors")?;

        info!(
            vehicles = scenario.vehicles.len(),
            sensors = scenario.sensors.len(),
            "sensors spawned"
        );

        // Subscribe
        let delivery = Arc::new(Mutex::new(DeliveryStatsAggregator::new()));
        let (tx, rx) = async_channel::bounded::<ForwardedPacket>(self.config.buffer_size.max(1));

        let subscribed = factory.apply_subscriptions(blueprint, &scenario, |spec, _key| {
            forward_callback(&spec.id, tx.clone(), delivery.clone())
        });
        // callbacks hold the only senders from here on
        drop(tx);

        let active_streams = match subscribed {
            Ok(streams) => streams,
            Err(e) => {
                record_subscribe_failure(&e);
                factory.teardown(&scenario).await;
                factory.client().disconnect();
                return Err(CliError::subscription(e.to_string()).into());
            }
        };
        let ros_enabled = record_subscription_state(&world);

        info!(
            streams = active_streams,
            ros_enabled,
            max_packets = ?self.config.max_packets,
            duration = ?self.config.duration,
            "session running"
        );

        // Consume
        let stop_reason = self.consume(rx, delivery.clone(), shutdown).await;
        info!(reason = %stop_reason, "consume loop finished");

        // Teardown
        factory.teardown(&scenario).await;
        factory.client().disconnect();

        let delivery = delivery.lock().clone();
        let stats = SessionStats {
            packets_received: delivery.total_packets(),
            packets_dropped: delivery.total_dropped(),
            duration: start_time.elapsed(),
            active_sensors: scenario.sensors.len(),
            active_streams,
            ros_enabled,
            stop_reason,
            delivery,
        };

        info!(
            packets = stats.packets_received,
            dropped = stats.packets_dropped,
            duration_secs = stats.duration.as_secs_f64(),
            throughput = format!("{:.2}", stats.throughput()),
            "session shutdown complete"
        );

        Ok(stats)
    }

    async fn consume<S>(
        &self,
        rx: Receiver<ForwardedPacket>,
        delivery: Arc<Mutex<DeliveryStatsAggregator>>,
        shutdown: S,
    ) -> StopReason
    where
        S: Future<Output = ()>,
    {
        let max_packets = self.config.max_packets;

        let consume_loop = async {
            let mut received: u64 = 0;
            while let Ok(forwarded) = rx.recv().await {
                received += 1;
                handle_packet(&forwarded, &rx, &delivery);

                if max_packets.is_some_and(|max| received >= max) {
                    info!(packets = received, "reached packet limit");
                    return StopReason::PacketLimit;
                }
            }
            StopReason::StreamsClosed
        };

        let deadline = async {
            match self.config.duration {
                Some(duration) => tokio::time::sleep(duration).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            reason = consume_loop => reason,
            _ = deadline => StopReason::Duration,
            _ = shutdown => {
                warn!("received shutdown signal, stopping session");
                StopReason::Signal
            }
        }
    }
}

fn handle_packet(
    forwarded: &ForwardedPacket,
    rx: &Receiver<ForwardedPacket>,
    delivery: &Mutex<DeliveryStatsAggregator>,
) {
    let packet = &forwarded.packet;

    observability::record_packet_received(&forwarded.sensor_id, packet.stream, packet.payload_len());
    observability::record_consume_latency_ms(forwarded.received_at.elapsed().as_secs_f64() * 1000.0);
    observability::record_queue_depth(rx.len());
    delivery.lock().update(&forwarded.sensor_id, packet);

    if let SensorPayload::LaneInvasion(event) = &packet.payload {
        info!(
            sensor_id = %forwarded.sensor_id,
            frame = packet.frame,
            markings = ?event.crossed_markings,
            "lane invasion"
        );
    }
}

/// Publish listening / ROS gauges for every live sensor. Returns the number of
/// sensors forwarded to ROS.
fn record_subscription_state(world: &SensorWorld) -> usize {
    let mut ros_enabled = 0;

    for actor_id in world.actor_ids() {
        let Some(actor) = world.get(actor_id) else {
            continue;
        };
        let sensor_id = actor.identity().role_name.clone();

        let listening = actor.stream().is_listening();
        observability::record_stream_state(&sensor_id, StreamKey::Primary, listening);
        if listening {
            observability::record_command_result(&sensor_id, "start_delivery", true);
        }

        if let Some(server) = actor.as_server_side() {
            for id in server.listening_gbuffers() {
                observability::record_stream_state(&sensor_id, StreamKey::GBuffer(id), true);
                observability::record_command_result(&sensor_id, "start_delivery", true);
            }
        }

        if let Some(bridge) = actor.ros_bridge() {
            let enabled = bridge.is_enabled_for_ros();
            observability::record_ros_state(&sensor_id, enabled);
            if enabled {
                ros_enabled += 1;
            }
        }
    }

    ros_enabled
}

fn record_subscribe_failure(error: &FactoryError) {
    if let FactoryError::SubscribeFailed { sensor_id, source } = error {
        if source.is_transport() {
            observability::record_command_result(sensor_id, "subscribe", false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ConfigVersion, SensorSpec, SensorType, SessionConfig as ScenarioSession, VehicleConfig};
    use sensor_core::ProducerConfig;
    use std::collections::HashMap;

    fn sensor(id: &str, sensor_type: SensorType, frequency_hz: f64) -> SensorSpec {
        SensorSpec {
            id: id.to_string(),
            sensor_type,
            frequency_hz,
            listen: true,
            gbuffers: vec![],
            enable_ros: false,
            attributes: HashMap::new(),
        }
    }

    fn blueprint(sensors: Vec<SensorSpec>) -> ScenarioBlueprint {
        ScenarioBlueprint {
            version: ConfigVersion::V1,
            session: ScenarioSession::default(),
            vehicles: vec![VehicleConfig {
                id: "ego".to_string(),
                blueprint: "vehicle.tesla.model3".to_string(),
                sensors,
            }],
        }
    }

    fn small_images(config: &mut SessionConfig) {
        config.simulator.producer = ProducerConfig {
            image_width: 8,
            image_height: 4,
            lidar_points: 16,
            ..Default::default()
        };
    }

    #[tokio::test]
    async fn test_session_stops_at_packet_limit() {
        let mut camera = sensor("cam", SensorType::Camera, 200.0);
        camera.gbuffers = vec![1];
        camera.enable_ros = true;
        let mut config = SessionConfig::new(blueprint(vec![
            camera,
            sensor("imu", SensorType::Imu, 200.0),
        ]));
        config.max_packets = Some(20);
        config.duration = Some(Duration::from_secs(10));
        small_images(&mut config);

        let stats = Session::new(config)
            .run(std::future::pending::<()>())
            .await
            .unwrap();

        assert_eq!(stats.stop_reason, StopReason::PacketLimit);
        assert!(stats.packets_received >= 20);
        assert_eq!(stats.active_sensors, 2);
        assert_eq!(stats.active_streams, 3);
        assert_eq!(stats.ros_enabled, 1);
    }

    #[tokio::test]
    async fn test_session_duration_elapses() {
        let mut config = SessionConfig::new(blueprint(vec![sensor("gnss", SensorType::Gnss, 50.0)]));
        config.duration = Some(Duration::from_millis(100));

        let stats = Session::new(config)
            .run(std::future::pending::<()>())
            .await
            .unwrap();

        assert_eq!(stats.stop_reason, StopReason::Duration);
        assert!(stats.delivery.stream("gnss", StreamKey::Primary).is_some());
    }

    #[tokio::test]
    async fn test_session_shutdown_signal() {
        let mut config = SessionConfig::new(blueprint(vec![sensor("imu", SensorType::Imu, 10.0)]));
        config.duration = Some(Duration::from_secs(10));

        let stats = Session::new(config)
            .run(tokio::time::sleep(Duration::from_millis(50)))
            .await
            .unwrap();

        assert_eq!(stats.stop_reason, StopReason::Signal);
    }

    #[tokio::test]
    async fn test_session_without_streams_closes_immediately() {
        let mut lane = sensor("lane", SensorType::LaneInvasion, 10.0);
        lane.listen = false;
        let config = SessionConfig::new(blueprint(vec![lane]));

        let stats = Session::new(config)
            .run(std::future::pending::<()>())
            .await
            .unwrap();

        assert_eq!(stats.stop_reason, StopReason::StreamsClosed);
        assert_eq!(stats.active_streams, 0);
        assert_eq!(stats.packets_received, 0);
    }

    #[tokio::test]
    async fn test_rejected_gbuffer_fails_session() {
        let mut camera = sensor("cam", SensorType::Camera, 20.0);
        camera.gbuffers = vec![42];
        let config = SessionConfig::new(blueprint(vec![camera]));

        let err = Session::new(config)
            .run(std::future::pending::<()>())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("subscription setup failed"));
    }

    #[tokio::test]
    async fn test_ros_unavailable_fails_session() {
        let mut camera = sensor("cam", SensorType::Camera, 20.0);
        camera.enable_ros = true;
        let mut bp = blueprint(vec![camera]);
        bp.session.ros_bridge_available = false;

        let err = Session::new(SessionConfig::new(bp))
            .run(std::future::pending::<()>())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("ros bridge unavailable"));
    }
}
