//! SensorFactory 核心实现
//!
//! 从 ScenarioBlueprint spawn 传感器，注册到 SensorWorld，按配置建立订阅，
//! 并负责 teardown 与失败回滚。

use std::sync::Arc;

use contracts::{
    ActorId, ContractError, DeliveryTarget, ScenarioBlueprint, SensorDataCallback, SensorSpec,
    StreamKey, VehicleConfig,
};
use tracing::{error, info, instrument, warn};

use crate::actor::SensorActor;
use crate::client::SimulatorClient;
use crate::error::{FactoryError, Result};
use crate::world::SensorWorld;

/// Actors spawned for one blueprint, in spawn order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpawnedScenario {
    /// (vehicle config id, actor id)
    pub vehicles: Vec<(String, ActorId)>,
    /// (sensor config id, actor id)
    pub sensors: Vec<(String, ActorId)>,
}

impl SpawnedScenario {
    /// Actor id of a sensor by config id
    pub fn sensor_actor(&self, sensor_id: &str) -> Option<ActorId> {
        self.sensors
            .iter()
            .find(|(id, _)| id == sensor_id)
            .map(|(_, actor_id)| *actor_id)
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty() && self.sensors.is_empty()
    }
}

/// Sensor Factory
///
/// 负责从 ScenarioBlueprint spawn vehicles 和 sensors，
/// 并提供 teardown 和回滚能力。
pub struct SensorFactory<C: SimulatorClient> {
    client: C,
    world: Arc<SensorWorld>,
}

impl<C: SimulatorClient> SensorFactory<C> {
    /// 创建新的 SensorFactory，并将模拟器产出的数据路由到 `world`
    pub fn new(client: C, world: Arc<SensorWorld>) -> Self {
        let target: Arc<dyn DeliveryTarget> = world.clone();
        client.attach_delivery_target(&target);
        Self { client, world }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn world(&self) -> &Arc<SensorWorld> {
        &self.world
    }

    /// 从 ScenarioBlueprint spawn 所有 actors
    ///
    /// # 原子性保证
    /// 如果任何 spawn 失败，会回滚销毁所有已创建的 actors。
    #[instrument(
        name = "sensor_factory_spawn_blueprint",
        skip(self, blueprint),
        fields(vehicle_count = blueprint.vehicles.len(), sensor_count = blueprint.sensor_count())
    )]
    pub async fn spawn_from_blueprint(
        &self,
        blueprint: &ScenarioBlueprint,
    ) -> Result<SpawnedScenario> {
        let mut scenario = SpawnedScenario::default();

        for vehicle_config in &blueprint.vehicles {
            if let Err(e) = self
                .spawn_vehicle_with_sensors(vehicle_config, &mut scenario)
                .await
            {
                // 回滚所有已创建的 actors
                warn!(
                    error = %e,
                    vehicle_id = %vehicle_config.id,
                    "spawn failed, rolling back all actors"
                );
                self.teardown(&scenario).await;
                return Err(e);
            }
        }

        info!(
            vehicles = scenario.vehicles.len(),
            sensors = scenario.sensors.len(),
            "spawn_from_blueprint completed successfully"
        );

        Ok(scenario)
    }

    /// Spawn 单个车辆及其所有传感器
    ///
    /// Every actor is pushed to `scenario` as soon as it exists, so a failure
    /// half way leaves the caller with exactly what needs rolling back.
    #[instrument(
        name = "sensor_factory_spawn_vehicle_with_sensors",
        skip(self, config, scenario),
        fields(vehicle_id = %config.id)
    )]
    async fn spawn_vehicle_with_sensors(
        &self,
        config: &VehicleConfig,
        scenario: &mut SpawnedScenario,
    ) -> Result<()> {
        info!(blueprint = %config.blueprint, "spawning vehicle");
        let vehicle_actor_id = self.client.spawn_vehicle(config).await?;
        scenario.vehicles.push((config.id.clone(), vehicle_actor_id));

        for spec in &config.sensors {
            info!(sensor_id = %spec.id, sensor_type = ?spec.sensor_type, "spawning sensor");
            let identity = self
                .client
                .spawn_sensor(spec, Some(vehicle_actor_id))
                .await?;
            let actor_id = identity.actor_id;

            let actor = SensorActor::wrap(identity, spec.sensor_type, self.client.transport());
            self.world.register(actor);
            scenario.sensors.push((spec.id.clone(), actor_id));

            info!(
                sensor_id = %spec.id,
                actor_id,
                "sensor spawned and attached successfully"
            );
        }

        Ok(())
    }

    /// Apply the subscription plan of every sensor in `blueprint`
    ///
    /// `make_callback` builds the callback for one stream of one sensor.
    /// Stops at the first refused subscription; already applied ones stay.
    #[instrument(
        name = "sensor_factory_subscribe",
        skip(self, blueprint, scenario, make_callback)
    )]
    pub fn apply_subscriptions<F>(
        &self,
        blueprint: &ScenarioBlueprint,
        scenario: &SpawnedScenario,
        mut make_callback: F,
    ) -> Result<usize>
    where
        F: FnMut(&SensorSpec, StreamKey) -> SensorDataCallback,
    {
        let mut streams = 0;

        for (_, spec) in blueprint.sensors() {
            let Some(actor_id) = scenario.sensor_actor(&spec.id) else {
                continue;
            };
            let Some(actor) = self.world.get(actor_id) else {
                continue;
            };
            let subscribe_err = |source: ContractError| FactoryError::SubscribeFailed {
                sensor_id: spec.id.clone(),
                source,
            };

            if spec.listen {
                actor
                    .stream()
                    .listen(make_callback(spec, StreamKey::Primary))
                    .map_err(subscribe_err)?;
                streams += 1;
            }

            if !spec.gbuffers.is_empty() {
                let auxiliary = actor.auxiliary().ok_or_else(|| {
                    subscribe_err(ContractError::Other(format!(
                        "{} sensors have no gbuffer streams",
                        spec.sensor_type.blueprint_id()
                    )))
                })?;
                for &id in &spec.gbuffers {
                    auxiliary
                        .listen_to_gbuffer(id, make_callback(spec, StreamKey::GBuffer(id)))
                        .map_err(subscribe_err)?;
                    streams += 1;
                }
            }

            if spec.enable_ros {
                actor
                    .ros_bridge()
                    .ok_or_else(|| {
                        subscribe_err(ContractError::Other(format!(
                            "{} sensors have no ros bridge",
                            spec.sensor_type.blueprint_id()
                        )))
                    })?
                    .enable_for_ros()
                    .map_err(subscribe_err)?;
            }
        }

        info!(streams, "subscriptions applied");
        Ok(streams)
    }

    /// 销毁 SpawnedScenario 中的所有 actors
    ///
    /// Sensors are removed from the world first, which clears their slots and
    /// stops delivery, then destroyed in the simulator.
    ///
    /// # 幂等性
    /// 多次调用安全，不存在的 actor 会被忽略。
    #[instrument(
        name = "sensor_factory_teardown",
        skip(self, scenario),
        fields(vehicle_count = scenario.vehicles.len(), sensor_count = scenario.sensors.len())
    )]
    pub async fn teardown(&self, scenario: &SpawnedScenario) {
        info!("starting teardown");

        // 先销毁 sensors
        for (sensor_id, actor_id) in scenario.sensors.iter().rev() {
            self.world.on_actor_destroyed(*actor_id);
            self.destroy_actor_safe(*actor_id, sensor_id).await;
        }

        // 再销毁 vehicles
        for (vehicle_id, actor_id) in scenario.vehicles.iter().rev() {
            self.destroy_actor_safe(*actor_id, vehicle_id).await;
        }

        info!("teardown completed");
    }

    /// 安全销毁 actor（忽略错误，仅记录日志）
    async fn destroy_actor_safe(&self, actor_id: ActorId, config_id: &str) {
        info!(actor_id, config_id, "destroying actor");

        if let Err(e) = self.client.destroy_actor(actor_id).await {
            error!(
                actor_id,
                config_id,
                error = %e,
                "failed to destroy actor"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::mock_client::{MockSimulator, MockSimulatorConfig, TransportCommand};
    use contracts::{ConfigVersion, SensorType, SessionConfig};

    fn sensor(id: &str, sensor_type: SensorType) -> SensorSpec {
        SensorSpec {
            id: id.to_string(),
            sensor_type,
            frequency_hz: 20.0,
            listen: true,
            gbuffers: vec![],
            enable_ros: false,
            attributes: HashMap::new(),
        }
    }

    fn create_test_blueprint() -> ScenarioBlueprint {
        let mut camera = sensor("front_camera", SensorType::Camera);
        camera.gbuffers = vec![1, 3];
        camera.enable_ros = true;

        ScenarioBlueprint {
            version: ConfigVersion::V1,
            session: SessionConfig::default(),
            vehicles: vec![VehicleConfig {
                id: "ego_vehicle".to_string(),
                blueprint: "vehicle.tesla.model3".to_string(),
                sensors: vec![
                    camera,
                    sensor("lidar", SensorType::Lidar),
                    sensor("lane", SensorType::LaneInvasion),
                ],
            }],
        }
    }

    async fn connected(config: MockSimulatorConfig) -> SensorFactory<MockSimulator> {
        let mut client = MockSimulator::with_config(config);
        client.connect("localhost", 2000).await.unwrap();
        SensorFactory::new(client, Arc::new(SensorWorld::new()))
    }

    fn noop(_: &SensorSpec, _: StreamKey) -> SensorDataCallback {
        Arc::new(|_| {})
    }

    #[tokio::test]
    async fn test_spawn_success() {
        let factory = connected(MockSimulatorConfig::default()).await;
        let blueprint = create_test_blueprint();

        let scenario = factory.spawn_from_blueprint(&blueprint).await.unwrap();

        assert_eq!(scenario.vehicles.len(), 1);
        assert_eq!(scenario.sensors.len(), 3);
        assert_eq!(factory.world().len(), 3);

        let camera = factory
            .world()
            .get(scenario.sensor_actor("front_camera").unwrap())
            .unwrap();
        assert!(camera.as_server_side().is_some());
        let lane = factory
            .world()
            .get(scenario.sensor_actor("lane").unwrap())
            .unwrap();
        assert!(matches!(lane, SensorActor::LaneInvasion(_)));
    }

    #[tokio::test]
    async fn test_sensor_spawn_failure_rollback() {
        let factory = connected(MockSimulatorConfig {
            fail_spawn: vec!["lane".to_string()],
            ..Default::default()
        })
        .await;
        let blueprint = create_test_blueprint();

        let err = factory.spawn_from_blueprint(&blueprint).await.unwrap_err();

        assert!(matches!(err, FactoryError::SensorSpawnFailed { .. }));
        assert_eq!(factory.client().actor_count(), 0);
        assert!(factory.world().is_empty());
    }

    #[tokio::test]
    async fn test_apply_subscriptions() {
        let factory = connected(MockSimulatorConfig::default()).await;
        let blueprint = create_test_blueprint();
        let scenario = factory.spawn_from_blueprint(&blueprint).await.unwrap();

        let streams = factory
            .apply_subscriptions(&blueprint, &scenario, noop)
            .unwrap();
        assert_eq!(streams, 5);

        let camera_id = scenario.sensor_actor("front_camera").unwrap();
        let camera = factory.world().get(camera_id).unwrap();
        let server = camera.as_server_side().unwrap();
        assert_eq!(server.listening_gbuffers(), vec![1, 3]);
        assert!(camera.ros_bridge().unwrap().is_enabled_for_ros());
        assert_eq!(factory.client().ros_enabled_actors(), vec![camera_id]);
    }

    #[tokio::test]
    async fn test_gbuffer_plan_on_client_side_sensor_fails() {
        let factory = connected(MockSimulatorConfig::default()).await;
        let mut blueprint = create_test_blueprint();
        blueprint.vehicles[0].sensors[2].gbuffers = vec![0];
        let scenario = factory.spawn_from_blueprint(&blueprint).await.unwrap();

        let err = factory
            .apply_subscriptions(&blueprint, &scenario, noop)
            .unwrap_err();
        assert!(
            matches!(err, FactoryError::SubscribeFailed { ref sensor_id, .. } if sensor_id == "lane")
        );
    }

    #[tokio::test]
    async fn test_teardown_clears_world_and_is_idempotent() {
        let factory = connected(MockSimulatorConfig::default()).await;
        let blueprint = create_test_blueprint();
        let scenario = factory.spawn_from_blueprint(&blueprint).await.unwrap();
        factory
            .apply_subscriptions(&blueprint, &scenario, noop)
            .unwrap();
        let camera = factory
            .world()
            .get(scenario.sensor_actor("front_camera").unwrap())
            .unwrap();

        factory.teardown(&scenario).await;
        assert!(factory.world().is_empty());
        assert_eq!(factory.client().actor_count(), 0);
        assert!(!camera.stream().is_listening());
        assert!(factory
            .client()
            .commands()
            .iter()
            .any(|c| matches!(c, TransportCommand::StopDelivery { key: StreamKey::GBuffer(3), .. })));

        // Second teardown should also succeed
        factory.teardown(&scenario).await;
    }

    #[tokio::test]
    async fn test_empty_blueprint() {
        let factory = connected(MockSimulatorConfig::default()).await;
        let blueprint = ScenarioBlueprint {
            version: ConfigVersion::V1,
            session: SessionConfig::default(),
            vehicles: vec![],
        };

        let scenario = factory.spawn_from_blueprint(&blueprint).await.unwrap();
        assert!(scenario.is_empty());
    }
}
