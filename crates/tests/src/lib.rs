//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 订阅生命周期 e2e 测试（mock 模拟器，无需真实仿真器）
//! - 并发投递压力测试

#[cfg(test)]
mod contract_tests {
    use contracts::{make_callback, ContractError, GBufferTexture, SensorPacket, StreamKey};

    #[test]
    fn test_contracts_compile() {
        // 验证 contracts crate 可编译
        let _ = contracts::ConfigVersion::V1;
    }

    #[test]
    fn test_make_callback_rejects_non_callable() {
        fn on_packet(_: SensorPacket) {}

        assert!(make_callback(Box::new(on_packet as fn(SensorPacket))).is_ok());
        assert!(matches!(
            make_callback(Box::new("not a callback")),
            Err(ContractError::InvalidCallback { .. })
        ));
    }

    #[test]
    fn test_gbuffer_wire_ids() {
        assert_eq!(GBufferTexture::ALL.len(), 13);
        assert_eq!(GBufferTexture::SceneDepth.stream_key(), StreamKey::GBuffer(1));
        assert_eq!(GBufferTexture::from_id(12), Some(GBufferTexture::CustomStencil));
        assert_eq!(GBufferTexture::from_id(13), None);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use bytes::Bytes;
    use contracts::{
        ConfigVersion, ContractError, DeliveryTarget, ImageFormat, ScenarioBlueprint,
        SensorDataCallback, SensorPacket, SensorPayload, SensorSpec, SensorType, SessionConfig,
        StreamKey, VehicleConfig,
    };
    use observability::DeliveryStatsAggregator;
    use parking_lot::Mutex;
    use sensor_core::{
        MockSimulator, MockSimulatorConfig, ProducerConfig, SensorActor, SensorFactory,
        SensorWorld, SimulatorClient, SpawnedScenario, TransportCommand,
    };

    fn sensor(id: &str, sensor_type: SensorType, frequency_hz: f64) -> SensorSpec {
        SensorSpec {
            id: id.to_string(),
            sensor_type,
            frequency_hz,
            listen: false,
            gbuffers: vec![],
            enable_ros: false,
            attributes: HashMap::new(),
        }
    }

    fn blueprint(sensors: Vec<SensorSpec>) -> ScenarioBlueprint {
        ScenarioBlueprint {
            version: ConfigVersion::V1,
            session: SessionConfig::default(),
            vehicles: vec![VehicleConfig {
                id: "ego".to_string(),
                blueprint: "vehicle.tesla.model3".to_string(),
                sensors,
            }],
        }
    }

    async fn setup(
        config: MockSimulatorConfig,
        sensors: Vec<SensorSpec>,
    ) -> (SensorFactory<MockSimulator>, ScenarioBlueprint, SpawnedScenario) {
        let mut client = MockSimulator::with_config(config);
        client.connect("localhost", 2000).await.unwrap();
        let factory = SensorFactory::new(client, Arc::new(SensorWorld::new()));
        let blueprint = blueprint(sensors);
        let scenario = factory.spawn_from_blueprint(&blueprint).await.unwrap();
        (factory, blueprint, scenario)
    }

    fn actor(factory: &SensorFactory<MockSimulator>, scenario: &SpawnedScenario, id: &str) -> SensorActor {
        factory
            .world()
            .get(scenario.sensor_actor(id).unwrap())
            .unwrap()
    }

    fn packet(actor_id: u32, stream: StreamKey, frame: u64) -> SensorPacket {
        SensorPacket {
            actor_id,
            stream,
            sensor_type: SensorType::Camera,
            frame,
            timestamp: frame as f64 * 0.05,
            payload: SensorPayload::Raw(Bytes::from_static(b"px")),
        }
    }

    fn counting(target: &Arc<AtomicU64>) -> SensorDataCallback {
        let target = target.clone();
        Arc::new(move |_| {
            target.fetch_add(1, Ordering::SeqCst);
        })
    }

    /// listen → deliver → stop → deliver：停止后的包被静默丢弃
    #[tokio::test]
    async fn test_listen_deliver_stop() {
        let (factory, _, scenario) =
            setup(MockSimulatorConfig::default(), vec![sensor("cam", SensorType::Camera, 20.0)]).await;
        let cam = actor(&factory, &scenario, "cam");
        let actor_id = cam.identity().actor_id;
        let world = factory.world();

        let frames = Arc::new(Mutex::new(Vec::new()));
        let sink = frames.clone();
        cam.stream()
            .listen(Arc::new(move |p: SensorPacket| sink.lock().push(p.frame)))
            .unwrap();
        assert!(cam.stream().is_listening());

        assert!(world.deliver(actor_id, StreamKey::Primary, packet(actor_id, StreamKey::Primary, 1)));
        assert!(world.deliver(actor_id, StreamKey::Primary, packet(actor_id, StreamKey::Primary, 2)));

        cam.stream().stop().unwrap();
        assert!(!cam.stream().is_listening());
        assert!(!world.deliver(actor_id, StreamKey::Primary, packet(actor_id, StreamKey::Primary, 3)));

        assert_eq!(*frames.lock(), vec![1, 2]);
        assert_eq!(
            factory.client().commands(),
            vec![
                TransportCommand::StartDelivery { actor_id, key: StreamKey::Primary },
                TransportCommand::StopDelivery { actor_id, key: StreamKey::Primary },
            ]
        );
    }

    /// 再次 listen 替换旧回调，旧回调不再收到数据
    #[tokio::test]
    async fn test_listen_replaces_previous_callback() {
        let (factory, _, scenario) =
            setup(MockSimulatorConfig::default(), vec![sensor("imu", SensorType::Imu, 100.0)]).await;
        let imu = actor(&factory, &scenario, "imu");
        let actor_id = imu.identity().actor_id;

        let first = Arc::new(AtomicU64::new(0));
        let second = Arc::new(AtomicU64::new(0));
        imu.stream().listen(counting(&first)).unwrap();
        factory.world().deliver(actor_id, StreamKey::Primary, packet(actor_id, StreamKey::Primary, 1));

        imu.stream().listen(counting(&second)).unwrap();
        factory.world().deliver(actor_id, StreamKey::Primary, packet(actor_id, StreamKey::Primary, 2));

        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    /// GBuffer 流之间以及与主流相互独立
    #[tokio::test]
    async fn test_gbuffer_streams_are_independent() {
        let (factory, _, scenario) =
            setup(MockSimulatorConfig::default(), vec![sensor("cam", SensorType::Camera, 20.0)]).await;
        let cam = actor(&factory, &scenario, "cam");
        let actor_id = cam.identity().actor_id;
        let aux = cam.auxiliary().unwrap();

        let depth = Arc::new(AtomicU64::new(0));
        let normals = Arc::new(AtomicU64::new(0));
        aux.listen_to_gbuffer(1, counting(&depth)).unwrap();
        aux.listen_to_gbuffer(4, counting(&normals)).unwrap();

        assert!(!cam.stream().is_listening());
        assert!(aux.is_listening_gbuffer(1));
        assert!(!aux.is_listening_gbuffer(2));

        aux.stop_gbuffer(4).unwrap();
        let world = factory.world();
        world.deliver(actor_id, StreamKey::GBuffer(1), packet(actor_id, StreamKey::GBuffer(1), 1));
        world.deliver(actor_id, StreamKey::GBuffer(4), packet(actor_id, StreamKey::GBuffer(4), 1));
        world.deliver(actor_id, StreamKey::Primary, packet(actor_id, StreamKey::Primary, 1));

        assert_eq!(depth.load(Ordering::SeqCst), 1);
        assert_eq!(normals.load(Ordering::SeqCst), 0);
        assert!(aux.is_listening_gbuffer(1));
    }

    /// ROS 开关幂等：只有真实状态切换才通知 transport
    #[tokio::test]
    async fn test_ros_toggle_idempotent() {
        let (factory, _, scenario) =
            setup(MockSimulatorConfig::default(), vec![sensor("lidar", SensorType::Lidar, 10.0)]).await;
        let lidar = actor(&factory, &scenario, "lidar");
        let ros = lidar.ros_bridge().unwrap();

        ros.enable_for_ros().unwrap();
        ros.enable_for_ros().unwrap();
        assert!(ros.is_enabled_for_ros());
        ros.disable_for_ros().unwrap();
        ros.disable_for_ros().unwrap();
        assert!(!ros.is_enabled_for_ros());

        let toggles = factory
            .client()
            .commands()
            .into_iter()
            .filter(|c| matches!(c, TransportCommand::SetRosBridge { .. }))
            .count();
        assert_eq!(toggles, 2);
        assert!(!lidar.stream().is_listening());
    }

    /// 会话关闭后 send 返回 NotConnected
    #[tokio::test]
    async fn test_send_after_disconnect() {
        let (factory, _, scenario) =
            setup(MockSimulatorConfig::default(), vec![sensor("cam", SensorType::Camera, 20.0)]).await;
        let cam = actor(&factory, &scenario, "cam");
        let server = cam.as_server_side().unwrap();

        server.send(Bytes::from_static(b"{\"exposure\":1.0}")).unwrap();
        factory.client().disconnect();
        assert!(matches!(
            server.send(Bytes::from_static(b"ping")),
            Err(ContractError::NotConnected { .. })
        ));
    }

    /// 销毁后所有回调被清除，后续订阅失败
    #[tokio::test]
    async fn test_teardown_clears_callbacks() {
        let mut cam = sensor("cam", SensorType::Camera, 20.0);
        cam.listen = true;
        cam.gbuffers = vec![0, 1];
        cam.enable_ros = true;
        let (factory, blueprint, scenario) = setup(MockSimulatorConfig::default(), vec![cam]).await;

        let hits = Arc::new(AtomicU64::new(0));
        let streams = factory
            .apply_subscriptions(&blueprint, &scenario, |_, _| counting(&hits))
            .unwrap();
        assert_eq!(streams, 3);

        let cam = actor(&factory, &scenario, "cam");
        let actor_id = cam.identity().actor_id;
        factory.teardown(&scenario).await;

        assert!(!cam.stream().is_listening());
        assert!(cam.as_server_side().unwrap().listening_gbuffers().is_empty());
        assert!(!cam.ros_bridge().unwrap().is_enabled_for_ros());
        assert!(!factory.world().deliver(actor_id, StreamKey::Primary, packet(actor_id, StreamKey::Primary, 1)));
        assert!(matches!(
            cam.stream().listen(counting(&hits)),
            Err(ContractError::ActorDestroyed { .. })
        ));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    /// mock 生产者经由 SensorWorld 投递到回调
    #[tokio::test]
    async fn test_mock_producer_end_to_end() {
        let config = MockSimulatorConfig {
            produce_data: true,
            producer: ProducerConfig {
                image_width: 4,
                image_height: 2,
                lidar_points: 8,
                lane_invasion_every: 1,
            },
            ..Default::default()
        };
        let mut cam = sensor("cam", SensorType::Camera, 100.0);
        cam.listen = true;
        cam.gbuffers = vec![1];
        let mut lane = sensor("lane", SensorType::LaneInvasion, 100.0);
        lane.listen = true;
        let (factory, blueprint, scenario) = setup(config, vec![cam, lane]).await;

        let received: Arc<Mutex<Vec<(String, SensorPacket)>>> = Arc::new(Mutex::new(Vec::new()));
        let stats = Arc::new(Mutex::new(DeliveryStatsAggregator::new()));
        factory
            .apply_subscriptions(&blueprint, &scenario, |spec, _| {
                let id = spec.id.clone();
                let received = received.clone();
                let stats = stats.clone();
                Arc::new(move |p: SensorPacket| {
                    stats.lock().update(&id, &p);
                    received.lock().push((id.clone(), p));
                })
            })
            .unwrap();
        assert_eq!(factory.client().active_producers().len(), 3);

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let done = {
                let stats = stats.lock();
                [("cam", StreamKey::Primary), ("cam", StreamKey::GBuffer(1)), ("lane", StreamKey::Primary)]
                    .iter()
                    .all(|(id, key)| stats.stream(id, *key).is_some_and(|s| s.packets >= 2))
            };
            if done {
                break;
            }
            assert!(tokio::time::Instant::now() < deadline, "producers timed out");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        factory.teardown(&scenario).await;
        assert!(factory.client().active_producers().is_empty());

        let received = received.lock();
        let depth = received
            .iter()
            .find(|(_, p)| p.stream == StreamKey::GBuffer(1))
            .unwrap();
        assert!(matches!(
            &depth.1.payload,
            SensorPayload::Image(image) if image.format == ImageFormat::R32F
        ));
        assert!(received
            .iter()
            .filter(|(id, _)| id == "lane")
            .all(|(_, p)| matches!(p.payload, SensorPayload::LaneInvasion(_))));
    }

    /// 配置文件 → spawn → 订阅
    #[tokio::test]
    async fn test_config_to_subscriptions() {
        let toml = r#"
[session]
host = "127.0.0.1"
port = 2000

[[vehicles]]
id = "ego"
blueprint = "vehicle.tesla.model3"

[[vehicles.sensors]]
id = "front"
sensor_type = "camera"
frequency_hz = 20.0
gbuffers = [1, 11]
enable_ros = true

[[vehicles.sensors]]
id = "lane"
sensor_type = "lane_invasion"
frequency_hz = 10.0
"#;
        let blueprint =
            config_loader::ConfigLoader::load_from_str(toml, config_loader::ConfigFormat::Toml)
                .unwrap();

        let mut client = MockSimulator::new();
        client
            .connect(&blueprint.session.host, blueprint.session.port)
            .await
            .unwrap();
        let factory = SensorFactory::new(client, Arc::new(SensorWorld::new()));
        let scenario = factory.spawn_from_blueprint(&blueprint).await.unwrap();

        let streams = factory
            .apply_subscriptions(&blueprint, &scenario, |_, _| Arc::new(|_| {}))
            .unwrap();
        assert_eq!(streams, 4);

        let front = scenario.sensor_actor("front").unwrap();
        let lane = scenario.sensor_actor("lane").unwrap();
        let commands = factory.client().commands();
        for key in [StreamKey::Primary, StreamKey::GBuffer(1), StreamKey::GBuffer(11)] {
            assert!(commands.contains(&TransportCommand::StartDelivery { actor_id: front, key }));
        }
        assert!(commands.contains(&TransportCommand::StartDelivery {
            actor_id: lane,
            key: StreamKey::Primary
        }));
        assert_eq!(factory.client().ros_enabled_actors(), vec![front]);
        assert_eq!(
            factory.client().actor_blueprint(lane).as_deref(),
            Some("sensor.other.lane_invasion")
        );
    }

    /// 并发 listen/stop 与投递：不崩溃，最终 stop 之后不再调用回调
    #[test]
    fn test_concurrent_listen_stop_deliver() {
        let sim = MockSimulator::new();
        sim.set_connected(true);
        let world = Arc::new(SensorWorld::new());
        let target: Arc<dyn DeliveryTarget> = world.clone();
        sim.attach_delivery_target(&target);

        let identity = contracts::SensorIdentity::new(7, "sensor.camera.rgb", "cam");
        let actor = SensorActor::wrap(identity, SensorType::Camera, sim.transport());
        world.register(actor.clone());

        let hits = Arc::new(AtomicU64::new(0));
        let mut handles = Vec::new();

        for t in 0..4u64 {
            let world = world.clone();
            handles.push(std::thread::spawn(move || {
                for frame in 0..2_000 {
                    let key = if frame % 2 == 0 {
                        StreamKey::Primary
                    } else {
                        StreamKey::GBuffer(t as u32)
                    };
                    world.deliver(7, key, packet(7, key, frame));
                }
            }));
        }
        for t in 0..2u32 {
            let actor = actor.clone();
            let hits = hits.clone();
            handles.push(std::thread::spawn(move || {
                let aux = actor.auxiliary().unwrap();
                for _ in 0..500 {
                    actor.stream().listen(counting(&hits)).unwrap();
                    aux.listen_to_gbuffer(t, counting(&hits)).unwrap();
                    actor.stream().stop().unwrap();
                    aux.stop_gbuffer(t).unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(!actor.stream().is_listening());
        let before = hits.load(Ordering::SeqCst);
        for t in 0..4u32 {
            assert!(!world.deliver(7, StreamKey::GBuffer(t), packet(7, StreamKey::GBuffer(t), 0)));
        }
        assert!(!world.deliver(7, StreamKey::Primary, packet(7, StreamKey::Primary, 0)));
        assert_eq!(hits.load(Ordering::SeqCst), before);
    }
}
