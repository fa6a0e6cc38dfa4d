//! Mock simulator
//!
//! 用于测试和开发的 mock 实现：同时充当 `SimulatorClient` 和 `Transport`，
//! 记录所有 transport 调用，支持注入失败场景，并可在后台线程中产生模拟数据。

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Weak};

use bytes::Bytes;
use contracts::{
    ActorId, ContractError, DeliveryTarget, GBufferTexture, SensorIdentity, SensorSpec,
    SensorType, StreamKey, Transport, TransportRequest, VehicleConfig,
};
use parking_lot::Mutex;
use tracing::{debug, info, instrument};

use crate::client::SimulatorClient;
use crate::error::{FactoryError, Result};
use crate::mock_producer::{spawn_producer, ProducerConfig, ProducerHandle};

/// Mock 模拟器配置
#[derive(Debug, Clone)]
pub struct MockSimulatorConfig {
    /// 拒绝所有 start_delivery 请求
    pub reject_starts: bool,
    /// ROS bridge 是否可用
    pub ros_bridge_available: bool,
    /// 订阅后是否在后台线程中产生数据
    pub produce_data: bool,
    /// 应该 spawn 失败的 vehicle / sensor 配置 ID
    pub fail_spawn: Vec<String>,
    /// 应该 destroy 失败的 actor IDs
    pub fail_destroy: Vec<ActorId>,
    /// 模拟数据参数
    pub producer: ProducerConfig,
}

impl Default for MockSimulatorConfig {
    fn default() -> Self {
        Self {
            reject_starts: false,
            ros_bridge_available: true,
            produce_data: false,
            fail_spawn: Vec::new(),
            fail_destroy: Vec::new(),
            producer: ProducerConfig::default(),
        }
    }
}

/// 已被 transport 接受的调用记录
#[derive(Debug, Clone, PartialEq)]
pub enum TransportCommand {
    StartDelivery { actor_id: ActorId, key: StreamKey },
    StopDelivery { actor_id: ActorId, key: StreamKey },
    SendCommand { actor_id: ActorId, message: Bytes },
    SetRosBridge { actor_id: ActorId, enabled: bool },
}

#[derive(Debug)]
struct ActorRecord {
    blueprint: String,
    /// None for vehicles
    sensor_type: Option<SensorType>,
    frequency_hz: f64,
}

#[derive(Default)]
struct MockState {
    actors: HashMap<ActorId, ActorRecord>,
    commands: Vec<TransportCommand>,
    ros_enabled: HashSet<ActorId>,
    producers: HashMap<(ActorId, StreamKey), ProducerHandle>,
}

struct Shared {
    config: MockSimulatorConfig,
    next_actor_id: AtomicU32,
    connected: AtomicBool,
    state: Mutex<MockState>,
    target: Mutex<Option<Weak<dyn DeliveryTarget>>>,
}

/// Mock 模拟器
///
/// Cheap to clone; all clones share the same simulated world.
#[derive(Clone)]
pub struct MockSimulator {
    shared: Arc<Shared>,
}

impl MockSimulator {
    /// 创建默认 mock 模拟器
    pub fn new() -> Self {
        Self::with_config(MockSimulatorConfig::default())
    }

    /// 使用配置创建 mock 模拟器
    pub fn with_config(config: MockSimulatorConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                next_actor_id: AtomicU32::new(1000), // 从 1000 开始，便于识别
                connected: AtomicBool::new(false),
                state: Mutex::new(MockState::default()),
                target: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &MockSimulatorConfig {
        &self.shared.config
    }

    pub fn set_connected(&self, connected: bool) {
        self.shared.connected.store(connected, Ordering::SeqCst);
    }

    /// Close the session; running producers keep going until their streams stop
    pub fn disconnect(&self) {
        self.set_connected(false);
        info!("mock simulator disconnected");
    }

    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    /// 已接受的 transport 调用（按时间顺序）
    pub fn commands(&self) -> Vec<TransportCommand> {
        self.shared.state.lock().commands.clone()
    }

    pub fn clear_commands(&self) {
        self.shared.state.lock().commands.clear();
    }

    /// 当前启用 ROS bridge 的 actors（已排序）
    pub fn ros_enabled_actors(&self) -> Vec<ActorId> {
        let mut actors: Vec<_> = self.shared.state.lock().ros_enabled.iter().copied().collect();
        actors.sort_unstable();
        actors
    }

    /// 当前正在产生数据的 (actor, stream)（已排序）
    pub fn active_producers(&self) -> Vec<(ActorId, StreamKey)> {
        let mut keys: Vec<_> = self.shared.state.lock().producers.keys().copied().collect();
        keys.sort_unstable();
        keys
    }

    /// 获取当前已创建的 actor 数量
    pub fn actor_count(&self) -> usize {
        self.shared.state.lock().actors.len()
    }

    /// 获取所有已创建的 actor IDs（已排序）
    pub fn all_actor_ids(&self) -> Vec<ActorId> {
        let mut ids: Vec<_> = self.shared.state.lock().actors.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Blueprint an actor was spawned from
    pub fn actor_blueprint(&self, actor_id: ActorId) -> Option<String> {
        self.shared
            .state
            .lock()
            .actors
            .get(&actor_id)
            .map(|record| record.blueprint.clone())
    }

    fn allocate_actor_id(&self) -> ActorId {
        self.shared.next_actor_id.fetch_add(1, Ordering::SeqCst)
    }

    fn should_fail_spawn(&self, config_id: &str) -> bool {
        self.shared.config.fail_spawn.iter().any(|id| id == config_id)
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(FactoryError::ConnectionFailed {
                message: "not connected".into(),
            })
        }
    }

    fn delivery_target(&self) -> Option<Weak<dyn DeliveryTarget>> {
        self.shared.target.lock().clone()
    }

    /// Check a stream start against what the simulated actor can produce
    fn check_start(
        &self,
        state: &MockState,
        key: StreamKey,
        sensor: &SensorIdentity,
    ) -> contracts::Result<()> {
        let reject = |message: &str| {
            Err(ContractError::transport_rejected(
                sensor.actor_id,
                TransportRequest::StartDelivery(key),
                message,
            ))
        };

        if self.shared.config.reject_starts {
            return reject("stream start refused by simulator");
        }
        if let Some(id) = key.gbuffer_id() {
            if GBufferTexture::from_id(id).is_none() {
                return reject("unknown gbuffer texture");
            }
            // unknown actors are not checked
            let sensor_type = state
                .actors
                .get(&sensor.actor_id)
                .and_then(|record| record.sensor_type);
            if sensor_type.is_some_and(|t| !t.supports_gbuffers()) {
                return reject("sensor has no gbuffer output");
            }
        }
        Ok(())
    }
}

impl Default for MockSimulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockSimulator {
    fn start_delivery(&self, key: StreamKey, sensor: &SensorIdentity) -> contracts::Result<()> {
        let target = self.delivery_target();
        let mut state = self.shared.state.lock();
        self.check_start(&state, key, sensor)?;

        let actor_id = sensor.actor_id;
        let producer = state.actors.get(&actor_id).and_then(|record| {
            Some((record.sensor_type?, record.frequency_hz))
        });
        if let (true, Some(target), Some((sensor_type, frequency_hz))) =
            (self.shared.config.produce_data, target, producer)
        {
            let config = self.shared.config.producer.clone();
            state.producers.entry((actor_id, key)).or_insert_with(|| {
                spawn_producer(actor_id, key, sensor_type, frequency_hz, config, target)
            });
        }

        state
            .commands
            .push(TransportCommand::StartDelivery { actor_id, key });
        Ok(())
    }

    fn stop_delivery(&self, key: StreamKey, sensor: &SensorIdentity) -> contracts::Result<()> {
        let actor_id = sensor.actor_id;
        let mut state = self.shared.state.lock();
        if let Some(handle) = state.producers.remove(&(actor_id, key)) {
            handle.stop();
        }
        state
            .commands
            .push(TransportCommand::StopDelivery { actor_id, key });
        Ok(())
    }

    fn send_command(&self, sensor: &SensorIdentity, message: Bytes) -> contracts::Result<()> {
        if !self.is_connected() {
            return Err(ContractError::not_connected("simulator session is closed"));
        }
        debug!(actor_id = sensor.actor_id, len = message.len(), "mock command received");
        self.shared.state.lock().commands.push(TransportCommand::SendCommand {
            actor_id: sensor.actor_id,
            message,
        });
        Ok(())
    }

    fn set_ros_bridge(&self, sensor: &SensorIdentity, enabled: bool) -> contracts::Result<()> {
        let actor_id = sensor.actor_id;
        let reject = |message: &str| {
            Err(ContractError::transport_rejected(
                actor_id,
                TransportRequest::SetRosBridge(enabled),
                message,
            ))
        };
        if !self.is_connected() {
            return reject("simulator session is closed");
        }
        if !self.shared.config.ros_bridge_available {
            return reject("ros bridge unavailable");
        }

        let mut state = self.shared.state.lock();
        if enabled {
            state.ros_enabled.insert(actor_id);
        } else {
            state.ros_enabled.remove(&actor_id);
        }
        state
            .commands
            .push(TransportCommand::SetRosBridge { actor_id, enabled });
        Ok(())
    }
}

impl SimulatorClient for MockSimulator {
    #[instrument(name = "mock_sim_connect", skip(self), fields(host = %host, port))]
    async fn connect(&mut self, host: &str, port: u16) -> Result<()> {
        let _ = (host, port);
        self.set_connected(true);
        Ok(())
    }

    #[instrument(
        name = "mock_sim_spawn_sensor",
        skip(self, spec),
        fields(sensor_id = %spec.id, parent)
    )]
    async fn spawn_sensor(
        &self,
        spec: &SensorSpec,
        parent: Option<ActorId>,
    ) -> Result<SensorIdentity> {
        self.ensure_connected()?;

        // 验证 parent 存在
        if let Some(parent_id) = parent {
            if !self.shared.state.lock().actors.contains_key(&parent_id) {
                return Err(FactoryError::sensor_spawn(
                    spec.id.clone(),
                    format!("parent actor {parent_id} not found"),
                ));
            }
        }

        if self.should_fail_spawn(&spec.id) {
            return Err(FactoryError::sensor_spawn(spec.id.clone(), "mock failure"));
        }

        let actor_id = self.allocate_actor_id();
        let blueprint = spec.sensor_type.blueprint_id();
        self.shared.state.lock().actors.insert(
            actor_id,
            ActorRecord {
                blueprint: blueprint.to_string(),
                sensor_type: Some(spec.sensor_type),
                frequency_hz: spec.frequency_hz,
            },
        );
        Ok(SensorIdentity::new(actor_id, blueprint, spec.id.clone()))
    }

    #[instrument(name = "mock_sim_spawn_vehicle", skip(self, config), fields(vehicle_id = %config.id))]
    async fn spawn_vehicle(&self, config: &VehicleConfig) -> Result<ActorId> {
        self.ensure_connected()?;

        if self.should_fail_spawn(&config.id) {
            return Err(FactoryError::VehicleSpawnFailed {
                vehicle_id: config.id.clone(),
                message: "mock failure".into(),
            });
        }

        let actor_id = self.allocate_actor_id();
        self.shared.state.lock().actors.insert(
            actor_id,
            ActorRecord {
                blueprint: config.blueprint.clone(),
                sensor_type: None,
                frequency_hz: 0.0,
            },
        );
        Ok(actor_id)
    }

    #[instrument(name = "mock_sim_destroy_actor", skip(self), fields(actor_id))]
    async fn destroy_actor(&self, actor_id: ActorId) -> Result<()> {
        if self.shared.config.fail_destroy.contains(&actor_id) {
            return Err(FactoryError::DestroyFailed {
                actor_id,
                message: "mock failure".into(),
            });
        }

        // 幂等：即使不存在也返回 Ok
        let mut state = self.shared.state.lock();
        state.actors.remove(&actor_id);
        state.ros_enabled.remove(&actor_id);
        state.producers.retain(|(owner, _), _| *owner != actor_id);
        Ok(())
    }

    #[instrument(name = "mock_sim_actor_exists", skip(self), fields(actor_id))]
    async fn actor_exists(&self, actor_id: ActorId) -> Result<bool> {
        Ok(self.shared.state.lock().actors.contains_key(&actor_id))
    }

    fn transport(&self) -> Arc<dyn Transport> {
        Arc::new(self.clone())
    }

    fn attach_delivery_target(&self, target: &Arc<dyn DeliveryTarget>) {
        *self.shared.target.lock() = Some(Arc::downgrade(target));
    }
}
