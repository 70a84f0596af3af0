//! Lightweight in-process simulator.
//!
//! A straight multi-lane road with point-mass vehicles, for CI and offline
//! runs. Lane snapping, gradual lane changes, braking, lane following, a
//! bridge that becomes ready after a few status polls and a time-of-day
//! clock are modelled; nothing else is.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::adapter::{check_hour, SimulatorApi};
use crate::error::SimulatorError;
use crate::kinematics::Heading;
use crate::types::{
    AgentId, AgentState, AgentType, LaneDirection, SensorInfo, Transform, Vector, VehicleControl,
};

/// Geometry of the simulated road.
#[derive(Debug, Clone, PartialEq)]
pub struct RoadConfig {
    /// Centre of the rightmost lane at longitudinal position zero.
    pub origin: Vector,
    /// Direction of travel in degrees.
    pub heading_deg: f64,
    pub lane_width_m: f64,
    /// Lanes are numbered from the right, starting at 0.
    pub lane_count: u32,
}

impl Default for RoadConfig {
    fn default() -> Self {
        // Runs towards world -X; (1699.6, 88.38, -601.9) sits on lane 1.
        Self {
            origin: Vector::new(1700.0, 88.38, -598.4),
            heading_deg: 270.0,
            lane_width_m: 3.5,
            lane_count: 4,
        }
    }
}

impl RoadConfig {
    fn heading(&self) -> Heading {
        Heading::from_degrees(self.heading_deg)
    }

    /// Lane index closest to `point`.
    pub fn lane_of(&self, point: Vector) -> u32 {
        let lateral = (point - self.origin).dot(self.heading().right());
        let lane = (-lateral / self.lane_width_m).round();
        lane.clamp(0.0, f64::from(self.lane_count.saturating_sub(1))) as u32
    }

    /// Centre of `lane` at the same longitudinal position as `point`.
    pub fn lane_center(&self, point: Vector, lane: u32) -> Vector {
        let heading = self.heading();
        let along = (point - self.origin).dot(heading.forward());
        let center = self.origin + heading.forward() * along
            - heading.right() * (f64::from(lane) * self.lane_width_m);
        Vector::new(center.x, self.origin.y, center.z)
    }

    fn lane_transform(&self, point: Vector, lane: u32) -> Transform {
        Transform {
            position: self.lane_center(point, lane),
            rotation: Vector::new(0.0, self.heading_deg, 0.0),
        }
    }
}

/// Configuration for the lightweight simulator.
#[derive(Debug, Clone)]
pub struct LightweightConfig {
    pub road: RoadConfig,
    /// Scenes accepted by `load_scene`.
    pub scenes: Vec<String>,
    /// Integration step in simulated seconds.
    pub step_s: f64,
    /// Deceleration at full braking, m/s².
    pub max_braking_mss: f64,
    /// Lateral speed of a lane change, m/s.
    pub lane_change_speed_ms: f64,
    /// Fraction of speed lost per second to rolling drag.
    pub drag_per_s: f64,
    /// Speed noise standard deviation in m/s per step.
    pub speed_noise_ms: f64,
    /// RNG seed for deterministic mode. None = random.
    pub seed: Option<u64>,
    /// Status polls answered `false` before the bridge reports ready. None = never.
    pub bridge_ready_after_polls: Option<u32>,
    /// Simulated seconds per simulated-clock hour is `3600 / time_scale`.
    pub time_scale: f64,
    /// Initial time of day in hours.
    pub initial_hour: f64,
    /// Sensors attached to every EGO vehicle.
    pub ego_sensors: Vec<String>,
}

impl Default for LightweightConfig {
    fn default() -> Self {
        Self {
            road: RoadConfig::default(),
            scenes: vec!["SanFrancisco".to_string()],
            step_s: 0.05,
            max_braking_mss: 8.0,
            lane_change_speed_ms: 1.75,
            drag_per_s: 0.02,
            speed_noise_ms: 0.0,
            seed: None,
            bridge_ready_after_polls: Some(2),
            time_scale: 60.0,
            initial_hour: 9.0,
            ego_sensors: [
                "velodyne",
                "Main Camera",
                "Telephoto Camera",
                "GPS",
                "IMU",
                "Radar",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum BridgeStatus {
    Unbridged,
    Connecting { polls_left: Option<u32> },
    Connected,
}

#[derive(Debug, Clone)]
struct SimAgent {
    id: AgentId,
    name: String,
    agent_type: AgentType,
    state: AgentState,
    /// Max speed while following its lane.
    lane_following: Option<f64>,
    /// Lane being changed into.
    target_lane: Option<u32>,
    control: Option<VehicleControl>,
    sticky: bool,
    sensors: Vec<SensorInfo>,
    bridge: BridgeStatus,
}

/// In-process simulator with straight-road kinematics.
pub struct LightweightSimulator {
    config: LightweightConfig,
    scene: Option<String>,
    agents: Vec<SimAgent>,
    next_uid: u64,
    rng: StdRng,
    sim_time_s: f64,
    hour: f64,
    hour_fixed: bool,
}

impl LightweightSimulator {
    pub fn new(config: LightweightConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let hour = config.initial_hour;
        Self {
            config,
            scene: None,
            agents: Vec::new(),
            next_uid: 1,
            rng,
            sim_time_s: 0.0,
            hour,
            hour_fixed: false,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(LightweightConfig::default())
    }

    /// Simulated seconds since the scene was loaded or reset.
    pub fn sim_time_s(&self) -> f64 {
        self.sim_time_s
    }

    /// Current state of an agent, without a round trip.
    pub fn peek_state(&self, agent: &AgentId) -> Option<AgentState> {
        self.agents.iter().find(|a| &a.id == agent).map(|a| a.state)
    }

    /// Asset name the agent was spawned with.
    pub fn agent_name(&self, agent: &AgentId) -> Option<&str> {
        self.agents
            .iter()
            .find(|a| &a.id == agent)
            .map(|a| a.name.as_str())
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Lane the agent currently occupies.
    pub fn lane_of(&self, agent: &AgentId) -> Option<u32> {
        self.peek_state(agent)
            .map(|s| self.config.road.lane_of(s.position()))
    }

    /// Whether the agent is still moving into another lane.
    pub fn is_changing_lane(&self, agent: &AgentId) -> bool {
        self.agents
            .iter()
            .any(|a| &a.id == agent && a.target_lane.is_some())
    }

    fn agent_mut(&mut self, agent: &AgentId) -> Result<&mut SimAgent, SimulatorError> {
        self.agents
            .iter_mut()
            .find(|a| &a.id == agent)
            .ok_or_else(|| SimulatorError::AgentNotFound(agent.clone()))
    }

    fn require_scene(&self) -> Result<(), SimulatorError> {
        if self.scene.is_none() {
            return Err(SimulatorError::Remote {
                command: "scene".to_string(),
                message: "no scene loaded".to_string(),
            });
        }
        Ok(())
    }

    fn clear_scene(&mut self) {
        self.agents.clear();
        self.sim_time_s = 0.0;
    }

    /// Integrate all agents over `dt` seconds.
    fn integrate(&mut self, dt: f64) {
        let road = self.config.road.clone();
        let road_forward = road.heading().forward();
        let drag = (1.0 - self.config.drag_per_s * dt).max(0.0);
        let lateral_step = self.config.lane_change_speed_ms * dt;

        for i in 0..self.agents.len() {
            let noise = self.gaussian_noise(self.config.speed_noise_ms);
            let agent = &mut self.agents[i];
            let mut velocity = agent.state.velocity;
            let mut speed = velocity.magnitude();

            if let Some(braking) = agent.control.and_then(|c| c.braking) {
                let decel = braking.clamp(0.0, 1.0) * self.config.max_braking_mss;
                speed = (speed - decel * dt).max(0.0);
            }
            speed = (speed * drag + noise).max(0.0);

            if let Some(max_speed) = agent.lane_following {
                velocity = road_forward * speed.min(max_speed);
            } else if velocity.magnitude() > f64::EPSILON {
                velocity = velocity * (speed / velocity.magnitude());
            }

            agent.state.velocity = velocity;
            let mut position = agent.state.transform.position + velocity * dt;

            if let Some(lane) = agent.target_lane {
                let center = road.lane_center(position, lane);
                let offset = Vector::new(center.x - position.x, 0.0, center.z - position.z);
                let remaining = offset.magnitude();
                if remaining <= lateral_step {
                    position = Vector::new(center.x, position.y, center.z);
                    agent.target_lane = None;
                } else {
                    position = position + offset * (lateral_step / remaining);
                }
            }
            agent.state.transform.position = position;
        }
    }

    fn clear_transient_controls(&mut self) {
        for agent in &mut self.agents {
            if !agent.sticky {
                agent.control = None;
            }
        }
    }

    /// Generate Gaussian noise using Box-Muller transform.
    fn gaussian_noise(&mut self, stddev: f64) -> f64 {
        if stddev == 0.0 {
            return 0.0;
        }
        let u1: f64 = self.rng.gen::<f64>().max(f64::EPSILON);
        let u2: f64 = self.rng.gen();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        z * stddev
    }

    fn advance_clock(&mut self, seconds: f64) {
        if !self.hour_fixed {
            self.hour = (self.hour + seconds * self.config.time_scale / 3600.0) % 24.0;
        }
    }
}

impl std::fmt::Debug for LightweightSimulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LightweightSimulator")
            .field("scene", &self.scene)
            .field("agents", &self.agents.len())
            .field("sim_time_s", &self.sim_time_s)
            .field("hour", &self.hour)
            .finish()
    }
}

#[async_trait]
impl SimulatorApi for LightweightSimulator {
    fn backend(&self) -> &'static str {
        "lightweight"
    }

    async fn current_scene(&mut self) -> Result<Option<String>, SimulatorError> {
        Ok(self.scene.clone())
    }

    async fn load_scene(&mut self, scene: &str) -> Result<(), SimulatorError> {
        if !self.config.scenes.iter().any(|s| s == scene) {
            return Err(SimulatorError::Remote {
                command: "simulator/load_scene".to_string(),
                message: format!("scene '{scene}' not found"),
            });
        }
        self.scene = Some(scene.to_string());
        self.clear_scene();
        Ok(())
    }

    async fn reset(&mut self) -> Result<(), SimulatorError> {
        self.require_scene()?;
        self.clear_scene();
        Ok(())
    }

    async fn spawn_points(&mut self) -> Result<Vec<Transform>, SimulatorError> {
        self.require_scene()?;
        let road = &self.config.road;
        let origin = road.origin;
        Ok((0..road.lane_count.min(2))
            .flat_map(|lane| {
                [0.0, -100.0].map(|along| {
                    road.lane_transform(road.heading().offset(origin, along), lane)
                })
            })
            .collect())
    }

    async fn map_point_on_lane(&mut self, point: Vector) -> Result<Transform, SimulatorError> {
        self.require_scene()?;
        let road = &self.config.road;
        Ok(road.lane_transform(point, road.lane_of(point)))
    }

    async fn add_agent(
        &mut self,
        name: &str,
        agent_type: AgentType,
        state: &AgentState,
    ) -> Result<AgentId, SimulatorError> {
        self.require_scene()?;
        let id = AgentId(format!("lw-{}", self.next_uid));
        self.next_uid += 1;

        let sensors = if agent_type == AgentType::Ego {
            self.config
                .ego_sensors
                .iter()
                .enumerate()
                .map(|(i, sensor)| SensorInfo {
                    uid: format!("{}-s{i}", id.0),
                    name: sensor.clone(),
                    enabled: false,
                })
                .collect()
        } else {
            Vec::new()
        };

        self.agents.push(SimAgent {
            id: id.clone(),
            name: name.to_string(),
            agent_type,
            state: *state,
            lane_following: None,
            target_lane: None,
            control: None,
            sticky: false,
            sensors,
            bridge: BridgeStatus::Unbridged,
        });
        log::debug!("lightweight: spawned {name} as {id} at {}", state.position());
        Ok(id)
    }

    async fn agent_state(&mut self, agent: &AgentId) -> Result<AgentState, SimulatorError> {
        self.peek_state(agent)
            .ok_or_else(|| SimulatorError::AgentNotFound(agent.clone()))
    }

    async fn set_agent_state(
        &mut self,
        agent: &AgentId,
        state: &AgentState,
    ) -> Result<(), SimulatorError> {
        self.agent_mut(agent)?.state = *state;
        Ok(())
    }

    async fn apply_control(
        &mut self,
        agent: &AgentId,
        control: &VehicleControl,
        sticky: bool,
    ) -> Result<(), SimulatorError> {
        let agent = self.agent_mut(agent)?;
        if agent.agent_type != AgentType::Ego {
            return Err(SimulatorError::InvalidArgument(format!(
                "{} is not an EGO vehicle",
                agent.id
            )));
        }
        agent.control = Some(*control);
        agent.sticky = sticky;
        Ok(())
    }

    async fn follow_closest_lane(
        &mut self,
        agent: &AgentId,
        follow: bool,
        max_speed: f64,
        _lane_change: bool,
    ) -> Result<(), SimulatorError> {
        let agent = self.agent_mut(agent)?;
        agent.lane_following = follow.then_some(max_speed);
        Ok(())
    }

    async fn change_lane(
        &mut self,
        agent: &AgentId,
        direction: LaneDirection,
    ) -> Result<(), SimulatorError> {
        let road = self.config.road.clone();
        let agent = self.agent_mut(agent)?;
        let lane = agent
            .target_lane
            .unwrap_or_else(|| road.lane_of(agent.state.position()));
        let target = match direction {
            LaneDirection::Left if lane + 1 < road.lane_count => lane + 1,
            LaneDirection::Right if lane > 0 => lane - 1,
            _ => {
                log::warn!("lightweight: {} has no lane to the {direction:?}", agent.id);
                return Ok(());
            }
        };
        agent.target_lane = Some(target);
        Ok(())
    }

    async fn sensors(&mut self, agent: &AgentId) -> Result<Vec<SensorInfo>, SimulatorError> {
        Ok(self.agent_mut(agent)?.sensors.clone())
    }

    async fn set_sensor_enabled(
        &mut self,
        sensor_uid: &str,
        enabled: bool,
    ) -> Result<(), SimulatorError> {
        let sensor = self
            .agents
            .iter_mut()
            .flat_map(|a| a.sensors.iter_mut())
            .find(|s| s.uid == sensor_uid)
            .ok_or_else(|| {
                SimulatorError::InvalidArgument(format!("unknown sensor {sensor_uid}"))
            })?;
        sensor.enabled = enabled;
        Ok(())
    }

    async fn connect_bridge(
        &mut self,
        agent: &AgentId,
        _host: &str,
        _port: u16,
    ) -> Result<(), SimulatorError> {
        let polls_left = self.config.bridge_ready_after_polls;
        let agent = self.agent_mut(agent)?;
        if agent.agent_type != AgentType::Ego {
            return Err(SimulatorError::InvalidArgument(format!(
                "{} cannot connect to a bridge",
                agent.id
            )));
        }
        agent.bridge = BridgeStatus::Connecting { polls_left };
        Ok(())
    }

    async fn bridge_connected(&mut self, agent: &AgentId) -> Result<bool, SimulatorError> {
        let agent = self.agent_mut(agent)?;
        agent.bridge = match agent.bridge {
            BridgeStatus::Connecting {
                polls_left: Some(0),
            } => BridgeStatus::Connected,
            BridgeStatus::Connecting {
                polls_left: Some(n),
            } => BridgeStatus::Connecting {
                polls_left: Some(n - 1),
            },
            other => other,
        };
        Ok(agent.bridge == BridgeStatus::Connected)
    }

    async fn run(&mut self, seconds: f64) -> Result<(), SimulatorError> {
        self.require_scene()?;
        if seconds.is_nan() || seconds < 0.0 {
            return Err(SimulatorError::InvalidArgument(format!(
                "run time must be non-negative, got {seconds}"
            )));
        }
        let mut remaining = seconds;
        while remaining > 1e-9 {
            let dt = remaining.min(self.config.step_s);
            self.integrate(dt);
            self.sim_time_s += dt;
            remaining -= dt;
        }
        self.advance_clock(seconds);
        self.clear_transient_controls();
        Ok(())
    }

    async fn time_of_day(&mut self) -> Result<f64, SimulatorError> {
        Ok(self.hour)
    }

    async fn set_time_of_day(&mut self, hour: f64, fixed: bool) -> Result<(), SimulatorError> {
        self.hour = check_hour(hour)?;
        self.hour_fixed = fixed;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_sim() -> LightweightSimulator {
        let config = LightweightConfig {
            seed: Some(42),
            drag_per_s: 0.0,
            ..Default::default()
        };
        LightweightSimulator::new(config)
    }

    async fn loaded_sim() -> LightweightSimulator {
        let mut sim = create_test_sim();
        sim.load_scene("SanFrancisco").await.unwrap();
        sim
    }

    fn moving(transform: Transform, speed: f64) -> AgentState {
        AgentState {
            transform,
            velocity: Heading::from_degrees(transform.yaw_deg()).velocity(speed),
            ..Default::default()
        }
    }

    #[test]
    fn test_lane_snapping_geometry() {
        let road = RoadConfig::default();
        let hint = Vector::new(1699.6, 88.38, -601.9);
        assert_eq!(road.lane_of(hint), 1);

        let snapped = road.lane_center(Vector::new(1650.0, 90.0, -600.5), 1);
        assert!((snapped.x - 1650.0).abs() < 1e-9);
        assert!((snapped.z - -601.9).abs() < 1e-9);
        assert_eq!(snapped.y, 88.38);
    }

    #[test]
    fn test_lane_index_is_clamped() {
        let road = RoadConfig::default();
        assert_eq!(road.lane_of(Vector::new(1700.0, 88.38, -500.0)), 0);
        assert_eq!(road.lane_of(Vector::new(1700.0, 88.38, -700.0)), 3);
    }

    #[tokio::test]
    async fn test_requires_scene() {
        let mut sim = create_test_sim();
        assert!(sim.current_scene().await.unwrap().is_none());
        assert!(sim.map_point_on_lane(Vector::ZERO).await.is_err());
        assert!(sim.run(1.0).await.is_err());
        assert!(sim.reset().await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_scene_rejected() {
        let mut sim = create_test_sim();
        match sim.load_scene("Atlantis").await.unwrap_err() {
            SimulatorError::Remote { message, .. } => assert!(message.contains("Atlantis")),
            other => panic!("Expected Remote, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_reset_removes_agents() {
        let mut sim = loaded_sim().await;
        let t = sim.map_point_on_lane(Vector::new(1700.0, 88.0, -601.9)).await.unwrap();
        sim.add_agent("Sedan", AgentType::Npc, &AgentState::at(t))
            .await
            .unwrap();
        sim.run(1.0).await.unwrap();
        assert_eq!(sim.agent_count(), 1);

        sim.reset().await.unwrap();
        assert_eq!(sim.agent_count(), 0);
        assert_eq!(sim.sim_time_s(), 0.0);
        assert_eq!(sim.current_scene().await.unwrap().as_deref(), Some("SanFrancisco"));
    }

    #[tokio::test]
    async fn test_run_integrates_velocity() {
        let mut sim = loaded_sim().await;
        let t = sim.map_point_on_lane(Vector::new(1700.0, 88.0, -601.9)).await.unwrap();
        let id = sim
            .add_agent("Sedan", AgentType::Npc, &moving(t, 10.0))
            .await
            .unwrap();

        sim.run(2.0).await.unwrap();

        let state = sim.agent_state(&id).await.unwrap();
        assert!((state.position().x - (t.position.x - 20.0)).abs() < 1e-6);
        assert!((state.speed() - 10.0).abs() < 1e-9);
        assert!((sim.sim_time_s() - 2.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_braking_slows_ego_for_one_run() {
        let mut sim = loaded_sim().await;
        let t = sim.map_point_on_lane(Vector::new(1700.0, 88.0, -601.9)).await.unwrap();
        let ego = sim
            .add_agent("XE", AgentType::Ego, &moving(t, 12.0))
            .await
            .unwrap();

        sim.apply_control(&ego, &VehicleControl::braking(0.2), false)
            .await
            .unwrap();
        sim.run(0.5).await.unwrap();
        // 0.2 * 8 m/s² for 0.5 s
        let speed = sim.agent_state(&ego).await.unwrap().speed();
        assert!((speed - 11.2).abs() < 1e-6, "got {speed}");

        // Non-sticky control is gone after the run.
        sim.run(0.5).await.unwrap();
        let after = sim.agent_state(&ego).await.unwrap().speed();
        assert!((after - speed).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_control_rejected_for_npc() {
        let mut sim = loaded_sim().await;
        let t = sim.map_point_on_lane(Vector::new(1700.0, 88.0, -601.9)).await.unwrap();
        let npc = sim
            .add_agent("Sedan", AgentType::Npc, &AgentState::at(t))
            .await
            .unwrap();
        let result = sim
            .apply_control(&npc, &VehicleControl::braking(1.0), true)
            .await;
        assert!(matches!(result, Err(SimulatorError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_lane_following_caps_speed() {
        let mut sim = loaded_sim().await;
        let t = sim.map_point_on_lane(Vector::new(1700.0, 88.0, -601.9)).await.unwrap();
        let npc = sim
            .add_agent("Sedan", AgentType::Npc, &moving(t, 20.0))
            .await
            .unwrap();
        sim.follow_closest_lane(&npc, true, 11.55, false)
            .await
            .unwrap();
        sim.run(0.5).await.unwrap();
        let speed = sim.agent_state(&npc).await.unwrap().speed();
        assert!((speed - 11.55).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_change_lane_moves_one_lane() {
        let mut sim = loaded_sim().await;
        let t = sim.map_point_on_lane(Vector::new(1700.0, 88.0, -601.9)).await.unwrap();
        let npc = sim
            .add_agent("Sedan", AgentType::Npc, &AgentState::at(t))
            .await
            .unwrap();
        assert_eq!(sim.lane_of(&npc), Some(1));

        sim.change_lane(&npc, LaneDirection::Left).await.unwrap();
        assert!(sim.is_changing_lane(&npc));
        // 3.5 m at 1.75 m/s
        sim.run(1.0).await.unwrap();
        assert!(sim.is_changing_lane(&npc));
        sim.run(1.1).await.unwrap();
        assert!(!sim.is_changing_lane(&npc));
        assert_eq!(sim.lane_of(&npc), Some(2));
        let z = sim.agent_state(&npc).await.unwrap().position().z;
        assert!((z - -605.4).abs() < 1e-9, "got {z}");

        sim.change_lane(&npc, LaneDirection::Right).await.unwrap();
        sim.change_lane(&npc, LaneDirection::Right).await.unwrap();
        sim.run(5.0).await.unwrap();
        assert_eq!(sim.lane_of(&npc), Some(0));

        // No lane further right: stays put.
        sim.change_lane(&npc, LaneDirection::Right).await.unwrap();
        assert!(!sim.is_changing_lane(&npc));
        sim.run(1.0).await.unwrap();
        assert_eq!(sim.lane_of(&npc), Some(0));
    }

    #[tokio::test]
    async fn test_state_write_keeps_lane_change_target() {
        let mut sim = loaded_sim().await;
        let t = sim.map_point_on_lane(Vector::new(1700.0, 88.0, -601.9)).await.unwrap();
        let npc = sim
            .add_agent("Sedan", AgentType::Npc, &moving(t, 10.0))
            .await
            .unwrap();
        let before = sim.agent_state(&npc).await.unwrap();
        sim.change_lane(&npc, LaneDirection::Left).await.unwrap();
        sim.set_agent_state(&npc, &before).await.unwrap();
        sim.run(3.0).await.unwrap();
        assert_eq!(sim.lane_of(&npc), Some(2));
    }

    #[tokio::test]
    async fn test_bridge_ready_after_polls() {
        let mut sim = loaded_sim().await;
        let t = sim.map_point_on_lane(Vector::new(1700.0, 88.0, -601.9)).await.unwrap();
        let ego = sim
            .add_agent("XE", AgentType::Ego, &AgentState::at(t))
            .await
            .unwrap();

        assert!(!sim.bridge_connected(&ego).await.unwrap());
        sim.connect_bridge(&ego, "127.0.0.1", 9090).await.unwrap();
        assert!(!sim.bridge_connected(&ego).await.unwrap());
        assert!(!sim.bridge_connected(&ego).await.unwrap());
        assert!(sim.bridge_connected(&ego).await.unwrap());
        assert!(sim.bridge_connected(&ego).await.unwrap());
    }

    #[tokio::test]
    async fn test_sensors_toggle() {
        let mut sim = loaded_sim().await;
        let t = sim.map_point_on_lane(Vector::new(1700.0, 88.0, -601.9)).await.unwrap();
        let ego = sim
            .add_agent("XE", AgentType::Ego, &AgentState::at(t))
            .await
            .unwrap();
        let sensors = sim.sensors(&ego).await.unwrap();
        assert_eq!(sensors.len(), 6);
        assert!(sensors.iter().all(|s| !s.enabled));

        sim.set_sensor_enabled(&sensors[0].uid, true).await.unwrap();
        let sensors = sim.sensors(&ego).await.unwrap();
        assert!(sensors[0].enabled);
        assert!(sim.set_sensor_enabled("nope", true).await.is_err());
    }

    #[tokio::test]
    async fn test_time_of_day_fixed_and_running() {
        let mut sim = loaded_sim().await;
        sim.set_time_of_day(19.0, true).await.unwrap();
        sim.run(5.0).await.unwrap();
        assert_eq!(sim.time_of_day().await.unwrap(), 19.0);

        sim.set_time_of_day(10.5, false).await.unwrap();
        sim.run(60.0).await.unwrap();
        // 60 s at 60x is one simulated-clock hour
        assert!((sim.time_of_day().await.unwrap() - 11.5).abs() < 1e-9);

        assert!(sim.set_time_of_day(25.0, true).await.is_err());
        assert!(sim.set_time_of_day(-1.0, true).await.is_err());
    }

    #[tokio::test]
    async fn test_spawn_points_lie_on_lanes() {
        let mut sim = loaded_sim().await;
        let spawns = sim.spawn_points().await.unwrap();
        assert_eq!(spawns.len(), 4);
        for spawn in &spawns {
            assert_eq!(spawn.yaw_deg(), 270.0);
            let snapped = sim.map_point_on_lane(spawn.position).await.unwrap();
            assert!((snapped.position - spawn.position).magnitude() < 1e-9);
        }
    }

    #[tokio::test]
    async fn test_deterministic_noise() {
        async fn final_speed(seed: u64) -> f64 {
            let config = LightweightConfig {
                seed: Some(seed),
                speed_noise_ms: 0.05,
                ..Default::default()
            };
            let mut sim = LightweightSimulator::new(config);
            sim.load_scene("SanFrancisco").await.unwrap();
            let t = sim.map_point_on_lane(Vector::new(1700.0, 88.0, -601.9)).await.unwrap();
            let id = sim
                .add_agent("Sedan", AgentType::Npc, &moving(t, 10.0))
                .await
                .unwrap();
            sim.run(3.0).await.unwrap();
            sim.agent_state(&id).await.unwrap().speed()
        }

        assert_eq!(final_speed(7).await, final_speed(7).await);
        assert_ne!(final_speed(7).await, final_speed(8).await);
    }
}
