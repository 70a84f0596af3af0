pub mod lightweight;
pub mod remote;

use async_trait::async_trait;

pub use lightweight::{LightweightConfig, LightweightSimulator, RoadConfig};
pub use remote::RemoteSimulator;

use crate::error::SimulatorError;
use crate::types::{
    AgentId, AgentState, AgentType, LaneDirection, SensorInfo, Transform, Vector, VehicleControl,
};

/// Client-side view of a driving simulator's remote API.
///
/// Implementations must be `Send + Sync` for object safety, allowing
/// scenarios to run against `Box<dyn SimulatorApi>`. Calls are strictly
/// ordered request/response; none of them retry.
#[async_trait]
pub trait SimulatorApi: Send + Sync {
    /// Identifier for this backend (e.g., "remote", "lightweight").
    fn backend(&self) -> &'static str;

    /// Name of the currently loaded scene, if any.
    async fn current_scene(&mut self) -> Result<Option<String>, SimulatorError>;

    /// Load a scene by name. Removes all agents.
    async fn load_scene(&mut self, scene: &str) -> Result<(), SimulatorError>;

    /// Reset the current scene to its initial state. Removes all agents.
    async fn reset(&mut self) -> Result<(), SimulatorError>;

    /// Predefined spawn points of the loaded map.
    async fn spawn_points(&mut self) -> Result<Vec<Transform>, SimulatorError>;

    /// Closest lane point and lane orientation for a world coordinate.
    async fn map_point_on_lane(&mut self, point: Vector) -> Result<Transform, SimulatorError>;

    /// Spawn an agent of the given asset name.
    async fn add_agent(
        &mut self,
        name: &str,
        agent_type: AgentType,
        state: &AgentState,
    ) -> Result<AgentId, SimulatorError>;

    async fn agent_state(&mut self, agent: &AgentId) -> Result<AgentState, SimulatorError>;

    async fn set_agent_state(
        &mut self,
        agent: &AgentId,
        state: &AgentState,
    ) -> Result<(), SimulatorError>;

    /// Apply vehicle control. `sticky` keeps the control applied on later frames.
    async fn apply_control(
        &mut self,
        agent: &AgentId,
        control: &VehicleControl,
        sticky: bool,
    ) -> Result<(), SimulatorError>;

    /// Ask an NPC to drive along the closest lane, capped at `max_speed`.
    async fn follow_closest_lane(
        &mut self,
        agent: &AgentId,
        follow: bool,
        max_speed: f64,
        lane_change: bool,
    ) -> Result<(), SimulatorError>;

    /// Ask an NPC to change into the adjacent lane.
    async fn change_lane(
        &mut self,
        agent: &AgentId,
        direction: LaneDirection,
    ) -> Result<(), SimulatorError>;

    async fn sensors(&mut self, agent: &AgentId) -> Result<Vec<SensorInfo>, SimulatorError>;

    async fn set_sensor_enabled(
        &mut self,
        sensor_uid: &str,
        enabled: bool,
    ) -> Result<(), SimulatorError>;

    /// Start connecting an EGO vehicle to an AD-stack bridge. Returns immediately.
    async fn connect_bridge(
        &mut self,
        agent: &AgentId,
        host: &str,
        port: u16,
    ) -> Result<(), SimulatorError>;

    async fn bridge_connected(&mut self, agent: &AgentId) -> Result<bool, SimulatorError>;

    /// Advance simulated time by `seconds` and wait until it has elapsed.
    async fn run(&mut self, seconds: f64) -> Result<(), SimulatorError>;

    /// Current time of day in hours, `0.0..24.0`.
    async fn time_of_day(&mut self) -> Result<f64, SimulatorError>;

    /// Set time of day. A `fixed` clock stays put; otherwise it keeps moving.
    async fn set_time_of_day(&mut self, hour: f64, fixed: bool) -> Result<(), SimulatorError>;
}

/// Validate an hour of day for `set_time_of_day`.
pub(crate) fn check_hour(hour: f64) -> Result<f64, SimulatorError> {
    if (0.0..=24.0).contains(&hour) {
        Ok(hour)
    } else {
        Err(SimulatorError::InvalidArgument(format!(
            "time of day must be within 0..=24, got {hour}"
        )))
    }
}
