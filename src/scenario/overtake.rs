//! Highway overtake.
//!
//! An NPC starts behind the EGO in the same lane, drives faster, pulls into
//! the left lane once it is close, passes, and pulls back in ahead of the
//! EGO. The EGO is held at its cruise speed by braking whenever it runs
//! over the limit.
//!
//! The lane decisions are a two-phase machine ([`OvertakePhase`]) advanced
//! once per tick from the measured [`Separation`]:
//!
//! | phase              | condition                          | action       | next        |
//! |--------------------|------------------------------------|--------------|-------------|
//! | `AwaitingOvertake` | `d <= overtake` and NPC behind     | change left  | `Overtaken` |
//! | `Overtaken`        | `d >= return` and NPC ahead        | change right | finished    |
//!
//! Anything else leaves the phase untouched.

use crate::adapter::SimulatorApi;
use crate::config::{ConnectionConfig, OvertakeConfig};
use crate::error::SimulatorError;
use crate::kinematics::{Heading, Separation};
use crate::scenario::readiness::wait_for_bridge;
use crate::scenario::select_scene;
use crate::types::{AgentId, AgentState, AgentType, LaneDirection, NpcModel, VehicleControl};

/// Where the overtake stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OvertakePhase {
    /// NPC has not pulled out yet.
    #[default]
    AwaitingOvertake,
    /// NPC is in the passing lane.
    Overtaken,
}

/// Result of advancing the phase by one observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub phase: OvertakePhase,
    /// Lane change to command this tick, if any.
    pub lane_change: Option<LaneDirection>,
    /// The scenario loop ends after this tick.
    pub finished: bool,
}

impl Transition {
    fn stay(phase: OvertakePhase) -> Self {
        Self {
            phase,
            lane_change: None,
            finished: false,
        }
    }
}

impl OvertakePhase {
    /// Decide the lane command for one observed separation.
    pub fn advance(self, separation: &Separation, overtake_m: f64, return_m: f64) -> Transition {
        match self {
            OvertakePhase::AwaitingOvertake
                if separation.distance <= overtake_m && separation.is_behind() =>
            {
                Transition {
                    phase: OvertakePhase::Overtaken,
                    lane_change: Some(LaneDirection::Left),
                    finished: false,
                }
            }
            OvertakePhase::Overtaken if separation.distance >= return_m && separation.is_ahead() => {
                Transition {
                    phase: OvertakePhase::Overtaken,
                    lane_change: Some(LaneDirection::Right),
                    finished: true,
                }
            }
            phase => Transition::stay(phase),
        }
    }
}

/// Handles and spawn states of the two vehicles.
#[derive(Debug, Clone)]
pub struct OvertakeAgents {
    pub ego: AgentId,
    pub npc: AgentId,
    pub ego_spawn: AgentState,
    pub npc_spawn: AgentState,
}

/// Summary of a completed overtake loop.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OvertakeReport {
    /// Ticks executed, the final one included.
    pub ticks: u32,
    /// Tick on which the NPC pulled out, and the separation then.
    pub left_change: Option<(u32, f64)>,
    /// Tick on which the NPC pulled back in, and the separation then.
    pub right_change: Option<(u32, f64)>,
    /// Ticks on which the EGO was braked.
    pub brake_ticks: u32,
}

/// Drives the overtake against any [`SimulatorApi`].
///
/// The steps are separate so a caller can pause between them; run
/// [`setup`](Self::setup), [`connect_bridge`](Self::connect_bridge),
/// [`start`](Self::start), [`drive`](Self::drive) and
/// [`settle`](Self::settle) in that order.
#[derive(Debug, Clone)]
pub struct OvertakeScenario {
    config: OvertakeConfig,
    bridge_host: String,
    bridge_port: u16,
}

impl OvertakeScenario {
    pub fn new(config: OvertakeConfig, connection: &ConnectionConfig) -> Self {
        Self {
            config,
            bridge_host: connection.bridge_host.clone(),
            bridge_port: connection.bridge_port,
        }
    }

    /// Select the scene and spawn the EGO and an NPC of `npc_model` behind it.
    pub async fn setup<S: SimulatorApi + ?Sized>(
        &self,
        sim: &mut S,
        npc_model: NpcModel,
    ) -> Result<OvertakeAgents, SimulatorError> {
        let config = &self.config;
        select_scene(sim, &config.scene).await?;

        let ego_spawn = AgentState::at(sim.map_point_on_lane(config.ego_spawn_hint).await?);
        let ego = sim
            .add_agent(&config.ego_model, AgentType::Ego, &ego_spawn)
            .await?;
        log::info!("spawned EGO {} at {}", config.ego_model, ego_spawn.position());
        self.enable_sensors(sim, &ego).await?;

        let npc_hint =
            Heading::of(&ego_spawn).offset(ego_spawn.position(), -config.npc_offset_behind_m);
        let npc_spawn = AgentState::at(sim.map_point_on_lane(npc_hint).await?);
        let npc = sim
            .add_agent(npc_model.asset_name(), AgentType::Npc, &npc_spawn)
            .await?;
        log::info!("spawned NPC {npc_model} at {}", npc_spawn.position());

        Ok(OvertakeAgents {
            ego,
            npc,
            ego_spawn,
            npc_spawn,
        })
    }

    async fn enable_sensors<S: SimulatorApi + ?Sized>(
        &self,
        sim: &mut S,
        ego: &AgentId,
    ) -> Result<(), SimulatorError> {
        for sensor in sim.sensors(ego).await? {
            if self.config.ego_sensors.contains(&sensor.name) {
                sim.set_sensor_enabled(&sensor.uid, true).await?;
                log::debug!("enabled sensor {}", sensor.name);
            }
        }
        Ok(())
    }

    /// Connect the EGO to the AD-stack bridge and wait until it is up.
    pub async fn connect_bridge<S: SimulatorApi + ?Sized>(
        &self,
        sim: &mut S,
        agents: &OvertakeAgents,
    ) -> Result<(), SimulatorError> {
        log::info!(
            "connecting {} to bridge at {}:{}",
            agents.ego,
            self.bridge_host,
            self.bridge_port
        );
        sim.connect_bridge(&agents.ego, &self.bridge_host, self.bridge_port)
            .await?;
        let polls = wait_for_bridge(sim, &agents.ego, &self.config.readiness).await?;
        log::debug!("bridge ready after {polls} polls");
        Ok(())
    }

    /// Put the EGO at cruise speed, let the AD stack warm up, then release the NPC.
    pub async fn start<S: SimulatorApi + ?Sized>(
        &self,
        sim: &mut S,
        agents: &OvertakeAgents,
    ) -> Result<(), SimulatorError> {
        let config = &self.config;

        let mut ego_state = agents.ego_spawn;
        ego_state.velocity = Heading::of(&ego_state).velocity(config.ego_start_speed_ms);
        sim.set_agent_state(&agents.ego, &ego_state).await?;

        sim.run(config.warmup_s).await?;

        let mut npc_state = agents.npc_spawn;
        npc_state.velocity = Heading::of(&npc_state).velocity(config.npc_speed_ms);
        sim.set_agent_state(&agents.npc, &npc_state).await?;
        sim.follow_closest_lane(&agents.npc, true, config.npc_speed_ms, false)
            .await?;
        Ok(())
    }

    /// Run the tick loop until the NPC has passed and pulled back in.
    pub async fn drive<S: SimulatorApi + ?Sized>(
        &self,
        sim: &mut S,
        agents: &OvertakeAgents,
    ) -> Result<OvertakeReport, SimulatorError> {
        let config = &self.config;
        let brake = VehicleControl::braking(config.ego_braking);
        let mut phase = OvertakePhase::default();
        let mut report = OvertakeReport::default();

        loop {
            if config.max_ticks.is_some_and(|max| report.ticks >= max) {
                log::warn!("overtake incomplete after {} ticks", report.ticks);
                return Err(SimulatorError::Timeout("overtake"));
            }
            report.ticks += 1;

            let npc_state = sim.agent_state(&agents.npc).await?;
            let ego_state = sim.agent_state(&agents.ego).await?;
            let separation = Separation::between(&npc_state, &ego_state, config.axis);
            log::trace!(
                "tick {}: d={:.2} behind_by={:.2} ego_speed={:.2}",
                report.ticks,
                separation.distance,
                separation.behind_by,
                ego_state.speed()
            );

            let transition =
                phase.advance(&separation, config.overtake_distance_m, config.return_distance_m);
            if let Some(direction) = transition.lane_change {
                sim.change_lane(&agents.npc, direction).await?;
                log::info!(
                    "NPC changing lane {direction:?} at {:.2} m (tick {})",
                    separation.distance,
                    report.ticks
                );
                let record = Some((report.ticks, separation.distance));
                match direction {
                    LaneDirection::Left => report.left_change = record,
                    LaneDirection::Right => report.right_change = record,
                }
            }
            phase = transition.phase;
            if transition.finished {
                return Ok(report);
            }

            if ego_state.speed() > config.ego_speed_limit_ms {
                sim.apply_control(&agents.ego, &brake, false).await?;
                report.brake_ticks += 1;
            }

            self.hold_npc_speed(sim, &agents.npc, npc_state).await?;
            sim.run(config.tick_s).await?;
        }
    }

    /// Keep the NPC moving once more and let the scene play out.
    pub async fn settle<S: SimulatorApi + ?Sized>(
        &self,
        sim: &mut S,
        agents: &OvertakeAgents,
    ) -> Result<(), SimulatorError> {
        let npc_state = sim.agent_state(&agents.npc).await?;
        self.hold_npc_speed(sim, &agents.npc, npc_state).await?;
        sim.run(self.config.settle_s).await
    }

    /// Rewrite the NPC velocity to the target speed along its current heading.
    async fn hold_npc_speed<S: SimulatorApi + ?Sized>(
        &self,
        sim: &mut S,
        npc: &AgentId,
        mut state: AgentState,
    ) -> Result<(), SimulatorError> {
        state.velocity = Heading::of(&state).velocity(self.config.npc_speed_ms);
        sim.set_agent_state(npc, &state).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinematics::LongitudinalAxis;
    use crate::types::{Transform, Vector};

    fn sep(distance: f64, behind_by: f64) -> Separation {
        Separation {
            distance,
            behind_by,
        }
    }

    fn advance(phase: OvertakePhase, distance: f64, behind_by: f64) -> Transition {
        phase.advance(&sep(distance, behind_by), 20.0, 15.0)
    }

    #[test]
    fn test_pulls_out_at_exactly_twenty() {
        let t = advance(OvertakePhase::AwaitingOvertake, 20.0, 20.0);
        assert_eq!(t.phase, OvertakePhase::Overtaken);
        assert_eq!(t.lane_change, Some(LaneDirection::Left));
        assert!(!t.finished);
    }

    #[test]
    fn test_waits_while_far_behind() {
        for d in [50.0, 30.0, 20.000001] {
            let t = advance(OvertakePhase::AwaitingOvertake, d, d);
            assert_eq!(t, Transition::stay(OvertakePhase::AwaitingOvertake), "d={d}");
        }
    }

    #[test]
    fn test_no_pull_out_when_already_ahead() {
        let t = advance(OvertakePhase::AwaitingOvertake, 10.0, -10.0);
        assert_eq!(t.lane_change, None);
        assert_eq!(t.phase, OvertakePhase::AwaitingOvertake);
    }

    #[test]
    fn test_no_return_before_pulling_out() {
        // Ahead and far enough, but the NPC never left its lane.
        let t = advance(OvertakePhase::AwaitingOvertake, 30.0, -30.0);
        assert_eq!(t, Transition::stay(OvertakePhase::AwaitingOvertake));
    }

    #[test]
    fn test_no_second_left_change() {
        for (d, behind) in [(20.0, 20.0), (5.0, 4.0), (19.0, 0.5)] {
            let t = advance(OvertakePhase::Overtaken, d, behind);
            assert_eq!(t.lane_change, None);
            assert!(!t.finished);
        }
    }

    #[test]
    fn test_returns_at_exactly_fifteen_ahead() {
        let t = advance(OvertakePhase::Overtaken, 15.0, -14.5);
        assert_eq!(t.lane_change, Some(LaneDirection::Right));
        assert!(t.finished);

        let t = advance(OvertakePhase::Overtaken, 14.999, -14.5);
        assert_eq!(t.lane_change, None);
        assert!(!t.finished);
    }

    #[test]
    fn test_alongside_is_neither_ahead_nor_behind() {
        let t = advance(OvertakePhase::AwaitingOvertake, 3.5, 0.0);
        assert_eq!(t.lane_change, None);
        let t = advance(OvertakePhase::Overtaken, 15.0, 0.0);
        assert!(!t.finished);
    }

    #[test]
    fn test_oscillating_distance_fires_once() {
        let mut phase = OvertakePhase::default();
        let mut lefts = 0;
        for d in [21.0, 20.0, 20.5, 19.5, 20.5, 18.0] {
            let t = advance(phase, d, d);
            if t.lane_change == Some(LaneDirection::Left) {
                lefts += 1;
            }
            phase = t.phase;
        }
        assert_eq!(lefts, 1);
        assert_eq!(phase, OvertakePhase::Overtaken);
    }

    #[test]
    fn test_phase_from_measured_states() {
        let ego = AgentState::at(Transform {
            position: Vector::new(0.0, 0.0, 0.0),
            rotation: Vector::new(0.0, 270.0, 0.0),
        });
        let npc = AgentState::at(Transform {
            position: Vector::new(12.0, 0.0, 16.0),
            rotation: Vector::new(0.0, 270.0, 0.0),
        });
        let separation = Separation::between(&npc, &ego, LongitudinalAxis::WorldX);
        assert!((separation.distance - 20.0).abs() < 1e-12);
        let t = OvertakePhase::AwaitingOvertake.advance(&separation, 20.0, 15.0);
        assert_eq!(t.lane_change, Some(LaneDirection::Left));
    }
}
