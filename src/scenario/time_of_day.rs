use crate::adapter::SimulatorApi;
use crate::config::TimeOfDayConfig;
use crate::error::SimulatorError;
use crate::scenario::select_scene;
use crate::types::{AgentId, AgentState, AgentType};

/// Spawns an EGO at a map spawn point and flips the time of day.
#[derive(Debug, Clone, Default)]
pub struct TimeOfDayDemo {
    config: TimeOfDayConfig,
}

impl TimeOfDayDemo {
    pub fn new(config: TimeOfDayConfig) -> Self {
        Self { config }
    }

    /// Select the scene and place the EGO on the configured spawn point.
    pub async fn spawn<S: SimulatorApi + ?Sized>(
        &self,
        sim: &mut S,
    ) -> Result<AgentId, SimulatorError> {
        select_scene(sim, &self.config.scene).await?;
        let spawns = sim.spawn_points().await?;
        let spawn = spawns
            .get(self.config.spawn_index)
            .copied()
            .ok_or(SimulatorError::SpawnNotFound(self.config.spawn_index))?;
        let ego = sim
            .add_agent(&self.config.ego_model, AgentType::Ego, &AgentState::at(spawn))
            .await?;
        log::info!("spawned {} at {}", self.config.ego_model, spawn.position);
        Ok(ego)
    }

    /// Freeze the clock at the configured hour. Returns the hour read back.
    pub async fn set_fixed<S: SimulatorApi + ?Sized>(
        &self,
        sim: &mut S,
    ) -> Result<f64, SimulatorError> {
        self.set_and_read(sim, self.config.fixed_hour, true).await
    }

    /// Set the configured hour and let the clock run. Returns the hour read back.
    pub async fn set_running<S: SimulatorApi + ?Sized>(
        &self,
        sim: &mut S,
    ) -> Result<f64, SimulatorError> {
        self.set_and_read(sim, self.config.running_hour, false).await
    }

    /// Advance the scene by the configured interval.
    pub async fn run<S: SimulatorApi + ?Sized>(&self, sim: &mut S) -> Result<(), SimulatorError> {
        sim.run(self.config.run_s).await
    }

    async fn set_and_read<S: SimulatorApi + ?Sized>(
        &self,
        sim: &mut S,
        hour: f64,
        fixed: bool,
    ) -> Result<f64, SimulatorError> {
        sim.set_time_of_day(hour, fixed).await?;
        log::debug!("time of day set to {hour} (fixed: {fixed})");
        sim.time_of_day().await
    }
}
