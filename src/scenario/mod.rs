//! Scripted scenarios driven through a [`SimulatorApi`].

pub mod overtake;
pub mod readiness;
pub mod time_of_day;

pub use overtake::{OvertakeAgents, OvertakePhase, OvertakeReport, OvertakeScenario, Transition};
pub use readiness::wait_for_bridge;
pub use time_of_day::TimeOfDayDemo;

use crate::adapter::SimulatorApi;
use crate::error::SimulatorError;

/// What [`select_scene`] had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneSelection {
    Reset,
    Loaded,
}

/// Reset the scene if it is already loaded, load it otherwise.
pub async fn select_scene<S: SimulatorApi + ?Sized>(
    sim: &mut S,
    scene: &str,
) -> Result<SceneSelection, SimulatorError> {
    if sim.current_scene().await?.as_deref() == Some(scene) {
        log::info!("resetting scene {scene}");
        sim.reset().await?;
        Ok(SceneSelection::Reset)
    } else {
        log::info!("loading scene {scene}");
        sim.load_scene(scene).await?;
        Ok(SceneSelection::Loaded)
    }
}
