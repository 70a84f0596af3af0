use tokio::time::{sleep, timeout};

use crate::adapter::SimulatorApi;
use crate::config::ReadinessConfig;
use crate::error::SimulatorError;
use crate::types::AgentId;

/// Poll the bridge status of `agent` until it reports connected.
///
/// Returns the number of status queries made. Fails with
/// [`SimulatorError::Timeout`] once `config.timeout` elapses, or with the
/// first error the simulator reports.
pub async fn wait_for_bridge<S: SimulatorApi + ?Sized>(
    sim: &mut S,
    agent: &AgentId,
    config: &ReadinessConfig,
) -> Result<u32, SimulatorError> {
    let poll = async {
        let mut polls = 0u32;
        loop {
            polls += 1;
            if sim.bridge_connected(agent).await? {
                return Ok::<u32, SimulatorError>(polls);
            }
            log::debug!("bridge for {agent} not ready after {polls} polls");
            sleep(config.poll_interval).await;
        }
    };

    match config.timeout {
        Some(limit) => timeout(limit, poll)
            .await
            .map_err(|_| SimulatorError::Timeout("bridge connection"))?,
        None => poll.await,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::adapter::{LightweightConfig, LightweightSimulator};
    use crate::types::{AgentState, AgentType, Vector};

    async fn sim_with_ego(ready_after: Option<u32>) -> (LightweightSimulator, AgentId) {
        let mut sim = LightweightSimulator::new(LightweightConfig {
            seed: Some(1),
            bridge_ready_after_polls: ready_after,
            ..Default::default()
        });
        sim.load_scene("SanFrancisco").await.unwrap();
        let t = sim
            .map_point_on_lane(Vector::new(1699.6, 88.38, -601.9))
            .await
            .unwrap();
        let ego = sim
            .add_agent("XE", AgentType::Ego, &AgentState::at(t))
            .await
            .unwrap();
        sim.connect_bridge(&ego, "127.0.0.1", 9090).await.unwrap();
        (sim, ego)
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_after_polls() {
        let (mut sim, ego) = sim_with_ego(Some(3)).await;
        let polls = wait_for_bridge(&mut sim, &ego, &ReadinessConfig::default())
            .await
            .unwrap();
        assert_eq!(polls, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_when_never_ready() {
        let (mut sim, ego) = sim_with_ego(None).await;
        let config = ReadinessConfig {
            poll_interval: Duration::from_secs(1),
            timeout: Some(Duration::from_secs(5)),
        };
        let result = wait_for_bridge(&mut sim, &ego, &config).await;
        assert!(matches!(
            result,
            Err(SimulatorError::Timeout("bridge connection"))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_agent_propagates() {
        let (mut sim, _ego) = sim_with_ego(Some(0)).await;
        let ghost = AgentId("ghost".to_string());
        let result = wait_for_bridge(&mut sim, &ghost, &ReadinessConfig::default()).await;
        assert!(matches!(result, Err(SimulatorError::AgentNotFound(_))));
    }
}
