//! Scenario and connection configuration.
//!
//! Defaults reproduce the recorded highway overtake: EGO on the second lane
//! from the right near (1699.6, 88.38, -601.9) in SanFrancisco, an NPC
//! starting 50 m behind at 11.55 m/s, lane changes at 20 m / 15 m.

use std::env;
use std::time::Duration;

use crate::kinematics::LongitudinalAxis;
use crate::types::Vector;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const SIMULATOR_PORT: u16 = 8181;
pub const BRIDGE_PORT: u16 = 9090;
pub const SIMULATOR_HOST_ENV: &str = "SIMULATOR_HOST";
pub const BRIDGE_HOST_ENV: &str = "BRIDGE_HOST";

/// Where to reach the simulator and the AD-stack bridge.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionConfig {
    pub simulator_host: String,
    pub simulator_port: u16,
    pub bridge_host: String,
    pub bridge_port: u16,
    /// Reply timeout for every command except `run`. Zero disables it.
    pub request_timeout_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            simulator_host: DEFAULT_HOST.to_string(),
            simulator_port: SIMULATOR_PORT,
            bridge_host: DEFAULT_HOST.to_string(),
            bridge_port: BRIDGE_PORT,
            request_timeout_ms: 30_000,
        }
    }
}

impl ConnectionConfig {
    /// Defaults with hosts taken from `SIMULATOR_HOST` / `BRIDGE_HOST` when set.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(host) = lookup(SIMULATOR_HOST_ENV).filter(|h| !h.is_empty()) {
            config.simulator_host = host;
        }
        if let Some(host) = lookup(BRIDGE_HOST_ENV).filter(|h| !h.is_empty()) {
            config.bridge_host = host;
        }
        config
    }

    pub fn simulator_url(&self) -> String {
        format!("ws://{}:{}", self.simulator_host, self.simulator_port)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_ms > 0).then(|| Duration::from_millis(self.request_timeout_ms))
    }
}

/// How the bridge readiness gate polls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReadinessConfig {
    /// Delay between status queries.
    pub poll_interval: Duration,
    /// Give up after this long. `None` waits forever.
    pub timeout: Option<Duration>,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            timeout: Some(Duration::from_secs(60)),
        }
    }
}

/// Parameters of the overtake scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct OvertakeConfig {
    pub scene: String,
    pub ego_model: String,
    /// EGO sensors switched on after spawning.
    pub ego_sensors: Vec<String>,
    /// Point near the EGO's lane; snapped onto the lane before spawning.
    pub ego_spawn_hint: Vector,
    /// NPC starts this far behind the EGO, along the EGO heading.
    pub npc_offset_behind_m: f64,
    pub ego_start_speed_ms: f64,
    pub npc_speed_ms: f64,
    /// Left lane change fires at or below this separation while the NPC is behind.
    pub overtake_distance_m: f64,
    /// Right lane change fires at or above this separation once the NPC is ahead.
    pub return_distance_m: f64,
    /// EGO is braked on any tick it is observed faster than this.
    pub ego_speed_limit_ms: f64,
    pub ego_braking: f64,
    /// Simulated seconds per loop tick.
    pub tick_s: f64,
    /// Simulated seconds run before the NPC starts moving.
    pub warmup_s: f64,
    /// Simulated seconds run after the NPC returns to its lane.
    pub settle_s: f64,
    pub readiness: ReadinessConfig,
    pub axis: LongitudinalAxis,
    /// Abort with a timeout after this many ticks. `None` runs until the overtake completes.
    pub max_ticks: Option<u32>,
}

impl Default for OvertakeConfig {
    fn default() -> Self {
        Self {
            scene: "SanFrancisco".to_string(),
            ego_model: "XE_Rigged-apollo_3_5".to_string(),
            ego_sensors: ["velodyne", "Main Camera", "Telephoto Camera", "GPS", "IMU"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ego_spawn_hint: Vector::new(1699.6, 88.38, -601.9),
            npc_offset_behind_m: 50.0,
            ego_start_speed_ms: 10.0,
            npc_speed_ms: 11.55,
            overtake_distance_m: 20.0,
            return_distance_m: 15.0,
            ego_speed_limit_ms: 10.0,
            ego_braking: 0.2,
            tick_s: 0.5,
            warmup_s: 1.0,
            settle_s: 10.0,
            readiness: ReadinessConfig::default(),
            axis: LongitudinalAxis::WorldX,
            max_ticks: None,
        }
    }
}

/// Parameters of the time-of-day demo.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeOfDayConfig {
    pub scene: String,
    pub ego_model: String,
    /// Index into the map's spawn points.
    pub spawn_index: usize,
    /// Hour set with a frozen clock.
    pub fixed_hour: f64,
    /// Hour set with a running clock.
    pub running_hour: f64,
    /// Simulated seconds run after each change.
    pub run_s: f64,
}

impl Default for TimeOfDayConfig {
    fn default() -> Self {
        Self {
            scene: "SanFrancisco".to_string(),
            ego_model: "XE_Rigged-apollo".to_string(),
            spawn_index: 1,
            fixed_hour: 19.0,
            running_hour: 10.5,
            run_s: 5.0,
        }
    }
}
