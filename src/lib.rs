pub mod adapter;
pub mod cli;
pub mod config;
pub mod console;
pub mod error;
pub mod kinematics;
pub mod scenario;
pub mod types;

pub use adapter::{LightweightConfig, LightweightSimulator, RemoteSimulator, SimulatorApi};
pub use config::{ConnectionConfig, OvertakeConfig, ReadinessConfig, TimeOfDayConfig};
pub use error::SimulatorError;
pub use scenario::{OvertakePhase, OvertakeReport, OvertakeScenario, TimeOfDayDemo};
pub use types::{AgentId, AgentState, AgentType, NpcModel, Transform, Vector, VehicleControl};
