use crate::types::AgentId;

/// Errors that can occur while talking to the simulator or driving a scenario.
#[derive(Debug, thiserror::Error)]
pub enum SimulatorError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Protocol error: {0}")]
    ProtocolError(String),

    #[error("Simulator rejected {command}: {message}")]
    Remote { command: String, message: String },

    #[error("Timeout waiting for {0}")]
    Timeout(&'static str),

    #[error("Agent not found: {0}")]
    AgentNotFound(AgentId),

    #[error("Spawn point {0} not available")]
    SpawnNotFound(usize),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
