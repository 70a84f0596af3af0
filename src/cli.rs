//! Command-line options shared by the scenario binaries.

use clap::Args;

use crate::config::ConnectionConfig;

/// Where to find the simulator and bridge.
///
/// Hosts fall back to `SIMULATOR_HOST` / `BRIDGE_HOST`, then to 127.0.0.1.
#[derive(Debug, Clone, Default, Args)]
pub struct ConnectionArgs {
    /// Simulator host [env: SIMULATOR_HOST]
    #[arg(long)]
    pub simulator_host: Option<String>,

    /// Simulator WebSocket port
    #[arg(long)]
    pub simulator_port: Option<u16>,

    /// AD-stack bridge host [env: BRIDGE_HOST]
    #[arg(long)]
    pub bridge_host: Option<String>,

    /// AD-stack bridge port
    #[arg(long)]
    pub bridge_port: Option<u16>,

    /// Reply timeout for simulator commands in milliseconds (0 disables)
    #[arg(long)]
    pub request_timeout_ms: Option<u64>,

    /// Run against the built-in lightweight simulator instead of a remote one
    #[arg(long)]
    pub offline: bool,
}

impl ConnectionArgs {
    /// Environment-derived configuration with command-line overrides applied.
    pub fn to_config(&self) -> ConnectionConfig {
        self.apply(ConnectionConfig::from_env())
    }

    fn apply(&self, mut config: ConnectionConfig) -> ConnectionConfig {
        if let Some(host) = &self.simulator_host {
            config.simulator_host = host.clone();
        }
        if let Some(port) = self.simulator_port {
            config.simulator_port = port;
        }
        if let Some(host) = &self.bridge_host {
            config.bridge_host = host.clone();
        }
        if let Some(port) = self.bridge_port {
            config.bridge_port = port;
        }
        if let Some(ms) = self.request_timeout_ms {
            config.request_timeout_ms = ms;
        }
        config
    }
}
