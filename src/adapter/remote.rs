use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::{check_hour, SimulatorApi};
use crate::config::ConnectionConfig;
use crate::error::SimulatorError;
use crate::types::{
    AgentId, AgentState, AgentType, LaneDirection, SensorInfo, Transform, Vector, VehicleControl,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Reply envelope. Exactly one of `result` / `error` is meaningful.
#[derive(Debug, Deserialize)]
struct Reply {
    #[serde(default)]
    result: Value,
    error: Option<String>,
}

/// Simulator client speaking JSON commands over a WebSocket.
pub struct RemoteSimulator {
    url: String,
    socket: WsStream,
    request_timeout: Option<Duration>,
    commands_sent: u64,
    /// Set from sending a command until its reply is read. A timeout or a
    /// dropped future leaves it set; a late reply would then answer the
    /// wrong command.
    poisoned: bool,
}

impl RemoteSimulator {
    /// Open the WebSocket to `ws://<simulator_host>:<simulator_port>`.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self, SimulatorError> {
        let url = config.simulator_url();
        let (socket, _response) = connect_async(url.as_str()).await.map_err(|e| {
            SimulatorError::ConnectionFailed(format!("Failed to connect to {url}: {e}"))
        })?;
        log::info!("connected to simulator at {url}");

        Ok(Self {
            url,
            socket,
            request_timeout: config.request_timeout(),
            commands_sent: 0,
            poisoned: false,
        })
    }

    /// Number of commands issued over this connection.
    pub fn commands_sent(&self) -> u64 {
        self.commands_sent
    }

    /// Close the socket politely. Dropping the client also closes it.
    pub async fn close(mut self) -> Result<(), SimulatorError> {
        self.socket
            .close(None)
            .await
            .map_err(|e| SimulatorError::ProtocolError(format!("close failed: {e}")))
    }

    async fn command(&mut self, command: &str, arguments: Value) -> Result<Value, SimulatorError> {
        if self.poisoned {
            return Err(SimulatorError::ConnectionFailed(format!(
                "{} abandoned a reply earlier; reconnect before {command}",
                self.url
            )));
        }
        self.poisoned = true;

        let request = encode_request(command, arguments);
        log::trace!("-> {request}");
        self.socket
            .send(Message::text(request))
            .await
            .map_err(|e| SimulatorError::ConnectionFailed(format!("send {command}: {e}")))?;
        self.commands_sent += 1;

        let text = match self.request_timeout {
            // Run and continue block for as long as the simulation takes.
            Some(limit) if !matches!(command, "simulator/run" | "simulator/continue") => {
                timeout(limit, self.receive_text(command))
                    .await
                    .map_err(|_| SimulatorError::Timeout("simulator reply"))??
            }
            _ => self.receive_text(command).await?,
        };
        self.poisoned = false;
        log::trace!("<- {text}");
        decode_reply(command, &text)
    }

    async fn receive_text(&mut self, command: &str) -> Result<String, SimulatorError> {
        loop {
            match self.socket.next().await {
                Some(Ok(Message::Text(text))) => return Ok(text.to_string()),
                Some(Ok(Message::Close(_))) | None => {
                    return Err(SimulatorError::ConnectionFailed(format!(
                        "{} closed the connection during {command}",
                        self.url
                    )))
                }
                // Ping/pong are answered by tungstenite; binary frames are not part of the API.
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    return Err(SimulatorError::ProtocolError(format!(
                        "receive {command}: {e}"
                    )))
                }
            }
        }
    }

    async fn command_as<T: DeserializeOwned>(
        &mut self,
        command: &str,
        arguments: Value,
    ) -> Result<T, SimulatorError> {
        let value = self.command(command, arguments).await?;
        decode_result(command, value)
    }
}

impl std::fmt::Debug for RemoteSimulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteSimulator")
            .field("url", &self.url)
            .field("request_timeout", &self.request_timeout)
            .field("commands_sent", &self.commands_sent)
            .field("poisoned", &self.poisoned)
            .finish()
    }
}

#[async_trait]
impl SimulatorApi for RemoteSimulator {
    fn backend(&self) -> &'static str {
        "remote"
    }

    async fn current_scene(&mut self) -> Result<Option<String>, SimulatorError> {
        self.command_as("simulator/current_scene", json!({})).await
    }

    async fn load_scene(&mut self, scene: &str) -> Result<(), SimulatorError> {
        self.command("simulator/load_scene", json!({ "scene": scene }))
            .await
            .map(drop)
    }

    async fn reset(&mut self) -> Result<(), SimulatorError> {
        self.command("simulator/reset", json!({})).await.map(drop)
    }

    async fn spawn_points(&mut self) -> Result<Vec<Transform>, SimulatorError> {
        self.command_as("map/spawn/get", json!({})).await
    }

    async fn map_point_on_lane(&mut self, point: Vector) -> Result<Transform, SimulatorError> {
        self.command_as("map/point_on_lane", json!({ "point": point }))
            .await
    }

    async fn add_agent(
        &mut self,
        name: &str,
        agent_type: AgentType,
        state: &AgentState,
    ) -> Result<AgentId, SimulatorError> {
        self.command_as(
            "simulator/add_agent",
            json!({ "name": name, "type": agent_type.code(), "state": state }),
        )
        .await
    }

    async fn agent_state(&mut self, agent: &AgentId) -> Result<AgentState, SimulatorError> {
        self.command_as("agent/state/get", json!({ "uid": agent }))
            .await
    }

    async fn set_agent_state(
        &mut self,
        agent: &AgentId,
        state: &AgentState,
    ) -> Result<(), SimulatorError> {
        self.command("agent/state/set", json!({ "uid": agent, "state": state }))
            .await
            .map(drop)
    }

    async fn apply_control(
        &mut self,
        agent: &AgentId,
        control: &VehicleControl,
        sticky: bool,
    ) -> Result<(), SimulatorError> {
        self.command(
            "vehicle/apply_control",
            json!({ "uid": agent, "sticky": sticky, "control": control }),
        )
        .await
        .map(drop)
    }

    async fn follow_closest_lane(
        &mut self,
        agent: &AgentId,
        follow: bool,
        max_speed: f64,
        lane_change: bool,
    ) -> Result<(), SimulatorError> {
        self.command(
            "vehicle/follow_closest_lane",
            json!({
                "uid": agent,
                "follow": follow,
                "max_speed": max_speed,
                "isLaneChange": lane_change,
            }),
        )
        .await
        .map(drop)
    }

    async fn change_lane(
        &mut self,
        agent: &AgentId,
        direction: LaneDirection,
    ) -> Result<(), SimulatorError> {
        self.command(
            "vehicle/change_lane",
            json!({ "uid": agent, "isLeftChange": direction.is_left() }),
        )
        .await
        .map(drop)
    }

    async fn sensors(&mut self, agent: &AgentId) -> Result<Vec<SensorInfo>, SimulatorError> {
        self.command_as("agent/get_sensors", json!({ "uid": agent }))
            .await
    }

    async fn set_sensor_enabled(
        &mut self,
        sensor_uid: &str,
        enabled: bool,
    ) -> Result<(), SimulatorError> {
        self.command(
            "sensor/enabled/set",
            json!({ "uid": sensor_uid, "enabled": enabled }),
        )
        .await
        .map(drop)
    }

    async fn connect_bridge(
        &mut self,
        agent: &AgentId,
        host: &str,
        port: u16,
    ) -> Result<(), SimulatorError> {
        self.command(
            "vehicle/bridge/connect",
            json!({ "uid": agent, "address": host, "port": port }),
        )
        .await
        .map(drop)
    }

    async fn bridge_connected(&mut self, agent: &AgentId) -> Result<bool, SimulatorError> {
        self.command_as("vehicle/bridge/connected", json!({ "uid": agent }))
            .await
    }

    async fn run(&mut self, seconds: f64) -> Result<(), SimulatorError> {
        if seconds.is_nan() || seconds < 0.0 {
            return Err(SimulatorError::InvalidArgument(format!(
                "run time must be non-negative, got {seconds}"
            )));
        }
        // The simulator pauses to report events; each batch is acknowledged with
        // `simulator/continue` until a reply without events arrives.
        let mut reply = self
            .command("simulator/run", json!({ "time_limit": seconds }))
            .await?;
        while let Some(events) = reply.get("events").and_then(Value::as_array) {
            for event in events {
                log::debug!("simulator event: {event}");
            }
            reply = self.command("simulator/continue", json!({})).await?;
        }
        Ok(())
    }

    async fn time_of_day(&mut self) -> Result<f64, SimulatorError> {
        self.command_as("environment/time/get", json!({})).await
    }

    async fn set_time_of_day(&mut self, hour: f64, fixed: bool) -> Result<(), SimulatorError> {
        let hour = check_hour(hour)?;
        self.command(
            "environment/time/set",
            json!({ "time": hour, "fixed": fixed }),
        )
        .await
        .map(drop)
    }
}

/// Serialize a command envelope.
fn encode_request(command: &str, arguments: Value) -> String {
    json!({ "command": command, "arguments": arguments }).to_string()
}

/// Parse a reply envelope, turning `error` replies into [`SimulatorError::Remote`].
fn decode_reply(command: &str, text: &str) -> Result<Value, SimulatorError> {
    let reply: Reply = serde_json::from_str(text)
        .map_err(|e| SimulatorError::ProtocolError(format!("JSON parse error: {e}")))?;
    match reply.error {
        Some(message) => Err(SimulatorError::Remote {
            command: command.to_string(),
            message,
        }),
        None => Ok(reply.result),
    }
}

fn decode_result<T: DeserializeOwned>(command: &str, value: Value) -> Result<T, SimulatorError> {
    serde_json::from_value(value).map_err(|e| {
        SimulatorError::ProtocolError(format!("unexpected result for {command}: {e}"))
    })
}
