use core::fmt;
use core::ops::{Add, Mul, Sub};
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Agent handle assigned by the simulator when an agent is added.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(pub String);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Agent({})", self.0)
    }
}

/// World-space vector. The simulator is Y-up; vehicles drive in the X/Z plane.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector {
    pub const ZERO: Vector = Vector {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn magnitude(&self) -> f64 {
        self.dot(*self).sqrt()
    }

    pub fn dot(&self, other: Vector) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }
}

impl Add for Vector {
    type Output = Vector;

    fn add(self, rhs: Vector) -> Vector {
        Vector::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vector {
    type Output = Vector;

    fn sub(self, rhs: Vector) -> Vector {
        Vector::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vector {
    type Output = Vector;

    fn mul(self, rhs: f64) -> Vector {
        Vector::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl fmt::Display for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

/// Position plus Euler rotation in degrees (`rotation.y` is yaw).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vector,
    pub rotation: Vector,
}

impl Transform {
    pub fn yaw_deg(&self) -> f64 {
        self.rotation.y
    }
}

/// Kinematic state of an agent as reported by (and written to) the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AgentState {
    pub transform: Transform,
    #[serde(default)]
    pub velocity: Vector,
    #[serde(default)]
    pub angular_velocity: Vector,
}

impl AgentState {
    pub fn at(transform: Transform) -> Self {
        Self {
            transform,
            ..Default::default()
        }
    }

    pub fn position(&self) -> Vector {
        self.transform.position
    }

    /// Scalar speed in m/s.
    pub fn speed(&self) -> f64 {
        self.velocity.magnitude()
    }
}

/// Agent category understood by the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentType {
    Ego,
    Npc,
    Pedestrian,
}

impl AgentType {
    /// Numeric code used on the wire.
    pub fn code(self) -> u8 {
        match self {
            AgentType::Ego => 1,
            AgentType::Npc => 2,
            AgentType::Pedestrian => 3,
        }
    }
}

/// Control inputs for a vehicle. Unset fields are left untouched by the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VehicleControl {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steering: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub throttle: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub braking: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reverse: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handbrake: Option<bool>,
}

impl VehicleControl {
    pub fn braking(amount: f64) -> Self {
        Self {
            braking: Some(amount),
            ..Default::default()
        }
    }
}

/// Sensor attached to an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorInfo {
    pub uid: String,
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
}

/// Lane change direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneDirection {
    Left,
    Right,
}

impl LaneDirection {
    pub fn is_left(self) -> bool {
        matches!(self, LaneDirection::Left)
    }
}

/// NPC vehicle models available in the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NpcModel {
    Sedan,
    Suv,
    Jeep,
    HatchBack,
    SchoolBus,
    DeliveryTruck,
}

impl NpcModel {
    pub const ALL: [NpcModel; 6] = [
        NpcModel::Sedan,
        NpcModel::Suv,
        NpcModel::Jeep,
        NpcModel::HatchBack,
        NpcModel::SchoolBus,
        NpcModel::DeliveryTruck,
    ];

    /// Asset name the simulator expects.
    pub fn asset_name(self) -> &'static str {
        match self {
            NpcModel::Sedan => "Sedan",
            NpcModel::Suv => "SUV",
            NpcModel::Jeep => "Jeep",
            NpcModel::HatchBack => "HatchBack",
            NpcModel::SchoolBus => "SchoolBus",
            NpcModel::DeliveryTruck => "DeliveryTruck",
        }
    }

    /// `"Sedan , SUV , ..."`, as printed when the model argument is rejected.
    pub fn listing() -> String {
        NpcModel::ALL
            .iter()
            .map(|m| m.asset_name())
            .collect::<Vec<_>>()
            .join(" , ")
    }
}

impl fmt::Display for NpcModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.asset_name())
    }
}

/// Error for a model name outside [`NpcModel::ALL`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("npc name not in list: {}", NpcModel::listing())]
pub struct UnknownNpcModel(pub String);

impl FromStr for NpcModel {
    type Err = UnknownNpcModel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NpcModel::ALL
            .into_iter()
            .find(|m| m.asset_name() == s)
            .ok_or_else(|| UnknownNpcModel(s.to_string()))
    }
}
