//! Heading-relative vector helpers for placing and driving agents
//!
//! The simulator reports yaw in degrees about the Y (up) axis, with 0° facing
//! +Z and 90° facing +X. A heading θ therefore maps to the planar direction
//! `(sin θ, 0, cos θ)`.
//!
//! # Examples
//!
//! ```
//! use scenario_sitl::kinematics::Heading;
//! use scenario_sitl::Vector;
//!
//! // 10 m/s facing +X
//! let v = Heading::from_degrees(90.0).velocity(10.0);
//! assert!((v.x - 10.0).abs() < 1e-9);
//! assert!(v.z.abs() < 1e-9);
//!
//! // 50 m behind a car at the origin facing +Z
//! let p = Heading::from_degrees(0.0).offset(Vector::ZERO, -50.0);
//! assert!((p.z + 50.0).abs() < 1e-9);
//! ```

use crate::types::{AgentState, Vector};

/// Planar heading in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Heading {
    degrees: f64,
}

impl Heading {
    pub fn from_degrees(degrees: f64) -> Self {
        Self { degrees }
    }

    /// Heading taken from an agent's yaw.
    pub fn of(state: &AgentState) -> Self {
        Self::from_degrees(state.transform.yaw_deg())
    }

    /// Unit vector pointing forward along this heading.
    pub fn forward(&self) -> Vector {
        let rad = self.degrees.to_radians();
        Vector::new(rad.sin(), 0.0, rad.cos())
    }

    /// Unit vector pointing to the driver's right (left-handed, Y-up frame).
    pub fn right(&self) -> Vector {
        let rad = self.degrees.to_radians();
        Vector::new(rad.cos(), 0.0, -rad.sin())
    }

    /// Velocity of magnitude `speed` along this heading: `vx = s·sin θ`, `vz = s·cos θ`.
    pub fn velocity(&self, speed: f64) -> Vector {
        self.forward() * speed
    }

    /// Point `distance` metres ahead of `origin` (negative for behind). Height is kept.
    pub fn offset(&self, origin: Vector, distance: f64) -> Vector {
        let f = self.forward();
        Vector::new(origin.x + f.x * distance, origin.y, origin.z + f.z * distance)
    }
}

/// How "ahead" and "behind" are judged between two vehicles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LongitudinalAxis {
    /// Sign of `other.x - reference.x`: positive means behind. Only valid on
    /// roads running towards world -X.
    #[default]
    WorldX,
    /// Separation projected onto the reference vehicle's heading.
    EgoHeading,
}

/// Relative placement of one vehicle with respect to another.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Separation {
    /// Euclidean distance in metres.
    pub distance: f64,
    /// Signed longitudinal separation; positive means the other vehicle is behind.
    pub behind_by: f64,
}

impl Separation {
    /// Measure `other` relative to `reference`.
    pub fn between(other: &AgentState, reference: &AgentState, axis: LongitudinalAxis) -> Self {
        let delta = other.position() - reference.position();
        let behind_by = match axis {
            LongitudinalAxis::WorldX => delta.x,
            LongitudinalAxis::EgoHeading => -delta.dot(Heading::of(reference).forward()),
        };
        Self {
            distance: delta.magnitude(),
            behind_by,
        }
    }

    pub fn is_behind(&self) -> bool {
        self.behind_by > 0.0
    }

    pub fn is_ahead(&self) -> bool {
        self.behind_by < 0.0
    }
}
