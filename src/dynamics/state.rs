use nalgebra::{Vector2, Vector4};
use serde::{Deserialize, Serialize};

use crate::sim::integrator::IntegratorConfig;

// ---------------------------------------------------------------------------
// Truck-frame state: [v1, theta1_dot, phi_dot, phi]
// ---------------------------------------------------------------------------

/// Dynamic state in the tractor's moving frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TruckState {
    pub lateral_velocity: f64,    // m/s, tractor CG
    pub yaw_rate: f64,            // rad/s, tractor
    pub articulation_rate: f64,   // rad/s
    pub articulation_angle: f64,  // rad, trailer relative to tractor
}

impl TruckState {
    pub fn to_vector(&self) -> Vector4<f64> {
        Vector4::new(
            self.lateral_velocity,
            self.yaw_rate,
            self.articulation_rate,
            self.articulation_angle,
        )
    }

    pub fn from_vector(v: &Vector4<f64>) -> Self {
        Self {
            lateral_velocity: v[0],
            yaw_rate: v[1],
            articulation_rate: v[2],
            articulation_angle: v[3],
        }
    }
}

// ---------------------------------------------------------------------------
// World-frame state: [x, y, delta, theta1, theta2]
// ---------------------------------------------------------------------------

/// Vehicle pose in the inertial frame.
///
/// `delta` is a reserved slot kept for the five-column output layout. The
/// simulator never writes it, so it stays at its initial value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldState {
    pub x: f64,        // m
    pub y: f64,        // m
    pub delta: f64,
    pub heading1: f64, // rad, tractor
    pub heading2: f64, // rad, trailer
}

impl WorldState {
    pub fn position(&self) -> Vector2<f64> {
        Vector2::new(self.x, self.y)
    }

    /// Unit vector along the tractor heading.
    pub fn tractor_direction(&self) -> Vector2<f64> {
        Vector2::new(self.heading1.cos(), self.heading1.sin())
    }

    /// Unit vector along the trailer heading.
    pub fn trailer_direction(&self) -> Vector2<f64> {
        Vector2::new(self.heading2.cos(), self.heading2.sin())
    }

    pub fn articulation_angle(&self) -> f64 {
        self.heading2 - self.heading1
    }

    /// Same pose referenced at the steer axle, `a1` ahead of the CG.
    pub fn at_front_axle(&self, a1: f64) -> WorldState {
        WorldState {
            x: self.x + a1 * self.heading1.cos(),
            y: self.y + a1 * self.heading1.sin(),
            ..*self
        }
    }

    /// Inverse of [`WorldState::at_front_axle`].
    pub fn at_center_of_gravity(&self, a1: f64) -> WorldState {
        WorldState {
            x: self.x - a1 * self.heading1.cos(),
            y: self.y - a1 * self.heading1.sin(),
            ..*self
        }
    }

    pub fn to_array(&self) -> [f64; 5] {
        [self.x, self.y, self.delta, self.heading1, self.heading2]
    }
}

// ---------------------------------------------------------------------------
// Control input: [u1, delta]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Control {
    pub velocity: f64,    // m/s, longitudinal
    pub steer_angle: f64, // rad, steer tire angle
}

impl Control {
    pub fn new(velocity: f64, steer_angle: f64) -> Self {
        Self { velocity, steer_angle }
    }
}

impl From<[f64; 2]> for Control {
    fn from(c: [f64; 2]) -> Self {
        Self::new(c[0], c[1])
    }
}

// ---------------------------------------------------------------------------
// Complete simulator state (clock + both frames)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SimState {
    pub time: f64,
    pub truck: TruckState,
    pub world: WorldState,
}

// ---------------------------------------------------------------------------
// Simulation config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub sim_timestep: f64,
    pub world_state_at_front: bool,
    pub integrator: IntegratorConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            sim_timestep: 0.02,         // 50 Hz
            world_state_at_front: false,
            integrator: IntegratorConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn front_axle_conversion_is_reversible() {
        let s = WorldState {
            x: 12.5,
            y: -3.0,
            delta: 0.0,
            heading1: 0.7,
            heading2: 0.65,
        };
        let front = s.at_front_axle(2.43264);
        assert_abs_diff_eq!(front.x - 2.43264 * 0.7_f64.cos(), s.x, epsilon = 1e-12);
        assert_abs_diff_eq!(front.y - 2.43264 * 0.7_f64.sin(), s.y, epsilon = 1e-12);
        let back = front.at_center_of_gravity(2.43264);
        assert_abs_diff_eq!(back.x, s.x, epsilon = 1e-12);
        assert_abs_diff_eq!(back.y, s.y, epsilon = 1e-12);
        assert_eq!(back.heading1, s.heading1);
        assert_eq!(back.heading2, s.heading2);
    }

    #[test]
    fn truck_state_vector_order() {
        let s = TruckState {
            lateral_velocity: 1.0,
            yaw_rate: 2.0,
            articulation_rate: 3.0,
            articulation_angle: 4.0,
        };
        let v = s.to_vector();
        assert_eq!(v, Vector4::new(1.0, 2.0, 3.0, 4.0));
        assert_eq!(TruckState::from_vector(&v), s);
    }
}
