use std::f64::consts::PI;

use log::warn;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::dynamics::state::{Control, WorldState};
use crate::path::ReferencePath;
use super::controller::{Controller, TrackingCommand};
use super::pid::Pid;

// ---------------------------------------------------------------------------
// Stanley front-axle steering law with a PID trim on cross-track error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StanleyParams {
    /// Cross-track gain, 1/s
    pub k: f64,
    /// Softening speed in the arctangent, m/s
    pub k_soft: f64,
    pub pid_kp: f64,
    pub pid_ki: f64,
    pub pid_kd: f64,
    pub integral_limit: f64,
    /// Steer tire angle limit, rad
    pub max_steer_rad: f64,
    /// Floor on the velocity demand, m/s
    pub min_speed_ms: f64,
    /// Number of path samples searched ahead of the last nearest point
    pub search_window: usize,
}

impl Default for StanleyParams {
    fn default() -> Self {
        Self {
            k: 2.0,
            k_soft: 1.0,
            pid_kp: 0.0,
            pid_ki: 0.01,
            pid_kd: 0.0,
            integral_limit: 5.0,
            max_steer_rad: 0.6,
            min_speed_ms: 0.5,
            search_window: 100,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StanleyController {
    pub params: StanleyParams,
    trim: Pid,
    progress: usize,
}

impl StanleyController {
    pub fn new(params: StanleyParams) -> Self {
        let trim = Pid::new(params.pid_kp, params.pid_ki, params.pid_kd)
            .with_integral_limit(params.integral_limit);
        Self { params, trim, progress: 0 }
    }

    /// Index of the reference point matched on the previous update.
    pub fn progress(&self) -> usize {
        self.progress
    }

    /// Signed cross-track and heading error of a front-axle state relative
    /// to path point `idx`.
    pub fn tracking_errors(state: &WorldState, path: &ReferencePath, idx: usize) -> (f64, f64) {
        let front = Point2::new(state.x, state.y);
        let tangent = path.tangent(idx);
        let offset = front - path.point(idx);
        let len = tangent.norm();
        let cross_track = if len > 0.0 {
            (tangent.x * offset.y - tangent.y * offset.x) / len
        } else {
            offset.norm()
        };
        let heading_error = wrap_angle(path.segment_heading(idx) - state.heading1);
        (cross_track, heading_error)
    }
}

impl Default for StanleyController {
    fn default() -> Self {
        Self::new(StanleyParams::default())
    }
}

impl Controller for StanleyController {
    fn control(
        &mut self,
        _time: f64,
        state: &WorldState,
        path: &ReferencePath,
        dt: f64,
    ) -> TrackingCommand {
        let p = &self.params;
        let front = Point2::new(state.x, state.y);
        let idx = path.nearest_index(&front, self.progress, p.search_window);
        self.progress = idx;

        let (cross_track, heading_error) = Self::tracking_errors(state, path, idx);
        let velocity = path.velocity[idx].max(p.min_speed_ms);

        let correction = (p.k * cross_track).atan2(p.k_soft + velocity);
        let trim = self.trim.update(cross_track, dt);
        let demand = heading_error - correction - trim;
        let steer = demand.clamp(-p.max_steer_rad, p.max_steer_rad);
        let saturated = steer != demand;
        if saturated {
            warn!(
                "Steer demand {:.3} rad saturated at point {} (cross-track {:.2} m)",
                demand, idx, cross_track
            );
        }

        TrackingCommand {
            control: Control::new(velocity, steer),
            cross_track_m: cross_track,
            heading_error_rad: heading_error,
            saturated,
        }
    }

    fn reset(&mut self) {
        self.trim.reset();
        self.progress = 0;
    }

    fn name(&self) -> &str {
        "Stanley"
    }
}

/// Wrap an angle to (-pi, pi].
pub fn wrap_angle(angle: f64) -> f64 {
    let wrapped = (angle + PI).rem_euclid(2.0 * PI) - PI;
    if wrapped == -PI {
        PI
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn straight_path() -> ReferencePath {
        let n = 200;
        let t: Vec<f64> = (0..n).map(|i| i as f64 * 0.1).collect();
        let x: Vec<f64> = t.iter().map(|t| t * 10.0).collect();
        ReferencePath::new(t, x, vec![0.0; n], vec![10.0; n], None).unwrap()
    }

    #[test]
    fn wrap_angle_range() {
        assert_eq!(wrap_angle(PI), PI);
        assert_abs_diff_eq!(wrap_angle(2.0 * PI + 0.3), 0.3, epsilon = 1e-12);
        assert_abs_diff_eq!(wrap_angle(-PI / 2.0 - 2.0 * PI), -PI / 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(wrap_angle(0.1), 0.1, epsilon = 1e-12);
    }

    #[test]
    fn on_path_gives_zero_steer() {
        let mut c = StanleyController::default();
        let cmd = c.control(0.0, &WorldState { x: 5.0, ..Default::default() }, &straight_path(), 0.02);
        assert_abs_diff_eq!(cmd.control.steer_angle, 0.0);
        assert_abs_diff_eq!(cmd.cross_track_m, 0.0);
        assert_eq!(cmd.control.velocity, 10.0);
    }

    #[test]
    fn left_of_path_steers_right() {
        let mut c = StanleyController::default();
        let state = WorldState { x: 20.0, y: 1.0, ..Default::default() };
        let cmd = c.control(0.0, &state, &straight_path(), 0.02);
        assert!(cmd.cross_track_m > 0.0);
        assert!(cmd.control.steer_angle < 0.0);
    }

    #[test]
    fn heading_error_steers_back_to_path_heading() {
        let mut c = StanleyController::default();
        let state = WorldState { x: 20.0, heading1: -0.2, ..Default::default() };
        let cmd = c.control(0.0, &state, &straight_path(), 0.02);
        assert_abs_diff_eq!(cmd.heading_error_rad, 0.2, epsilon = 1e-12);
        assert!(cmd.control.steer_angle > 0.0);
    }

    #[test]
    fn large_error_saturates() {
        let mut c = StanleyController::default();
        let state = WorldState { x: 20.0, y: -50.0, heading1: -1.0, ..Default::default() };
        let cmd = c.control(0.0, &state, &straight_path(), 0.02);
        assert!(cmd.saturated);
        assert_eq!(cmd.control.steer_angle, c.params.max_steer_rad);
    }

    #[test]
    fn velocity_demand_is_floored() {
        let path = ReferencePath::new(
            vec![0.0, 1.0, 2.0],
            vec![0.0, 1.0, 2.0],
            vec![0.0; 3],
            vec![0.0; 3],
            None,
        )
        .unwrap();
        let mut c = StanleyController::default();
        let cmd = c.control(0.0, &WorldState::default(), &path, 0.02);
        assert_eq!(cmd.control.velocity, c.params.min_speed_ms);
    }

    #[test]
    fn reset_clears_progress() {
        let mut c = StanleyController::default();
        c.control(0.0, &WorldState { x: 100.0, ..Default::default() }, &straight_path(), 0.02);
        assert!(c.progress() > 0);
        c.reset();
        assert_eq!(c.progress(), 0);
    }
}
