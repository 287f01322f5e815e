use log::{info, warn};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::dynamics::state::{Control, WorldState};
use crate::gnc::{Controller, StanleyController};
use crate::metrics::rms;
use crate::path::{PathError, ReferencePath};
use super::simulator::Simulator;
use super::SimError;

// ---------------------------------------------------------------------------
// Run records
// ---------------------------------------------------------------------------

/// One simulated step as written to the trajectory CSV.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub time: f64,
    pub x: f64,
    pub y: f64,
    pub delta: f64,
    pub heading1: f64,
    pub heading2: f64,
    pub velocity: f64,
    pub steer_angle: f64,
    pub cross_track_m: f64,
    pub heading_error_rad: f64,
}

impl Sample {
    fn new(time: f64, state: &WorldState, control: &Control, cross_track_m: f64, heading_error_rad: f64) -> Self {
        Self {
            time,
            x: state.x,
            y: state.y,
            delta: state.delta,
            heading1: state.heading1,
            heading2: state.heading2,
            velocity: control.velocity,
            steer_angle: control.steer_angle,
            cross_track_m,
            heading_error_rad,
        }
    }

    pub fn world_state(&self) -> WorldState {
        WorldState {
            x: self.x,
            y: self.y,
            delta: self.delta,
            heading1: self.heading1,
            heading2: self.heading2,
        }
    }
}

/// Everything recorded while driving one path.
#[derive(Debug, Clone)]
pub struct RunLog {
    pub controller: String,
    pub samples: Vec<Sample>,
    pub saturated_steps: usize,
    /// Samples are referenced at the front axle rather than the CG
    pub at_front: bool,
}

impl RunLog {
    /// World states of all samples, referenced at the front axle.
    pub fn front_states(&self, a1: f64) -> Vec<WorldState> {
        self.samples
            .iter()
            .map(|s| {
                let w = s.world_state();
                if self.at_front { w } else { w.at_front_axle(a1) }
            })
            .collect()
    }

    pub fn max_cross_track(&self) -> f64 {
        self.samples
            .iter()
            .map(|s| s.cross_track_m.abs())
            .fold(0.0_f64, f64::max)
    }

    pub fn rms_cross_track(&self) -> f64 {
        let ct: Vec<f64> = self.samples.iter().map(|s| s.cross_track_m).collect();
        rms(&ct)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("Simulation failed at step {index} (t = {time:.3} s): {source}")]
    Step {
        index: usize,
        time: f64,
        source: SimError,
    },

    #[error("Simulator timestep {sim} s does not match the path sample spacing {path} s")]
    TimestepMismatch { sim: f64, path: f64 },

    #[error(transparent)]
    Path(#[from] PathError),
}

/// One simulator step is taken per path sample, so both must share a
/// timestep.
fn check_timestep(sim: &Simulator, path: &ReferencePath) -> Result<(), RunError> {
    let (dt_sim, dt_path) = (sim.sim_timestep(), path.timestep());
    if (dt_sim - dt_path).abs() > 1e-9 * dt_sim.abs().max(dt_path.abs()) {
        return Err(RunError::TimestepMismatch { sim: dt_sim, path: dt_path });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Open loop: replay recorded controls
// ---------------------------------------------------------------------------

/// Drive the simulator with the velocity and steer angle recorded on `path`.
pub fn run_open_loop(sim: &mut Simulator, path: &ReferencePath) -> Result<RunLog, RunError> {
    check_timestep(sim, path)?;
    info!("Open-loop replay of {} samples ({:.1} s)", path.len(), path.duration());

    let a1 = sim.params().a1;
    let mut samples = Vec::with_capacity(path.len());

    for i in 0..path.len() {
        let control = path.recorded_control(i)?;
        let out = sim
            .simulate_timestep(control)
            .map_err(|source| RunError::Step { index: i, time: sim.sim_time(), source })?;

        let front = if sim.world_state_at_front() { out } else { out.at_front_axle(a1) };
        let nearest = path.nearest_index(&Point2::new(front.x, front.y), 0, 0);
        let (ct, he) = StanleyController::tracking_errors(&front, path, nearest);

        samples.push(Sample::new(sim.sim_time(), &out, &control, ct, he));
    }

    let log = RunLog {
        controller: "open-loop".into(),
        samples,
        saturated_steps: 0,
        at_front: sim.world_state_at_front(),
    };
    info!("Open-loop replay done: max cross-track {:.3} m", log.max_cross_track());
    Ok(log)
}

// ---------------------------------------------------------------------------
// Closed loop: controller in the loop
// ---------------------------------------------------------------------------

/// Track `path` with `controller`, one simulator step per path sample.
pub fn run_closed_loop(
    sim: &mut Simulator,
    controller: &mut dyn Controller,
    path: &ReferencePath,
) -> Result<RunLog, RunError> {
    check_timestep(sim, path)?;
    info!(
        "Tracking {} samples ({:.1} s, {:.0} m) with {} controller",
        path.len(),
        path.duration(),
        path.length(),
        controller.name()
    );

    let dt = sim.sim_timestep();
    let mut samples = Vec::with_capacity(path.len());
    let mut saturated_steps = 0;

    for i in 0..path.len() {
        let front = sim.convert_world_state_to_front();
        let cmd = controller.control(path.t[i], &front, path, dt);
        if cmd.saturated {
            saturated_steps += 1;
        }

        let out = sim
            .simulate_timestep(cmd.control)
            .map_err(|source| RunError::Step { index: i, time: sim.sim_time(), source })?;

        samples.push(Sample::new(
            sim.sim_time(),
            &out,
            &cmd.control,
            cmd.cross_track_m,
            cmd.heading_error_rad,
        ));
    }

    let log = RunLog {
        controller: controller.name().to_string(),
        samples,
        saturated_steps,
        at_front: sim.world_state_at_front(),
    };

    if saturated_steps > 0 {
        warn!("Steer demand saturated on {} of {} steps", saturated_steps, path.len());
    }
    info!(
        "Tracking done: max cross-track {:.3} m, RMS {:.3} m",
        log.max_cross_track(),
        log.rms_cross_track()
    );
    Ok(log)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gnc::TrackingCommand;
    use crate::path::{RandomPathGenerator, RandomPathParams};

    fn recorded_straight(n: usize, velocity: f64) -> ReferencePath {
        recorded_straight_at(n, velocity, 0.02)
    }

    fn recorded_straight_at(n: usize, velocity: f64, dt: f64) -> ReferencePath {
        let t: Vec<f64> = (0..n).map(|i| i as f64 * dt).collect();
        let x: Vec<f64> = t.iter().map(|t| t * velocity).collect();
        ReferencePath::new(t, x, vec![0.0; n], vec![velocity; n], Some(vec![0.0; n])).unwrap()
    }

    #[test]
    fn open_loop_replays_recorded_controls() {
        let path = recorded_straight(100, 10.0);
        let mut sim = Simulator::new(path.timestep(), true, None).unwrap();
        let log = run_open_loop(&mut sim, &path).unwrap();
        assert_eq!(log.samples.len(), 100);
        let last = log.samples.last().unwrap();
        // CG starts at the origin, so the front axle leads the path by a1
        assert!((last.x - (100.0 * 0.2 + sim.params().a1)).abs() < 1e-6);
        assert!(log.max_cross_track() < 1e-9);
    }

    #[test]
    fn replay_follows_path_sample_spacing() {
        let path = recorded_straight_at(100, 10.0, 0.01);
        let mut sim = Simulator::new(path.timestep(), false, None).unwrap();
        let log = run_open_loop(&mut sim, &path).unwrap();
        assert!((sim.sim_time() - 1.0).abs() < 1e-9);
        assert!((log.samples.last().unwrap().x - 10.0).abs() < 1e-6);
    }

    #[test]
    fn mismatched_timestep_is_rejected() {
        let path = recorded_straight_at(100, 10.0, 0.01);
        let mut sim = Simulator::new(0.02, false, None).unwrap();
        assert!(matches!(
            run_open_loop(&mut sim, &path),
            Err(RunError::TimestepMismatch { .. })
        ));
        assert_eq!(sim.sim_time(), 0.0);

        let mut controller = StanleyController::default();
        assert!(matches!(
            run_closed_loop(&mut sim, &mut controller, &path),
            Err(RunError::TimestepMismatch { .. })
        ));
    }

    #[test]
    fn open_loop_needs_steer_column() {
        let mut path = recorded_straight(10, 10.0);
        path.steer_angle = None;
        let mut sim = Simulator::new(0.02, true, None).unwrap();
        assert!(matches!(
            run_open_loop(&mut sim, &path),
            Err(RunError::Path(PathError::NoSteerAngle))
        ));
    }

    #[test]
    fn zero_velocity_step_reports_index() {
        let mut path = recorded_straight(10, 10.0);
        path.velocity[4] = 0.0;
        let mut sim = Simulator::new(0.02, true, None).unwrap();
        match run_open_loop(&mut sim, &path) {
            Err(RunError::Step { index, source, .. }) => {
                assert_eq!(index, 4);
                assert_eq!(source, SimError::ZeroVelocity);
            }
            other => panic!("expected step failure, got {:?}", other.map(|l| l.samples.len())),
        }
    }

    #[test]
    fn stanley_tracks_random_path() {
        let params = RandomPathParams { seed: Some(11), velocity: Some(12.0), ..Default::default() };
        let path = RandomPathGenerator::new(&params).unwrap().generate(&params).unwrap();
        let mut sim = Simulator::new(path.timestep(), true, None).unwrap();
        let mut controller = StanleyController::default();
        let log = run_closed_loop(&mut sim, &mut controller, &path).unwrap();

        assert_eq!(log.samples.len(), path.len());
        assert_eq!(log.controller, "Stanley");
        // The front axle starts a1 ahead of the path origin and must stay close
        assert!(log.max_cross_track() < 2.0, "max cross-track {}", log.max_cross_track());
    }

    struct ConstantSteer(f64);

    impl Controller for ConstantSteer {
        fn control(&mut self, _t: f64, _s: &WorldState, path: &ReferencePath, _dt: f64) -> TrackingCommand {
            TrackingCommand {
                control: Control::new(path.velocity[0], self.0),
                ..Default::default()
            }
        }
    }

    #[test]
    fn custom_controller_plugs_in() {
        let path = recorded_straight(50, 10.0);
        let mut sim = Simulator::new(0.02, false, None).unwrap();
        let log = run_closed_loop(&mut sim, &mut ConstantSteer(0.05), &path).unwrap();
        assert_eq!(log.controller, "unnamed");
        assert!(!log.at_front);
        assert!(log.samples.last().unwrap().y > 0.0);
        assert_eq!(log.front_states(sim.params().a1).len(), 50);
    }
}
