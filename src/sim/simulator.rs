use log::{debug, trace};
use nalgebra::{Matrix4, Rotation2, Vector2, Vector4};

use crate::dynamics::matrices::{input_vector, mass_matrix, stiffness_matrix};
use crate::dynamics::params::{ModelParams, TruckParams};
use crate::dynamics::state::{Control, SimConfig, SimState, TruckState, WorldState};
use super::integrator::{integrate, IntegratorConfig};
use super::SimError;

// ---------------------------------------------------------------------------
// Constant part of the linear model
// ---------------------------------------------------------------------------

/// Parameters and the matrices that depend on them only.
#[derive(Debug, Clone)]
pub struct LinearModel {
    pub params: ModelParams,
    pub mass: Matrix4<f64>,
    pub mass_inv: Matrix4<f64>,
    pub input: Vector4<f64>,
}

impl LinearModel {
    pub fn new(params: ModelParams) -> Result<Self, SimError> {
        let mass = mass_matrix(&params);
        let mass_inv = mass.try_inverse().ok_or(SimError::SingularMassMatrix)?;
        Ok(Self {
            input: input_vector(&params),
            params,
            mass,
            mass_inv,
        })
    }

    /// Right-hand side `M^-1 (A x + B delta)` for one control input.
    ///
    /// Returns the system matrix `M^-1 A` and forcing `M^-1 B delta`.
    pub fn canonical_ode(&self, control: &Control) -> Result<(Matrix4<f64>, Vector4<f64>), SimError> {
        let a = stiffness_matrix(&self.params, control)?;
        Ok((self.mass_inv * a, self.mass_inv * self.input * control.steer_angle))
    }
}

// ---------------------------------------------------------------------------
// Pure state transition
// ---------------------------------------------------------------------------

/// Advance `state` by one timestep `dt` under a constant `control`.
pub fn step(
    model: &LinearModel,
    state: &SimState,
    control: &Control,
    dt: f64,
    integrator: &IntegratorConfig,
) -> Result<SimState, SimError> {
    let (system, forcing) = model.canonical_ode(control)?;
    let rhs = |_t: f64, x: &Vector4<f64>| system * x + forcing;

    let t1 = state.time + dt;
    let x = integrate(&rhs, state.time, t1, &state.truck.to_vector(), integrator)?;
    let truck = TruckState::from_vector(&x);
    let world = update_world_state(&state.world, &truck, control, dt);

    Ok(SimState { time: t1, truck, world })
}

/// Integrate the freshly updated truck-frame rates into the world pose.
///
/// Order matters: the tractor heading is advanced first, the body velocity
/// is rotated by the advanced heading, and the trailer heading is derived
/// from the new articulation angle last.
pub fn update_world_state(
    world: &WorldState,
    truck: &TruckState,
    control: &Control,
    dt: f64,
) -> WorldState {
    let mut next = *world;

    next.heading1 += truck.yaw_rate * dt;

    let vel = Rotation2::new(next.heading1) * Vector2::new(control.velocity, truck.lateral_velocity);
    next.x += vel.x * dt;
    next.y += vel.y * dt;

    next.heading2 = next.heading1 + truck.articulation_angle;

    next
}

// ---------------------------------------------------------------------------
// Stateful simulator
// ---------------------------------------------------------------------------

/// Fixed-timestep tractor-trailer simulator.
///
/// Owns the truck state, world state and clock. A failed step leaves all
/// three untouched.
#[derive(Debug, Clone)]
pub struct Simulator {
    model: LinearModel,
    state: SimState,
    sim_timestep: f64,
    world_state_at_front: bool,
    integrator: IntegratorConfig,
}

impl Simulator {
    /// `params` defaults to [`TruckParams::default`] when `None`.
    pub fn new(
        sim_timestep: f64,
        world_state_at_front: bool,
        params: Option<TruckParams>,
    ) -> Result<Self, SimError> {
        let config = SimConfig {
            sim_timestep,
            world_state_at_front,
            ..Default::default()
        };
        Self::from_config(&config, params)
    }

    pub fn from_config(config: &SimConfig, params: Option<TruckParams>) -> Result<Self, SimError> {
        if !(config.sim_timestep.is_finite() && config.sim_timestep > 0.0) {
            return Err(SimError::InvalidTimestep(config.sim_timestep));
        }
        let model = LinearModel::new(params.unwrap_or_default().into())?;

        debug!(
            "Simulator ready: dt = {} s, output at {}, solver {:?}",
            config.sim_timestep,
            if config.world_state_at_front { "front axle" } else { "CG" },
            config.integrator.solver
        );
        debug!("    Cs1 = {:.3}, Cq1 = {:.3}", model.params.cs1, model.params.cq1);

        Ok(Self {
            model,
            state: SimState::default(),
            sim_timestep: config.sim_timestep,
            world_state_at_front: config.world_state_at_front,
            integrator: config.integrator,
        })
    }

    /// Simulate one timestep from the stored truck state.
    ///
    /// Returns the world state at the front axle or at the CG depending on
    /// how the simulator was constructed.
    pub fn simulate_timestep(&mut self, control: Control) -> Result<WorldState, SimError> {
        let next = step(&self.model, &self.state, &control, self.sim_timestep, &self.integrator)?;
        self.state = next;

        trace!(
            "t = {:.3}: x = {:.3}, y = {:.3}, th1 = {:.5}, th2 = {:.5}",
            next.time,
            next.world.x,
            next.world.y,
            next.world.heading1,
            next.world.heading2
        );

        Ok(if self.world_state_at_front {
            self.convert_world_state_to_front()
        } else {
            self.state.world
        })
    }

    /// World state referenced at the front axle. Does not advance the
    /// simulation or modify the stored state.
    pub fn convert_world_state_to_front(&self) -> WorldState {
        self.state.world.at_front_axle(self.model.params.truck.a1)
    }

    /// Return to t = 0 with zero truck and world state.
    pub fn reset(&mut self) {
        self.state = SimState::default();
    }

    pub fn world_state(&self) -> &WorldState {
        &self.state.world
    }

    pub fn truck_state(&self) -> &TruckState {
        &self.state.truck
    }

    pub fn state(&self) -> &SimState {
        &self.state
    }

    pub fn sim_time(&self) -> f64 {
        self.state.time
    }

    pub fn sim_timestep(&self) -> f64 {
        self.sim_timestep
    }

    pub fn world_state_at_front(&self) -> bool {
        self.world_state_at_front
    }

    pub fn params(&self) -> &TruckParams {
        &self.model.params.truck
    }

    pub fn mass_matrix(&self) -> &Matrix4<f64> {
        &self.model.mass
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::integrator::{IntegrationError, Solver};
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn run(sim: &mut Simulator, control: Control, steps: usize) -> WorldState {
        let mut out = WorldState::default();
        for _ in 0..steps {
            out = sim.simulate_timestep(control).unwrap();
        }
        out
    }

    #[test]
    fn straight_line_at_constant_speed() {
        let mut sim = Simulator::new(0.02, false, None).unwrap();
        let s = run(&mut sim, Control::new(10.0, 0.0), 50);
        assert_abs_diff_eq!(s.x, 10.0, epsilon = 1e-3);
        assert_abs_diff_eq!(s.y, 0.0, epsilon = 1e-3);
        assert_abs_diff_eq!(s.heading1, 0.0, epsilon = 1e-3);
        assert_abs_diff_eq!(s.heading2, 0.0, epsilon = 1e-3);
        assert_relative_eq!(sim.sim_time(), 1.0, max_relative = 1e-12);
    }

    #[test]
    fn straight_line_grows_linearly() {
        let mut sim = Simulator::new(0.05, false, None).unwrap();
        for i in 1..=40 {
            let s = sim.simulate_timestep(Control::new(3.0, 0.0)).unwrap();
            assert_relative_eq!(s.x, 3.0 * 0.05 * i as f64, max_relative = 1e-6);
            assert_eq!(s.y, 0.0);
            assert_eq!(s.heading1, 0.0);
        }
    }

    #[test]
    fn constant_steer_develops_articulation() {
        let mut sim = Simulator::new(0.02, false, None).unwrap();
        let s = run(&mut sim, Control::new(10.0, 0.05), 100);
        assert!(s.heading1 > 0.0, "heading1 = {}", s.heading1);
        assert!(s.heading2.abs() > 1e-4, "heading2 = {}", s.heading2);
        assert!((s.heading1 - s.heading2).abs() > 1e-4);
        assert!(s.y > 0.0, "y = {}", s.y);
        assert_eq!(s.delta, 0.0);
    }

    #[test]
    fn steer_sign_mirrors_trajectory() {
        let mut left = Simulator::new(0.02, false, None).unwrap();
        let mut right = Simulator::new(0.02, false, None).unwrap();
        let l = run(&mut left, Control::new(10.0, 0.05), 100);
        let r = run(&mut right, Control::new(10.0, -0.05), 100);
        assert!(r.y < 0.0);
        assert_relative_eq!(l.y, -r.y, max_relative = 1e-9);
        assert_relative_eq!(l.heading2, -r.heading2, max_relative = 1e-9);
    }

    #[test]
    fn yaw_rate_reaches_steady_state() {
        let mut sim = Simulator::new(0.02, false, None).unwrap();
        let control = Control::new(10.0, 0.02);
        run(&mut sim, control, 1500);
        let r_settled = sim.truck_state().yaw_rate;
        run(&mut sim, control, 500);
        let truck = *sim.truck_state();

        assert!(r_settled > 0.0);
        assert_relative_eq!(truck.yaw_rate, r_settled, max_relative = 1e-4);
        // Trailer follows the tractor in a steady turn
        assert_abs_diff_eq!(truck.articulation_rate, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn front_axle_output_offsets_cg() {
        let mut cg = Simulator::new(0.02, false, None).unwrap();
        let mut front = Simulator::new(0.02, true, None).unwrap();
        let a1 = cg.params().a1;
        let control = Control::new(8.0, 0.03);
        for _ in 0..75 {
            let c = cg.simulate_timestep(control).unwrap();
            let f = front.simulate_timestep(control).unwrap();
            assert_abs_diff_eq!(f.x - a1 * f.heading1.cos(), c.x, epsilon = 1e-9);
            assert_abs_diff_eq!(f.y - a1 * f.heading1.sin(), c.y, epsilon = 1e-9);
        }
        // Stored state remains at the CG
        assert_eq!(*front.world_state(), *cg.world_state());
    }

    #[test]
    fn frame_query_does_not_mutate() {
        let mut sim = Simulator::new(0.02, false, None).unwrap();
        run(&mut sim, Control::new(10.0, 0.04), 20);
        let before = *sim.state();
        let front = sim.convert_world_state_to_front();
        assert_eq!(*sim.state(), before);
        assert!(front.x > before.world.x);
    }

    #[test]
    fn zero_velocity_is_an_error_and_state_is_kept() {
        let mut sim = Simulator::new(0.02, false, None).unwrap();
        run(&mut sim, Control::new(10.0, 0.01), 10);
        let before = *sim.state();
        let err = sim.simulate_timestep(Control::new(0.0, 0.01)).unwrap_err();
        assert_eq!(err, SimError::ZeroVelocity);
        assert_eq!(*sim.state(), before);
    }

    #[test]
    fn integrator_failure_is_an_error_and_state_is_kept() {
        let config = SimConfig {
            sim_timestep: 5.0,
            integrator: IntegratorConfig { max_steps: 1, ..Default::default() },
            ..Default::default()
        };
        let mut sim = Simulator::from_config(&config, None).unwrap();
        let before = *sim.state();

        // A 5 s interval cannot be covered in a single accepted step
        let err = sim.simulate_timestep(Control::new(10.0, 0.05)).unwrap_err();
        assert!(
            matches!(err, SimError::Integration(IntegrationError::MaxStepsExceeded { .. })),
            "got {:?}",
            err
        );
        assert_eq!(*sim.state(), before);
        assert_eq!(sim.sim_time(), 0.0);
    }

    #[test]
    fn invalid_timestep_rejected() {
        assert!(matches!(
            Simulator::new(0.0, false, None),
            Err(SimError::InvalidTimestep(_))
        ));
        assert!(matches!(
            Simulator::new(f64::NAN, false, None),
            Err(SimError::InvalidTimestep(_))
        ));
    }

    #[test]
    fn singular_mass_matrix_rejected() {
        let params = TruckParams { m1: 0.0, m2: 0.0, i1: 0.0, i2: 0.0, ..Default::default() };
        assert_eq!(
            Simulator::new(0.02, false, Some(params)).unwrap_err(),
            SimError::SingularMassMatrix
        );
    }

    #[test]
    fn mass_matrix_constant_over_run() {
        let mut sim = Simulator::new(0.02, false, None).unwrap();
        let m0 = *sim.mass_matrix();
        run(&mut sim, Control::new(15.0, 0.02), 30);
        assert_eq!(*sim.mass_matrix(), m0);
    }

    #[test]
    fn rk4_solver_agrees_with_adaptive() {
        let config = SimConfig {
            integrator: IntegratorConfig {
                solver: Solver::Rk4 { substeps: 8 },
                ..Default::default()
            },
            ..Default::default()
        };
        let mut fixed = Simulator::from_config(&config, None).unwrap();
        let mut adaptive = Simulator::new(0.02, false, None).unwrap();
        let control = Control::new(12.0, 0.03);
        let a = run(&mut adaptive, control, 200);
        let f = run(&mut fixed, control, 200);
        assert_abs_diff_eq!(a.x, f.x, epsilon = 1e-4);
        assert_abs_diff_eq!(a.y, f.y, epsilon = 1e-4);
        assert_abs_diff_eq!(a.heading2, f.heading2, epsilon = 1e-6);
    }

    #[test]
    fn world_update_uses_advanced_heading() {
        let truck = TruckState { yaw_rate: 1.0, articulation_angle: -0.1, ..Default::default() };
        let next = update_world_state(&WorldState::default(), &truck, &Control::new(2.0, 0.0), 0.5);
        assert_abs_diff_eq!(next.heading1, 0.5);
        assert_abs_diff_eq!(next.x, 2.0 * 0.5_f64.cos() * 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(next.y, 2.0 * 0.5_f64.sin() * 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(next.heading2, 0.4, epsilon = 1e-12);
    }

    #[test]
    fn reset_returns_to_origin() {
        let mut sim = Simulator::new(0.02, true, None).unwrap();
        run(&mut sim, Control::new(10.0, 0.05), 10);
        sim.reset();
        assert_eq!(*sim.state(), SimState::default());
    }
}
