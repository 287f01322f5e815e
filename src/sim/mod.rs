pub mod integrator;
pub mod runner;
pub mod simulator;

pub use integrator::{integrate, rk4_step, IntegrationError, IntegratorConfig, Solver};
pub use runner::{run_closed_loop, run_open_loop, RunError, RunLog, Sample};
pub use simulator::{step, update_world_state, LinearModel, Simulator};

use crate::dynamics::state::Control;

/// Errors that end a simulated trajectory.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimError {
    #[error("Longitudinal velocity is zero, the stiffness matrix is undefined")]
    ZeroVelocity,

    #[error("Control input is not finite: {0:?}")]
    NonFiniteControl(Control),

    #[error("Simulation timestep must be positive and finite, found {0}")]
    InvalidTimestep(f64),

    #[error("The mass matrix is singular")]
    SingularMassMatrix,

    #[error("Integration of the truck state failed: {0}")]
    Integration(#[from] IntegrationError),
}
