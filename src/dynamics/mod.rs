pub mod geometry;
pub mod matrices;
pub mod params;
pub mod state;

pub use matrices::{input_vector, mass_matrix, stiffness_matrix};
pub use params::{ModelParams, TruckParams};
pub use state::{Control, SimConfig, SimState, TruckState, WorldState};
