pub mod controller;
pub mod pid;
pub mod stanley;

pub use controller::{Controller, TrackingCommand};
pub use pid::Pid;
pub use stanley::{wrap_angle, StanleyController, StanleyParams};
