use crate::dynamics::state::{Control, WorldState};
use crate::path::ReferencePath;

/// Output of a path-tracking controller for one step.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrackingCommand {
    pub control: Control,
    pub cross_track_m: f64,      // positive = vehicle left of the path
    pub heading_error_rad: f64,  // path heading minus tractor heading
    pub saturated: bool,         // steer demand hit the limit
}

/// Trait for path-tracking controllers.
///
/// Implement this to plug a custom controller into
/// [`run_closed_loop`](crate::sim::run_closed_loop). The state passed in is
/// referenced at the front axle.
pub trait Controller {
    /// Compute the next velocity and steer command.
    fn control(
        &mut self,
        time: f64,
        state: &WorldState,
        path: &ReferencePath,
        dt: f64,
    ) -> TrackingCommand;

    /// Reset controller internal state (path progress, PID integrators).
    fn reset(&mut self) {}

    /// Human-readable name for logging/display.
    fn name(&self) -> &str {
        "unnamed"
    }
}
