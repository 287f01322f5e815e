use nalgebra::Point2;

use truck_sim::dynamics::{Control, WorldState};
use truck_sim::gnc::{Controller, StanleyController, TrackingCommand};
use truck_sim::path::{RandomPathGenerator, RandomPathParams, ReferencePath};
use truck_sim::sim::{run_closed_loop, Simulator};

/// Pure pursuit on the front axle: steer towards the path point one
/// lookahead distance ahead.
struct PurePursuit {
    wheelbase: f64,
    min_lookahead: f64,
    lookahead_gain: f64,
    progress: usize,
}

impl Controller for PurePursuit {
    fn control(&mut self, _time: f64, state: &WorldState, path: &ReferencePath, _dt: f64) -> TrackingCommand {
        let p = Point2::new(state.x, state.y);
        let nearest = path.nearest_index(&p, self.progress, 200);
        self.progress = nearest;

        let v = path.velocity[nearest].max(0.5);
        let lookahead = self.min_lookahead.max(self.lookahead_gain * v);

        let mut target = nearest;
        while target + 1 < path.len() && (path.point(target) - p).norm() < lookahead {
            target += 1;
        }

        let d = path.point(target) - p;
        let alpha = d.y.atan2(d.x) - state.heading1;
        let steer = (2.0 * self.wheelbase * alpha.sin() / lookahead).atan();

        let (cross_track_m, heading_error_rad) = StanleyController::tracking_errors(state, path, nearest);
        TrackingCommand {
            control: Control::new(v, steer),
            cross_track_m,
            heading_error_rad,
            saturated: false,
        }
    }

    fn reset(&mut self) {
        self.progress = 0;
    }

    fn name(&self) -> &str {
        "PurePursuit"
    }
}

fn main() -> color_eyre::Result<()> {
    let params = RandomPathParams {
        velocity: Some(10.0),
        seed: Some(3),
        ..Default::default()
    };
    let path = RandomPathGenerator::new(&params)?.generate(&params)?;

    let mut sim = Simulator::new(0.02, true, None)?;
    let mut controller = PurePursuit {
        wheelbase: sim.params().a1 + sim.params().b1,
        min_lookahead: 4.0,
        lookahead_gain: 0.8,
        progress: 0,
    };

    println!("Tracking {:.0} m path with {} controller...", path.length(), controller.name());
    let log = run_closed_loop(&mut sim, &mut controller, &path)?;

    println!("  Steps:            {:>8}", log.samples.len());
    println!("  Max cross-track:  {:>8.3} m", log.max_cross_track());
    println!("  RMS cross-track:  {:>8.3} m", log.rms_cross_track());
    Ok(())
}
