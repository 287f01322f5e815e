use truck_sim::dynamics::TruckParams;
use truck_sim::gnc::{StanleyController, StanleyParams};
use truck_sim::metrics::calc_off_tracking;
use truck_sim::path::{RandomPathGenerator, RandomPathParams};
use truck_sim::sim::{run_closed_loop, Simulator};

/// Track a batch of seeded random paths and compare trailer off-tracking
/// across speeds.
fn main() -> color_eyre::Result<()> {
    let truck = TruckParams::default();

    println!(
        "  {:>5}  {:>8}  {:>8}  {:>10}  {:>10}  {:>10}",
        "seed", "v (m/s)", "len (m)", "ct max(m)", "5th max(m)", "trl max(m)"
    );
    for seed in 0..6_u64 {
        let params = RandomPathParams {
            seed: Some(seed),
            velocity: Some(5.0 + 4.0 * seed as f64),
            ..Default::default()
        };
        let path = RandomPathGenerator::new(&params)?.generate(&params)?;

        let mut sim = Simulator::new(params.delta_t, true, Some(truck))?;
        let mut controller = StanleyController::new(StanleyParams::default());
        let log = run_closed_loop(&mut sim, &mut controller, &path)?;
        let ot = calc_off_tracking(&log.front_states(truck.a1), &truck, &path);

        println!(
            "  {:>5}  {:>8.1}  {:>8.1}  {:>10.3}  {:>10.3}  {:>10.3}",
            seed,
            path.velocity[0],
            path.length(),
            log.max_cross_track(),
            ot.max_fifth_wheel(),
            ot.max_trailer_axle()
        );
    }
    Ok(())
}
