use truck_sim::dynamics::Control;
use truck_sim::sim::Simulator;

/// Drive straight, then hold a small step steer and watch the trailer follow.
fn main() -> color_eyre::Result<()> {
    let mut sim = Simulator::new(0.02, true, None)?;

    println!("  {:>6}  {:>8}  {:>8}  {:>8}  {:>8}", "t (s)", "x (m)", "y (m)", "psi1(°)", "psi2(°)");
    for i in 0..500 {
        let steer = if i < 100 { 0.0 } else { 0.02 };
        let w = sim.simulate_timestep(Control::new(15.0, steer))?;
        if i % 25 == 0 {
            println!(
                "  {:>6.2}  {:>8.2}  {:>8.2}  {:>8.2}  {:>8.2}",
                sim.sim_time(),
                w.x,
                w.y,
                w.heading1.to_degrees(),
                w.heading2.to_degrees()
            );
        }
    }

    let t = sim.truck_state();
    println!();
    println!(
        "  Steady state: yaw rate {:.4} rad/s, articulation {:.2}°",
        t.yaw_rate,
        t.articulation_angle.to_degrees()
    );
    Ok(())
}
