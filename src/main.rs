use std::path::PathBuf;

use color_eyre::eyre::WrapErr;
use log::info;
use structopt::StructOpt;

use truck_sim::config::{self, RunConfig};
use truck_sim::gnc::StanleyController;
use truck_sim::io::csv::{self as csv_io, STEERING_RATIO};
use truck_sim::io::json::{self, RunSummary};
use truck_sim::logger::{logger_init, LevelFilter};
use truck_sim::metrics::calc_off_tracking;
use truck_sim::path::{RandomPathGenerator, ReferencePath};
use truck_sim::sim::{run_closed_loop, run_open_loop, RunLog, Simulator};

#[derive(Debug, StructOpt)]
#[structopt(name = "truck-sim", about = "Tractor-trailer lateral dynamics and path tracking")]
struct Opt {
    /// TOML run configuration
    #[structopt(short, long, parse(from_os_str))]
    config: Option<PathBuf>,

    #[structopt(long, default_value = "info")]
    log_level: LevelFilter,

    #[structopt(long, parse(from_os_str))]
    log_file: Option<PathBuf>,

    /// Trajectory CSV output
    #[structopt(short, long, parse(from_os_str))]
    output: Option<PathBuf>,

    /// JSON run summary output
    #[structopt(short, long, parse(from_os_str))]
    summary: Option<PathBuf>,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(Debug, StructOpt)]
enum Command {
    /// Replay the controls recorded on a reference path
    OpenLoop {
        #[structopt(parse(from_os_str))]
        path: PathBuf,

        /// Read a multibody export instead of a t,x,y,velocity CSV
        #[structopt(long)]
        simpack: bool,
    },

    /// Track a reference path with the Stanley controller
    Track {
        #[structopt(parse(from_os_str))]
        path: PathBuf,

        #[structopt(long)]
        simpack: bool,
    },

    /// Track a randomly generated path
    Random {
        #[structopt(long)]
        seed: Option<u64>,

        #[structopt(long)]
        velocity: Option<f64>,
    },
}

fn load_path(path: &PathBuf, simpack: bool) -> color_eyre::Result<ReferencePath> {
    let p = if simpack {
        csv_io::read_simpack_export_file(path, STEERING_RATIO)
    } else {
        csv_io::read_reference_path_file(path)
    };
    p.wrap_err_with(|| format!("Could not load reference path {:?}", path))
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let opt = Opt::from_args();

    logger_init(opt.log_level, opt.log_file.as_deref())?;

    let mut cfg = match &opt.config {
        Some(p) => config::load(p).wrap_err_with(|| format!("Could not load config {:?}", p))?,
        None => RunConfig::default(),
    };

    // -----------------------------------------------------------------------
    // Reference path
    // -----------------------------------------------------------------------
    let path = match &opt.cmd {
        Command::OpenLoop { path, simpack } | Command::Track { path, simpack } => load_path(path, *simpack)?,
        Command::Random { seed, velocity } => {
            if seed.is_some() {
                cfg.random_path.seed = *seed;
            }
            if velocity.is_some() {
                cfg.random_path.velocity = *velocity;
            }
            RandomPathGenerator::new(&cfg.random_path)?.generate(&cfg.random_path)?
        }
    };

    // One simulator step per path sample
    cfg.sim.sim_timestep = path.timestep();
    let mut sim = Simulator::from_config(&cfg.sim, Some(cfg.params))?;
    info!("Timestep {} s, solver {:?}", cfg.sim.sim_timestep, cfg.sim.integrator.solver);

    // -----------------------------------------------------------------------
    // Run
    // -----------------------------------------------------------------------
    let log = match &opt.cmd {
        Command::OpenLoop { .. } => run_open_loop(&mut sim, &path)?,
        Command::Track { .. } | Command::Random { .. } => {
            let mut controller = StanleyController::new(cfg.controller.clone());
            run_closed_loop(&mut sim, &mut controller, &path)?
        }
    };

    let off_tracking = calc_off_tracking(&log.front_states(cfg.params.a1), &cfg.params, &path);
    let summary = RunSummary::new(&log, &off_tracking, &cfg.params);

    print_report(&path, &log, &summary, cfg.sim.sim_timestep);

    // -----------------------------------------------------------------------
    // Output
    // -----------------------------------------------------------------------
    if let Some(out) = &opt.output {
        csv_io::write_trajectory_file(out, &log.samples)
            .wrap_err_with(|| format!("Could not write trajectory {:?}", out))?;
        info!("Trajectory written to {:?}", out);
    }
    if let Some(out) = &opt.summary {
        let file = std::fs::File::create(out)?;
        json::write_summary(file, &summary)?;
        info!("Summary written to {:?}", out);
    }

    Ok(())
}

fn print_report(path: &ReferencePath, log: &RunLog, summary: &RunSummary, dt: f64) {
    println!();
    println!("====================================================================");
    println!("  TRACTOR-TRAILER SIMULATION: {}", log.controller);
    println!("====================================================================");
    println!();
    println!("  Reference Path");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!(
        "  Samples:       {:>8}         Duration:     {:>8.1} s",
        path.len(),
        path.duration()
    );
    println!(
        "  Length:        {:>8.1} m       Recorded steer: {:>6}",
        path.length(),
        if path.steer_angle.is_some() { "yes" } else { "no" }
    );
    println!();

    println!("  Tracking");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!(
        "  Max cross-track: {:>7.3} m     RMS cross-track: {:>7.3} m",
        summary.max_cross_track_m, summary.rms_cross_track_m
    );
    println!(
        "  Steer saturated: {:>7} steps",
        summary.saturated_steps
    );
    println!();

    println!("  Off-tracking (max distance to path)");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!(
        "  Front axle:    {:>8.3} m   Fifth wheel:  {:>8.3} m   Trailer axle: {:>8.3} m",
        summary.off_tracking.max_front_axle_m,
        summary.off_tracking.max_fifth_wheel_m,
        summary.off_tracking.max_trailer_axle_m
    );
    println!();

    // -----------------------------------------------------------------------
    // Trajectory table (sampled)
    // -----------------------------------------------------------------------
    println!("  Trajectory");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!(
        "  {:>7}  {:>9}  {:>9}  {:>8}  {:>8}  {:>8}",
        "t (s)", "x (m)", "y (m)", "psi1(°)", "phi (°)", "steer(°)"
    );
    println!("  {}", "─".repeat(60));

    let sample_interval = (log.samples.len() / 30).max(1);
    for (i, s) in log.samples.iter().enumerate() {
        if i % sample_interval != 0 && i != log.samples.len() - 1 {
            continue;
        }
        println!(
            "  {:>7.2}  {:>9.2}  {:>9.2}  {:>8.2}  {:>8.2}  {:>8.3}",
            s.time,
            s.x,
            s.y,
            s.heading1.to_degrees(),
            (s.heading2 - s.heading1).to_degrees(),
            s.steer_angle.to_degrees()
        );
    }

    println!();
    println!("  Simulation: {} steps, dt={} s", summary.steps, dt);
    println!("====================================================================");
    println!();
}
