use eframe::egui;
use egui_plot::{Legend, Line, Plot, PlotPoints};

use truck_sim::config::RunConfig;
use truck_sim::dynamics::geometry::{body_outlines, Outline};
use truck_sim::dynamics::{SimConfig, TruckParams};
use truck_sim::gnc::StanleyController;
use truck_sim::path::{RandomPathGenerator, ReferencePath};
use truck_sim::sim::{run_closed_loop, RunLog, Simulator};

fn main() -> eframe::Result {
    let config = RunConfig::default();
    let (path, log) = match prepare(&config) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Error: {:?}", e);
            std::process::exit(1);
        }
    };

    let app = TrackViz { path, log, params: config.params };
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1200.0, 800.0]),
        ..Default::default()
    };
    eframe::run_native("Tractor-Trailer Path Tracking", options, Box::new(|_| Ok(Box::new(app))))
}

fn prepare(config: &RunConfig) -> color_eyre::Result<(ReferencePath, RunLog)> {
    let path = RandomPathGenerator::new(&config.random_path)?.generate(&config.random_path)?;
    let sim_config = SimConfig { sim_timestep: path.timestep(), ..config.sim.clone() };
    let mut sim = Simulator::from_config(&sim_config, Some(config.params))?;
    let mut controller = StanleyController::new(config.controller.clone());
    let log = run_closed_loop(&mut sim, &mut controller, &path)?;
    Ok((path, log))
}

fn closed_outline(outline: &Outline) -> PlotPoints<'static> {
    outline
        .iter()
        .chain(outline.first())
        .map(|p| [p.x, p.y])
        .collect()
}

struct TrackViz {
    path: ReferencePath,
    log: RunLog,
    params: TruckParams,
}

impl eframe::App for TrackViz {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let front = self.log.front_states(self.params.a1);

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.heading(format!("Controller: {}", self.log.controller));
            ui.label(format!(
                "Path: {:.0} m  |  Speed: {:.1} m/s  |  Max cross-track: {:.3} m  |  RMS: {:.3} m  |  Saturated: {}",
                self.path.length(),
                self.path.velocity.first().copied().unwrap_or(0.0),
                self.log.max_cross_track(),
                self.log.rms_cross_track(),
                self.log.saturated_steps,
            ));
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let available = ui.available_size();
            let half_w = available.x / 2.0 - 8.0;

            ui.horizontal(|ui| {
                // Reference vs driven path with the final body outlines
                ui.vertical(|ui| {
                    ui.label("Path (m)");
                    let reference: PlotPoints = self.path.x.iter().zip(&self.path.y).map(|(x, y)| [*x, *y]).collect();
                    let driven: PlotPoints = front.iter().map(|s| [s.x, s.y]).collect();
                    let outlines = front.last().map(|s| body_outlines(s, &self.params));
                    Plot::new("path")
                        .width(half_w)
                        .height(available.y - 8.0)
                        .data_aspect(1.0)
                        .legend(Legend::default())
                        .show(ui, |plot_ui| {
                            plot_ui.line(Line::new("Reference", reference));
                            plot_ui.line(Line::new("Front axle", driven));
                            if let Some((tractor, trailer)) = &outlines {
                                plot_ui.line(Line::new("Tractor", closed_outline(tractor)));
                                plot_ui.line(Line::new("Trailer", closed_outline(trailer)));
                            }
                        });
                });

                ui.vertical(|ui| {
                    let half_h = available.y / 2.0 - 16.0;

                    ui.label("Cross-track error (m)");
                    let ct: PlotPoints = self.log.samples.iter().map(|s| [s.time, s.cross_track_m]).collect();
                    Plot::new("cross_track")
                        .width(half_w)
                        .height(half_h)
                        .x_axis_label("Time (s)")
                        .show(ui, |plot_ui| {
                            plot_ui.line(Line::new("Cross-track", ct));
                        });

                    ui.label("Heading (deg)");
                    let h1: PlotPoints = self.log.samples.iter().map(|s| [s.time, s.heading1.to_degrees()]).collect();
                    let h2: PlotPoints = self.log.samples.iter().map(|s| [s.time, s.heading2.to_degrees()]).collect();
                    Plot::new("heading")
                        .width(half_w)
                        .height(half_h)
                        .x_axis_label("Time (s)")
                        .legend(Legend::default())
                        .show(ui, |plot_ui| {
                            plot_ui.line(Line::new("Tractor", h1));
                            plot_ui.line(Line::new("Trailer", h2));
                        });
                });
            });
        });
    }
}
