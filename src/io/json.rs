use std::io::Write;

use serde::Serialize;

use crate::dynamics::TruckParams;
use crate::metrics::{rms, OffTracking};
use crate::sim::RunLog;

/// Summary statistics computed from a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub controller: String,
    pub steps: usize,
    pub duration_s: f64,
    pub final_x: f64,
    pub final_y: f64,
    pub final_articulation_rad: f64,
    pub max_cross_track_m: f64,
    pub rms_cross_track_m: f64,
    pub saturated_steps: usize,
    pub off_tracking: OffTrackingSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OffTrackingSummary {
    pub max_front_axle_m: f64,
    pub max_fifth_wheel_m: f64,
    pub max_trailer_axle_m: f64,
    pub rms_trailer_axle_m: f64,
}

impl From<&OffTracking> for OffTrackingSummary {
    fn from(ot: &OffTracking) -> Self {
        OffTrackingSummary {
            max_front_axle_m: ot.max_front_axle(),
            max_fifth_wheel_m: ot.max_fifth_wheel(),
            max_trailer_axle_m: ot.max_trailer_axle(),
            rms_trailer_axle_m: rms(&ot.trailer_axle_m),
        }
    }
}

impl RunSummary {
    pub fn new(log: &RunLog, off_tracking: &OffTracking, params: &TruckParams) -> Self {
        let last = log.samples.last();
        let front = log.front_states(params.a1);
        let final_front = front.last();

        RunSummary {
            controller: log.controller.clone(),
            steps: log.samples.len(),
            duration_s: last.map_or(0.0, |s| s.time),
            final_x: final_front.map_or(0.0, |s| s.x),
            final_y: final_front.map_or(0.0, |s| s.y),
            final_articulation_rad: last.map_or(0.0, |s| s.heading2 - s.heading1),
            max_cross_track_m: log.max_cross_track(),
            rms_cross_track_m: log.rms_cross_track(),
            saturated_steps: log.saturated_steps,
            off_tracking: off_tracking.into(),
        }
    }
}

/// Write run summary as pretty JSON.
pub fn write_summary<W: Write>(writer: W, summary: &RunSummary) -> serde_json::Result<()> {
    serde_json::to_writer_pretty(writer, summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::Sample;

    fn sample(time: f64, x: f64, cross: f64) -> Sample {
        Sample {
            time,
            x,
            y: 0.0,
            delta: 0.0,
            heading1: 0.0,
            heading2: 0.01,
            velocity: 10.0,
            steer_angle: 0.0,
            cross_track_m: cross,
            heading_error_rad: 0.0,
        }
    }

    #[test]
    fn summary_serialises() {
        let params = TruckParams::default();
        let log = RunLog {
            controller: "Stanley".into(),
            samples: vec![sample(0.02, 0.2, 0.1), sample(0.04, 0.4, -0.3)],
            saturated_steps: 1,
            at_front: true,
        };
        let ot = OffTracking {
            front_axle_m: vec![0.1, 0.3],
            fifth_wheel_m: vec![0.2, 0.4],
            trailer_axle_m: vec![0.5, 0.5],
        };
        let summary = RunSummary::new(&log, &ot, &params);
        assert_eq!(summary.steps, 2);
        assert_eq!(summary.final_x, 0.4);
        assert!((summary.max_cross_track_m - 0.3).abs() < 1e-12);

        let mut buf = Vec::new();
        write_summary(&mut buf, &summary).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(parsed["controller"], "Stanley");
        assert_eq!(parsed["saturated_steps"], 1);
        assert_eq!(parsed["off_tracking"]["max_trailer_axle_m"], 0.5);
    }
}
