//! Off-tracking of the combination relative to its reference path.

use nalgebra::Point2;
use serde::Serialize;

use crate::dynamics::geometry::AxlePoints;
use crate::dynamics::params::TruckParams;
use crate::dynamics::state::WorldState;
use crate::path::ReferencePath;

/// Per-sample minimum distance of three tracked points to the path, in m.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OffTracking {
    pub front_axle_m: Vec<f64>,
    pub fifth_wheel_m: Vec<f64>,
    pub trailer_axle_m: Vec<f64>,
}

impl OffTracking {
    pub fn max_front_axle(&self) -> f64 {
        max(&self.front_axle_m)
    }

    pub fn max_fifth_wheel(&self) -> f64 {
        max(&self.fifth_wheel_m)
    }

    pub fn max_trailer_axle(&self) -> f64 {
        max(&self.trailer_axle_m)
    }
}

/// Off-tracking of every state in `front_states` (world states referenced
/// at the front axle).
pub fn calc_off_tracking(
    front_states: &[WorldState],
    params: &TruckParams,
    path: &ReferencePath,
) -> OffTracking {
    let mut out = OffTracking::default();
    for s in front_states {
        let pts = AxlePoints::from_front_state(s, params);
        out.front_axle_m.push(distance_to_path(&pts.front_axle, path));
        out.fifth_wheel_m.push(distance_to_path(&pts.fifth_wheel, path));
        out.trailer_axle_m.push(distance_to_path(&pts.trailer_axle, path));
    }
    out
}

/// Shortest distance from `p` to the path polyline.
pub fn distance_to_path(p: &Point2<f64>, path: &ReferencePath) -> f64 {
    (0..path.len() - 1)
        .map(|i| distance_to_segment(p, &path.point(i), &path.point(i + 1)))
        .fold(f64::INFINITY, f64::min)
}

/// Distance from `p` to the segment `a`-`b`, clamped to its end points.
pub fn distance_to_segment(p: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>) -> f64 {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq == 0.0 {
        return (p - a).norm();
    }
    let s = ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    (p - (a + ab * s)).norm()
}

/// Root mean square of a series (0 for an empty one).
pub fn rms(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    (values.iter().map(|v| v * v).sum::<f64>() / values.len() as f64).sqrt()
}

fn max(values: &[f64]) -> f64 {
    values.iter().cloned().fold(0.0_f64, f64::max)
}
