use log::debug;
use nalgebra::Vector2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use super::{PathError, ReferencePath};

// ---------------------------------------------------------------------------
// Lateral acceleration envelope (m/s^2) as a function of speed (m/s)
// ---------------------------------------------------------------------------

const ACCEL_LIM_SPEED: [f64; 13] = [0.0, 1.0, 3.0, 5.0, 7.0, 11.0, 18.0, 23.0, 25.0, 27.0, 31.0, 33.0, 35.0];
const ACCEL_LIM_LAT: [f64; 13] = [0.0, 0.25, 1.3, 3.0, 4.5, 5.0, 5.2, 4.5, 4.6, 4.6, 4.2, 4.2, 4.0];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomPathParams {
    /// Duration of the path at constant speed, s
    pub end_time: f64,
    /// Sample spacing, s
    pub delta_t: f64,
    /// Constant speed, m/s. Drawn uniformly from [1, 31) when absent.
    pub velocity: Option<f64>,
    /// Seed for a reproducible path
    pub seed: Option<u64>,
    /// Standard deviation of the lateral jerk, m/s^3
    pub jerk_std_dev: f64,
}

impl Default for RandomPathParams {
    fn default() -> Self {
        Self {
            end_time: 20.0,
            delta_t: 0.02,
            velocity: None,
            seed: None,
            jerk_std_dev: 2.0,
        }
    }
}

/// Upper bound on generated path samples.
pub const MAX_POINTS: usize = 1_000_000;

/// Number of samples in `linspace(0, end_time)` at spacing `delta_t`.
fn sample_count(end_time: f64, delta_t: f64) -> Result<usize, PathError> {
    if !(end_time.is_finite() && end_time > 0.0) {
        return Err(PathError::InvalidGenerator(format!("end time {}", end_time)));
    }
    if !(delta_t.is_finite() && delta_t > 0.0) {
        return Err(PathError::InvalidGenerator(format!("sample spacing {}", delta_t)));
    }

    let intervals = (end_time / delta_t + 1e-9).floor();
    if intervals >= MAX_POINTS as f64 {
        return Err(PathError::InvalidGenerator(format!(
            "{} s at {} s spacing exceeds {} samples",
            end_time, delta_t, MAX_POINTS
        )));
    }

    let n = intervals as usize + 1;
    if n < 2 {
        return Err(PathError::TooFewPoints(n));
    }
    Ok(n)
}

/// Generates smooth random paths that a tractor-trailer can drive at
/// constant speed without exceeding a speed-dependent lateral acceleration.
pub struct RandomPathGenerator {
    rng: StdRng,
    jerk: Normal<f64>,
}

impl RandomPathGenerator {
    pub fn new(params: &RandomPathParams) -> Result<Self, PathError> {
        sample_count(params.end_time, params.delta_t)?;
        let jerk = Normal::new(0.0, params.jerk_std_dev)
            .map_err(|e| PathError::InvalidGenerator(format!("jerk deviation {}: {}", params.jerk_std_dev, e)))?;
        let rng = match params.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self { rng, jerk })
    }

    /// Lateral acceleration limit at the given speed (linear interpolation,
    /// held constant outside the table).
    pub fn lateral_accel_limit(speed: f64) -> f64 {
        interp(speed, &ACCEL_LIM_SPEED, &ACCEL_LIM_LAT)
    }

    /// Path starting at the origin heading along +x, travelled at constant
    /// speed over `[0, end_time]`.
    pub fn random_path(&mut self, end_time: f64, delta_t: f64, vel: Option<f64>) -> Result<ReferencePath, PathError> {
        let speed = vel.unwrap_or_else(|| 30.0 * self.rng.gen::<f64>() + 1.0);
        let n = sample_count(end_time, delta_t)?;

        let t: Vec<f64> = (0..n).map(|i| end_time * i as f64 / (n - 1) as f64).collect();
        let mut x = vec![0.0; n];
        let mut y = vec![0.0; n];

        let limit = Self::lateral_accel_limit(speed);
        let mut lat_accel = 0.0_f64;
        let mut vel_vec = Vector2::new(speed, 0.0);

        for i in 0..n - 1 {
            lat_accel += self.jerk.sample(&mut self.rng) * delta_t;
            lat_accel = lat_accel.clamp(-limit, limit);

            // Push the velocity sideways, then restore its magnitude
            let normal = Vector2::new(-vel_vec.y, vel_vec.x) / vel_vec.norm();
            vel_vec += normal * (lat_accel * delta_t);
            vel_vec *= speed / vel_vec.norm();

            x[i + 1] = x[i] + vel_vec.x * delta_t;
            y[i + 1] = y[i] + vel_vec.y * delta_t;
        }

        debug!(
            "Random path: {} points at {:.2} m/s, lateral accel limit {:.2} m/s^2",
            n, speed, limit
        );

        ReferencePath::new(t, x, y, vec![speed; n], None)
    }

    pub fn generate(&mut self, params: &RandomPathParams) -> Result<ReferencePath, PathError> {
        self.random_path(params.end_time, params.delta_t, params.velocity)
    }
}

fn interp(v: f64, xs: &[f64], ys: &[f64]) -> f64 {
    if v <= xs[0] {
        return ys[0];
    }
    for i in 1..xs.len() {
        if v <= xs[i] {
            let frac = (v - xs[i - 1]) / (xs[i] - xs[i - 1]);
            return ys[i - 1] + frac * (ys[i] - ys[i - 1]);
        }
    }
    ys[ys.len() - 1]
}
