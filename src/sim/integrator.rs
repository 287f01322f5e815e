use nalgebra::SVector;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Integrator configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Solver {
    /// Adaptive Dormand-Prince 5(4) with error control.
    DormandPrince,
    /// Classical RK4 with a fixed number of substeps per call.
    Rk4 { substeps: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegratorConfig {
    pub solver: Solver,
    pub rtol: f64,
    pub atol: f64,
    pub max_steps: usize,
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        Self {
            solver: Solver::DormandPrince,
            rtol: 1e-6,
            atol: 1e-8,
            max_steps: 10_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IntegrationError {
    #[error("Step size underflow at t = {t}: h = {h:e}")]
    StepSizeUnderflow { t: f64, h: f64 },

    #[error("Exceeded {steps} internal steps before reaching the end of the interval (t = {t})")]
    MaxStepsExceeded { t: f64, steps: usize },

    #[error("State or derivative became non-finite at t = {t}")]
    NonFinite { t: f64 },
}

// ---------------------------------------------------------------------------
// Dormand-Prince 5(4) tableau
// ---------------------------------------------------------------------------

const C2: f64 = 1.0 / 5.0;
const C3: f64 = 3.0 / 10.0;
const C4: f64 = 4.0 / 5.0;
const C5: f64 = 8.0 / 9.0;

const A21: f64 = 1.0 / 5.0;
const A31: f64 = 3.0 / 40.0;
const A32: f64 = 9.0 / 40.0;
const A41: f64 = 44.0 / 45.0;
const A42: f64 = -56.0 / 15.0;
const A43: f64 = 32.0 / 9.0;
const A51: f64 = 19372.0 / 6561.0;
const A52: f64 = -25360.0 / 2187.0;
const A53: f64 = 64448.0 / 6561.0;
const A54: f64 = -212.0 / 729.0;
const A61: f64 = 9017.0 / 3168.0;
const A62: f64 = -355.0 / 33.0;
const A63: f64 = 46732.0 / 5247.0;
const A64: f64 = 49.0 / 176.0;
const A65: f64 = -5103.0 / 18656.0;

// 5th-order weights (also row 7 of the tableau: FSAL)
const B1: f64 = 35.0 / 384.0;
const B3: f64 = 500.0 / 1113.0;
const B4: f64 = 125.0 / 192.0;
const B5: f64 = -2187.0 / 6784.0;
const B6: f64 = 11.0 / 84.0;

// 5th minus embedded 4th-order weights
const E1: f64 = 71.0 / 57600.0;
const E3: f64 = -71.0 / 16695.0;
const E4: f64 = 71.0 / 1920.0;
const E5: f64 = -17253.0 / 339200.0;
const E6: f64 = 22.0 / 525.0;
const E7: f64 = -1.0 / 40.0;

const SAFETY: f64 = 0.9;
const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 5.0;

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Integrate `dy/dt = f(t, y)` from `t0` to `t1` (`t1 >= t0`) and return
/// `y(t1)`.
pub fn integrate<const N: usize, F>(
    f: &F,
    t0: f64,
    t1: f64,
    y0: &SVector<f64, N>,
    config: &IntegratorConfig,
) -> Result<SVector<f64, N>, IntegrationError>
where
    F: Fn(f64, &SVector<f64, N>) -> SVector<f64, N>,
{
    if !is_finite(y0) {
        return Err(IntegrationError::NonFinite { t: t0 });
    }
    if t1 <= t0 {
        return Ok(*y0);
    }

    match config.solver {
        Solver::DormandPrince => dormand_prince(f, t0, t1, y0, config),
        Solver::Rk4 { substeps } => {
            let n = substeps.max(1);
            let h = (t1 - t0) / n as f64;
            let mut y = *y0;
            for i in 0..n {
                y = rk4_step(f, t0 + i as f64 * h, &y, h);
            }
            if is_finite(&y) {
                Ok(y)
            } else {
                Err(IntegrationError::NonFinite { t: t1 })
            }
        }
    }
}

/// Single classical RK4 step.
pub fn rk4_step<const N: usize, F>(f: &F, t: f64, y: &SVector<f64, N>, h: f64) -> SVector<f64, N>
where
    F: Fn(f64, &SVector<f64, N>) -> SVector<f64, N>,
{
    let k1 = f(t, y);
    let k2 = f(t + h * 0.5, &(y + k1 * (h * 0.5)));
    let k3 = f(t + h * 0.5, &(y + k2 * (h * 0.5)));
    let k4 = f(t + h, &(y + k3 * h));

    y + (k1 + 2.0 * k2 + 2.0 * k3 + k4) * (h / 6.0)
}

// ---------------------------------------------------------------------------
// Adaptive Dormand-Prince
// ---------------------------------------------------------------------------

fn dormand_prince<const N: usize, F>(
    f: &F,
    t0: f64,
    t1: f64,
    y0: &SVector<f64, N>,
    config: &IntegratorConfig,
) -> Result<SVector<f64, N>, IntegrationError>
where
    F: Fn(f64, &SVector<f64, N>) -> SVector<f64, N>,
{
    let mut t = t0;
    let mut y = *y0;
    let mut h = t1 - t0;
    let mut k1 = f(t, &y);
    if !is_finite(&k1) {
        return Err(IntegrationError::NonFinite { t });
    }

    let mut steps = 0;
    while t < t1 {
        if steps >= config.max_steps {
            return Err(IntegrationError::MaxStepsExceeded { t, steps });
        }
        steps += 1;

        let remaining = t1 - t;
        let last = h >= remaining;
        let h_step = if last { remaining } else { h };
        if h_step <= 16.0 * f64::EPSILON * t.abs().max(1.0) {
            return Err(IntegrationError::StepSizeUnderflow { t, h: h_step });
        }

        let k2 = f(t + C2 * h_step, &(y + k1 * (A21 * h_step)));
        let k3 = f(t + C3 * h_step, &(y + (k1 * A31 + k2 * A32) * h_step));
        let k4 = f(t + C4 * h_step, &(y + (k1 * A41 + k2 * A42 + k3 * A43) * h_step));
        let k5 = f(
            t + C5 * h_step,
            &(y + (k1 * A51 + k2 * A52 + k3 * A53 + k4 * A54) * h_step),
        );
        let k6 = f(
            t + h_step,
            &(y + (k1 * A61 + k2 * A62 + k3 * A63 + k4 * A64 + k5 * A65) * h_step),
        );
        let y_new = y + (k1 * B1 + k3 * B3 + k4 * B4 + k5 * B5 + k6 * B6) * h_step;
        let k7 = f(t + h_step, &y_new);

        let err_vec = (k1 * E1 + k3 * E3 + k4 * E4 + k5 * E5 + k6 * E6 + k7 * E7) * h_step;
        let err = error_norm(&err_vec, &y, &y_new, config);

        if !err.is_finite() || !is_finite(&y_new) || !is_finite(&k7) {
            // Treat as a hard rejection; repeated failures end in underflow
            h = h_step * MIN_FACTOR;
            continue;
        }

        let accepted = err <= 1.0;
        if accepted {
            t = if last { t1 } else { t + h_step };
            y = y_new;
            k1 = k7;
        }

        let mut factor = if err == 0.0 {
            MAX_FACTOR
        } else {
            (SAFETY * err.powf(-0.2)).clamp(MIN_FACTOR, MAX_FACTOR)
        };
        if !accepted {
            factor = factor.min(1.0);
        }
        h = h_step * factor;
    }

    Ok(y)
}

/// RMS of the local error scaled by the mixed absolute/relative tolerance.
fn error_norm<const N: usize>(
    err: &SVector<f64, N>,
    y: &SVector<f64, N>,
    y_new: &SVector<f64, N>,
    config: &IntegratorConfig,
) -> f64 {
    let sum: f64 = (0..N)
        .map(|i| {
            let scale = config.atol + config.rtol * y[i].abs().max(y_new[i].abs());
            (err[i] / scale).powi(2)
        })
        .sum();
    (sum / N as f64).sqrt()
}

fn is_finite<const N: usize>(v: &SVector<f64, N>) -> bool {
    v.iter().all(|x| x.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Vector1, Vector2};

    #[test]
    fn exponential_decay() {
        let f = |_t: f64, y: &Vector1<f64>| -*y;
        let y = integrate(&f, 0.0, 2.0, &Vector1::new(1.0), &IntegratorConfig::default()).unwrap();
        assert_relative_eq!(y[0], (-2.0_f64).exp(), max_relative = 1e-5);
    }

    #[test]
    fn harmonic_oscillator_full_period() {
        let f = |_t: f64, y: &Vector2<f64>| Vector2::new(y[1], -y[0]);
        let period = 2.0 * std::f64::consts::PI;
        let y = integrate(&f, 0.0, period, &Vector2::new(1.0, 0.0), &IntegratorConfig::default())
            .unwrap();
        assert!((y[0] - 1.0).abs() < 1e-5, "x = {}", y[0]);
        assert!(y[1].abs() < 1e-5, "v = {}", y[1]);
    }

    #[test]
    fn time_dependent_rhs() {
        // y' = 2t → y = t^2
        let f = |t: f64, _y: &Vector1<f64>| Vector1::new(2.0 * t);
        let y = integrate(&f, 1.0, 3.0, &Vector1::new(1.0), &IntegratorConfig::default()).unwrap();
        assert_relative_eq!(y[0], 9.0, max_relative = 1e-9);
    }

    #[test]
    fn rk4_substeps_match_adaptive() {
        let f = |_t: f64, y: &Vector2<f64>| Vector2::new(y[1], -4.0 * y[0] - 0.5 * y[1]);
        let y0 = Vector2::new(1.0, 0.0);
        let adaptive = integrate(&f, 0.0, 0.5, &y0, &IntegratorConfig::default()).unwrap();
        let config = IntegratorConfig {
            solver: Solver::Rk4 { substeps: 50 },
            ..Default::default()
        };
        let fixed = integrate(&f, 0.0, 0.5, &y0, &config).unwrap();
        assert_relative_eq!(adaptive, fixed, epsilon = 1e-6);
    }

    #[test]
    fn empty_interval_returns_initial_state() {
        let f = |_t: f64, y: &Vector1<f64>| -*y;
        let y = integrate(&f, 1.0, 1.0, &Vector1::new(3.0), &IntegratorConfig::default()).unwrap();
        assert_eq!(y[0], 3.0);
    }

    #[test]
    fn step_budget_exhausted() {
        // Very stiff decay forces many tiny explicit steps
        let f = |_t: f64, y: &Vector1<f64>| *y * -1.0e6;
        let config = IntegratorConfig { max_steps: 5, ..Default::default() };
        let err = integrate(&f, 0.0, 1.0, &Vector1::new(1.0), &config).unwrap_err();
        assert!(matches!(err, IntegrationError::MaxStepsExceeded { steps: 5, .. }));
    }

    #[test]
    fn nan_initial_state_rejected() {
        let f = |_t: f64, y: &Vector1<f64>| -*y;
        let err = integrate(&f, 0.0, 1.0, &Vector1::new(f64::NAN), &IntegratorConfig::default())
            .unwrap_err();
        assert_eq!(err, IntegrationError::NonFinite { t: 0.0 });
    }
}
