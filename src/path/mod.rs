//! # Reference paths
//!
//! Sampled paths the vehicle should follow, either recorded from a
//! multibody reference run or produced by [`random::RandomPathGenerator`].

pub mod random;

use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

pub use random::{RandomPathGenerator, RandomPathParams};

use crate::dynamics::state::Control;

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("Cannot read the path CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Row {row} has no column {column}")]
    MissingColumn { row: usize, column: usize },

    #[error("Row {row}, column {column}: cannot parse {value:?} as a number")]
    BadNumber { row: usize, column: usize, value: String },

    #[error("Path columns have different lengths ({0})")]
    LengthMismatch(String),

    #[error("A path needs at least two points, found {0}")]
    TooFewPoints(usize),

    #[error("The path has no recorded steer angle to replay")]
    NoSteerAngle,

    #[error("Invalid random path settings: {0}")]
    InvalidGenerator(String),
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A time-stamped front-axle path with its reference speed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferencePath {
    pub t: Vec<f64>,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub velocity: Vec<f64>,

    /// Recorded steer tire angle, present for paths taken from a driven run.
    pub steer_angle: Option<Vec<f64>>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ReferencePath {
    pub fn new(
        t: Vec<f64>,
        x: Vec<f64>,
        y: Vec<f64>,
        velocity: Vec<f64>,
        steer_angle: Option<Vec<f64>>,
    ) -> Result<Self, PathError> {
        let n = t.len();
        let steer_len = steer_angle.as_ref().map_or(n, |s| s.len());
        if x.len() != n || y.len() != n || velocity.len() != n || steer_len != n {
            return Err(PathError::LengthMismatch(format!(
                "t: {}, x: {}, y: {}, velocity: {}, steer: {}",
                n,
                x.len(),
                y.len(),
                velocity.len(),
                steer_len
            )));
        }
        if n < 2 {
            return Err(PathError::TooFewPoints(n));
        }

        Ok(Self { t, x, y, velocity, steer_angle })
    }

    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    pub fn point(&self, i: usize) -> Point2<f64> {
        Point2::new(self.x[i], self.y[i])
    }

    /// Sample spacing of the first interval, used as the simulation step.
    pub fn timestep(&self) -> f64 {
        self.t[1] - self.t[0]
    }

    pub fn duration(&self) -> f64 {
        self.t[self.len() - 1] - self.t[0]
    }

    /// Heading of the segment leaving point `i` (the final point reuses the
    /// last segment).
    pub fn segment_heading(&self, i: usize) -> f64 {
        let d = self.tangent(i);
        d.y.atan2(d.x)
    }

    /// Unnormalized direction of the segment leaving point `i`.
    pub fn tangent(&self, i: usize) -> Vector2<f64> {
        let i = i.min(self.len() - 2);
        self.point(i + 1) - self.point(i)
    }

    /// Index of the point nearest to `p`, searching `window` points forward
    /// from `from`. A `window` of zero searches the whole path.
    pub fn nearest_index(&self, p: &Point2<f64>, from: usize, window: usize) -> usize {
        let (start, end) = if window == 0 {
            (0, self.len())
        } else {
            let start = from.min(self.len() - 1);
            (start, (start + window).min(self.len()))
        };

        (start..end)
            .map(|i| (i, (self.point(i) - p).norm_squared()))
            .fold((start, f64::INFINITY), |best, cur| if cur.1 < best.1 { cur } else { best })
            .0
    }

    /// Recorded control at sample `i`.
    pub fn recorded_control(&self, i: usize) -> Result<Control, PathError> {
        let steer = self.steer_angle.as_ref().ok_or(PathError::NoSteerAngle)?;
        Ok(Control::new(self.velocity[i], steer[i]))
    }

    /// Total arc length of the polyline, in m.
    pub fn length(&self) -> f64 {
        (1..self.len())
            .map(|i| (self.point(i) - self.point(i - 1)).norm())
            .sum()
    }
}
