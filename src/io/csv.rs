use std::io::{Read, Write};
use std::path::Path;

use log::info;
use serde::Deserialize;

use crate::path::{PathError, ReferencePath};
use crate::sim::Sample;

/// Steering-wheel to steer-tire angle ratio of the recorded tractor.
pub const STEERING_RATIO: f64 = 20.0;

// ---------------------------------------------------------------------------
// Reference paths
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct PathRow {
    t: f64,
    x: f64,
    y: f64,
    velocity: f64,
    #[serde(default)]
    steer_angle: Option<f64>,
}

/// Read a headered `t,x,y,velocity[,steer_angle]` CSV.
///
/// The steer column is kept only when every row carries a value.
pub fn read_reference_path<R: Read>(reader: R) -> Result<ReferencePath, PathError> {
    let mut rdr = ::csv::ReaderBuilder::new().trim(::csv::Trim::All).from_reader(reader);

    let (mut t, mut x, mut y, mut velocity) = (vec![], vec![], vec![], vec![]);
    let mut steer = Vec::new();
    for row in rdr.deserialize() {
        let row: PathRow = row?;
        t.push(row.t);
        x.push(row.x);
        y.push(row.y);
        velocity.push(row.velocity);
        steer.push(row.steer_angle);
    }

    let steer_angle = steer.iter().cloned().collect::<Option<Vec<f64>>>();
    ReferencePath::new(t, x, y, velocity, steer_angle)
}

pub fn read_reference_path_file<P: AsRef<Path>>(path: P) -> Result<ReferencePath, PathError> {
    let file = std::fs::File::open(path.as_ref()).map_err(::csv::Error::from)?;
    let p = read_reference_path(file)?;
    info!("Loaded {} path points from {:?}", p.len(), path.as_ref());
    Ok(p)
}

// Column layout of the multibody (Simpack) export
const COL_TIME: usize = 0;
const COL_VELOCITY: usize = 1;
const COL_STEER_WHEEL: usize = 3;
const COL_X_FRONT_LEFT: usize = 4;
const COL_X_FRONT_RIGHT: usize = 5;
const COL_Y_FRONT_LEFT: usize = 18;
const COL_Y_FRONT_RIGHT: usize = 19;

/// Read a multibody export: time, speed, steering-wheel angle and the
/// left/right front wheel positions, whose midpoint is the front-axle path.
pub fn read_simpack_export<R: Read>(reader: R, steering_ratio: f64) -> Result<ReferencePath, PathError> {
    let mut rdr = ::csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(::csv::Trim::All)
        .from_reader(reader);

    let (mut t, mut x, mut y, mut velocity, mut steer) = (vec![], vec![], vec![], vec![], vec![]);
    for (row, record) in rdr.records().enumerate() {
        let record = record?;
        let col = |column: usize| -> Result<f64, PathError> {
            let value = record
                .get(column)
                .ok_or(PathError::MissingColumn { row, column })?;
            value.parse::<f64>().map_err(|_| PathError::BadNumber {
                row,
                column,
                value: value.to_string(),
            })
        };

        t.push(col(COL_TIME)?);
        velocity.push(col(COL_VELOCITY)?);
        steer.push(col(COL_STEER_WHEEL)? / steering_ratio);
        x.push((col(COL_X_FRONT_LEFT)? + col(COL_X_FRONT_RIGHT)?) / 2.0);
        y.push((col(COL_Y_FRONT_LEFT)? + col(COL_Y_FRONT_RIGHT)?) / 2.0);
    }

    ReferencePath::new(t, x, y, velocity, Some(steer))
}

pub fn read_simpack_export_file<P: AsRef<Path>>(path: P, steering_ratio: f64) -> Result<ReferencePath, PathError> {
    let file = std::fs::File::open(path.as_ref()).map_err(::csv::Error::from)?;
    let p = read_simpack_export(file, steering_ratio)?;
    info!("Loaded {} samples from multibody export {:?}", p.len(), path.as_ref());
    Ok(p)
}

// ---------------------------------------------------------------------------
// Trajectory output
// ---------------------------------------------------------------------------

/// Write simulated samples as CSV.
///
/// Columns: time, x, y, delta, heading1, heading2, velocity, steer_angle,
///          cross_track_m, heading_error_rad
pub fn write_trajectory<W: Write>(writer: W, samples: &[Sample]) -> Result<(), ::csv::Error> {
    let mut wtr = ::csv::Writer::from_writer(writer);
    for s in samples {
        wtr.serialize(s)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write trajectory to a CSV file at the given path.
pub fn write_trajectory_file<P: AsRef<Path>>(path: P, samples: &[Sample]) -> Result<(), ::csv::Error> {
    let file = std::fs::File::create(path)?;
    write_trajectory(file, samples)
}
