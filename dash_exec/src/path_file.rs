//! # Path files
//!
//! Paths are exchanged as CSV files with a `row,col` header, one waypoint per line, the same
//! layout the server keeps its own path in.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::path_model::Waypoint;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct PathRecord {
    #[serde(alias = "r")]
    row: i32,

    #[serde(alias = "c")]
    col: i32,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PathFileError {
    #[error("Could not open the path file: {0}")]
    OpenError(csv::Error),

    #[error("Invalid record on line {line}: {error}")]
    InvalidRecord { line: u64, error: csv::Error },

    #[error("Could not write the path file: {0}")]
    WriteError(csv::Error),

    #[error("Could not flush the path file: {0}")]
    FlushError(std::io::Error),
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Read a path from a CSV file.
pub fn read_path<P: AsRef<Path>>(path: P) -> Result<Vec<Waypoint>, PathFileError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(PathFileError::OpenError)?;

    let mut waypoints = vec![];

    for result in reader.deserialize::<PathRecord>() {
        let record = result.map_err(|error| PathFileError::InvalidRecord {
            line: error.position().map(|p| p.line()).unwrap_or(0),
            error,
        })?;

        waypoints.push(Waypoint::new(record.col as f64, record.row as f64));
    }

    Ok(waypoints)
}

/// Write a path to a CSV file, positions are rounded to the nearest cell.
pub fn write_path<P: AsRef<Path>>(path: P, waypoints: &[Waypoint]) -> Result<(), PathFileError> {
    let mut writer = csv::Writer::from_path(path).map_err(PathFileError::WriteError)?;

    for w in waypoints {
        writer
            .serialize(PathRecord {
                row: w.y.round() as i32,
                col: w.x.round() as i32,
            })
            .map_err(PathFileError::WriteError)?;
    }

    writer.flush().map_err(PathFileError::FlushError)
}
