//! # Grid model
//!
//! Owns the calibration points and the obstacle cells, and derives the [`GridBounds`] used by the
//! coordinate transform.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::{BTreeMap, BTreeSet};

use log::warn;
use nalgebra::Point2;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::coord_tf::GridBounds;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Known pixel position of one grid intersection, in the image frame (y up).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPoint {
    pub row: i32,
    pub col: i32,
    pub x: f64,
    pub y: f64,
}

/// A blocked grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObstacleCell {
    pub row: i32,
    pub col: i32,
}

#[derive(Debug, Default, Clone)]
pub struct GridModel {
    /// Calibration points keyed by `(row, col)`
    points: BTreeMap<(i32, i32), CalibrationPoint>,

    obstacles: BTreeSet<ObstacleCell>,

    bounds: Option<GridBounds>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum GridError {
    #[error("The calibration set is empty")]
    EmptySet,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ObstacleCell {
    pub fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }
}

impl GridModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the calibration set and recompute the bounds.
    ///
    /// Returns the number of points kept. If more than one point is given for the same
    /// `(row, col)` only the first is kept. An empty set clears the model's calibration and
    /// leaves the bounds undefined.
    pub fn load_calibration(&mut self, points: Vec<CalibrationPoint>) -> Result<usize, GridError> {
        let mut new_points = BTreeMap::new();
        let mut num_dupes = 0;

        for p in points {
            if new_points.contains_key(&(p.row, p.col)) {
                num_dupes += 1;
            } else {
                new_points.insert((p.row, p.col), p);
            }
        }

        if num_dupes > 0 {
            warn!(
                "{} duplicate calibration points were discarded, the first of each was kept",
                num_dupes
            );
        }

        self.bounds = derive_bounds(new_points.values());
        self.points = new_points;

        if self.points.is_empty() {
            Err(GridError::EmptySet)
        } else {
            Ok(self.points.len())
        }
    }

    /// The bounds of the current calibration set, if there is one.
    ///
    /// The bounds may still be degenerate, see [`GridBounds::is_defined`].
    pub fn bounds(&self) -> Option<GridBounds> {
        self.bounds
    }

    pub fn num_calibration_points(&self) -> usize {
        self.points.len()
    }

    pub fn calibration_point(&self, row: i32, col: i32) -> Option<&CalibrationPoint> {
        self.points.get(&(row, col))
    }

    /// The calibration point closest to the given image frame position.
    ///
    /// Ties go to the lowest row, then the lowest column.
    pub fn nearest_calibration_point(&self, img: &Point2<f64>) -> Option<&CalibrationPoint> {
        self.points.values().min_by_key(|p| {
            (
                OrderedFloat((p.x - img.x).powi(2) + (p.y - img.y).powi(2)),
                p.row,
                p.col,
            )
        })
    }

    pub fn is_obstacle(&self, row: i32, col: i32) -> bool {
        self.obstacles.contains(&ObstacleCell::new(row, col))
    }

    /// Flip the state of a cell, returning `true` if it is now an obstacle.
    pub fn toggle_obstacle(&mut self, row: i32, col: i32) -> bool {
        let cell = ObstacleCell::new(row, col);

        if self.obstacles.remove(&cell) {
            false
        } else {
            self.obstacles.insert(cell);
            true
        }
    }

    /// Replace the whole obstacle set, duplicates collapse.
    pub fn replace_obstacles<I: IntoIterator<Item = ObstacleCell>>(&mut self, cells: I) {
        self.obstacles = cells.into_iter().collect();
    }

    /// Obstacles in `(row, col)` order.
    pub fn obstacles(&self) -> impl Iterator<Item = &ObstacleCell> {
        self.obstacles.iter()
    }

    pub fn num_obstacles(&self) -> usize {
        self.obstacles.len()
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn derive_bounds<'a, I>(points: I) -> Option<GridBounds>
where
    I: Iterator<Item = &'a CalibrationPoint>,
{
    points.fold(None, |acc: Option<GridBounds>, p| {
        Some(match acc {
            None => GridBounds {
                min_px_x: p.x,
                max_px_x: p.x,
                min_px_y: p.y,
                max_px_y: p.y,
                max_row: p.row,
                max_col: p.col,
            },
            Some(b) => GridBounds {
                min_px_x: b.min_px_x.min(p.x),
                max_px_x: b.max_px_x.max(p.x),
                min_px_y: b.min_px_y.min(p.y),
                max_px_y: b.max_px_y.max(p.y),
                max_row: b.max_row.max(p.row),
                max_col: b.max_col.max(p.col),
            },
        })
    })
}
