//! # Path model
//!
//! The operator's path is an ordered sequence of waypoints in grid space, the order of the
//! sequence being the order the robot traverses them in. Waypoints may coincide.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A point of the path in grid space, `x` is the column and `y` the row.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Waypoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathModel {
    waypoints: Vec<Waypoint>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum PathError {
    #[error("Waypoint index {index} is out of range, the path has {len} waypoints")]
    IndexOutOfRange { index: usize, len: usize },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Waypoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl std::fmt::Display for Waypoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(x: {}, y: {})", self.x, self.y)
    }
}

impl PathModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, waypoint: Waypoint) {
        self.waypoints.push(waypoint);
    }

    /// Replace the waypoint at `index`, returning the previous value.
    pub fn move_at(&mut self, index: usize, waypoint: Waypoint) -> Result<Waypoint, PathError> {
        let len = self.waypoints.len();

        match self.waypoints.get_mut(index) {
            Some(w) => Ok(std::mem::replace(w, waypoint)),
            None => Err(PathError::IndexOutOfRange { index, len }),
        }
    }

    /// Remove the waypoint at `index`, later waypoints shift down by one.
    pub fn remove_at(&mut self, index: usize) -> Result<Waypoint, PathError> {
        if index < self.waypoints.len() {
            Ok(self.waypoints.remove(index))
        } else {
            Err(PathError::IndexOutOfRange {
                index,
                len: self.waypoints.len(),
            })
        }
    }

    pub fn clear(&mut self) {
        self.waypoints.clear();
    }

    pub fn replace_all(&mut self, waypoints: Vec<Waypoint>) {
        self.waypoints = waypoints;
    }

    pub fn get(&self, index: usize) -> Option<&Waypoint> {
        self.waypoints.get(index)
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn path(points: &[(f64, f64)]) -> PathModel {
        let mut p = PathModel::new();
        for (x, y) in points {
            p.append(Waypoint::new(*x, *y));
        }
        p
    }

    #[test]
    fn test_move_in_place() {
        let mut p = path(&[(0.0, 0.0), (5.0, 5.0), (10.0, 10.0)]);

        let prev = p.move_at(1, Waypoint::new(6.0, 6.0)).unwrap();

        assert_eq!(prev, Waypoint::new(5.0, 5.0));
        assert_eq!(
            p.waypoints(),
            &[
                Waypoint::new(0.0, 0.0),
                Waypoint::new(6.0, 6.0),
                Waypoint::new(10.0, 10.0)
            ]
        );
    }

    #[test]
    fn test_remove_shifts_indices() {
        let mut p = path(&[(0.0, 0.0), (5.0, 5.0), (10.0, 10.0)]);

        assert_eq!(p.remove_at(0).unwrap(), Waypoint::new(0.0, 0.0));
        assert_eq!(p.len(), 2);
        assert_eq!(p.get(0), Some(&Waypoint::new(5.0, 5.0)));
        assert_eq!(p.get(1), Some(&Waypoint::new(10.0, 10.0)));
    }

    #[test]
    fn test_index_out_of_range() {
        let mut p = path(&[(1.0, 1.0)]);

        assert_eq!(
            p.move_at(1, Waypoint::default()),
            Err(PathError::IndexOutOfRange { index: 1, len: 1 })
        );
        assert_eq!(
            p.remove_at(3),
            Err(PathError::IndexOutOfRange { index: 3, len: 1 })
        );
        assert_eq!(p.waypoints(), &[Waypoint::new(1.0, 1.0)]);
    }

    #[test]
    fn test_replace_all_and_clear() {
        let mut p = path(&[(0.0, 0.0), (4.0, 4.0)]);

        p.replace_all(vec![Waypoint::new(1.0, 2.0)]);
        assert_eq!(p.waypoints(), &[Waypoint::new(1.0, 2.0)]);

        p.replace_all(vec![]);
        assert!(p.is_empty());

        // Coincident waypoints are kept
        p.append(Waypoint::new(3.0, 3.0));
        p.append(Waypoint::new(3.0, 3.0));
        assert_eq!(p.len(), 2);

        p.clear();
        assert!(p.is_empty());
    }
}
