//! # Progress animator
//!
//! Places a simulated agent along the path for a progress value between 0 and 100, and splits
//! the path into the part already travelled and the part remaining. The progress value is driven
//! either directly by the operator or by a [`Playback`] advancing it over time.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Serialize;
use util::maths::{clamp, lerp};

use crate::path_model::Waypoint;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

pub const PROGRESS_MAX: f64 = 100.0;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Render-ready state of the agent for one progress value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressFrame {
    /// Position of the agent in grid space
    pub position: Waypoint,

    /// Waypoints already passed, ending at the agent
    pub completed: Vec<Waypoint>,

    /// The agent followed by the waypoints still to come
    pub remaining: Vec<Waypoint>,
}

/// Automated advance of the progress value.
#[derive(Debug, Clone, PartialEq)]
pub struct Playback {
    running: bool,
    progress: f64,

    /// Time taken to go from 0 to 100
    duration_s: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Playback {
    pub fn new(duration_s: f64) -> Self {
        Self {
            running: false,
            progress: 0.0,
            duration_s,
        }
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Set the progress directly, as a slider would.
    pub fn set_progress(&mut self, progress: f64) {
        self.progress = clamp_progress(progress);
    }

    /// Start or resume, a finished playback starts again from 0.
    pub fn play(&mut self) {
        if self.progress >= PROGRESS_MAX {
            self.progress = 0.0;
        }
        self.running = true;
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    /// Halt and rewind to the start.
    pub fn stop(&mut self) {
        self.running = false;
        self.progress = 0.0;
    }

    /// Advance by `dt_s` seconds, returning `true` if the progress changed.
    pub fn step(&mut self, dt_s: f64) -> bool {
        if !self.running || dt_s <= 0.0 {
            return false;
        }

        if self.duration_s <= 0.0 {
            self.progress = PROGRESS_MAX;
        } else {
            self.progress = clamp_progress(self.progress + PROGRESS_MAX * dt_s / self.duration_s);
        }

        if self.progress >= PROGRESS_MAX {
            self.running = false;
        }

        true
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Compute the agent's position along `waypoints` at `progress`.
///
/// The progress is spread evenly over the segments of the path regardless of their length, so
/// that 50 on a three waypoint path is always the middle waypoint.
pub fn animate(waypoints: &[Waypoint], progress: f64) -> ProgressFrame {
    match waypoints.len() {
        0 => ProgressFrame {
            position: Waypoint::default(),
            completed: vec![],
            remaining: vec![],
        },
        1 => ProgressFrame {
            position: waypoints[0],
            completed: vec![],
            remaining: vec![],
        },
        len => {
            let segments = len - 1;
            let pos = clamp_progress(progress) / PROGRESS_MAX * segments as f64;

            let index = (pos.floor() as usize).min(segments - 1);
            let t = pos - index as f64;

            let w0 = waypoints[index];
            let w1 = waypoints[index + 1];
            let position = Waypoint::new(lerp(w0.x, w1.x, t), lerp(w0.y, w1.y, t));

            let mut completed = waypoints[..=index].to_vec();
            completed.push(position);

            let mut remaining = vec![position];
            remaining.extend_from_slice(&waypoints[index + 1..]);

            ProgressFrame {
                position,
                completed,
                remaining,
            }
        }
    }
}

fn clamp_progress(progress: f64) -> f64 {
    if progress.is_nan() {
        0.0
    } else {
        clamp(&progress, &0.0, &PROGRESS_MAX)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn l_path() -> Vec<Waypoint> {
        vec![
            Waypoint::new(0.0, 0.0),
            Waypoint::new(10.0, 0.0),
            Waypoint::new(10.0, 10.0),
        ]
    }

    #[test]
    fn test_interpolation_boundaries() {
        let path = l_path();

        assert_eq!(animate(&path, 0.0).position, Waypoint::new(0.0, 0.0));
        assert_eq!(animate(&path, 25.0).position, Waypoint::new(5.0, 0.0));
        assert_eq!(animate(&path, 50.0).position, Waypoint::new(10.0, 0.0));
        assert_eq!(animate(&path, 100.0).position, Waypoint::new(10.0, 10.0));

        // Out of range values are clamped
        assert_eq!(animate(&path, -20.0).position, Waypoint::new(0.0, 0.0));
        assert_eq!(animate(&path, 180.0).position, Waypoint::new(10.0, 10.0));
    }

    #[test]
    fn test_polyline_split() {
        let path = l_path();

        let frame = animate(&path, 75.0);
        assert_eq!(frame.position, Waypoint::new(10.0, 5.0));
        assert_eq!(
            frame.completed,
            vec![
                Waypoint::new(0.0, 0.0),
                Waypoint::new(10.0, 0.0),
                Waypoint::new(10.0, 5.0)
            ]
        );
        assert_eq!(
            frame.remaining,
            vec![Waypoint::new(10.0, 5.0), Waypoint::new(10.0, 10.0)]
        );

        // At the end the whole path is completed
        let frame = animate(&path, 100.0);
        assert_eq!(frame.completed.len(), 3);
        assert_eq!(frame.remaining, vec![frame.position, path[2]]);
    }

    #[test]
    fn test_short_paths() {
        let empty = animate(&[], 40.0);
        assert_eq!(empty.position, Waypoint::new(0.0, 0.0));
        assert!(empty.completed.is_empty() && empty.remaining.is_empty());

        let single = animate(&[Waypoint::new(3.0, 4.0)], 40.0);
        assert_eq!(single.position, Waypoint::new(3.0, 4.0));
        assert!(single.completed.is_empty() && single.remaining.is_empty());
    }

    #[test]
    fn test_animate_idempotent() {
        let path = l_path();
        assert_eq!(animate(&path, 33.3), animate(&path, 33.3));
    }

    #[test]
    fn test_playback() {
        let mut pb = Playback::new(10.0);

        // Nothing happens until played
        assert!(!pb.step(1.0));
        assert_eq!(pb.progress(), 0.0);

        pb.play();
        assert!(pb.step(2.5));
        assert!((pb.progress() - 25.0).abs() < 1e-9);

        pb.pause();
        assert!(!pb.step(1.0));

        pb.play();
        pb.step(100.0);
        assert_eq!(pb.progress(), PROGRESS_MAX);
        assert!(!pb.is_running());

        // Replaying a finished playback restarts it
        pb.play();
        assert_eq!(pb.progress(), 0.0);

        pb.set_progress(60.0);
        pb.stop();
        assert_eq!(pb.progress(), 0.0);
        assert!(!pb.is_running());
    }
}
