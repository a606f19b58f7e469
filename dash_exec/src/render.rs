//! # Render scene
//!
//! Collects everything which has to be drawn over the field image, in viewport pixels. Obstacles
//! are drawn at their calibration point, the same point an obstacle click snaps to, so what is
//! shown is what would be toggled.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Point2;
use serde::Serialize;

use crate::{
    coord_tf::{self, TransformError},
    interaction::{EditMode, InteractionController},
    path_model::Waypoint,
    progress::ProgressFrame,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaypointMarker {
    pub index: usize,
    pub waypoint: Waypoint,
    pub pos: Point2<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObstacleMarker {
    pub row: i32,
    pub col: i32,
    pub pos: Point2<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scene {
    pub viewport_size: (f64, f64),

    pub mode: EditMode,

    pub waypoints: Vec<WaypointMarker>,

    pub obstacles: Vec<ObstacleMarker>,

    /// Travelled part of the path, ending at the agent
    pub completed: Vec<Point2<f64>>,

    /// Remaining part of the path, starting at the agent
    pub remaining: Vec<Point2<f64>>,

    /// The simulated agent, absent when there is no path
    pub agent: Option<Point2<f64>>,

    /// Path the robot reports it is executing
    pub planned: Vec<Point2<f64>>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Scene {
    /// Build the scene for the controller's current state.
    ///
    /// Fails with `BoundsUndefined` if the grid can't be placed on the image yet.
    pub fn build(
        ctrl: &InteractionController,
        progress: &ProgressFrame,
        planned: &[Waypoint],
    ) -> Result<Self, TransformError> {
        let frame = ctrl.frame();
        let bounds = ctrl.bounds()?;
        let to_px = |w: &Waypoint| coord_tf::grid_to_pixel(w.x, w.y, &frame, &bounds);
        let to_px_all = |ws: &[Waypoint]| ws.iter().map(to_px).collect::<Result<Vec<_>, _>>();

        let waypoints = ctrl
            .path()
            .waypoints()
            .iter()
            .enumerate()
            .map(|(index, w)| {
                Ok(WaypointMarker {
                    index,
                    waypoint: *w,
                    pos: to_px(w)?,
                })
            })
            .collect::<Result<Vec<_>, TransformError>>()?;

        let obstacles = ctrl
            .grid()
            .obstacles()
            .map(|o| {
                let pos = match ctrl.grid().calibration_point(o.row, o.col) {
                    Some(p) => coord_tf::image_to_viewport(&Point2::new(p.x, p.y), &frame)?,
                    None => coord_tf::grid_to_pixel(o.col as f64, o.row as f64, &frame, &bounds)?,
                };

                Ok(ObstacleMarker {
                    row: o.row,
                    col: o.col,
                    pos,
                })
            })
            .collect::<Result<Vec<_>, TransformError>>()?;

        let agent = if ctrl.path().is_empty() {
            None
        } else {
            Some(to_px(&progress.position)?)
        };

        Ok(Self {
            viewport_size: (frame.viewport_width, frame.viewport_height),
            mode: ctrl.mode(),
            waypoints,
            obstacles,
            completed: to_px_all(&progress.completed)?,
            remaining: to_px_all(&progress.remaining)?,
            agent,
            planned: to_px_all(planned)?,
        })
    }
}

impl std::fmt::Display for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Viewport {:.0} x {:.0} px, {} mode",
            self.viewport_size.0, self.viewport_size.1, self.mode
        )?;

        writeln!(f, "Waypoints ({}):", self.waypoints.len())?;
        for m in &self.waypoints {
            writeln!(
                f,
                "  [{}] {} at ({:.1}, {:.1}) px",
                m.index, m.waypoint, m.pos.x, m.pos.y
            )?;
        }

        writeln!(f, "Obstacles ({}):", self.obstacles.len())?;
        for o in &self.obstacles {
            writeln!(
                f,
                "  r{} c{} at ({:.1}, {:.1}) px",
                o.row, o.col, o.pos.x, o.pos.y
            )?;
        }

        match self.agent {
            Some(a) => writeln!(f, "Agent at ({:.1}, {:.1}) px", a.x, a.y)?,
            None => writeln!(f, "No agent")?,
        }

        write!(f, "Planned path: {} points", self.planned.len())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        grid_model::{test::lattice, ObstacleCell},
        interaction::InteractionParams,
        progress::animate,
    };

    fn controller() -> InteractionController {
        let mut ctrl = InteractionController::new(InteractionParams::default());
        ctrl.load_calibration(lattice()).unwrap();
        ctrl.set_image_size(600.0, 480.0);
        ctrl.set_viewport_size(Some((300.0, 240.0)));
        ctrl
    }

    fn assert_near(p: &Point2<f64>, x: f64, y: f64) {
        assert!(
            (p.x - x).abs() < 1e-9 && (p.y - y).abs() < 1e-9,
            "{:?} is not ({}, {})",
            p,
            x,
            y
        );
    }

    #[test]
    fn test_scene() {
        let mut ctrl = controller();
        ctrl.import_path(vec![Waypoint::new(0.0, 0.0), Waypoint::new(10.0, 0.0)]);
        ctrl.apply_remote_obstacles(vec![ObstacleCell::new(8, 10)]);

        let progress = animate(ctrl.path().waypoints(), 50.0);
        let scene = Scene::build(&ctrl, &progress, &[Waypoint::new(0.0, 8.0)]).unwrap();

        assert_eq!(scene.waypoints.len(), 2);
        assert_near(&scene.waypoints[0].pos, 25.0, 225.0);
        assert_near(&scene.waypoints[1].pos, 275.0, 225.0);

        // Top right intersection of the lattice
        assert_near(&scene.obstacles[0].pos, 275.0, 25.0);

        assert_near(&scene.agent.unwrap(), 150.0, 225.0);
        assert_eq!(scene.completed.len(), 2);
        assert_eq!(scene.remaining.len(), 2);
        assert_eq!(scene.planned.len(), 1);
        assert_near(&scene.planned[0], 25.0, 25.0);
    }

    #[test]
    fn test_scene_needs_bounds() {
        let ctrl = InteractionController::new(InteractionParams::default());
        let progress = animate(&[], 0.0);

        assert_eq!(
            Scene::build(&ctrl, &progress, &[]),
            Err(TransformError::BoundsUndefined)
        );
    }

    #[test]
    fn test_no_agent_without_path() {
        let ctrl = controller();
        let scene = Scene::build(&ctrl, &animate(&[], 30.0), &[]).unwrap();

        assert!(scene.agent.is_none());
        assert!(scene.to_string().contains("No agent"));
    }
}
