//! # Interaction controller
//!
//! Turns raw pointer events into edits of the [`PathModel`] and [`GridModel`].
//!
//! A gesture starts with a pointer down and ends with a pointer up. Whether the gesture was a
//! click or a drag is decided by the total distance the pointer travelled in between, compared
//! against `drag_threshold_px`:
//!
//! - A click in path mode, away from any waypoint marker, appends a waypoint.
//! - A click in obstacle mode toggles the obstacle at the nearest calibration point.
//! - A drag which started on a waypoint marker in path mode moves that waypoint.
//! - Anything else has no effect.
//!
//! Commands which are not part of a gesture (mode changes, deletes, clears and imports) abandon
//! any gesture in progress first. Abandoning a drag puts the dragged waypoint back where it was.
//!
//! The controller never talks to the network. Each edit returns an [`EditOutcome`] whose
//! [`SyncAction`] tells the caller what needs pushing to the server.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::str::FromStr;

use log::debug;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::{
    coord_tf::{self, Frame, GridBounds, GridCoord, TransformError},
    grid_model::{CalibrationPoint, GridError, GridModel, ObstacleCell},
    path_model::{PathError, PathModel, Waypoint},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionParams {
    /// Radius around a waypoint marker, in viewport pixels, within which a press grabs it
    pub marker_radius_px: f64,

    /// Total pointer travel, in viewport pixels, above which a gesture is a drag
    pub drag_threshold_px: f64,
}

pub struct InteractionController {
    grid: GridModel,
    path: PathModel,
    mode: EditMode,
    state: GestureState,
    params: InteractionParams,

    /// Natural size of the field image, zero until the image has been fetched
    image_size: (f64, f64),

    /// Displayed size, `None` to display the image at its natural size
    viewport_size: Option<(f64, f64)>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Which model pointer events edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditMode {
    Path,
    Obstacle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureState {
    Idle,

    /// The pointer is down but the gesture is not yet known to be a drag.
    Pressed {
        start: Point2<f64>,
        last: Point2<f64>,
        travelled: f64,

        /// The waypoint marker under the pointer when it went down
        marker: Option<usize>,
    },

    /// A waypoint is being dragged.
    Dragging {
        index: usize,

        /// Where the waypoint was before the drag started
        original: Waypoint,

        last: Point2<f64>,
    },
}

/// The result of an event handled by the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum EditOutcome {
    /// The event changed nothing
    Ignored,

    Pressed,

    /// A waypoint followed the pointer during a drag
    Dragged { index: usize, to: Waypoint },

    WaypointAdded { index: usize, waypoint: Waypoint },

    /// A drag finished
    WaypointMoved {
        index: usize,
        from: Waypoint,
        to: Waypoint,
    },

    WaypointRemoved { index: usize, waypoint: Waypoint },

    PathCleared,

    PathImported { len: usize },

    ObstacleToggled { row: i32, col: i32, added: bool },

    ModeChanged { mode: EditMode, drag_cancelled: bool },
}

/// What must be pushed to the server after an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    None,
    PushPath,
    PushObstacles,
}

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum EditError {
    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Path(#[from] PathError),

    #[error("This edit is only possible in {0} mode")]
    WrongMode(EditMode),
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("Unknown edit mode {0:?}, expected \"path\" or \"obstacle\"")]
pub struct ParseModeError(String);

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for InteractionParams {
    fn default() -> Self {
        Self {
            marker_radius_px: 8.0,
            drag_threshold_px: 4.0,
        }
    }
}

impl FromStr for EditMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "path" => Ok(EditMode::Path),
            "obstacle" | "obstacles" => Ok(EditMode::Obstacle),
            _ => Err(ParseModeError(s.to_string())),
        }
    }
}

impl std::fmt::Display for EditMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EditMode::Path => write!(f, "path"),
            EditMode::Obstacle => write!(f, "obstacle"),
        }
    }
}

impl EditOutcome {
    pub fn sync_action(&self) -> SyncAction {
        match self {
            EditOutcome::WaypointAdded { .. }
            | EditOutcome::WaypointMoved { .. }
            | EditOutcome::WaypointRemoved { .. }
            | EditOutcome::PathCleared
            | EditOutcome::PathImported { .. } => SyncAction::PushPath,
            EditOutcome::ObstacleToggled { .. } => SyncAction::PushObstacles,
            EditOutcome::Ignored
            | EditOutcome::Pressed
            | EditOutcome::Dragged { .. }
            | EditOutcome::ModeChanged { .. } => SyncAction::None,
        }
    }
}

impl InteractionController {
    pub fn new(params: InteractionParams) -> Self {
        Self {
            grid: GridModel::new(),
            path: PathModel::new(),
            mode: EditMode::Path,
            state: GestureState::Idle,
            params,
            image_size: (0.0, 0.0),
            viewport_size: None,
        }
    }

    // ---- ACCESSORS ----

    pub fn grid(&self) -> &GridModel {
        &self.grid
    }

    pub fn path(&self) -> &PathModel {
        &self.path
    }

    pub fn mode(&self) -> EditMode {
        self.mode
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    pub fn params(&self) -> &InteractionParams {
        &self.params
    }

    /// The current viewport and image sizes.
    pub fn frame(&self) -> Frame {
        Frame::new(self.viewport_size.unwrap_or(self.image_size), self.image_size)
    }

    /// Bounds usable for transforming positions.
    pub fn bounds(&self) -> Result<GridBounds, TransformError> {
        match self.grid.bounds() {
            Some(b) if b.is_defined() && self.frame().is_defined() => Ok(b),
            _ => Err(TransformError::BoundsUndefined),
        }
    }

    /// True if pointer edits can currently be resolved.
    pub fn is_editable(&self) -> bool {
        self.bounds().is_ok()
    }

    // ---- MODEL INPUTS ----

    pub fn set_image_size(&mut self, width: f64, height: f64) {
        self.image_size = (width, height);
    }

    /// Set the displayed size, `None` displays the image at its natural size.
    pub fn set_viewport_size(&mut self, size: Option<(f64, f64)>) {
        self.viewport_size = size;
    }

    pub fn load_calibration(&mut self, points: Vec<CalibrationPoint>) -> Result<usize, GridError> {
        self.grid.load_calibration(points)
    }

    /// Replace the path with the server's copy.
    ///
    /// A drag in progress is dropped since the index it refers to may no longer exist.
    pub fn apply_remote_path(&mut self, waypoints: Vec<Waypoint>) {
        if let GestureState::Dragging { index, .. } = self.state {
            debug!("Remote path update while dragging waypoint {}, drag dropped", index);
        }
        self.state = GestureState::Idle;
        self.path.replace_all(waypoints);
    }

    /// Replace the obstacles with the server's copy.
    pub fn apply_remote_obstacles(&mut self, cells: Vec<ObstacleCell>) {
        self.grid.replace_obstacles(cells);
    }

    // ---- COMMANDS ----

    pub fn set_mode(&mut self, mode: EditMode) -> EditOutcome {
        let drag_cancelled = self.cancel_gesture();
        self.mode = mode;

        EditOutcome::ModeChanged {
            mode,
            drag_cancelled,
        }
    }

    /// Abandon any gesture in progress, returning `true` if a drag was undone.
    pub fn cancel_gesture(&mut self) -> bool {
        let state = std::mem::replace(&mut self.state, GestureState::Idle);

        match state {
            GestureState::Dragging {
                index, original, ..
            } => {
                // The index is valid for as long as the drag lasts
                self.path.move_at(index, original).is_ok()
            }
            _ => false,
        }
    }

    pub fn delete_waypoint(&mut self, index: usize) -> Result<EditOutcome, EditError> {
        if self.mode != EditMode::Path {
            return Err(EditError::WrongMode(EditMode::Path));
        }

        self.cancel_gesture();
        let waypoint = self.path.remove_at(index)?;

        Ok(EditOutcome::WaypointRemoved { index, waypoint })
    }

    pub fn clear_path(&mut self) -> EditOutcome {
        self.cancel_gesture();
        self.path.clear();

        EditOutcome::PathCleared
    }

    pub fn import_path(&mut self, waypoints: Vec<Waypoint>) -> EditOutcome {
        self.cancel_gesture();
        let len = waypoints.len();
        self.path.replace_all(waypoints);

        EditOutcome::PathImported { len }
    }

    // ---- POINTER EVENTS ----

    pub fn pointer_down(&mut self, vp: Point2<f64>) -> EditOutcome {
        // A down without an up means the previous gesture was lost
        self.cancel_gesture();

        let marker = match self.mode {
            EditMode::Path => self.marker_at(&vp),
            EditMode::Obstacle => None,
        };

        self.state = GestureState::Pressed {
            start: vp,
            last: vp,
            travelled: 0.0,
            marker,
        };

        EditOutcome::Pressed
    }

    pub fn pointer_move(&mut self, vp: Point2<f64>) -> Result<EditOutcome, EditError> {
        match self.state {
            GestureState::Idle => Ok(EditOutcome::Ignored),

            GestureState::Pressed {
                start,
                last,
                travelled,
                marker,
            } => {
                let travelled = travelled + nalgebra::distance(&last, &vp);

                match marker {
                    Some(index) if travelled > self.params.drag_threshold_px => {
                        let original = match self.path.get(index) {
                            Some(w) => *w,
                            None => {
                                self.state = GestureState::Idle;
                                return Err(PathError::IndexOutOfRange {
                                    index,
                                    len: self.path.len(),
                                }
                                .into());
                            }
                        };

                        debug!("Drag of waypoint {} started", index);
                        self.state = GestureState::Dragging {
                            index,
                            original,
                            last: vp,
                        };

                        self.drag_to(index, &vp)
                    }
                    _ => {
                        self.state = GestureState::Pressed {
                            start,
                            last: vp,
                            travelled,
                            marker,
                        };
                        Ok(EditOutcome::Ignored)
                    }
                }
            }

            GestureState::Dragging {
                index, original, ..
            } => {
                self.state = GestureState::Dragging {
                    index,
                    original,
                    last: vp,
                };

                self.drag_to(index, &vp)
            }
        }
    }

    pub fn pointer_up(&mut self, vp: Point2<f64>) -> Result<EditOutcome, EditError> {
        // Account for any travel between the last move and the release
        self.pointer_move(vp)?;

        let state = std::mem::replace(&mut self.state, GestureState::Idle);

        match state {
            GestureState::Idle => Ok(EditOutcome::Ignored),

            GestureState::Pressed {
                start,
                travelled,
                marker,
                ..
            } => {
                if travelled > self.params.drag_threshold_px || marker.is_some() {
                    Ok(EditOutcome::Ignored)
                } else {
                    self.click_at(&start)
                }
            }

            GestureState::Dragging {
                index, original, ..
            } => {
                let to = match self.path.get(index) {
                    Some(w) => *w,
                    None => {
                        return Err(PathError::IndexOutOfRange {
                            index,
                            len: self.path.len(),
                        }
                        .into())
                    }
                };

                Ok(EditOutcome::WaypointMoved {
                    index,
                    from: original,
                    to,
                })
            }
        }
    }

    /// A press and release at the same position.
    pub fn click(&mut self, vp: Point2<f64>) -> Result<EditOutcome, EditError> {
        self.pointer_down(vp);
        self.pointer_up(vp)
    }

    // ---- RESOLUTION ----

    /// The grid cell under a viewport position.
    pub fn resolve_cell(&self, vp: &Point2<f64>) -> Result<GridCoord, TransformError> {
        coord_tf::pixel_to_grid(vp, &self.frame(), &self.bounds()?)
    }

    /// The obstacle cell under a viewport position, the cell of the nearest calibration point.
    pub fn resolve_obstacle(&self, vp: &Point2<f64>) -> Result<ObstacleCell, TransformError> {
        let bounds = self.bounds()?;
        let img = coord_tf::viewport_to_image(vp, &self.frame())?;

        if !bounds.contains(&img) {
            return Err(TransformError::OutOfBounds(img.x, img.y));
        }

        self.grid
            .nearest_calibration_point(&img)
            .map(|p| ObstacleCell::new(p.row, p.col))
            .ok_or(TransformError::BoundsUndefined)
    }

    /// Viewport position of a waypoint.
    pub fn waypoint_position(&self, waypoint: &Waypoint) -> Result<Point2<f64>, TransformError> {
        coord_tf::grid_to_pixel(waypoint.x, waypoint.y, &self.frame(), &self.bounds()?)
    }

    /// The waypoint marker under a viewport position.
    ///
    /// Where markers overlap the closest wins, and of equally close markers the last drawn.
    pub fn marker_at(&self, vp: &Point2<f64>) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;

        for (i, w) in self.path.waypoints().iter().enumerate() {
            let pos = match self.waypoint_position(w) {
                Ok(p) => p,
                Err(_) => return None,
            };

            let dist = nalgebra::distance(&pos, vp);
            if dist > self.params.marker_radius_px {
                continue;
            }

            match best {
                Some((_, d)) if dist > d => (),
                _ => best = Some((i, dist)),
            }
        }

        best.map(|(i, _)| i)
    }

    // ---- PRIVATE ----

    fn click_at(&mut self, vp: &Point2<f64>) -> Result<EditOutcome, EditError> {
        match self.mode {
            EditMode::Path => {
                let cell = self.resolve_cell(vp)?;
                let waypoint = Waypoint::new(cell.col as f64, cell.row as f64);
                self.path.append(waypoint);

                Ok(EditOutcome::WaypointAdded {
                    index: self.path.len() - 1,
                    waypoint,
                })
            }
            EditMode::Obstacle => {
                let cell = self.resolve_obstacle(vp)?;
                let added = self.grid.toggle_obstacle(cell.row, cell.col);

                Ok(EditOutcome::ObstacleToggled {
                    row: cell.row,
                    col: cell.col,
                    added,
                })
            }
        }
    }

    /// Move a dragged waypoint under the pointer, positions off the grid leave it where it is.
    fn drag_to(&mut self, index: usize, vp: &Point2<f64>) -> Result<EditOutcome, EditError> {
        match self.resolve_cell(vp) {
            Ok(cell) => {
                let to = Waypoint::new(cell.col as f64, cell.row as f64);
                self.path.move_at(index, to)?;
                Ok(EditOutcome::Dragged { index, to })
            }
            Err(_) => Ok(EditOutcome::Ignored),
        }
    }
}
