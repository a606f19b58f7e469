//! # Coordinate transform
//!
//! Maps between positions in the displayed viewport and cells of the calibrated grid.
//!
//! Three frames are involved:
//!
//! - the viewport frame, pixels of the image as it is currently displayed, origin top left, y
//!   down.
//! - the image frame, pixels of the image at its natural size, origin bottom left, y up. This is
//!   the frame the calibration points are given in.
//! - the grid frame, continuous (column, row) coordinates, column along image x and row along
//!   image y.
//!
//! The grid frame is an affine map of the image frame defined by [`GridBounds`].

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use util::maths::lin_map;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Slack on the edges of the calibrated extent, absorbs floating point error on round trips.
const EDGE_TOLERANCE_PX: f64 = 1e-6;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Extent of the calibration points, the parameters of the image to grid map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridBounds {
    pub min_px_x: f64,
    pub max_px_x: f64,
    pub min_px_y: f64,
    pub max_px_y: f64,
    pub max_row: i32,
    pub max_col: i32,
}

/// Sizes of the displayed viewport and of the image at its natural resolution.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Frame {
    pub viewport_width: f64,
    pub viewport_height: f64,
    pub image_width: f64,
    pub image_height: f64,
}

/// A discrete grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridCoord {
    pub col: i32,
    pub row: i32,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum TransformError {
    #[error("Position ({0:.1}, {1:.1}) is outside of the calibrated grid")]
    OutOfBounds(f64, f64),

    #[error("The grid bounds are undefined, calibration data or image size unavailable")]
    BoundsUndefined,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl GridBounds {
    /// True if the bounds can be used to transform positions.
    ///
    /// At least two distinct rows and columns, spanning a non-zero pixel extent, are needed.
    pub fn is_defined(&self) -> bool {
        self.max_row > 0
            && self.max_col > 0
            && self.max_px_x - self.min_px_x > 0.0
            && self.max_px_y - self.min_px_y > 0.0
    }

    /// True if the image frame position lies within the calibrated extent.
    pub fn contains(&self, img: &Point2<f64>) -> bool {
        img.x >= self.min_px_x - EDGE_TOLERANCE_PX
            && img.x <= self.max_px_x + EDGE_TOLERANCE_PX
            && img.y >= self.min_px_y - EDGE_TOLERANCE_PX
            && img.y <= self.max_px_y + EDGE_TOLERANCE_PX
    }
}

impl Frame {
    pub fn new(viewport: (f64, f64), image: (f64, f64)) -> Self {
        Self {
            viewport_width: viewport.0,
            viewport_height: viewport.1,
            image_width: image.0,
            image_height: image.1,
        }
    }

    /// True if both sizes are known and non-zero.
    pub fn is_defined(&self) -> bool {
        [
            self.viewport_width,
            self.viewport_height,
            self.image_width,
            self.image_height,
        ]
        .iter()
        .all(|v| v.is_finite() && *v > 0.0)
    }

    fn check(&self) -> Result<(), TransformError> {
        if self.is_defined() {
            Ok(())
        } else {
            Err(TransformError::BoundsUndefined)
        }
    }
}

impl GridCoord {
    pub fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Convert a viewport position into the image frame, scaling to the natural size and flipping y.
pub fn viewport_to_image(vp: &Point2<f64>, frame: &Frame) -> Result<Point2<f64>, TransformError> {
    frame.check()?;

    let px = vp.x / frame.viewport_width * frame.image_width;
    let py = vp.y / frame.viewport_height * frame.image_height;

    Ok(Point2::new(px, frame.image_height - py))
}

/// Convert an image frame position into the viewport.
pub fn image_to_viewport(img: &Point2<f64>, frame: &Frame) -> Result<Point2<f64>, TransformError> {
    frame.check()?;

    let py = frame.image_height - img.y;

    Ok(Point2::new(
        img.x / frame.image_width * frame.viewport_width,
        py / frame.image_height * frame.viewport_height,
    ))
}

/// Resolve a viewport position to the nearest grid cell.
pub fn pixel_to_grid(
    vp: &Point2<f64>,
    frame: &Frame,
    bounds: &GridBounds,
) -> Result<GridCoord, TransformError> {
    if !bounds.is_defined() {
        return Err(TransformError::BoundsUndefined);
    }

    let img = viewport_to_image(vp, frame)?;

    if !bounds.contains(&img) {
        return Err(TransformError::OutOfBounds(img.x, img.y));
    }

    let col = lin_map(
        (bounds.min_px_x, bounds.max_px_x),
        (0.0, bounds.max_col as f64),
        img.x,
    );
    let row = lin_map(
        (bounds.min_px_y, bounds.max_px_y),
        (0.0, bounds.max_row as f64),
        img.y,
    );

    Ok(GridCoord::new(col.round() as i32, row.round() as i32))
}

/// Position in the viewport of a (possibly fractional) grid coordinate.
pub fn grid_to_pixel(
    col: f64,
    row: f64,
    frame: &Frame,
    bounds: &GridBounds,
) -> Result<Point2<f64>, TransformError> {
    if !bounds.is_defined() {
        return Err(TransformError::BoundsUndefined);
    }

    let img = Point2::new(
        lin_map(
            (0.0, bounds.max_col as f64),
            (bounds.min_px_x, bounds.max_px_x),
            col,
        ),
        lin_map(
            (0.0, bounds.max_row as f64),
            (bounds.min_px_y, bounds.max_px_y),
            row,
        ),
    );

    image_to_viewport(&img, frame)
}

#[cfg(test)]
mod test {
    use super::*;

    fn bounds() -> GridBounds {
        GridBounds {
            min_px_x: 50.0,
            max_px_x: 550.0,
            min_px_y: 30.0,
            max_px_y: 430.0,
            max_row: 8,
            max_col: 10,
        }
    }

    #[test]
    fn test_round_trip() {
        let b = bounds();

        for viewport in &[(600.0, 480.0), (300.0, 240.0), (1013.0, 777.0)] {
            let frame = Frame::new(*viewport, (600.0, 480.0));

            for col in 0..=b.max_col {
                for row in 0..=b.max_row {
                    let vp = grid_to_pixel(col as f64, row as f64, &frame, &b).unwrap();
                    let cell = pixel_to_grid(&vp, &frame, &b).unwrap();

                    assert_eq!(cell, GridCoord::new(col, row), "viewport {:?}", viewport);
                }
            }
        }
    }

    #[test]
    fn test_vertical_flip() {
        // Row 0 sits at the bottom of the image, so at the bottom of the viewport
        let frame = Frame::new((600.0, 480.0), (600.0, 480.0));
        let b = bounds();

        let bottom = grid_to_pixel(0.0, 0.0, &frame, &b).unwrap();
        let top = grid_to_pixel(0.0, 8.0, &frame, &b).unwrap();

        assert!((bottom.y - 450.0).abs() < 1e-9);
        assert!((top.y - 50.0).abs() < 1e-9);
        assert!(bottom.y > top.y);
    }

    #[test]
    fn test_viewport_scaling() {
        // Half size viewport, every position halves
        let full = Frame::new((600.0, 480.0), (600.0, 480.0));
        let half = Frame::new((300.0, 240.0), (600.0, 480.0));
        let b = bounds();

        let p_full = grid_to_pixel(4.0, 3.0, &full, &b).unwrap();
        let p_half = grid_to_pixel(4.0, 3.0, &half, &b).unwrap();

        assert!((p_full.x - 2.0 * p_half.x).abs() < 1e-9);
        assert!((p_full.y - 2.0 * p_half.y).abs() < 1e-9);
    }

    #[test]
    fn test_out_of_bounds() {
        let frame = Frame::new((300.0, 240.0), (600.0, 480.0));
        let b = bounds();

        // One image pixel beyond the maximum x
        let vp = Point2::new((b.max_px_x + 1.0) / 2.0, 240.0 - (b.min_px_y + 10.0) / 2.0);
        assert!(matches!(
            pixel_to_grid(&vp, &frame, &b),
            Err(TransformError::OutOfBounds(..))
        ));

        // Exactly on the edge is accepted
        let vp = Point2::new(b.max_px_x / 2.0, 240.0 - b.max_px_y / 2.0);
        assert_eq!(
            pixel_to_grid(&vp, &frame, &b).unwrap(),
            GridCoord::new(10, 8)
        );

        // Below the bottom row
        let vp = Point2::new(100.0, 239.0);
        assert!(matches!(
            pixel_to_grid(&vp, &frame, &b),
            Err(TransformError::OutOfBounds(..))
        ));
    }

    #[test]
    fn test_bounds_undefined() {
        let frame = Frame::new((600.0, 480.0), (600.0, 480.0));
        let vp = Point2::new(100.0, 100.0);

        let mut single_row = bounds();
        single_row.max_row = 0;
        assert_eq!(
            pixel_to_grid(&vp, &frame, &single_row),
            Err(TransformError::BoundsUndefined)
        );

        let mut flat = bounds();
        flat.max_px_x = flat.min_px_x;
        assert_eq!(
            grid_to_pixel(1.0, 1.0, &frame, &flat),
            Err(TransformError::BoundsUndefined)
        );

        // Unknown image size
        let no_image = Frame::new((600.0, 480.0), (0.0, 0.0));
        assert_eq!(
            pixel_to_grid(&vp, &no_image, &bounds()),
            Err(TransformError::BoundsUndefined)
        );
    }
}
