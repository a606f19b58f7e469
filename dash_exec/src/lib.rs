//! # Dashboard library.
//!
//! This library holds the editing core of the operator dashboard, so that it can be tested and
//! benchmarked independently of the executable.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Coordinate transform - maps between viewport pixels and grid cells
pub mod coord_tf;

/// Grid model - calibration points, obstacle cells and the derived bounds
pub mod grid_model;

/// Path model - the ordered waypoint sequence
pub mod path_model;

/// Interaction controller - turns pointer gestures into model edits
pub mod interaction;

/// Progress animator - position of the simulated agent along the path
pub mod progress;

/// Render scene - everything to draw, in viewport pixels
pub mod render;

/// Path files - CSV import and export of the path
pub mod path_file;

/// Sync gateway - background worker exchanging model state with the server
pub mod sync_gateway;

/// Operator console command grammar
pub mod console;

/// Global data store for the executable
pub mod data_store;

/// Executable parameters
pub mod params;
