//! # Operator console
//!
//! Grammar of the commands accepted by the dashboard, whether typed at the console or replayed
//! from a script. Pointer positions are viewport pixels.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::path::PathBuf;

use structopt::{clap::AppSettings, StructOpt};

use crate::interaction::EditMode;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A command to the dashboard.
#[derive(Debug, Clone, PartialEq, StructOpt)]
#[structopt(name = "dash", no_version)]
pub enum ConsoleCmd {
    /// Select which model pointer events edit, "path" or "obstacle".
    #[structopt(name = "mode")]
    Mode { mode: EditMode },

    /// Press the pointer at the given viewport position.
    #[structopt(name = "down", setting = AppSettings::AllowNegativeNumbers)]
    Down { x: f64, y: f64 },

    /// Move the pointer to the given viewport position.
    #[structopt(name = "move", setting = AppSettings::AllowNegativeNumbers)]
    Move { x: f64, y: f64 },

    /// Release the pointer at the given viewport position.
    #[structopt(name = "up", setting = AppSettings::AllowNegativeNumbers)]
    Up { x: f64, y: f64 },

    /// Press and release the pointer at the given viewport position.
    #[structopt(name = "click", setting = AppSettings::AllowNegativeNumbers)]
    Click { x: f64, y: f64 },

    /// Delete the waypoint with the given index.
    #[structopt(name = "delete")]
    Delete { index: usize },

    /// Remove all waypoints.
    #[structopt(name = "clear")]
    Clear,

    /// Replace the path with the contents of a CSV file.
    #[structopt(name = "import")]
    Import { path: PathBuf },

    /// Push the path to the server again, writing it to a CSV file if one is given.
    ///
    /// Without a file the path is archived in the session directory.
    #[structopt(name = "export")]
    Export { path: Option<PathBuf> },

    /// Set the progress of the simulated agent, between 0 and 100.
    #[structopt(name = "progress")]
    Progress { value: f64 },

    /// Start or resume the automated playback of the agent.
    #[structopt(name = "play")]
    Play,

    /// Pause the automated playback.
    #[structopt(name = "pause")]
    Pause,

    /// Stop the playback and command the robot to stop.
    #[structopt(name = "stop")]
    Stop,

    /// Command the robot to drive.
    #[structopt(name = "drive", setting = AppSettings::AllowNegativeNumbers)]
    Drive {
        /// Turn to the left in degrees, negative turns right
        turn_left_deg: f64,

        /// Forward speed, negative reverses
        speed: f64,
    },

    /// Fetch the image, calibration, obstacles and path from the server.
    #[structopt(name = "fetch")]
    Fetch,

    /// Open the real-time channel.
    #[structopt(name = "connect")]
    Connect,

    /// Close the real-time channel, it will not reopen by itself.
    #[structopt(name = "disconnect")]
    Disconnect,

    /// Set the displayed size of the image, without a size the natural size is used.
    #[structopt(name = "viewport")]
    Viewport {
        #[structopt(requires = "height")]
        width: Option<f64>,

        height: Option<f64>,
    },

    /// Print the render scene.
    #[structopt(name = "show")]
    Show {
        /// Also save the scene as JSON in the session directory
        #[structopt(long)]
        save: bool,
    },

    /// Print the last telemetry received.
    #[structopt(name = "tlm")]
    Tlm,

    /// Print the state of the dashboard and check the server health.
    #[structopt(name = "status")]
    Status,

    /// List the grid files held by the server.
    #[structopt(name = "manifest")]
    Manifest,

    /// Exit the dashboard.
    #[structopt(name = "quit", alias = "exit")]
    Quit,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ConsoleCmd {
    /// Parse one console line, blank lines and `#` comments give `None`.
    pub fn parse_line(line: &str) -> Result<Option<Self>, structopt::clap::Error> {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        Self::from_iter_safe(std::iter::once("dash").chain(line.split_whitespace())).map(Some)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_line() {
        assert_eq!(
            ConsoleCmd::parse_line("click 120.5 80").unwrap(),
            Some(ConsoleCmd::Click { x: 120.5, y: 80.0 })
        );
        assert_eq!(
            ConsoleCmd::parse_line("  mode obstacle ").unwrap(),
            Some(ConsoleCmd::Mode {
                mode: EditMode::Obstacle
            })
        );
        assert_eq!(
            ConsoleCmd::parse_line("drive -15 0.5").unwrap(),
            Some(ConsoleCmd::Drive {
                turn_left_deg: -15.0,
                speed: 0.5
            })
        );
        assert_eq!(
            ConsoleCmd::parse_line("export").unwrap(),
            Some(ConsoleCmd::Export { path: None })
        );
        assert_eq!(
            ConsoleCmd::parse_line("export out.csv").unwrap(),
            Some(ConsoleCmd::Export {
                path: Some(PathBuf::from("out.csv"))
            })
        );
        assert_eq!(
            ConsoleCmd::parse_line("viewport").unwrap(),
            Some(ConsoleCmd::Viewport {
                width: None,
                height: None
            })
        );
        assert_eq!(
            ConsoleCmd::parse_line("show --save").unwrap(),
            Some(ConsoleCmd::Show { save: true })
        );
        assert_eq!(ConsoleCmd::parse_line("exit").unwrap(), Some(ConsoleCmd::Quit));
    }

    #[test]
    fn test_parse_ignored_and_invalid() {
        assert_eq!(ConsoleCmd::parse_line("").unwrap(), None);
        assert_eq!(ConsoleCmd::parse_line("# a comment").unwrap(), None);

        assert!(ConsoleCmd::parse_line("teleport 1 2").is_err());
        assert!(ConsoleCmd::parse_line("mode walls").is_err());
        assert!(ConsoleCmd::parse_line("click 10").is_err());
        assert!(ConsoleCmd::parse_line("delete -1").is_err());
        assert!(ConsoleCmd::parse_line("viewport 300").is_err());
    }
}
