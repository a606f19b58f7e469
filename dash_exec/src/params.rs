//! # Dashboard Executable Parameters
//!
//! This module provides parameters for the dashboard executable, loaded from `dash_exec.toml`.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::interaction::InteractionParams;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashExecParams {
    /// Displayed width of the field image, the natural width if not given
    pub viewport_width: Option<f64>,

    /// Displayed height of the field image, the natural height if not given
    pub viewport_height: Option<f64>,

    /// Marker hit radius and click/drag threshold
    pub interaction: InteractionParams,

    /// Time taken by the automated playback to go from 0 to 100
    pub playback_duration_s: f64,

    /// Open the real-time channel at startup
    pub connect_on_start: bool,

    /// Target period of one cycle of the main loop
    pub cycle_period_s: f64,

    /// File the console history is kept in, relative to the software root
    pub history_file: Option<String>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum ParamsError {
    #[error("The cycle period must be a finite number of seconds above zero, got {0}")]
    InvalidCyclePeriod(f64),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl DashExecParams {
    /// Check the values which can't be used as loaded.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if !self.cycle_period_s.is_finite() || self.cycle_period_s <= 0.0 {
            return Err(ParamsError::InvalidCyclePeriod(self.cycle_period_s));
        }

        Ok(())
    }

    /// The configured viewport size, if both dimensions are given.
    pub fn viewport_size(&self) -> Option<(f64, f64)> {
        match (self.viewport_width, self.viewport_height) {
            (Some(w), Some(h)) => Some((w, h)),
            _ => None,
        }
    }
}

impl Default for DashExecParams {
    fn default() -> Self {
        Self {
            viewport_width: None,
            viewport_height: None,
            interaction: InteractionParams::default(),
            playback_duration_s: 10.0,
            connect_on_start: true,
            cycle_period_s: 0.05,
            history_file: Some("sessions/dash_history.txt".into()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_partial_params() {
        let path = std::env::temp_dir().join("dash_exec_params_test.toml");
        std::fs::write(
            &path,
            "viewport_width = 800.0\n\
             viewport_height = 600.0\n\
             \n\
             [interaction]\n\
             drag_threshold_px = 6.0\n",
        )
        .unwrap();

        let params: DashExecParams = util::params::load_from(&path).unwrap();

        assert_eq!(params.viewport_size(), Some((800.0, 600.0)));
        assert_eq!(params.interaction.drag_threshold_px, 6.0);
        assert_eq!(params.interaction.marker_radius_px, 8.0);
        assert_eq!(params.playback_duration_s, 10.0);
        assert!(params.connect_on_start);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_validate_cycle_period() {
        let mut params = DashExecParams::default();
        assert_eq!(params.validate(), Ok(()));

        for bad in [0.0, -0.05, f64::NAN, f64::INFINITY].iter() {
            params.cycle_period_s = *bad;
            assert!(matches!(
                params.validate(),
                Err(ParamsError::InvalidCyclePeriod(_))
            ));
        }

        let path = std::env::temp_dir().join("dash_exec_params_cycle_test.toml");
        std::fs::write(&path, "cycle_period_s = -1.0\n").unwrap();

        let params: DashExecParams = util::params::load_from(&path).unwrap();
        assert_eq!(params.validate(), Err(ParamsError::InvalidCyclePeriod(-1.0)));

        std::fs::remove_file(&path).ok();
    }
}
