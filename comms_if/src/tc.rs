//! # Telecommand module
//!
//! Directives are the commands pushed to the robot through `PUT /directions`. On the wire they are
//! raw text, either the literal `STOP` or a set of `key=value` lines:
//!
//! ```text
//! TURN_LEFT=15
//! SPEED=0.5
//! ```

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

use crate::{tlm::key_values, WireError};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

const STOP_TEXT: &str = "STOP";
const TURN_LEFT_KEY: &str = "TURN_LEFT";
const SPEED_KEY: &str = "SPEED";

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A directive for the robot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Directive {
    /// Stop all motion immediately.
    Stop,

    /// Drive at the given speed while turning.
    Drive {
        /// Turn to the left in degrees, negative values turn to the right.
        turn_left_deg: f64,

        /// Forward speed, negative values reverse.
        speed: f64,
    },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Directive {
    /// Render the directive as the raw text body of a directions update.
    pub fn to_text(&self) -> String {
        match self {
            Directive::Stop => STOP_TEXT.to_string(),
            Directive::Drive {
                turn_left_deg,
                speed,
            } => format!(
                "{}={}\n{}={}",
                TURN_LEFT_KEY, turn_left_deg, SPEED_KEY, speed
            ),
        }
    }

    /// Parse a directive from the raw text of a directions update.
    ///
    /// A drive directive must contain at least one of the turn or speed keys, the other defaults
    /// to zero.
    pub fn from_text(text: &str) -> Result<Self, WireError> {
        let trimmed = text.trim();

        if trimmed.eq_ignore_ascii_case(STOP_TEXT) {
            return Ok(Directive::Stop);
        }

        let mut turn_left_deg = None;
        let mut speed = None;

        for (key, value) in key_values(trimmed) {
            let target = match key {
                TURN_LEFT_KEY => &mut turn_left_deg,
                SPEED_KEY => &mut speed,
                _ => continue,
            };

            *target = Some(value.parse::<f64>().map_err(|_| WireError::InvalidValue {
                key: key.to_string(),
                value: value.to_string(),
            })?);
        }

        if turn_left_deg.is_none() && speed.is_none() {
            return Err(WireError::InvalidDirective(trimmed.to_string()));
        }

        Ok(Directive::Drive {
            turn_left_deg: turn_left_deg.unwrap_or(0.0),
            speed: speed.unwrap_or(0.0),
        })
    }
}

impl std::fmt::Display for Directive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Directive::Stop => write!(f, "STOP"),
            Directive::Drive {
                turn_left_deg,
                speed,
            } => write!(f, "DRIVE turn left {} deg at speed {}", turn_left_deg, speed),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_directive_text() {
        assert_eq!(Directive::Stop.to_text(), "STOP");
        assert_eq!(
            Directive::Drive {
                turn_left_deg: 15.0,
                speed: 0.5
            }
            .to_text(),
            "TURN_LEFT=15\nSPEED=0.5"
        );
    }

    #[test]
    fn test_directive_parse() {
        assert_eq!(Directive::from_text("  stop\n").unwrap(), Directive::Stop);
        assert_eq!(
            Directive::from_text("TURN_LEFT=-30\nSPEED=1.25").unwrap(),
            Directive::Drive {
                turn_left_deg: -30.0,
                speed: 1.25
            }
        );
        assert_eq!(
            Directive::from_text("SPEED=2").unwrap(),
            Directive::Drive {
                turn_left_deg: 0.0,
                speed: 2.0
            }
        );

        assert!(Directive::from_text("Hello from the server").is_err());
        assert!(Directive::from_text("SPEED=fast").is_err());
    }
}
