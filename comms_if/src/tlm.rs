//! # Telemetry
//!
//! The robot's current values are published as plain text, one `key=value` pair per line, for
//! example:
//!
//! ```text
//! X_ECI=1.5
//! Y_ECI=-0.25
//! percentBatteryRemaining=87.0
//! errorCode=0
//! isMoving=True
//! ```
//!
//! Unknown keys are ignored. Missing keys, and values which cannot be parsed, keep their default
//! so that older or newer robot software can still be displayed.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::str::FromStr;

use log::warn;
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// One telemetry record reported by the robot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Telemetry {
    #[serde(rename = "X_ECI")]
    pub x_eci: f64,

    #[serde(rename = "Y_ECI")]
    pub y_eci: f64,

    #[serde(rename = "Z_ECI")]
    pub z_eci: f64,

    #[serde(rename = "Vx_ECI")]
    pub vx_eci: f64,

    #[serde(rename = "Vy_ECI")]
    pub vy_eci: f64,

    #[serde(rename = "Vz_ECI")]
    pub vz_eci: f64,

    /// Heading in degrees
    #[serde(rename = "Heading")]
    pub heading: f64,

    /// Length of tether cable left on the spool
    #[serde(rename = "cableRemaining_m")]
    pub cable_remaining_m: f64,

    #[serde(rename = "percentBatteryRemaining")]
    pub battery_pct: f64,

    /// Robot error code, 0 is nominal
    #[serde(rename = "errorCode")]
    pub error_code: i64,

    #[serde(rename = "cableDispenseStatus")]
    pub cable_dispense_status: String,

    #[serde(rename = "cableDispenseCommand")]
    pub cable_dispense_command: String,

    #[serde(rename = "SequenceNum")]
    pub sequence_num: u64,

    #[serde(rename = "isMoving")]
    pub is_moving: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Telemetry {
    /// Parse a telemetry record from its `key=value` text form.
    ///
    /// Blank lines, lines without an `=` and unknown keys are skipped. A known key whose value
    /// cannot be parsed is logged and left at its default.
    pub fn from_text(text: &str) -> Self {
        let mut tlm = Self::default();

        for (key, value) in key_values(text) {
            match key {
                "X_ECI" => set_value(&mut tlm.x_eci, key, value),
                "Y_ECI" => set_value(&mut tlm.y_eci, key, value),
                "Z_ECI" => set_value(&mut tlm.z_eci, key, value),
                "Vx_ECI" => set_value(&mut tlm.vx_eci, key, value),
                "Vy_ECI" => set_value(&mut tlm.vy_eci, key, value),
                "Vz_ECI" => set_value(&mut tlm.vz_eci, key, value),
                "Heading" => set_value(&mut tlm.heading, key, value),
                "cableRemaining_m" => set_value(&mut tlm.cable_remaining_m, key, value),
                "percentBatteryRemaining" => set_value(&mut tlm.battery_pct, key, value),
                "errorCode" => set_value(&mut tlm.error_code, key, value),
                "cableDispenseStatus" => tlm.cable_dispense_status = value.to_string(),
                "cableDispenseCommand" => tlm.cable_dispense_command = value.to_string(),
                "SequenceNum" => set_value(&mut tlm.sequence_num, key, value),
                "isMoving" => set_bool(&mut tlm.is_moving, key, value),
                _ => (),
            }
        }

        tlm
    }

    /// Render this record in its `key=value` text form.
    pub fn to_text(&self) -> String {
        format!(
            "X_ECI={}\nY_ECI={}\nZ_ECI={}\nVx_ECI={}\nVy_ECI={}\nVz_ECI={}\nHeading={}\n\
            cableRemaining_m={}\npercentBatteryRemaining={}\nerrorCode={}\n\
            cableDispenseStatus={}\ncableDispenseCommand={}\nSequenceNum={}\nisMoving={}\n",
            self.x_eci,
            self.y_eci,
            self.z_eci,
            self.vx_eci,
            self.vy_eci,
            self.vz_eci,
            self.heading,
            self.cable_remaining_m,
            self.battery_pct,
            self.error_code,
            self.cable_dispense_status,
            self.cable_dispense_command,
            self.sequence_num,
            self.is_moving
        )
    }

    /// True if the robot reports a non-zero error code.
    pub fn is_faulted(&self) -> bool {
        self.error_code != 0
    }
}

impl std::fmt::Display for Telemetry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} | battery {:.0} % | pos ({:.2}, {:.2}, {:.2}) | heading {:.1} deg | cable {:.1} m \
            | error {} | seq {}",
            if self.is_moving { "MOVING" } else { "STOPPED" },
            self.battery_pct,
            self.x_eci,
            self.y_eci,
            self.z_eci,
            self.heading,
            self.cable_remaining_m,
            self.error_code,
            self.sequence_num
        )
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Iterate over the trimmed `(key, value)` pairs of a `key=value` text block.
///
/// Only the first `=` on a line separates the key from the value.
pub fn key_values(text: &str) -> impl Iterator<Item = (&str, &str)> {
    text.lines().filter_map(|line| {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let mut split = line.splitn(2, '=');
        let key = split.next()?.trim();
        let value = split.next()?.trim();

        Some((key, value))
    })
}

fn set_value<T: FromStr>(field: &mut T, key: &str, value: &str) {
    match value.parse() {
        Ok(v) => *field = v,
        Err(_) => warn!("Value for {} is invalid: {:?}, using the default", key, value),
    }
}

/// Booleans may be written by python (`True`) as well as in lower case or as digits.
fn set_bool(field: &mut bool, key: &str, value: &str) {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" => *field = true,
        "false" | "0" | "" => *field = false,
        _ => warn!("Value for {} is invalid: {:?}, using the default", key, value),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_from_text() {
        let text = "\
X_ECI=1.5
Y_ECI=-0.25

percentBatteryRemaining=87.0
errorCode=4
cableDispenseStatus=IDLE
isMoving=True
someFutureKey=whatever
not a pair
";
        let tlm = Telemetry::from_text(text);

        assert_eq!(tlm.x_eci, 1.5);
        assert_eq!(tlm.y_eci, -0.25);
        assert_eq!(tlm.battery_pct, 87.0);
        assert_eq!(tlm.error_code, 4);
        assert_eq!(tlm.cable_dispense_status, "IDLE");
        assert!(tlm.is_moving);
        assert!(tlm.is_faulted());

        // Missing keys keep their default
        assert_eq!(tlm.heading, 0.0);
        assert_eq!(tlm.sequence_num, 0);
    }

    #[test]
    fn test_from_text_invalid_value_keeps_default() {
        let tlm = Telemetry::from_text("isMoving=True\nerrorCode=N/A\nSequenceNum=3");

        assert!(tlm.is_moving);
        assert_eq!(tlm.error_code, 0);
        assert_eq!(tlm.sequence_num, 3);
        assert!(!tlm.is_faulted());

        let tlm = Telemetry::from_text("isMoving=maybe\nerrorCode=1.5\nX_ECI=2.5");
        assert!(!tlm.is_moving);
        assert_eq!(tlm.error_code, 0);
        assert_eq!(tlm.x_eci, 2.5);
    }

    #[test]
    fn test_text_form_is_stable() {
        let tlm = Telemetry {
            battery_pct: 55.5,
            error_code: 2,
            is_moving: true,
            sequence_num: 19,
            ..Default::default()
        };

        assert_eq!(Telemetry::from_text(&tlm.to_text()), tlm);
    }

    #[test]
    fn test_from_json_fields() {
        let tlm: Telemetry =
            serde_json::from_str(r#"{"isMoving": true, "errorCode": 0, "X_ECI": 2.0}"#).unwrap();

        assert!(tlm.is_moving);
        assert_eq!(tlm.x_eci, 2.0);
    }
}
