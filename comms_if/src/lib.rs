//! # Communications interface crate.
//!
//! Provides everything that crosses the boundary between the dashboard and the CirceBot server:
//! payload types, their text and JSON encodings, and the network clients which carry them.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Grid resources: calibration points, obstacle and path cells, the file manifest
pub mod grid;

/// Telecommands sent to the robot through the directions resource
pub mod tc;

/// Telemetry reported by the robot through the current values resource
pub mod tlm;

/// Real-time channel messages
pub mod ws;

/// Network module
pub mod net;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors raised while decoding a payload received from the server.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("Payload is not valid JSON or doesn't match the expected schema: {0}")]
    InvalidJson(serde_json::Error),

    #[error("Payload is not a recognised directive: {0:?}")]
    InvalidDirective(String),

    #[error("Value for {key} is invalid: {value:?}")]
    InvalidValue { key: String, value: String },
}
