//! # Real-time channel messages
//!
//! Messages on the `/ws` channel are JSON objects of the form `{"type": ..., "data": ...}`. The
//! server also pushes the raw directions text whenever it changes, which is accepted here as a
//! directions update.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::{
    grid::CellList,
    tc::Directive,
    tlm::Telemetry,
    WireError,
};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A message received on the real-time channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum WsMessage {
    /// New telemetry from the robot
    CurrentValuesUpdate(TlmPayload),

    /// The path the robot is executing changed
    PathUpdate(CellList),

    /// The directive currently held by the server changed
    DirectionsUpdate(String),

    /// The obstacle set changed
    ObstaclesUpdate(CellList),

    /// The operator waypoints changed
    WaypointsUpdate(CellList),
}

/// Telemetry may be relayed either as its text form or as a JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TlmPayload {
    Text(String),
    Record(Telemetry),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl WsMessage {
    /// Parse a text frame received on the channel.
    pub fn parse(text: &str) -> Result<Self, WireError> {
        match serde_json::from_str(text) {
            Ok(m) => Ok(m),
            Err(json_err) => {
                // Raw directions text pushed by the server
                if Directive::from_text(text).is_ok() {
                    Ok(WsMessage::DirectionsUpdate(text.trim().to_string()))
                } else {
                    Err(WireError::InvalidJson(json_err))
                }
            }
        }
    }

    /// Name of the message type as it appears on the wire.
    pub fn type_name(&self) -> &'static str {
        match self {
            WsMessage::CurrentValuesUpdate(_) => "current_values_update",
            WsMessage::PathUpdate(_) => "path_update",
            WsMessage::DirectionsUpdate(_) => "directions_update",
            WsMessage::ObstaclesUpdate(_) => "obstacles_update",
            WsMessage::WaypointsUpdate(_) => "waypoints_update",
        }
    }
}

impl TlmPayload {
    pub fn into_telemetry(self) -> Telemetry {
        match self {
            TlmPayload::Text(t) => Telemetry::from_text(&t),
            TlmPayload::Record(r) => r,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::grid::GridCell;

    #[test]
    fn test_parse_typed_messages() {
        let msg = WsMessage::parse(r#"{"type": "obstacles_update", "data": [{"r": 1, "c": 2}]}"#)
            .unwrap();
        match msg {
            WsMessage::ObstaclesUpdate(cells) => {
                assert_eq!(cells.into_cells(), vec![GridCell::new(1, 2)])
            }
            other => panic!("Unexpected message {:?}", other),
        }

        let msg = WsMessage::parse(
            r#"{"type": "current_values_update", "data": "isMoving=false\nerrorCode=7"}"#,
        )
        .unwrap();
        match msg {
            WsMessage::CurrentValuesUpdate(p) => {
                let tlm = p.into_telemetry();
                assert!(!tlm.is_moving);
                assert_eq!(tlm.error_code, 7);
            }
            other => panic!("Unexpected message {:?}", other),
        }

        let msg = WsMessage::parse(
            r#"{"type": "current_values_update", "data": {"isMoving": true}}"#,
        )
        .unwrap();
        assert_eq!(msg.type_name(), "current_values_update");
    }

    #[test]
    fn test_parse_raw_directions() {
        assert_eq!(
            WsMessage::parse("TURN_LEFT=10\nSPEED=0.3").unwrap(),
            WsMessage::DirectionsUpdate("TURN_LEFT=10\nSPEED=0.3".to_string())
        );
        assert!(WsMessage::parse("Hello from Raspberry Pi WebSocket Server!").is_err());
        assert!(WsMessage::parse(r#"{"type": "unknown_update", "data": 1}"#).is_err());
    }
}
