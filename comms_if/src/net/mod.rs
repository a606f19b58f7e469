//! # Network Module
//!
//! This module provides the two links to the CirceBot server: a blocking REST client for the
//! request/response resources and a monitored WebSocket client for the real-time channel.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod rest;
pub mod ws;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

use crate::WireError;

pub use rest::{RestClient, ServerApi};
pub use ws::{WsClient, WsEvent};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters describing how to reach the server.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetParams {
    /// Base URL of the server, for example `http://localhost:8765`
    pub server_url: String,

    /// Path of the real-time channel on the server
    pub ws_path: String,

    /// Timeout applied to each REST request
    pub request_timeout_s: f64,

    /// Fixed delay before the real-time channel is reopened after it closes
    pub ws_reconnect_period_s: f64,

    /// Period of the telemetry poll, 0 disables polling.
    pub tlm_poll_period_s: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum NetError {
    #[error("Could not build the HTTP client: {0}")]
    ClientBuildError(reqwest::Error),

    #[error("Request to {0} failed: {1}")]
    RequestError(String, reqwest::Error),

    #[error("Request to {0} returned status {1}")]
    BadStatus(String, u16),

    #[error("Could not read the response body from {0}: {1}")]
    BodyError(String, reqwest::Error),

    #[error("Malformed response from {0}: {1}")]
    Malformed(String, WireError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl NetParams {
    /// Full URL of a REST resource.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.server_url.trim_end_matches('/'), path)
    }

    /// URL of the real-time channel, derived from the server URL by swapping `http` for `ws`.
    ///
    /// Other schemes are kept as they are, the [`WsClient`] refuses them.
    pub fn ws_url(&self) -> String {
        let base = self.server_url.trim_end_matches('/');

        let base = match base.strip_prefix("http://") {
            Some(rest) => format!("ws://{}", rest),
            None => base.to_string(),
        };

        format!("{}{}", base, self.ws_path)
    }
}

impl Default for NetParams {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8765".into(),
            ws_path: "/ws".into(),
            request_timeout_s: 5.0,
            ws_reconnect_period_s: 5.0,
            tlm_poll_period_s: 2.0,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_urls() {
        let mut params = NetParams::default();
        assert_eq!(params.ws_url(), "ws://localhost:8765/ws");
        assert_eq!(params.url("/grid/path"), "http://localhost:8765/grid/path");

        params.server_url = "https://circe.local/".into();
        assert_eq!(params.ws_url(), "https://circe.local/ws");
        assert_eq!(params.url("/health"), "https://circe.local/health");
    }
}
