//! # REST client
//!
//! Blocking client for the server's request/response resources. The [`ServerApi`] trait is the
//! seam between the dashboard and the network, so that the dashboard can be driven by a fake
//! server in tests.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::time::Duration;

use log::trace;
use reqwest::{blocking::Client, blocking::Response, header::CONTENT_TYPE};

use super::{NetError, NetParams};
use crate::{
    grid::{decode_data, CalibrationRecord, GridCell, GridManifest, PutAck},
    tc::Directive,
    tlm::Telemetry,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

pub const HEALTH_PATH: &str = "/health";
pub const MANIFEST_PATH: &str = "/grid/manifest";
pub const IMAGE_PATH: &str = "/grid/image";
pub const CALIBRATION_PATH: &str = "/grid/coordinates/json";
pub const OBSTACLES_PATH: &str = "/grid/obstacles";
pub const OBSTACLES_JSON_PATH: &str = "/grid/obstacles/json";
pub const PATH_PATH: &str = "/grid/path";
pub const PATH_JSON_PATH: &str = "/grid/path/json";
pub const CURRENT_VALUES_PATH: &str = "/current-values";
pub const DIRECTIONS_PATH: &str = "/directions";

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// The operations offered by the server.
///
/// Replacement operations always carry the full set, never a diff.
pub trait ServerApi: Send {
    /// Connectivity check, returns the body of the health resource.
    fn health(&self) -> Result<String, NetError>;

    fn manifest(&self) -> Result<GridManifest, NetError>;

    /// Raw bytes of the field image.
    fn grid_image(&self) -> Result<Vec<u8>, NetError>;

    fn calibration(&self) -> Result<Vec<CalibrationRecord>, NetError>;

    fn obstacles(&self) -> Result<Vec<GridCell>, NetError>;

    fn put_obstacles(&self, cells: &[GridCell]) -> Result<PutAck, NetError>;

    fn path(&self) -> Result<Vec<GridCell>, NetError>;

    fn put_path(&self, cells: &[GridCell]) -> Result<PutAck, NetError>;

    fn current_values(&self) -> Result<Telemetry, NetError>;

    /// Push a directive, returns the server's text acknowledgement.
    fn put_directions(&self, directive: &Directive) -> Result<String, NetError>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// [`ServerApi`] implementation over HTTP.
pub struct RestClient {
    client: Client,
    params: NetParams,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RestClient {
    pub fn new(params: &NetParams) -> Result<Self, NetError> {
        let client = Client::builder()
            .timeout(Duration::from_secs_f64(params.request_timeout_s.max(0.1)))
            .build()
            .map_err(NetError::ClientBuildError)?;

        Ok(Self {
            client,
            params: params.clone(),
        })
    }

    fn get(&self, path: &str) -> Result<Response, NetError> {
        let url = self.params.url(path);
        trace!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| NetError::RequestError(url.clone(), e))?;

        check_status(url, response)
    }

    fn get_text(&self, path: &str) -> Result<String, NetError> {
        self.get(path)?
            .text()
            .map_err(|e| NetError::BodyError(self.params.url(path), e))
    }

    fn put_cells(&self, path: &str, cells: &[GridCell]) -> Result<PutAck, NetError> {
        let url = self.params.url(path);
        trace!("PUT {} ({} cells)", url, cells.len());

        let response = self
            .client
            .put(&url)
            .json(cells)
            .send()
            .map_err(|e| NetError::RequestError(url.clone(), e))?;

        let text = check_status(url.clone(), response)?
            .text()
            .map_err(|e| NetError::BodyError(url, e))?;

        // The ack is informational only, an unexpected body is not a failure
        Ok(serde_json::from_str(&text).unwrap_or_default())
    }
}

impl ServerApi for RestClient {
    fn health(&self) -> Result<String, NetError> {
        self.get_text(HEALTH_PATH).map(|t| t.trim().to_string())
    }

    fn manifest(&self) -> Result<GridManifest, NetError> {
        let text = self.get_text(MANIFEST_PATH)?;
        serde_json::from_str(&text).map_err(|e| {
            NetError::Malformed(self.params.url(MANIFEST_PATH), crate::WireError::InvalidJson(e))
        })
    }

    fn grid_image(&self) -> Result<Vec<u8>, NetError> {
        self.get(IMAGE_PATH)?
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| NetError::BodyError(self.params.url(IMAGE_PATH), e))
    }

    fn calibration(&self) -> Result<Vec<CalibrationRecord>, NetError> {
        let text = self.get_text(CALIBRATION_PATH)?;
        decode_data(&text).map_err(|e| NetError::Malformed(self.params.url(CALIBRATION_PATH), e))
    }

    fn obstacles(&self) -> Result<Vec<GridCell>, NetError> {
        let text = self.get_text(OBSTACLES_JSON_PATH)?;
        decode_data(&text)
            .map_err(|e| NetError::Malformed(self.params.url(OBSTACLES_JSON_PATH), e))
    }

    fn put_obstacles(&self, cells: &[GridCell]) -> Result<PutAck, NetError> {
        self.put_cells(OBSTACLES_PATH, cells)
    }

    fn path(&self) -> Result<Vec<GridCell>, NetError> {
        let text = self.get_text(PATH_JSON_PATH)?;
        decode_data(&text).map_err(|e| NetError::Malformed(self.params.url(PATH_JSON_PATH), e))
    }

    fn put_path(&self, cells: &[GridCell]) -> Result<PutAck, NetError> {
        self.put_cells(PATH_PATH, cells)
    }

    fn current_values(&self) -> Result<Telemetry, NetError> {
        let text = self.get_text(CURRENT_VALUES_PATH)?;
        Ok(Telemetry::from_text(&text))
    }

    fn put_directions(&self, directive: &Directive) -> Result<String, NetError> {
        let url = self.params.url(DIRECTIONS_PATH);
        trace!("PUT {} ({})", url, directive);

        let response = self
            .client
            .put(&url)
            .header(CONTENT_TYPE, "text/plain")
            .body(directive.to_text())
            .send()
            .map_err(|e| NetError::RequestError(url.clone(), e))?;

        check_status(url.clone(), response)?
            .text()
            .map_err(|e| NetError::BodyError(url, e))
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn check_status(url: String, response: Response) -> Result<Response, NetError> {
    let status = response.status();

    if status.is_success() {
        Ok(response)
    } else {
        Err(NetError::BadStatus(url, status.as_u16()))
    }
}
