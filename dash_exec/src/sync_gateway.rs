//! # Sync gateway
//!
//! Background worker which exchanges model state with the server, so that the main loop never
//! waits on the network. Requests are queued to the worker and served in order, responses are
//! collected by [`SyncGateway::poll`] once per cycle.
//!
//! All payloads are validated and converted here. Server cells are `{r, c}` while local grid
//! positions are `{x, y}`, with `x` the column and `y` the row. A payload of the wrong shape is
//! replaced by an empty set and reported, it never reaches the models as is.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    sync::mpsc::{channel, Receiver, Sender},
    thread,
};

use comms_if::{
    grid::{CalibrationRecord, GridCell, GridManifest, PutAck},
    net::{NetError, ServerApi},
    tc::Directive,
    tlm::Telemetry,
};
use image::GenericImageView;
use log::{debug, trace};

use crate::{
    grid_model::{CalibrationPoint, GridModel, ObstacleCell},
    path_model::Waypoint,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct SyncGateway {
    request_tx: Sender<WorkerMsg>,
    response_rx: Receiver<GatewayResponse>,
    join_handle: Option<thread::JoinHandle<()>>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum GatewayRequest {
    /// Fetch the image, calibration, obstacles and path
    FetchAll,

    FetchObstacles,

    FetchPath,

    /// Replace the server's path with this full ordered set
    PushPath(Vec<GridCell>),

    /// Replace the server's obstacles with this full set
    PushObstacles(Vec<GridCell>),

    PollTelemetry,

    PushDirective(Directive),

    Health,

    Manifest,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GatewayResponse {
    ImageSize { width: u32, height: u32 },

    Calibration(Vec<CalibrationPoint>),

    Obstacles(Vec<ObstacleCell>),

    Path(Vec<Waypoint>),

    PathPushed(PutAck),

    ObstaclesPushed(PutAck),

    Telemetry(Telemetry),

    DirectiveSent { directive: Directive, ack: String },

    Health(String),

    Manifest(GridManifest),

    /// A request failed, nothing was changed
    Failed { op: &'static str, error: String },

    /// The server's payload was malformed, an empty set was used in its place
    Malformed { op: &'static str, error: String },
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("The gateway worker has stopped")]
    WorkerStopped,
}

enum WorkerMsg {
    Request(GatewayRequest),
    Stop,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SyncGateway {
    /// Start the worker, which takes ownership of the server connection.
    pub fn new(api: Box<dyn ServerApi>) -> Self {
        let (request_tx, request_rx) = channel();
        let (response_tx, response_rx) = channel();

        let join_handle = thread::spawn(move || worker(api, request_rx, response_tx));

        Self {
            request_tx,
            response_rx,
            join_handle: Some(join_handle),
        }
    }

    pub fn send(&self, request: GatewayRequest) -> Result<(), GatewayError> {
        trace!("Gateway request: {:?}", request);
        self.request_tx
            .send(WorkerMsg::Request(request))
            .map_err(|_| GatewayError::WorkerStopped)
    }

    /// Drain all responses received since the last call.
    pub fn poll(&self) -> Vec<GatewayResponse> {
        self.response_rx.try_iter().collect()
    }
}

impl Drop for SyncGateway {
    fn drop(&mut self) {
        self.request_tx.send(WorkerMsg::Stop).ok();

        if let Some(jh) = self.join_handle.take() {
            jh.join().ok();
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

pub fn waypoint_to_cell(w: &Waypoint) -> GridCell {
    GridCell::new(w.y.round() as i32, w.x.round() as i32)
}

pub fn cell_to_waypoint(c: &GridCell) -> Waypoint {
    Waypoint::new(c.c as f64, c.r as f64)
}

pub fn obstacle_to_cell(o: &ObstacleCell) -> GridCell {
    GridCell::new(o.row, o.col)
}

pub fn cell_to_obstacle(c: &GridCell) -> ObstacleCell {
    ObstacleCell::new(c.r, c.c)
}

pub fn record_to_calibration(r: &CalibrationRecord) -> CalibrationPoint {
    CalibrationPoint {
        row: r.row,
        col: r.col,
        x: r.x,
        y: r.y,
    }
}

/// Payload of a path push.
pub fn path_payload(waypoints: &[Waypoint]) -> Vec<GridCell> {
    waypoints.iter().map(waypoint_to_cell).collect()
}

/// Payload of an obstacle push.
pub fn obstacles_payload(grid: &GridModel) -> Vec<GridCell> {
    grid.obstacles().map(obstacle_to_cell).collect()
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn worker(
    api: Box<dyn ServerApi>,
    request_rx: Receiver<WorkerMsg>,
    response_tx: Sender<GatewayResponse>,
) {
    while let Ok(WorkerMsg::Request(request)) = request_rx.recv() {
        for response in serve(api.as_ref(), request) {
            if response_tx.send(response).is_err() {
                return;
            }
        }
    }

    debug!("Gateway worker stopped");
}

fn serve(api: &dyn ServerApi, request: GatewayRequest) -> Vec<GatewayResponse> {
    match request {
        GatewayRequest::FetchAll => {
            let mut responses = vec![fetch_image(api)];
            responses.extend(fetch_list(
                "fetch calibration",
                api.calibration(),
                |records| {
                    GatewayResponse::Calibration(
                        records.iter().map(record_to_calibration).collect(),
                    )
                },
            ));
            responses.extend(serve(api, GatewayRequest::FetchObstacles));
            responses.extend(serve(api, GatewayRequest::FetchPath));
            responses
        }

        GatewayRequest::FetchObstacles => fetch_list(
            "fetch obstacles",
            api.obstacles(),
            |cells| GatewayResponse::Obstacles(cells.iter().map(cell_to_obstacle).collect()),
        ),

        GatewayRequest::FetchPath => fetch_list("fetch path", api.path(), |cells| {
            GatewayResponse::Path(cells.iter().map(cell_to_waypoint).collect())
        }),

        GatewayRequest::PushPath(cells) => vec![match api.put_path(&cells) {
            Ok(ack) => GatewayResponse::PathPushed(ack),
            Err(e) => failed("push path", e),
        }],

        GatewayRequest::PushObstacles(cells) => vec![match api.put_obstacles(&cells) {
            Ok(ack) => GatewayResponse::ObstaclesPushed(ack),
            Err(e) => failed("push obstacles", e),
        }],

        GatewayRequest::PollTelemetry => vec![match api.current_values() {
            Ok(tlm) => GatewayResponse::Telemetry(tlm),
            Err(e) => failed("poll telemetry", e),
        }],

        GatewayRequest::PushDirective(directive) => vec![match api.put_directions(&directive) {
            Ok(ack) => GatewayResponse::DirectiveSent { directive, ack },
            Err(e) => failed("push directive", e),
        }],

        GatewayRequest::Health => vec![match api.health() {
            Ok(h) => GatewayResponse::Health(h),
            Err(e) => failed("health check", e),
        }],

        GatewayRequest::Manifest => vec![match api.manifest() {
            Ok(m) => GatewayResponse::Manifest(m),
            Err(e) => failed("fetch manifest", e),
        }],
    }
}

fn fetch_image(api: &dyn ServerApi) -> GatewayResponse {
    let bytes = match api.grid_image() {
        Ok(b) => b,
        Err(e) => return failed("fetch image", e),
    };

    // Only the natural size is needed, drawing is left to whatever displays the scene
    match image::load_from_memory(&bytes) {
        Ok(img) => {
            let (width, height) = img.dimensions();
            GatewayResponse::ImageSize { width, height }
        }
        Err(e) => GatewayResponse::Failed {
            op: "decode image",
            error: e.to_string(),
        },
    }
}

/// Convert a fetched list, falling back to an empty list if the payload was malformed.
fn fetch_list<T, F>(
    op: &'static str,
    result: Result<Vec<T>, NetError>,
    convert: F,
) -> Vec<GatewayResponse>
where
    F: Fn(&[T]) -> GatewayResponse,
{
    match result {
        Ok(list) => vec![convert(list.as_slice())],
        Err(NetError::Malformed(url, e)) => vec![
            GatewayResponse::Malformed {
                op,
                error: format!("{}: {}", url, e),
            },
            convert(Vec::new().as_slice()),
        ],
        Err(e) => vec![failed(op, e)],
    }
}

fn failed(op: &'static str, error: NetError) -> GatewayResponse {
    GatewayResponse::Failed {
        op,
        error: error.to_string(),
    }
}
