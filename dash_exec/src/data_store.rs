//! # Data Store
//!
//! Everything the dashboard knows, owned by the main loop. Edits, gateway responses and messages
//! from the real-time channel are all applied here, one at a time, so the models are never shared
//! between threads.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use comms_if::{
    grid::GridManifest,
    net::WsEvent,
    tlm::Telemetry,
    ws::WsMessage,
};
use log::{debug, error, info, warn};
use serde::Serialize;

use crate::{
    coord_tf::TransformError,
    grid_model::GridError,
    interaction::{EditError, EditOutcome, InteractionController, SyncAction},
    params::DashExecParams,
    path_model::Waypoint,
    progress::{animate, Playback, ProgressFrame},
    render::Scene,
    sync_gateway::{
        self, cell_to_obstacle, cell_to_waypoint, GatewayRequest, GatewayResponse,
    },
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of notices kept until they are taken, older ones are dropped.
const MAX_QUEUED_NOTICES: usize = 32;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A message for the operator, shown once.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub severity: Severity,
    pub text: String,
}

/// Global data store for the executable.
pub struct DataStore {
    // Cycle management
    /// Number of cycles already executed
    pub num_cycles: u128,

    /// Session elapsed time at the start of this cycle
    pub elapsed_s: f64,

    /// Set by the quit command
    pub quit: bool,

    // Editing
    pub ctrl: InteractionController,

    pub playback: Playback,

    /// Path the robot reports it is executing, in grid coordinates
    pub planned_path: Vec<Waypoint>,

    // Robot state
    pub tlm: Option<Telemetry>,

    /// Time at which `tlm` was received
    pub tlm_received: Option<DateTime<Utc>>,

    /// True if new telemetry arrived this cycle
    pub tlm_updated: bool,

    /// Raw text of the directive currently held by the server
    pub directions: Option<String>,

    // Server state
    pub ws_connected: bool,

    pub health: Option<String>,

    pub manifest: Option<GridManifest>,

    notices: VecDeque<Notice>,

    // Monitoring Counters
    /// Number of consecutive cycle overruns
    pub num_consec_cycle_overruns: u64,
}

/// Telemetry as it is archived, one row per update.
#[derive(Debug, Clone, Serialize)]
pub struct TlmArchRecord {
    pub elapsed_s: f64,
    pub sequence_num: u64,
    pub x_eci: f64,
    pub y_eci: f64,
    pub z_eci: f64,
    pub heading: f64,
    pub battery_pct: f64,
    pub cable_remaining_m: f64,
    pub error_code: i64,
    pub is_moving: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl DataStore {
    pub fn new(params: &DashExecParams) -> Self {
        let mut ctrl = InteractionController::new(params.interaction);
        ctrl.set_viewport_size(params.viewport_size());

        Self {
            num_cycles: 0,
            elapsed_s: 0.0,
            quit: false,
            ctrl,
            playback: Playback::new(params.playback_duration_s),
            planned_path: vec![],
            tlm: None,
            tlm_received: None,
            tlm_updated: false,
            directions: None,
            ws_connected: false,
            health: None,
            manifest: None,
            notices: VecDeque::new(),
            num_consec_cycle_overruns: 0,
        }
    }

    /// Perform actions required at the start of a cycle.
    ///
    /// Advances the playback by the time elapsed since the last cycle.
    pub fn cycle_start(&mut self) {
        let now_s = util::session::get_elapsed_seconds();

        if now_s.is_finite() {
            let dt_s = (now_s - self.elapsed_s).max(0.0);
            self.elapsed_s = now_s;

            self.step_playback(dt_s);
        }

        self.tlm_updated = false;
    }

    /// Advance the playback by `dt_s`, returning `true` only on the step which completes it.
    pub fn step_playback(&mut self, dt_s: f64) -> bool {
        let was_running = self.playback.is_running();
        self.playback.step(dt_s);

        let completed = was_running && !self.playback.is_running();
        if completed {
            info!("Playback complete");
        }

        completed
    }

    /// Queue a notice for the operator and log it.
    pub fn notify<S: Into<String>>(&mut self, severity: Severity, text: S) {
        let text = text.into();

        match severity {
            Severity::Warning => warn!("{}", text),
            Severity::Error => error!("{}", text),
        }

        if self.notices.len() == MAX_QUEUED_NOTICES {
            self.notices.pop_front();
        }
        self.notices.push_back(Notice { severity, text });
    }

    /// Take all notices queued since the last call, oldest first.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    /// The notice shown for as long as editing is impossible.
    pub fn persistent_notice(&self) -> Option<&'static str> {
        if self.ctrl.is_editable() {
            None
        } else if self.ctrl.grid().num_calibration_points() == 0 {
            Some("Loading grid calibration, editing unavailable")
        } else {
            Some("Grid calibration unusable, editing unavailable")
        }
    }

    /// Apply the result of an edit, returning the push it requires.
    ///
    /// The local models have already changed when this is called, a push that later fails is
    /// reported but does not undo the edit.
    pub fn apply_edit(
        &mut self,
        result: Result<EditOutcome, EditError>,
    ) -> Option<GatewayRequest> {
        let outcome = match result {
            Ok(o) => o,
            Err(e) => {
                self.edit_rejected(e);
                return None;
            }
        };

        match outcome {
            EditOutcome::Ignored | EditOutcome::Pressed | EditOutcome::Dragged { .. } => (),
            ref o => info!("{}", describe(o)),
        }

        match outcome.sync_action() {
            SyncAction::None => None,
            SyncAction::PushPath => Some(GatewayRequest::PushPath(sync_gateway::path_payload(
                self.ctrl.path().waypoints(),
            ))),
            SyncAction::PushObstacles => Some(GatewayRequest::PushObstacles(
                sync_gateway::obstacles_payload(self.ctrl.grid()),
            )),
        }
    }

    /// Apply a response from the gateway.
    pub fn handle_response(&mut self, response: GatewayResponse) {
        match response {
            GatewayResponse::ImageSize { width, height } => {
                info!("Field image is {} x {} px", width, height);
                self.ctrl.set_image_size(width as f64, height as f64);
            }
            GatewayResponse::Calibration(points) => {
                let was_editable = self.ctrl.is_editable();

                match self.ctrl.load_calibration(points) {
                    Ok(n) => info!("Loaded {} calibration points", n),
                    Err(GridError::EmptySet) => self.notify(
                        Severity::Error,
                        "The server has no grid calibration, editing is disabled",
                    ),
                }

                if self.ctrl.is_editable() && !was_editable {
                    info!("Grid bounds defined, editing enabled");
                }
            }
            GatewayResponse::Obstacles(cells) => {
                debug!("Fetched {} obstacles", cells.len());
                self.ctrl.apply_remote_obstacles(cells);
            }
            GatewayResponse::Path(waypoints) => {
                debug!("Fetched a path of {} waypoints", waypoints.len());
                self.ctrl.apply_remote_path(waypoints);
            }
            GatewayResponse::PathPushed(ack) => self.check_ack("Path", ack.error),
            GatewayResponse::ObstaclesPushed(ack) => self.check_ack("Obstacle", ack.error),
            GatewayResponse::Telemetry(tlm) => self.set_telemetry(tlm),
            GatewayResponse::DirectiveSent { directive, ack } => {
                info!("Directive {} sent, server replied \"{}\"", directive, ack.trim())
            }
            GatewayResponse::Health(h) => {
                info!("Server health: {}", h.trim());
                self.health = Some(h);
            }
            GatewayResponse::Manifest(m) => {
                info!("Grid manifest:\n{}", m);
                self.manifest = Some(m);
            }
            GatewayResponse::Failed { op, error } => {
                self.notify(Severity::Error, format!("Could not {}: {}", op, error))
            }
            GatewayResponse::Malformed { op, error } => self.notify(
                Severity::Warning,
                format!("Malformed reply to {}, using an empty set: {}", op, error),
            ),
        }
    }

    /// Apply an event from the real-time channel.
    pub fn handle_ws_event(&mut self, event: WsEvent) {
        match event {
            WsEvent::Connected => {
                info!("Real-time channel connected");
                self.ws_connected = true;
            }
            WsEvent::Disconnected { reason } => {
                warn!("Real-time channel lost: {}", reason);
                self.ws_connected = false;
            }
            WsEvent::ConnectFailed(e) => debug!("Real-time channel connection failed: {}", e),
            WsEvent::ReconnectScheduled { in_s } => {
                info!("Reconnecting the real-time channel in {:.1} s", in_s)
            }
            WsEvent::Stopped { reason } => {
                self.ws_connected = false;
                self.notify(
                    Severity::Error,
                    format!("Real-time channel stopped: {}", reason),
                );
            }
            WsEvent::Message(msg) => self.handle_ws_message(msg),
            WsEvent::Malformed(e) => self.notify(
                Severity::Warning,
                format!("Ignored a malformed real-time message: {}", e),
            ),
        }
    }

    /// The progress frame of the current path and playback.
    pub fn progress_frame(&self) -> ProgressFrame {
        animate(self.ctrl.path().waypoints(), self.playback.progress())
    }

    pub fn scene(&self) -> Result<Scene, TransformError> {
        Scene::build(&self.ctrl, &self.progress_frame(), &self.planned_path)
    }

    fn handle_ws_message(&mut self, msg: WsMessage) {
        debug!("Real-time message: {}", msg.type_name());

        match msg {
            WsMessage::CurrentValuesUpdate(payload) => self.set_telemetry(payload.into_telemetry()),
            WsMessage::PathUpdate(cells) => {
                self.planned_path = cells.into_cells().iter().map(cell_to_waypoint).collect();
            }
            WsMessage::DirectionsUpdate(text) => {
                info!("Server directive is now \"{}\"", text.replace('\n', " "));
                self.directions = Some(text);
            }
            WsMessage::ObstaclesUpdate(cells) => self
                .ctrl
                .apply_remote_obstacles(cells.into_cells().iter().map(cell_to_obstacle).collect()),
            WsMessage::WaypointsUpdate(cells) => self
                .ctrl
                .apply_remote_path(cells.into_cells().iter().map(cell_to_waypoint).collect()),
        }
    }

    fn set_telemetry(&mut self, tlm: Telemetry) {
        let was_faulted = self.tlm.as_ref().map(|t| t.is_faulted()).unwrap_or(false);

        if tlm.is_faulted() && !was_faulted {
            self.notify(
                Severity::Error,
                format!("Robot reports error code {}", tlm.error_code),
            );
        }

        self.tlm = Some(tlm);
        self.tlm_received = Some(Utc::now());
        self.tlm_updated = true;
    }

    fn check_ack(&mut self, what: &str, error: Option<String>) {
        match error {
            Some(e) => self.notify(
                Severity::Error,
                format!("{} update rejected by the server: {}", what, e),
            ),
            None => debug!("{} update acknowledged", what),
        }
    }

    fn edit_rejected(&mut self, error: EditError) {
        let text = match error {
            EditError::Transform(TransformError::BoundsUndefined) => {
                "Edit rejected, the grid is not calibrated yet".to_string()
            }
            e => format!("Edit rejected: {}", e),
        };

        self.notify(Severity::Warning, text);
    }
}

impl TlmArchRecord {
    pub fn new(elapsed_s: f64, tlm: &Telemetry) -> Self {
        Self {
            elapsed_s,
            sequence_num: tlm.sequence_num,
            x_eci: tlm.x_eci,
            y_eci: tlm.y_eci,
            z_eci: tlm.z_eci,
            heading: tlm.heading,
            battery_pct: tlm.battery_pct,
            cable_remaining_m: tlm.cable_remaining_m,
            error_code: tlm.error_code,
            is_moving: tlm.is_moving,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn describe(outcome: &EditOutcome) -> String {
    match outcome {
        EditOutcome::WaypointAdded { index, waypoint } => {
            format!("Added waypoint {} at {}", index, waypoint)
        }
        EditOutcome::WaypointMoved { index, from, to } => {
            format!("Moved waypoint {} from {} to {}", index, from, to)
        }
        EditOutcome::WaypointRemoved { index, waypoint } => {
            format!("Removed waypoint {} at {}", index, waypoint)
        }
        EditOutcome::PathCleared => "Path cleared".into(),
        EditOutcome::PathImported { len } => format!("Imported a path of {} waypoints", len),
        EditOutcome::ObstacleToggled { row, col, added } => format!(
            "{} obstacle at r{} c{}",
            if *added { "Added" } else { "Removed" },
            row,
            col
        ),
        EditOutcome::ModeChanged {
            mode,
            drag_cancelled,
        } => format!(
            "{} mode{}",
            mode,
            if *drag_cancelled {
                ", drag cancelled"
            } else {
                ""
            }
        ),
        o => format!("{:?}", o),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        grid_model::{test::lattice, ObstacleCell},
        interaction::EditMode,
        progress::PROGRESS_MAX,
        sync_gateway::test::{png, wait_for, FakeServer},
        sync_gateway::SyncGateway,
    };
    use comms_if::grid::{CalibrationRecord, GridCell};
    use nalgebra::Point2;

    /// A store with the lattice calibration loaded and the viewport at the image's natural size.
    fn store() -> DataStore {
        let mut ds = DataStore::new(&DashExecParams::default());
        ds.handle_response(GatewayResponse::ImageSize {
            width: 600,
            height: 480,
        });
        ds.handle_response(GatewayResponse::Calibration(lattice()));
        ds
    }

    /// Viewport position of a cell of the lattice.
    fn cell_px(col: i32, row: i32) -> Point2<f64> {
        Point2::new(50.0 + 50.0 * col as f64, 480.0 - (30.0 + 50.0 * row as f64))
    }

    #[test]
    fn test_persistent_notice() {
        let mut ds = DataStore::new(&DashExecParams::default());
        assert!(ds.persistent_notice().is_some());

        // Calibration alone is not enough, the image size is needed too
        ds.handle_response(GatewayResponse::Calibration(lattice()));
        assert!(ds.persistent_notice().is_some());

        ds.handle_response(GatewayResponse::ImageSize {
            width: 600,
            height: 480,
        });
        assert_eq!(ds.persistent_notice(), None);

        ds.handle_response(GatewayResponse::Calibration(vec![]));
        assert!(ds.persistent_notice().is_some());
        assert_eq!(ds.take_notices()[0].severity, Severity::Error);
    }

    #[test]
    fn test_edit_pushes() {
        let mut ds = store();

        let result = ds.ctrl.click(cell_px(2, 1));
        assert_eq!(
            ds.apply_edit(result),
            Some(GatewayRequest::PushPath(vec![GridCell::new(1, 2)]))
        );

        ds.ctrl.set_mode(EditMode::Obstacle);
        let result = ds.ctrl.click(cell_px(4, 5));
        assert_eq!(
            ds.apply_edit(result),
            Some(GatewayRequest::PushObstacles(vec![GridCell::new(5, 4)]))
        );

        assert!(ds.take_notices().is_empty());
    }

    #[test]
    fn test_rejected_edit_is_noticed() {
        let mut ds = store();

        let result = ds.ctrl.click(Point2::new(5.0, 5.0));
        assert_eq!(ds.apply_edit(result), None);
        assert!(ds.ctrl.path().is_empty());

        let notices = ds.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].severity, Severity::Warning);
        assert!(ds.take_notices().is_empty());
    }

    #[test]
    fn test_ws_messages() {
        let mut ds = store();

        let msgs = [
            r#"{"type": "waypoints_update", "data": {"data": [{"r": 3, "c": 7}]}}"#,
            r#"{"type": "obstacles_update", "data": [{"r": 1, "c": 1}, {"r": 2, "c": 2}]}"#,
            r#"{"type": "path_update", "data": [{"r": 0, "c": 0}, {"r": 0, "c": 1}]}"#,
            r#"{"type": "current_values_update", "data": "isMoving=true\nerrorCode=4"}"#,
            "TURN_LEFT=10\nSPEED=0.5",
        ];

        for m in msgs.iter() {
            ds.handle_ws_event(WsEvent::Message(WsMessage::parse(m).unwrap()));
        }

        assert_eq!(ds.ctrl.path().waypoints(), &[Waypoint::new(7.0, 3.0)]);
        assert!(ds.ctrl.grid().is_obstacle(2, 2));
        assert_eq!(ds.ctrl.grid().num_obstacles(), 2);
        assert_eq!(ds.planned_path.len(), 2);
        assert_eq!(ds.directions.as_deref(), Some("TURN_LEFT=10\nSPEED=0.5"));

        let tlm = ds.tlm.as_ref().unwrap();
        assert!(tlm.is_moving);
        assert!(ds.tlm_updated);

        // The fault is reported once
        let notices = ds.take_notices();
        assert_eq!(notices.len(), 1);
        assert!(notices[0].text.contains("error code 4"));
    }

    #[test]
    fn test_ws_stopped_is_noticed() {
        let mut ds = store();
        ds.handle_ws_event(WsEvent::Connected);
        assert!(ds.ws_connected);

        ds.handle_ws_event(WsEvent::Stopped {
            reason: "Unsupported scheme in https://circe.local/ws".into(),
        });
        assert!(!ds.ws_connected);

        let notices = ds.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].severity, Severity::Error);
        assert!(notices[0].text.contains("https://circe.local/ws"));
    }

    #[test]
    fn test_remote_path_during_drag() {
        let mut ds = store();
        ds.ctrl.import_path(vec![Waypoint::new(2.0, 1.0)]);

        ds.ctrl.pointer_down(cell_px(2, 1));
        ds.ctrl.pointer_move(cell_px(4, 1)).unwrap();

        ds.handle_ws_event(WsEvent::Message(
            WsMessage::parse(r#"{"type": "waypoints_update", "data": []}"#).unwrap(),
        ));

        // The drag no longer has a waypoint to move
        let result = ds.ctrl.pointer_up(cell_px(4, 1));
        assert_eq!(ds.apply_edit(result), None);
        assert!(ds.ctrl.path().is_empty());
    }

    #[test]
    fn test_failures_keep_local_state() {
        let mut ds = store();

        let result = ds.ctrl.click(cell_px(2, 1));
        ds.apply_edit(result);

        ds.handle_response(GatewayResponse::Failed {
            op: "push path",
            error: "connection refused".into(),
        });
        ds.handle_response(GatewayResponse::Malformed {
            op: "fetch obstacles",
            error: "expected a list".into(),
        });
        ds.handle_response(GatewayResponse::Obstacles(vec![]));

        assert_eq!(ds.ctrl.path().len(), 1);

        let notices = ds.take_notices();
        assert_eq!(notices.len(), 2);
        assert_eq!(notices[0].severity, Severity::Error);
        assert_eq!(notices[1].severity, Severity::Warning);
    }

    #[test]
    fn test_sync_with_server() {
        let server = FakeServer {
            image: png(600, 480),
            calibration: lattice()
                .iter()
                .map(|p| CalibrationRecord {
                    row: p.row,
                    col: p.col,
                    x: p.x,
                    y: p.y,
                })
                .collect(),
            ..Default::default()
        };
        let server_path = server.path.clone();
        let server_obstacles = server.obstacles.clone();

        let gateway = SyncGateway::new(Box::new(server));
        let mut ds = DataStore::new(&DashExecParams::default());

        gateway.send(GatewayRequest::FetchAll).unwrap();
        for r in wait_for(&gateway, 4) {
            ds.handle_response(r);
        }
        assert_eq!(ds.persistent_notice(), None);

        // Last write wins, the server ends up with the final state of both models
        for (col, row) in [(1, 1), (3, 2), (5, 5)].iter() {
            let result = ds.ctrl.click(cell_px(*col, *row));
            if let Some(req) = ds.apply_edit(result) {
                gateway.send(req).unwrap();
            }
        }

        ds.ctrl.set_mode(EditMode::Obstacle);
        let result = ds.ctrl.click(cell_px(6, 6));
        if let Some(req) = ds.apply_edit(result) {
            gateway.send(req).unwrap();
        }

        for r in wait_for(&gateway, 4) {
            ds.handle_response(r);
        }

        assert_eq!(
            *server_path.lock().unwrap(),
            vec![GridCell::new(1, 1), GridCell::new(2, 3), GridCell::new(5, 5)]
        );
        assert_eq!(*server_obstacles.lock().unwrap(), vec![GridCell::new(6, 6)]);
        assert!(ds.ctrl.grid().obstacles().eq([ObstacleCell::new(6, 6)].iter()));
        assert!(ds.take_notices().is_empty());
    }

    #[test]
    fn test_playback_completes_once() {
        let mut ds = DataStore::new(&DashExecParams::default());
        ds.playback.play();

        // A 10 s playback advanced one 50 ms cycle at a time
        for _ in 0..199 {
            assert!(!ds.step_playback(0.05));
            assert!(ds.playback.is_running());
        }

        assert!(ds.step_playback(1.0));
        assert_eq!(ds.playback.progress(), PROGRESS_MAX);
        assert!(!ds.step_playback(0.05));

        // Pausing is not completing
        ds.playback.play();
        ds.step_playback(2.0);
        ds.playback.pause();
        assert!(!ds.step_playback(0.05));
        assert!((ds.playback.progress() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_tlm_arch_record() {
        let tlm = Telemetry {
            sequence_num: 12,
            battery_pct: 80.0,
            ..Default::default()
        };

        let rec = TlmArchRecord::new(1.5, &tlm);
        assert_eq!(rec.sequence_num, 12);
        assert_eq!(rec.battery_pct, 80.0);
        assert_eq!(rec.elapsed_s, 1.5);
    }
}
