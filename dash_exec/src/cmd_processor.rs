//! # Command processor module
//!
//! The command processor handles console commands coming from any source.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use log::{debug, info};
use nalgebra::Point2;

// Internal
use comms_if::{net::WsClient, tc::Directive};
use dash_lib::{
    console::ConsoleCmd,
    data_store::{DataStore, Severity},
    path_file,
    sync_gateway::{self, GatewayRequest},
};
use util::session::Session;

use crate::Links;

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Execute a console command.
///
/// Edits are applied to the local models first, the resulting push is then queued on the
/// gateway.
pub(crate) fn exec(ds: &mut DataStore, links: &mut Links, session: &Session, cmd: ConsoleCmd) {
    debug!("Executing {:?}", cmd);

    let push = match cmd {
        ConsoleCmd::Mode { mode } => {
            let outcome = ds.ctrl.set_mode(mode);
            ds.apply_edit(Ok(outcome))
        }
        ConsoleCmd::Down { x, y } => {
            let outcome = ds.ctrl.pointer_down(Point2::new(x, y));
            ds.apply_edit(Ok(outcome))
        }
        ConsoleCmd::Move { x, y } => {
            let result = ds.ctrl.pointer_move(Point2::new(x, y));
            ds.apply_edit(result)
        }
        ConsoleCmd::Up { x, y } => {
            let result = ds.ctrl.pointer_up(Point2::new(x, y));
            ds.apply_edit(result)
        }
        ConsoleCmd::Click { x, y } => {
            let result = ds.ctrl.click(Point2::new(x, y));
            ds.apply_edit(result)
        }
        ConsoleCmd::Delete { index } => {
            let result = ds.ctrl.delete_waypoint(index);
            ds.apply_edit(result)
        }
        ConsoleCmd::Clear => {
            let outcome = ds.ctrl.clear_path();
            ds.apply_edit(Ok(outcome))
        }
        ConsoleCmd::Import { path } => match path_file::read_path(&path) {
            Ok(waypoints) => {
                let outcome = ds.ctrl.import_path(waypoints);
                ds.apply_edit(Ok(outcome))
            }
            Err(e) => {
                ds.notify(
                    Severity::Error,
                    format!("Could not import {}: {}", path.display(), e),
                );
                None
            }
        },
        ConsoleCmd::Export { path } => {
            let waypoints = ds.ctrl.path().waypoints().to_vec();

            match path {
                Some(p) => match path_file::write_path(&p, &waypoints) {
                    Ok(()) => info!("Path written to {}", p.display()),
                    Err(e) => ds.notify(
                        Severity::Error,
                        format!("Could not export to {}: {}", p.display(), e),
                    ),
                },
                None => {
                    session.save_with_timestamp("path.json", waypoints.clone());
                    info!("Path archived in the session");
                }
            }

            // Exporting is also how a failed push is retried
            Some(GatewayRequest::PushPath(sync_gateway::path_payload(&waypoints)))
        }
        ConsoleCmd::Progress { value } => {
            ds.playback.pause();
            ds.playback.set_progress(value);
            info!(
                "Progress {:.1}, agent at {}",
                ds.playback.progress(),
                ds.progress_frame().position
            );
            None
        }
        ConsoleCmd::Play => {
            ds.playback.play();
            info!("Playback running from {:.1}", ds.playback.progress());
            None
        }
        ConsoleCmd::Pause => {
            ds.playback.pause();
            info!("Playback paused at {:.1}", ds.playback.progress());
            None
        }
        ConsoleCmd::Stop => {
            ds.playback.stop();
            Some(GatewayRequest::PushDirective(Directive::Stop))
        }
        ConsoleCmd::Drive {
            turn_left_deg,
            speed,
        } => Some(GatewayRequest::PushDirective(Directive::Drive {
            turn_left_deg,
            speed,
        })),
        ConsoleCmd::Fetch => Some(GatewayRequest::FetchAll),
        ConsoleCmd::Connect => {
            match links.ws {
                Some(_) => info!("The real-time channel is already open"),
                None => {
                    info!("Opening the real-time channel");
                    links.ws = Some(WsClient::new(&links.net_params));
                }
            }
            None
        }
        ConsoleCmd::Disconnect => {
            match links.ws.take() {
                Some(ws) => {
                    ws.disconnect();
                    ds.ws_connected = false;
                    info!("Real-time channel closed");
                }
                None => info!("The real-time channel is not open"),
            }
            None
        }
        ConsoleCmd::Viewport { width, height } => {
            let size = width.zip(height);
            ds.ctrl.set_viewport_size(size);

            let frame = ds.ctrl.frame();
            info!(
                "Viewport is {:.0} x {:.0} px",
                frame.viewport_width, frame.viewport_height
            );
            None
        }
        ConsoleCmd::Show { save } => {
            match ds.scene() {
                Ok(scene) => {
                    println!("{}", scene);
                    if save {
                        session.save_with_timestamp("scene.json", scene);
                    }
                }
                Err(e) => ds.notify(Severity::Warning, format!("Nothing to show: {}", e)),
            }
            None
        }
        ConsoleCmd::Tlm => {
            print_tlm(ds);
            None
        }
        ConsoleCmd::Status => {
            print_status(ds, links);
            Some(GatewayRequest::Health)
        }
        ConsoleCmd::Manifest => Some(GatewayRequest::Manifest),
        ConsoleCmd::Quit => {
            info!("Quit requested");
            ds.quit = true;
            None
        }
    };

    if let Some(request) = push {
        if let Err(e) = links.gateway.send(request) {
            ds.notify(Severity::Error, format!("Request not sent: {}", e));
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn print_tlm(ds: &DataStore) {
    match (&ds.tlm, ds.tlm_received) {
        (Some(tlm), Some(received)) => {
            let age_ms = chrono::Utc::now()
                .signed_duration_since(received)
                .num_milliseconds();
            println!("{}", tlm);
            println!("Received {:.1} s ago", age_ms as f64 * 0.001);
        }
        _ => println!("No telemetry received yet"),
    }

    if let Some(d) = &ds.directions {
        println!("Server directive: {}", d.replace('\n', " "));
    }
}

fn print_status(ds: &mut DataStore, links: &Links) {
    let frame = ds.ctrl.frame();

    println!("Server: {}", links.net_params.server_url);
    println!(
        "Real-time channel: {}",
        match (&links.ws, ds.ws_connected) {
            (None, _) => "closed",
            (Some(_), true) => "connected",
            (Some(_), false) => "connecting",
        }
    );
    println!(
        "Image: {:.0} x {:.0} px, viewport {:.0} x {:.0} px",
        frame.image_width, frame.image_height, frame.viewport_width, frame.viewport_height
    );
    println!(
        "Calibration points: {}, obstacles: {}, waypoints: {}",
        ds.ctrl.grid().num_calibration_points(),
        ds.ctrl.grid().num_obstacles(),
        ds.ctrl.path().len()
    );
    println!(
        "Mode: {}, playback {:.1} ({})",
        ds.ctrl.mode(),
        ds.playback.progress(),
        if ds.playback.is_running() {
            "running"
        } else {
            "paused"
        }
    );

    if let Some(n) = ds.persistent_notice() {
        println!("{}", n);
    }

    let notices = ds.take_notices();
    if !notices.is_empty() {
        println!("Notices since the last status:");
        for n in notices {
            println!("  [{:?}] {}", n.severity, n.text);
        }
    }
}
