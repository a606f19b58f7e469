//! Main dashboard executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise the session, parameters and network links
//!     - Main loop:
//!         - Command acquisition, from the console or a script
//!         - Command processing, edits are applied locally then pushed
//!         - Gateway responses and real-time messages applied to the data store
//!         - Playback stepping and telemetry polling
//!         - Telemetry archiving
//!
//! The models are only ever touched by this loop. The console, the gateway and the real-time
//! channel each run on their own thread and exchange messages with the loop.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod cmd_processor;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{debug, info, warn};
use rustyline::{error::ReadlineError, DefaultEditor};
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use structopt::StructOpt;

// Internal
use comms_if::net::{NetParams, RestClient, WsClient};
use dash_lib::{
    console::ConsoleCmd,
    data_store::{DataStore, TlmArchRecord},
    params::DashExecParams,
    sync_gateway::{GatewayRequest, SyncGateway},
};
use util::{
    archive::Archiver,
    host,
    logger::{logger_init, LevelFilter},
    script_interpreter::{PendingCmds, ScriptInterpreter},
    session::Session,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

const PROMPT: &str = "circe $ ";

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "dash_exec", about = "CirceBot operator dashboard")]
struct Opts {
    /// Timed command script to run instead of the interactive console
    #[structopt(parse(from_os_str))]
    script: Option<PathBuf>,

    /// Show debug messages on the console
    #[structopt(short, long)]
    verbose: bool,
}

/// The executable's links to the server.
pub(crate) struct Links {
    pub gateway: SyncGateway,
    pub ws: Option<WsClient>,
    pub net_params: NetParams,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Various sources for the commands incoming to the exec.
enum CmdSource {
    Console {
        line_rx: Receiver<String>,
        join_handle: JoinHandle<()>,
    },
    Script(ScriptInterpreter),
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opts = Opts::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("dash_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    let console_level = if opts.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    logger_init(LevelFilter::Trace, console_level, &session)
        .wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("CirceBot Dashboard Executable\n");
    info!("Running on: {}", host::get_hostname());
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let net_params: NetParams =
        util::params::load("net.toml").wrap_err("Could not load net params")?;

    let exec_params: DashExecParams =
        util::params::load("dash_exec.toml").wrap_err("Could not load exec params")?;
    exec_params.validate().wrap_err("Invalid exec params")?;

    info!("Exec parameters loaded");

    // ---- INITIALISE COMMAND SOURCE ----

    let mut cmd_source = match opts.script {
        Some(ref path) => {
            info!("Loading script from {:?}", path);

            let si = ScriptInterpreter::new(path).wrap_err("Failed to load script")?;

            info!(
                "Loaded script lasts {:.02} s and contains {} commands\n",
                si.get_duration(),
                si.get_num_cmds()
            );

            CmdSource::Script(si)
        }
        None => {
            info!("No script provided, commands will be read from the console\n");

            let history_path = match exec_params.history_file {
                Some(ref f) => Some(
                    host::get_sw_root()
                        .wrap_err("Could not get the software root")?
                        .join(f),
                ),
                None => None,
            };

            let (line_rx, join_handle) = spawn_console(history_path);

            CmdSource::Console {
                line_rx,
                join_handle,
            }
        }
    };

    // ---- INITIALISE DATASTORE ----

    let mut ds = DataStore::new(&exec_params);

    let mut tlm_archiver =
        Archiver::from_path(&session, "tlm.csv").wrap_err("Failed to create the tlm archive")?;

    // ---- INITIALISE NETWORK ----

    info!("Initialising network");

    let rest_client =
        RestClient::new(&net_params).wrap_err("Failed to initialise the RestClient")?;

    let mut links = Links {
        gateway: SyncGateway::new(Box::new(rest_client)),
        ws: None,
        net_params,
    };
    info!("SyncGateway initialised for {}", links.net_params.server_url);

    if exec_params.connect_on_start {
        links.ws = Some(WsClient::new(&links.net_params));
        info!("WsClient initialised");
    }

    links
        .gateway
        .send(GatewayRequest::FetchAll)
        .wrap_err("Could not request the initial state")?;

    info!("Network initialisation complete");

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let mut last_tlm_poll_s = std::f64::NEG_INFINITY;
    let mut last_persistent_notice = None;

    loop {
        // Get cycle start time
        let cycle_start_instant = Instant::now();

        ds.cycle_start();

        // ---- COMMAND PROCESSING ----

        let lines = match cmd_source {
            CmdSource::Console { ref line_rx, .. } => {
                let mut lines = vec![];
                loop {
                    match line_rx.try_recv() {
                        Ok(l) => lines.push(l),
                        Err(TryRecvError::Empty) => break,
                        Err(TryRecvError::Disconnected) => {
                            warn!("Console closed");
                            lines.push("quit".into());
                            break;
                        }
                    }
                }
                lines
            }
            CmdSource::Script(ref mut si) => match si.get_pending_cmds(ds.elapsed_s) {
                PendingCmds::None => vec![],
                PendingCmds::Some(lines) => lines,
                PendingCmds::EndOfScript => {
                    info!("End of command script reached, stopping");
                    vec!["quit".into()]
                }
            },
        };

        for line in lines {
            match ConsoleCmd::parse_line(&line) {
                Ok(Some(cmd)) => cmd_processor::exec(&mut ds, &mut links, &session, cmd),
                Ok(None) => (),
                Err(e) => warn!("Invalid command \"{}\":\n{}", line.trim(), e.message),
            }
        }

        // ---- NETWORK INPUT ----

        for response in links.gateway.poll() {
            ds.handle_response(response);
        }

        if let Some(ref ws) = links.ws {
            for event in ws.poll() {
                ds.handle_ws_event(event);
            }
        }

        match (ds.persistent_notice(), last_persistent_notice) {
            (Some(n), None) => warn!("{}", n),
            (None, Some(_)) => info!("Editing available"),
            _ => (),
        }
        last_persistent_notice = ds.persistent_notice();

        // ---- TELEMETRY ----

        let poll_period_s = links.net_params.tlm_poll_period_s;
        if poll_period_s > 0.0 && ds.elapsed_s - last_tlm_poll_s >= poll_period_s {
            last_tlm_poll_s = ds.elapsed_s;

            if let Err(e) = links.gateway.send(GatewayRequest::PollTelemetry) {
                warn!("Could not poll telemetry: {}", e);
            }
        }

        // ---- WRITE ARCHIVES ----

        if ds.tlm_updated {
            if let Some(ref tlm) = ds.tlm {
                if let Err(e) = tlm_archiver.serialise(TlmArchRecord::new(ds.elapsed_s, tlm)) {
                    warn!("Could not archive telemetry: {}", e);
                }
            }
        }

        if ds.quit {
            break;
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match Duration::from_secs_f64(exec_params.cycle_period_s).checked_sub(cycle_dur) {
            Some(d) => {
                ds.num_consec_cycle_overruns = 0;
                thread::sleep(d);
            }
            None => {
                warn!(
                    "Cycle overran by {:.06} s",
                    cycle_dur.as_secs_f64() - exec_params.cycle_period_s
                );
                ds.num_consec_cycle_overruns += 1;
            }
        }

        // Increment cycle counter
        ds.num_cycles += 1;
    }

    // ---- SHUTDOWN ----

    info!("Shutting down after {} cycles", ds.num_cycles);

    if let Some(ws) = links.ws.take() {
        ws.disconnect();
    }
    drop(links);

    if let CmdSource::Console { join_handle, .. } = cmd_source {
        if join_handle.join().is_err() {
            warn!("Console thread panicked");
        }
    }

    session.exit();

    info!("End of execution");

    Ok(())
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Read console lines on a background thread until the operator quits.
fn spawn_console(history_path: Option<PathBuf>) -> (Receiver<String>, JoinHandle<()>) {
    let (line_tx, line_rx) = channel();

    let join_handle = thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                warn!("Could not start the console: {}", e);
                return;
            }
        };

        if let Some(ref p) = history_path {
            if rl.load_history(p).is_err() {
                debug!("No console history at {:?}", p);
            }
        }

        loop {
            let line = match rl.readline(PROMPT) {
                Ok(line) => line,
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => "quit".into(),
                Err(e) => {
                    warn!("Console error: {}", e);
                    "quit".into()
                }
            };

            if !line.trim().is_empty() {
                rl.add_history_entry(line.as_str()).ok();
            }

            let quit = matches!(ConsoleCmd::parse_line(&line), Ok(Some(ConsoleCmd::Quit)));

            if line_tx.send(line).is_err() || quit {
                break;
            }
        }

        if let Some(ref p) = history_path {
            if let Err(e) = rl.save_history(p) {
                warn!("Could not save the console history: {}", e);
            }
        }
    });

    (line_rx, join_handle)
}
