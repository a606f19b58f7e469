//! # Real-time channel client
//!
//! A background thread holds the WebSocket open, parses each text frame into a [`WsMessage`] and
//! forwards it, together with connection events, over a channel. When the connection closes the
//! thread waits a fixed period and connects again, until the client is disconnected or dropped.
//!
//! Only plain `ws://` is supported. A server URL with any other scheme stops the thread at once.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    io::ErrorKind,
    net::{TcpStream, ToSocketAddrs},
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{channel, Receiver, Sender},
        Arc,
    },
    thread,
    time::Duration,
};

use log::debug;
use tungstenite::{http::Uri, Message, WebSocket};

use super::NetParams;
use crate::ws::WsMessage;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Read timeout on the socket, bounds how long the thread takes to notice a shutdown.
const READ_TIMEOUT: Duration = Duration::from_millis(100);

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A WebSocket client which is monitored and reconnects by itself.
pub struct WsClient {
    join_handle: Option<thread::JoinHandle<()>>,

    event_rx: Receiver<WsEvent>,

    shutdown: Arc<AtomicBool>,

    connected: Arc<AtomicBool>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Something which happened on the real-time channel.
#[derive(Debug, Clone, PartialEq)]
pub enum WsEvent {
    Connected,

    Disconnected { reason: String },

    ConnectFailed(String),

    ReconnectScheduled { in_s: f64 },

    /// The client gave up and will not reconnect
    Stopped { reason: String },

    Message(WsMessage),

    /// A frame which couldn't be parsed, with a description of the problem
    Malformed(String),
}

/// Why the connection loop ended.
enum LinkEnd {
    Shutdown,
    Lost(String),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl WsClient {
    /// Start the client, connection happens in the background.
    pub fn new(params: &NetParams) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let connected = Arc::new(AtomicBool::new(false));
        let (event_tx, event_rx) = channel();

        let url = params.ws_url();
        let connect_timeout = Duration::from_secs_f64(params.request_timeout_s.max(0.1));
        let reconnect_period_s = params.ws_reconnect_period_s.max(0.0);

        let shutdown_clone = shutdown.clone();
        let connected_clone = connected.clone();

        let join_handle = thread::spawn(move || {
            run_link(
                url,
                connect_timeout,
                reconnect_period_s,
                shutdown_clone,
                connected_clone,
                event_tx,
            )
        });

        Self {
            join_handle: Some(join_handle),
            event_rx,
            shutdown,
            connected,
        }
    }

    /// Return if the socket is connected or not.
    pub fn connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    /// Drain all events received since the last call.
    pub fn poll(&self) -> Vec<WsEvent> {
        self.event_rx.try_iter().collect()
    }

    /// Close the connection and stop reconnecting.
    pub fn disconnect(self) {
        drop(self)
    }
}

impl Drop for WsClient {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);

        if let Some(jh) = self.join_handle.take() {
            jh.join().ok();
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn run_link(
    url: String,
    connect_timeout: Duration,
    reconnect_period_s: f64,
    shutdown: Arc<AtomicBool>,
    connected: Arc<AtomicBool>,
    event_tx: Sender<WsEvent>,
) {
    if let Err(reason) = check_scheme(&url) {
        event_tx.send(WsEvent::Stopped { reason }).ok();
        return;
    }

    while !shutdown.load(Ordering::Relaxed) {
        let event = match open(&url, connect_timeout) {
            Ok(mut socket) => {
                debug!("Real-time channel connected to {}", url);
                connected.store(true, Ordering::Relaxed);
                if event_tx.send(WsEvent::Connected).is_err() {
                    return;
                }

                let end = serve(&mut socket, &shutdown, &event_tx);
                connected.store(false, Ordering::Relaxed);

                match end {
                    LinkEnd::Shutdown => return,
                    LinkEnd::Lost(reason) => WsEvent::Disconnected { reason },
                }
            }
            Err(e) => WsEvent::ConnectFailed(e),
        };

        // A dropped receiver means nobody is listening any more
        if event_tx.send(event).is_err()
            || event_tx
                .send(WsEvent::ReconnectScheduled {
                    in_s: reconnect_period_s,
                })
                .is_err()
        {
            return;
        }

        // Wait before reconnecting, checking for a shutdown as we go
        let mut waited_s = 0.0;
        while waited_s < reconnect_period_s {
            if shutdown.load(Ordering::Relaxed) {
                return;
            }
            thread::sleep(READ_TIMEOUT);
            waited_s += READ_TIMEOUT.as_secs_f64();
        }
    }
}

fn parse_uri(url: &str) -> Result<Uri, String> {
    url.parse()
        .map_err(|e| format!("Invalid URL {}: {}", url, e))
}

/// Retrying can't fix a URL the client has no transport for.
fn check_scheme(url: &str) -> Result<(), String> {
    match parse_uri(url)?.scheme_str() {
        Some("ws") => Ok(()),
        _ => Err(format!("Unsupported scheme in {}, only ws:// is supported", url)),
    }
}

/// Open the TCP stream and perform the WebSocket handshake.
fn open(url: &str, connect_timeout: Duration) -> Result<WebSocket<TcpStream>, String> {
    let uri = parse_uri(url)?;

    let host = uri
        .host()
        .ok_or_else(|| format!("No host in {}", url))?;
    let port = uri.port_u16().unwrap_or(80);

    let addrs = (host, port)
        .to_socket_addrs()
        .map_err(|e| format!("Could not resolve {}: {}", host, e))?;

    let mut last_err = format!("No address found for {}", host);
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, connect_timeout) {
            Ok(stream) => {
                let (socket, _) = tungstenite::client(url, stream)
                    .map_err(|e| format!("Handshake with {} failed: {}", url, e))?;

                socket
                    .get_ref()
                    .set_read_timeout(Some(READ_TIMEOUT))
                    .map_err(|e| format!("Could not set the read timeout: {}", e))?;

                return Ok(socket);
            }
            Err(e) => last_err = format!("Could not connect to {}: {}", addr, e),
        }
    }

    Err(last_err)
}

/// Forward frames until the link ends.
fn serve(
    socket: &mut WebSocket<TcpStream>,
    shutdown: &AtomicBool,
    event_tx: &Sender<WsEvent>,
) -> LinkEnd {
    loop {
        if shutdown.load(Ordering::Relaxed) {
            socket.close(None).ok();
            socket.flush().ok();
            return LinkEnd::Shutdown;
        }

        let event = match socket.read() {
            Ok(Message::Text(text)) => match WsMessage::parse(&text) {
                Ok(msg) => WsEvent::Message(msg),
                Err(e) => WsEvent::Malformed(format!("{} (frame: {:?})", e, text)),
            },
            Ok(Message::Close(_)) => return LinkEnd::Lost("closed by the server".into()),
            Ok(_) => continue,
            Err(tungstenite::Error::Io(ref e))
                if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut =>
            {
                continue
            }
            Err(e) => return LinkEnd::Lost(e.to_string()),
        };

        if event_tx.send(event).is_err() {
            socket.close(None).ok();
            return LinkEnd::Shutdown;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::grid::GridCell;
    use std::{net::TcpListener, time::Instant};

    fn wait_for_events(client: &WsClient, count: usize) -> Vec<WsEvent> {
        let start = Instant::now();
        let mut events = vec![];

        while events.len() < count && start.elapsed() < Duration::from_secs(5) {
            events.extend(client.poll());
            thread::sleep(Duration::from_millis(20));
        }

        events
    }

    fn params_for(port: u16) -> NetParams {
        NetParams {
            server_url: format!("http://127.0.0.1:{}", port),
            ws_reconnect_period_s: 0.2,
            request_timeout_s: 1.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_connect_refused_schedules_reconnect() {
        // Bind then release a port so nothing is listening on it
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();

        let client = WsClient::new(&params_for(port));
        let events = wait_for_events(&client, 2);

        assert!(matches!(events[0], WsEvent::ConnectFailed(_)));
        assert_eq!(events[1], WsEvent::ReconnectScheduled { in_s: 0.2 });
        assert!(!client.connected());

        client.disconnect();
    }

    #[test]
    fn test_unsupported_scheme_stops() {
        let params = NetParams {
            server_url: "https://127.0.0.1:1".into(),
            ..params_for(1)
        };

        let client = WsClient::new(&params);
        let events = wait_for_events(&client, 1);

        match &events[0] {
            WsEvent::Stopped { reason } => assert!(reason.contains("https://127.0.0.1:1/ws")),
            other => panic!("Unexpected event {:?}", other),
        }

        // No reconnect is attempted
        thread::sleep(Duration::from_millis(500));
        assert!(client.poll().is_empty());
        assert!(!client.connected());

        client.disconnect();
    }

    #[test]
    fn test_messages_forwarded() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut ws = tungstenite::accept(stream).unwrap();

            ws.send(Message::Text(
                r#"{"type": "waypoints_update", "data": [{"r": 1, "c": 2}]}"#.into(),
            ))
            .unwrap();
            ws.send(Message::Text("garbage".into())).unwrap();
            ws.close(None).unwrap();

            // Let the close handshake complete
            while ws.read().is_ok() {}
        });

        let client = WsClient::new(&params_for(port));
        let events = wait_for_events(&client, 4);
        server.join().unwrap();

        assert_eq!(events[0], WsEvent::Connected);
        match &events[1] {
            WsEvent::Message(WsMessage::WaypointsUpdate(cells)) => {
                assert_eq!(cells.clone().into_cells(), vec![GridCell::new(1, 2)])
            }
            other => panic!("Unexpected event {:?}", other),
        }
        assert!(matches!(events[2], WsEvent::Malformed(_)));
        assert!(matches!(events[3], WsEvent::Disconnected { .. }));

        client.disconnect();
    }
}
