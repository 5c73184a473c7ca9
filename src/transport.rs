//! Socket.IO client transport with auto-reconnect.
//!
//! The transport task owns the websocket. It performs the Engine.IO/Socket.IO
//! handshake, answers heartbeats, decodes inbound events and transmits
//! outbound commands. When the link drops it reconnects with the configured
//! backoff.
//!
//! # Lifecycle
//!
//! ```text
//! connect ──handshake ok──> Connected ──link lost──> Disconnected ──backoff──> connect
//!    │                                                                          ▲
//!    └───────────────────────────────failure──────────── backoff ───────────────┘
//! ```
//!
//! Exactly one [`TransportEvent::Connected`] and one
//! [`TransportEvent::Disconnected`] are emitted per established session.
//! Failed attempts that never reached `Connected` emit nothing. Commands that
//! arrive while no session is up are dropped, never queued. The task ends
//! when the command channel closes or the event receiver goes away.

use crate::connection::{ReconnectConfig, ServerAddress};
use crate::error::{ConsoleError, Result};
use crate::protocol::{
    decode_event, EnginePacket, Handshake, InboundEvent, OutboundCommand, SocketPacket,
    SocketPacketKind,
};
use crate::session::TransportEvent;
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, timeout, Instant};
use tokio_tungstenite::tungstenite::Message;

/// Default time allowed for the websocket + Socket.IO handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Transport settings.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Device service address.
    pub address: ServerAddress,
    /// Backoff policy between attempts.
    pub reconnect: ReconnectConfig,
    /// Upper bound on one connect + handshake.
    pub connect_timeout: Duration,
}

impl TransportConfig {
    /// Defaults for `address`.
    #[must_use]
    pub fn new(address: ServerAddress) -> Self {
        Self {
            address,
            reconnect: ReconnectConfig::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

/// What the read side made of one websocket text frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameAction {
    /// Frame to write back immediately (heartbeat pong).
    Reply(String),
    /// Decoded event to forward to the session.
    Deliver(InboundEvent),
    /// Nothing to do.
    Ignore,
    /// The server ended the session.
    Closed(String),
}

/// Interpret one text frame of an established session.
///
/// Undecodable payloads of known events and unknown event names are ignored;
/// only codec-level garbage is an error.
pub fn route_frame(frame: &str) -> Result<FrameAction> {
    match EnginePacket::parse(frame)? {
        EnginePacket::Ping(probe) => Ok(FrameAction::Reply(EnginePacket::Pong(probe).encode())),
        EnginePacket::Close => Ok(FrameAction::Closed("server closed the engine session".into())),
        EnginePacket::Message(payload) => route_socket_packet(&payload),
        EnginePacket::Open(_) | EnginePacket::Pong(_) | EnginePacket::Upgrade | EnginePacket::Noop => {
            Ok(FrameAction::Ignore)
        }
    }
}

fn route_socket_packet(payload: &str) -> Result<FrameAction> {
    let packet = SocketPacket::parse(payload)?;
    match packet.kind {
        SocketPacketKind::Event => {
            let (name, argument) = packet.into_event()?;
            match decode_event(&name, argument) {
                Ok(Some(event)) => Ok(FrameAction::Deliver(event)),
                Ok(None) => {
                    tracing::trace!(event = %name, "Ignoring unknown event");
                    Ok(FrameAction::Ignore)
                }
                Err(e) => {
                    tracing::debug!(event = %name, error = %e, "Dropping malformed event payload");
                    Ok(FrameAction::Ignore)
                }
            }
        }
        SocketPacketKind::Disconnect => {
            Ok(FrameAction::Closed("server disconnected the namespace".into()))
        }
        SocketPacketKind::ConnectError => Ok(FrameAction::Closed(packet.error_message())),
        SocketPacketKind::Connect
        | SocketPacketKind::Ack
        | SocketPacketKind::BinaryEvent
        | SocketPacketKind::BinaryAck => Ok(FrameAction::Ignore),
    }
}

/// Encode a command as a websocket text frame.
pub fn encode_command(command: &OutboundCommand) -> Result<String> {
    SocketPacket::event(command.name(), command.payload()?).to_frame()
}

/// Select the process-wide rustls crypto provider used for `wss://` links.
///
/// A provider installed earlier by the host process is left in place.
pub fn install_tls_provider() {
    if rustls::crypto::CryptoProvider::get_default().is_none() {
        let _ = rustls::crypto::ring::default_provider().install_default();
    }
}

/// Spawn the transport task.
pub fn spawn_transport(
    config: TransportConfig,
    events: mpsc::Sender<TransportEvent>,
    commands: mpsc::Receiver<OutboundCommand>,
) -> JoinHandle<()> {
    tokio::spawn(run_transport(config, events, commands))
}

/// Why a session loop stopped.
enum SessionEnd {
    /// Command channel closed; the console is shutting down.
    Shutdown,
    /// Event receiver dropped.
    ReceiverGone,
    /// Link lost; reconnect.
    Lost(String),
}

async fn run_transport(
    config: TransportConfig,
    events: mpsc::Sender<TransportEvent>,
    mut commands: mpsc::Receiver<OutboundCommand>,
) {
    let url = config.address.socket_url();
    if config.address.is_tls() {
        install_tls_provider();
    }
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        tracing::info!(attempt, url = %url, "Connecting to device service");

        match timeout(config.connect_timeout, open_session(url.as_str())).await {
            Ok(Ok((socket, handshake))) => {
                tracing::info!(sid = %handshake.sid, "Socket.IO session established");
                attempt = 0;

                if events.send(TransportEvent::Connected).await.is_err() {
                    return;
                }

                let end = serve_session(socket, &handshake, &events, &mut commands).await;
                let reason = match end {
                    SessionEnd::Shutdown => {
                        tracing::info!("Transport shutting down");
                        return;
                    }
                    SessionEnd::ReceiverGone => return,
                    SessionEnd::Lost(reason) => reason,
                };

                tracing::warn!(%reason, "Connection lost");
                if events
                    .send(TransportEvent::Disconnected { reason })
                    .await
                    .is_err()
                {
                    return;
                }
                attempt = 1;
            }
            Ok(Err(e)) => {
                tracing::warn!(attempt, error = %e, "Connection attempt failed");
                if !e.is_retriable() {
                    tracing::error!(error = %e, "Not retrying");
                    return;
                }
            }
            Err(_) => {
                tracing::warn!(attempt, timeout = ?config.connect_timeout, "Connection attempt timed out");
            }
        }

        if !config.reconnect.should_retry(attempt) {
            tracing::error!(attempt, "Giving up on the device service");
            return;
        }

        let delay = config.reconnect.delay_for_attempt(attempt);
        tracing::debug!(?delay, "Waiting before reconnect");
        if !idle_until(Instant::now() + delay, &mut commands).await {
            tracing::info!("Transport shutting down");
            return;
        }
    }
}

/// Wait until `deadline`, dropping any commands. Returns `false` if the
/// command channel closed.
async fn idle_until(deadline: Instant, commands: &mut mpsc::Receiver<OutboundCommand>) -> bool {
    let sleep = sleep_until(deadline);
    tokio::pin!(sleep);
    loop {
        tokio::select! {
            () = &mut sleep => return true,
            command = commands.recv() => match command {
                Some(command) => {
                    tracing::warn!(command = command.name(), "Dropping command while disconnected");
                }
                None => return false,
            },
        }
    }
}

type Socket =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Connect and run the Engine.IO open + Socket.IO namespace connect.
async fn open_session(url: &str) -> Result<(Socket, Handshake)> {
    let (mut socket, _response) = tokio_tungstenite::connect_async(url).await?;

    let handshake = loop {
        match next_text(&mut socket).await? {
            Some(frame) => match EnginePacket::parse(&frame)? {
                EnginePacket::Open(handshake) => break handshake,
                other => {
                    return Err(ConsoleError::Handshake(format!(
                        "expected engine open, got {other:?}"
                    )))
                }
            },
            None => return Err(ConsoleError::Handshake("closed before engine open".into())),
        }
    };

    socket
        .send(Message::Text(SocketPacket::connect().to_frame()?))
        .await?;

    loop {
        let Some(frame) = next_text(&mut socket).await? else {
            return Err(ConsoleError::Handshake(
                "closed before namespace connect".into(),
            ));
        };
        match EnginePacket::parse(&frame)? {
            EnginePacket::Ping(probe) => {
                socket
                    .send(Message::Text(EnginePacket::Pong(probe).encode()))
                    .await?;
            }
            EnginePacket::Message(payload) => {
                let packet = SocketPacket::parse(&payload)?;
                match packet.kind {
                    SocketPacketKind::Connect => return Ok((socket, handshake)),
                    SocketPacketKind::ConnectError => {
                        return Err(ConsoleError::Handshake(packet.error_message()))
                    }
                    _ => tracing::trace!(kind = ?packet.kind, "Ignoring packet before namespace connect"),
                }
            }
            EnginePacket::Close => {
                return Err(ConsoleError::Handshake(
                    "server closed during handshake".into(),
                ))
            }
            _ => {}
        }
    }
}

/// Next text frame, skipping control frames. `None` on close.
async fn next_text(socket: &mut Socket) -> Result<Option<String>> {
    while let Some(message) = socket.next().await {
        match message? {
            Message::Text(text) => return Ok(Some(text)),
            Message::Close(_) => return Ok(None),
            Message::Binary(_) | Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
        }
    }
    Ok(None)
}

async fn serve_session(
    socket: Socket,
    handshake: &Handshake,
    events: &mpsc::Sender<TransportEvent>,
    commands: &mut mpsc::Receiver<OutboundCommand>,
) -> SessionEnd {
    let (mut sink, mut stream) = socket.split();
    let window = handshake.liveness_window();
    let mut deadline = Instant::now() + window;

    loop {
        tokio::select! {
            () = sleep_until(deadline) => {
                return SessionEnd::Lost(format!("no heartbeat within {window:?}"));
            }
            message = stream.next() => {
                let text = match message {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => {
                        return SessionEnd::Lost("websocket closed".into());
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => return SessionEnd::Lost(e.to_string()),
                };
                deadline = Instant::now() + window;

                match route_frame(&text) {
                    Ok(FrameAction::Reply(reply)) => {
                        if let Err(e) = sink.send(Message::Text(reply)).await {
                            return SessionEnd::Lost(e.to_string());
                        }
                    }
                    Ok(FrameAction::Deliver(event)) => {
                        tracing::trace!(event = event.name(), "Inbound event");
                        if events.send(TransportEvent::Message(event)).await.is_err() {
                            return SessionEnd::ReceiverGone;
                        }
                    }
                    Ok(FrameAction::Ignore) => {}
                    Ok(FrameAction::Closed(reason)) => return SessionEnd::Lost(reason),
                    Err(e) => tracing::debug!(error = %e, "Skipping unparseable frame"),
                }
            }
            command = commands.recv() => {
                let Some(command) = command else {
                    let _ = sink.send(Message::Close(None)).await;
                    return SessionEnd::Shutdown;
                };
                match encode_command(&command) {
                    Ok(frame) => {
                        tracing::debug!(command = command.name(), "Sending command");
                        if let Err(e) = sink.send(Message::Text(frame)).await {
                            return SessionEnd::Lost(e.to_string());
                        }
                    }
                    Err(e) => tracing::error!(command = command.name(), error = %e, "Failed to encode command"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{DetectorSettings, DoorStatusReport};

    #[test]
    fn test_ping_is_answered() {
        assert_eq!(route_frame("2").unwrap(), FrameAction::Reply("3".into()));
        assert_eq!(
            route_frame("2probe").unwrap(),
            FrameAction::Reply("3probe".into())
        );
    }

    #[test]
    fn test_event_is_delivered() {
        let action = route_frame(r#"42["door_status",{"status":"closed"}]"#).unwrap();
        assert_eq!(
            action,
            FrameAction::Deliver(InboundEvent::DoorStatus(DoorStatusReport {
                status: Some("closed".into())
            }))
        );
    }

    #[test]
    fn test_unknown_and_malformed_events_are_ignored() {
        assert_eq!(
            route_frame(r#"42["telemetry",{"fps":12}]"#).unwrap(),
            FrameAction::Ignore
        );
        assert_eq!(
            route_frame(r#"42["settings",{"threshold":"high"}]"#).unwrap(),
            FrameAction::Ignore
        );
    }

    #[test]
    fn test_server_disconnect_closes_session() {
        assert!(matches!(route_frame("41").unwrap(), FrameAction::Closed(_)));
        assert!(matches!(route_frame("1").unwrap(), FrameAction::Closed(_)));
    }

    #[test]
    fn test_garbage_is_an_error() {
        assert!(route_frame("").is_err());
        assert!(route_frame("9xyz").is_err());
    }

    #[test]
    fn test_encode_commands() {
        assert_eq!(
            encode_command(&OutboundCommand::Calibrate).unwrap(),
            r#"42["calibrate"]"#
        );
        let frame = encode_command(&OutboundCommand::UpdateSettings(DetectorSettings {
            threshold: 42,
            min_area_percent: 7,
        }))
        .unwrap();
        assert!(frame.starts_with(r#"42["update_settings",{"#));
        assert!(frame.contains(r#""threshold":42"#));
        assert!(frame.contains(r#""min_area_percent":7"#));
    }
}
