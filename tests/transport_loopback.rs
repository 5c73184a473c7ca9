//! Transport against an in-process websocket server speaking Engine.IO/Socket.IO.

use door_console::connection::{ReconnectConfig, ServerAddress};
use door_console::protocol::{DoorStatusReport, InboundEvent, OutboundCommand};
use door_console::session::TransportEvent;
use door_console::transport::{spawn_transport, TransportConfig};
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

const OPEN: &str =
    r#"0{"sid":"loopback","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#;
const STEP: Duration = Duration::from_secs(5);

async fn recv_event(events: &mut mpsc::Receiver<TransportEvent>) -> TransportEvent {
    timeout(STEP, events.recv())
        .await
        .expect("timed out waiting for transport event")
        .expect("transport closed the event channel")
}

#[tokio::test]
async fn test_session_round_trip() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (frames_tx, frames_rx) = oneshot::channel::<Vec<String>>();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

        ws.send(Message::Text(OPEN.into())).await.unwrap();
        let connect = ws.next().await.unwrap().unwrap();
        assert_eq!(connect, Message::Text("40".into()));
        ws.send(Message::Text(r#"40{"sid":"ns-1"}"#.into()))
            .await
            .unwrap();

        ws.send(Message::Text(r#"42["door_status",{"status":"open"}]"#.into()))
            .await
            .unwrap();
        ws.send(Message::Text(r#"42["telemetry",{"fps":15}]"#.into()))
            .await
            .unwrap();
        ws.send(Message::Text("2".into())).await.unwrap();

        // Expect the heartbeat reply and the calibrate command, in either order.
        let mut received = Vec::new();
        while received.len() < 2 {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => received.push(text),
                Some(Ok(_)) => {}
                _ => break,
            }
        }

        ws.close(None).await.unwrap();
        let _ = frames_tx.send(received);
    });

    let mut config = TransportConfig::new(ServerAddress::parse(&format!("127.0.0.1:{port}")).unwrap());
    config.reconnect = ReconnectConfig {
        initial_delay: Duration::from_millis(50),
        max_delay: Duration::from_millis(100),
        jitter: false,
        ..ReconnectConfig::default()
    };

    let (events_tx, mut events) = mpsc::channel(16);
    let (commands_tx, commands_rx) = mpsc::channel(16);
    let transport = spawn_transport(config, events_tx, commands_rx);

    assert_eq!(recv_event(&mut events).await, TransportEvent::Connected);
    assert_eq!(
        recv_event(&mut events).await,
        TransportEvent::Message(InboundEvent::DoorStatus(DoorStatusReport {
            status: Some("open".into())
        }))
    );

    commands_tx.send(OutboundCommand::Calibrate).await.unwrap();

    let mut frames = timeout(STEP, frames_rx).await.unwrap().unwrap();
    frames.sort();
    assert_eq!(frames, vec!["3".to_string(), r#"42["calibrate"]"#.to_string()]);

    assert!(matches!(
        recv_event(&mut events).await,
        TransportEvent::Disconnected { .. }
    ));

    server.await.unwrap();
    drop(commands_tx);
    timeout(STEP, transport).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_refused_connect_error_emits_nothing() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        ws.send(Message::Text(OPEN.into())).await.unwrap();
        let _ = ws.next().await;
        ws.send(Message::Text(r#"44{"message":"not authorized"}"#.into()))
            .await
            .unwrap();
        let _ = ws.close(None).await;
    });

    let mut config = TransportConfig::new(ServerAddress::parse(&format!("127.0.0.1:{port}")).unwrap());
    config.reconnect = ReconnectConfig {
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(10),
        max_attempts: 1,
        jitter: false,
        ..ReconnectConfig::default()
    };

    let (events_tx, mut events) = mpsc::channel(16);
    let (_commands_tx, commands_rx) = mpsc::channel(16);
    let transport = spawn_transport(config, events_tx, commands_rx);

    server.await.unwrap();
    timeout(STEP, transport).await.unwrap().unwrap();
    // The transport gave up without ever reporting a session.
    assert!(events.recv().await.is_none());
}

#[tokio::test]
async fn test_tls_address_opens_a_tls_handshake() {
    use tokio::io::AsyncReadExt;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut record_type = [0u8; 1];
        stream.read_exact(&mut record_type).await.unwrap();
        record_type[0]
    });

    let address = ServerAddress::parse(&format!("https://127.0.0.1:{port}")).unwrap();
    assert!(address.socket_url().as_str().starts_with("wss://"));

    let mut config = TransportConfig::new(address);
    config.reconnect = ReconnectConfig {
        max_attempts: 1,
        jitter: false,
        ..ReconnectConfig::default()
    };

    let (events_tx, mut events) = mpsc::channel(16);
    let (_commands_tx, commands_rx) = mpsc::channel(16);
    let transport = spawn_transport(config, events_tx, commands_rx);

    // 0x16 is a TLS handshake record: the client sent a ClientHello.
    let record_type = timeout(STEP, server).await.unwrap().unwrap();
    assert_eq!(record_type, 0x16);

    timeout(STEP, transport).await.unwrap().unwrap();
    assert!(events.recv().await.is_none());
}
