use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

use attune_session::{
    ChannelEvent, ChannelState, ClientMessage, ServerMessage, SessionConfig, SessionMode,
    SessionStatus, SignalingChannel,
};

async fn spawn_backend() -> (String, tokio::task::JoinHandle<Vec<serde_json::Value>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        let mut received = Vec::new();

        // Handshake: the very first frame must be the config envelope
        let first = ws.next().await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(first.to_text().unwrap()).unwrap();
        assert_eq!(value["type"], "config", "config must precede everything");
        received.push(value);

        ws.send(Message::Text(
            r#"{"type":"status","status":"connected"}"#.into(),
        ))
        .await
        .unwrap();

        // Garbage frame: must be survivable
        ws.send(Message::Text("{this is not json".into()))
            .await
            .unwrap();

        // And the channel should still deliver after it
        ws.send(Message::Text(
            r#"{"type":"status","status":"listening"}"#.into(),
        ))
        .await
        .unwrap();

        // Collect anything else the client sends until it hangs up
        while let Some(Ok(frame)) = ws.next().await {
            match frame {
                Message::Text(text) => {
                    received.push(serde_json::from_str(text.as_str()).unwrap());
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
        received
    });

    (format!("ws://{}/ws/session/test", addr), handle)
}

fn test_config() -> SessionConfig {
    SessionConfig {
        mode: SessionMode::Wellness,
        ..Default::default()
    }
}

#[tokio::test]
async fn config_is_sent_before_connect_resolves() {
    let (url, backend) = spawn_backend().await;
    let (mut channel, mut events) = SignalingChannel::new(url);

    channel.connect(&test_config()).await.unwrap();
    assert_eq!(channel.state(), ChannelState::Connected);

    // First inbound event is the connected status
    match tokio::time::timeout(Duration::from_secs(2), events.recv())
        .await
        .unwrap()
    {
        Some(ChannelEvent::Message(ServerMessage::Status { status, .. })) => {
            assert_eq!(status, SessionStatus::Connected);
        }
        other => panic!("expected connected status, got {:?}", other),
    }

    channel.disconnect().await;
    let received = backend.await.unwrap();
    assert_eq!(received[0]["type"], "config");
    assert_eq!(received[0]["config"]["mode"], "wellness");
}

#[tokio::test]
async fn malformed_frame_reports_error_without_closing() {
    let (url, _backend) = spawn_backend().await;
    let (mut channel, mut events) = SignalingChannel::new(url);
    channel.connect(&test_config()).await.unwrap();

    let mut saw_error = false;
    let mut saw_listening = false;

    for _ in 0..3 {
        match tokio::time::timeout(Duration::from_secs(2), events.recv())
            .await
            .unwrap()
        {
            Some(ChannelEvent::Error(_)) => saw_error = true,
            Some(ChannelEvent::Message(ServerMessage::Status { status, .. })) => {
                if status == SessionStatus::Listening {
                    saw_listening = true;
                }
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    assert!(saw_error, "malformed frame must surface as an error event");
    assert!(
        saw_listening,
        "channel must keep delivering after a malformed frame"
    );
    assert!(channel.is_connected());

    channel.disconnect().await;
}

#[tokio::test]
async fn audio_sent_while_connected_reaches_backend() {
    let (url, backend) = spawn_backend().await;
    let (mut channel, mut events) = SignalingChannel::new(url);
    channel.connect(&test_config()).await.unwrap();

    // Drain the three scripted events first
    for _ in 0..3 {
        let _ = tokio::time::timeout(Duration::from_secs(2), events.recv()).await;
    }

    channel
        .send(&ClientMessage::Audio {
            data: "c2FtcGxlcw==".into(),
            sample_rate: 16_000,
        })
        .await;
    channel.disconnect().await;

    let received = backend.await.unwrap();
    let audio = received
        .iter()
        .find(|v| v["type"] == "audio")
        .expect("backend received the audio envelope");
    assert_eq!(audio["sampleRate"], 16_000);
    assert_eq!(audio["data"], "c2FtcGxlcw==");
}

#[tokio::test]
async fn send_while_disconnected_transmits_nothing() {
    let (url, backend) = spawn_backend().await;

    // Never connected: the send must be a silent no-op
    {
        let (channel, _events) = SignalingChannel::new(url.clone());
        channel
            .send(&ClientMessage::Audio {
                data: "ZHJvcHBlZA==".into(),
                sample_rate: 16_000,
            })
            .await;
    }

    // Now connect and immediately hang up so the backend task finishes
    let (mut channel, _events) = SignalingChannel::new(url);
    channel.connect(&test_config()).await.unwrap();
    channel.disconnect().await;

    let received = backend.await.unwrap();
    assert!(
        received.iter().all(|v| v["type"] != "audio"),
        "nothing must reach the wire before connect"
    );
}

#[tokio::test]
async fn server_close_transitions_to_disconnected() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        let _config = ws.next().await;
        // Close straight away
        let _ = ws.send(Message::Close(None)).await;
    });

    let (mut channel, mut events) =
        SignalingChannel::new(format!("ws://{}/ws/session/bye", addr));
    channel.connect(&test_config()).await.unwrap();

    // Eventually the reader observes the close
    let mut closed = false;
    while let Ok(Some(event)) = tokio::time::timeout(Duration::from_secs(2), events.recv()).await {
        if matches!(event, ChannelEvent::Closed) {
            closed = true;
            break;
        }
    }
    assert!(closed, "close frame must produce a Closed event");
    assert_eq!(channel.state(), ChannelState::Disconnected);
}
