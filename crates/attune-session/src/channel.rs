use futures_util::stream::{SplitSink, StreamExt};
use futures_util::SinkExt;
use parking_lot::RwLock;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::ChannelError;
use crate::protocol::{ClientMessage, ServerMessage, SessionConfig};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Transport state. There is no reconnecting state on purpose: reconnection
/// is the caller's responsibility, with a fresh `connect`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Connected,
}

/// Everything the backend (or the transport) pushes at the client.
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    Message(ServerMessage),
    /// Malformed inbound frame or post-handshake transport failure.
    /// Malformed frames do not close the channel.
    Error(String),
    /// The transport is gone; state is already `Disconnected`.
    Closed,
}

/// Duplex JSON-envelope channel over one WebSocket connection.
///
/// `connect` transmits the `config` envelope before reporting success, so
/// a caller that observes `Connected` knows the backend has the session
/// parameters. `send` on a channel that is not connected is a warn-and-drop
/// no-op, never an error and never a queue.
pub struct SignalingChannel {
    url: String,
    state: Arc<RwLock<ChannelState>>,
    writer: Arc<tokio::sync::Mutex<Option<WsSink>>>,
    event_tx: mpsc::Sender<ChannelEvent>,
    reader_handle: Option<JoinHandle<()>>,
}

impl SignalingChannel {
    /// Build a channel for `url`. Events arrive on the returned receiver
    /// once `connect` succeeds.
    pub fn new(url: impl Into<String>) -> (Self, mpsc::Receiver<ChannelEvent>) {
        let (event_tx, event_rx) = mpsc::channel(256);
        (
            Self {
                url: url.into(),
                state: Arc::new(RwLock::new(ChannelState::Disconnected)),
                writer: Arc::new(tokio::sync::Mutex::new(None)),
                event_tx,
                reader_handle: None,
            },
            event_rx,
        )
    }

    /// Derive a session endpoint from a base URL by appending a
    /// client-generated identifier, e.g. `ws://host/ws/session/k3jd02m4a9f1`.
    pub fn session_url(base_url: &str) -> String {
        let id: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(12)
            .map(|c| (c as char).to_ascii_lowercase())
            .collect();
        format!("{}/{}", base_url.trim_end_matches('/'), id)
    }

    pub fn state(&self) -> ChannelState {
        *self.state.read()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ChannelState::Connected
    }

    /// Open the socket and perform the config handshake.
    ///
    /// Any failure before the config envelope is on the wire comes back as
    /// an error here and leaves the channel `Disconnected`. Failures after
    /// that surface as `ChannelEvent`s instead.
    pub async fn connect(&mut self, config: &SessionConfig) -> Result<(), ChannelError> {
        *self.state.write() = ChannelState::Connecting;
        tracing::info!("Connecting to {}", self.url);

        let (ws, _response) = match connect_async(self.url.as_str()).await {
            Ok(ok) => ok,
            Err(e) => {
                *self.state.write() = ChannelState::Disconnected;
                return Err(e.into());
            }
        };

        let (mut sink, mut stream) = ws.split();

        // Config goes out before anyone can observe Connected; audio sent
        // against an unconfigured session would be dropped server-side
        let envelope = ClientMessage::Config {
            config: config.clone(),
        };
        let json = serde_json::to_string(&envelope)?;
        if let Err(e) = sink.send(Message::Text(json.into())).await {
            *self.state.write() = ChannelState::Disconnected;
            return Err(ChannelError::Handshake(e.to_string()));
        }

        *self.writer.lock().await = Some(sink);
        *self.state.write() = ChannelState::Connected;
        tracing::info!("Signaling channel connected, config sent");

        let state = Arc::clone(&self.state);
        let event_tx = self.event_tx.clone();
        self.reader_handle = Some(tokio::spawn(async move {
            while let Some(frame) = stream.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        match serde_json::from_str::<ServerMessage>(text.as_str()) {
                            Ok(message) => {
                                let _ = event_tx.send(ChannelEvent::Message(message)).await;
                            }
                            Err(e) => {
                                // Malformed frames are reported per-message
                                // and the channel stays up
                                tracing::warn!("Malformed server message: {}", e);
                                let _ = event_tx
                                    .send(ChannelEvent::Error(format!(
                                        "malformed message: {}",
                                        e
                                    )))
                                    .await;
                            }
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {} // ping/pong/binary frames are not part of the protocol
                    Err(e) => {
                        tracing::error!("Signaling channel transport error: {}", e);
                        let _ = event_tx.send(ChannelEvent::Error(e.to_string())).await;
                        break;
                    }
                }
            }

            *state.write() = ChannelState::Disconnected;
            let _ = event_tx.send(ChannelEvent::Closed).await;
        }));

        Ok(())
    }

    /// Transmit one envelope if connected; otherwise warn and drop it.
    /// Callers that need delivery guarantees check `is_connected` first.
    pub async fn send(&self, message: &ClientMessage) {
        if !self.is_connected() {
            tracing::warn!("Channel not connected, dropping outbound message");
            return;
        }

        let json = match serde_json::to_string(message) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("Failed to serialize outbound message: {}", e);
                return;
            }
        };

        let mut writer = self.writer.lock().await;
        if let Some(sink) = writer.as_mut() {
            if let Err(e) = sink.send(Message::Text(json.into())).await {
                tracing::error!("Send failed, marking channel disconnected: {}", e);
                *self.state.write() = ChannelState::Disconnected;
                let _ = self.event_tx.send(ChannelEvent::Error(e.to_string())).await;
            }
        }
    }

    /// Close unconditionally. Idempotent; there is no automatic reconnect.
    pub async fn disconnect(&mut self) {
        *self.state.write() = ChannelState::Disconnected;

        if let Some(mut sink) = self.writer.lock().await.take() {
            let _ = sink.send(Message::Close(None)).await;
        }
        if let Some(handle) = self.reader_handle.take() {
            handle.abort();
        }
        tracing::info!("Signaling channel disconnected");
    }
}
