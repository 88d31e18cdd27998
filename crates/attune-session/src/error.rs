use thiserror::Error;

/// Transport-level failures on the signaling channel.
///
/// Only the initial connect handshake returns these to the caller; after
/// the handshake, failures flow through the event stream and the channel
/// simply transitions to disconnected.
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Message serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Config handshake failed: {0}")]
    Handshake(String),

    #[error("Channel is not connected")]
    NotConnected,
}
