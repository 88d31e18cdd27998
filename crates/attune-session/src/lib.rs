//! Duplex signaling channel to the conversational backend.
//!
//! One WebSocket connection per session, carrying typed JSON envelopes in
//! both directions. The channel owns nothing above the wire: reconnection,
//! retry, and session-level timeouts are all the caller's responsibility.

pub mod channel;
pub mod error;
pub mod protocol;

pub use channel::{ChannelEvent, ChannelState, SignalingChannel};
pub use error::ChannelError;
pub use protocol::{
    epoch_millis, ClientMessage, Role, ServerMessage, SessionConfig, SessionMode, SessionStatus,
};
