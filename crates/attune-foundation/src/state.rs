use crate::error::AppError;
use crossbeam_channel::{Receiver, Sender};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Conversation-level state of a voice session.
///
/// `Idle`/`Listening`/`Thinking`/`Speaking` are driven by backend `status`
/// messages; the connection edges are driven by the signaling channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    Idle,
    Listening,
    Thinking,
    Speaking,
}

pub struct SessionStateManager {
    state: Arc<RwLock<SessionState>>,
    state_tx: Sender<SessionState>,
    state_rx: Receiver<SessionState>,
}

impl Default for SessionStateManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStateManager {
    pub fn new() -> Self {
        let (state_tx, state_rx) = crossbeam_channel::unbounded();
        Self {
            state: Arc::new(RwLock::new(SessionState::Disconnected)),
            state_tx,
            state_rx,
        }
    }

    pub fn transition(&self, new_state: SessionState) -> Result<(), AppError> {
        let mut current = self.state.write();

        // Connection edges are strict; the backend may move freely between
        // the in-session states (idle/listening/thinking/speaking).
        let valid = match (&*current, &new_state) {
            (_, SessionState::Disconnected) => true,
            (SessionState::Disconnected, SessionState::Connecting) => true,
            (SessionState::Connecting, SessionState::Connected) => true,
            (from, to) => {
                (from.is_in_session() || *from == SessionState::Connected) && to.is_in_session()
            }
        };

        if !valid {
            return Err(AppError::Fatal(format!(
                "Invalid session state transition: {:?} -> {:?}",
                *current, new_state
            )));
        }

        tracing::debug!("Session state: {:?} -> {:?}", *current, new_state);
        *current = new_state;
        let _ = self.state_tx.send(new_state);
        Ok(())
    }

    pub fn current(&self) -> SessionState {
        *self.state.read()
    }

    pub fn subscribe(&self) -> Receiver<SessionState> {
        self.state_rx.clone()
    }
}

impl SessionState {
    pub fn is_in_session(&self) -> bool {
        matches!(
            self,
            SessionState::Idle
                | SessionState::Listening
                | SessionState::Thinking
                | SessionState::Speaking
        )
    }
}
