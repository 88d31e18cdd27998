use serde::{Deserialize, Serialize};

/// Per-frame voice-activity classification.
///
/// Recomputed every frame; purely a feedback payload with no persistent
/// identity. The authoritative speech/no-speech decision is made
/// server-side, so this status never gates whether audio is sent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VadStatus {
    pub is_speech: bool,
    /// Confidence in [0, 1].
    pub confidence: f32,
}

impl VadStatus {
    pub fn silence() -> Self {
        Self {
            is_speech: false,
            confidence: 0.0,
        }
    }
}
