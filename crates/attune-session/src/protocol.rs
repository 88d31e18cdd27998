use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Session parameters sent once, immediately after the socket opens.
///
/// Field names are the wire contract; the backend expects camelCase with
/// the historical exception of `vad_enabled`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    pub system_prompt: String,
    pub voice: String,
    pub allow_interruptions: bool,
    pub mode: SessionMode,
    #[serde(rename = "vad_enabled")]
    pub vad_enabled: bool,
    pub language: String,
    pub alternative_languages: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            system_prompt: String::new(),
            voice: "default".to_string(),
            allow_interruptions: true,
            mode: SessionMode::Wellness,
            vad_enabled: true,
            language: "en-US".to_string(),
            alternative_languages: Vec::new(),
        }
    }
}

/// Conversation domain the backend should run in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    Study,
    Wellness,
}

/// Who produced a transcript line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Backend-reported session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    Listening,
    Thinking,
    Speaking,
    Connected,
    ConfigReceived,
}

/// Client -> backend envelopes. One variant per wire `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Config {
        config: SessionConfig,
    },
    Audio {
        data: String,
        #[serde(rename = "sampleRate")]
        sample_rate: u32,
    },
    /// Locally recognized user speech, forwarded for storage.
    UserTranscription {
        text: String,
        timestamp: u64,
    },
    /// Batch of AI audio that was actually rendered, requesting a
    /// transcript of what the user heard.
    TranscribePlayedAudio {
        #[serde(rename = "audioChunks")]
        audio_chunks: Vec<String>,
        #[serde(rename = "sampleRate")]
        sample_rate: u32,
        timestamp: u64,
    },
}

/// Backend -> client envelopes. One variant per wire `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Audio {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    Status {
        status: SessionStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
    Transcription {
        role: Role,
        text: String,
        timestamp: u64,
    },
    TurnComplete {
        role: Role,
        text: String,
        timestamp: u64,
    },
    /// Backend-reported error; non-fatal to the channel.
    Error {
        text: String,
    },
}

/// Wall-clock timestamp for outbound envelopes, milliseconds since epoch.
pub fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_envelope_wire_shape() {
        let msg = ClientMessage::Config {
            config: SessionConfig {
                system_prompt: "be kind".into(),
                voice: "aria".into(),
                allow_interruptions: true,
                mode: SessionMode::Wellness,
                vad_enabled: false,
                language: "en-US".into(),
                alternative_languages: vec!["de-DE".into()],
            },
        };

        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "config");
        assert_eq!(json["config"]["systemPrompt"], "be kind");
        assert_eq!(json["config"]["allowInterruptions"], true);
        assert_eq!(json["config"]["mode"], "wellness");
        assert_eq!(json["config"]["vad_enabled"], false);
        assert_eq!(json["config"]["alternativeLanguages"][0], "de-DE");
    }

    #[test]
    fn audio_envelope_wire_shape() {
        let msg = ClientMessage::Audio {
            data: "AAAA".into(),
            sample_rate: 16_000,
        };
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "audio");
        assert_eq!(json["sampleRate"], 16_000);
    }

    #[test]
    fn transcribe_played_audio_wire_shape() {
        let msg = ClientMessage::TranscribePlayedAudio {
            audio_chunks: vec!["a".into(), "b".into()],
            sample_rate: 24_000,
            timestamp: 1_700_000_000_000,
        };
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "transcribe_played_audio");
        assert_eq!(json["audioChunks"][1], "b");
    }

    #[test]
    fn inbound_audio_parses() {
        let raw = r#"{"type":"audio","data":"UEsF","mimeType":"audio/pcm;rate=24000"}"#;
        match serde_json::from_str::<ServerMessage>(raw).unwrap() {
            ServerMessage::Audio { data, mime_type } => {
                assert_eq!(data, "UEsF");
                assert_eq!(mime_type, "audio/pcm;rate=24000");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn inbound_status_with_and_without_text() {
        let raw = r#"{"type":"status","status":"connected"}"#;
        match serde_json::from_str::<ServerMessage>(raw).unwrap() {
            ServerMessage::Status { status, text } => {
                assert_eq!(status, SessionStatus::Connected);
                assert!(text.is_none());
            }
            other => panic!("unexpected: {:?}", other),
        }

        let raw = r#"{"type":"status","status":"thinking","text":"one moment"}"#;
        match serde_json::from_str::<ServerMessage>(raw).unwrap() {
            ServerMessage::Status { status, text } => {
                assert_eq!(status, SessionStatus::Thinking);
                assert_eq!(text.as_deref(), Some("one moment"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn inbound_turn_complete_parses() {
        let raw = r#"{"type":"turn_complete","role":"assistant","text":"done","timestamp":123}"#;
        match serde_json::from_str::<ServerMessage>(raw).unwrap() {
            ServerMessage::TurnComplete { role, .. } => assert_eq!(role, Role::Assistant),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn unknown_type_is_rejected() {
        let raw = r#"{"type":"telepathy","data":"??"}"#;
        assert!(serde_json::from_str::<ServerMessage>(raw).is_err());
    }
}
