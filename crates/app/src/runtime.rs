use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};

use attune_audio::{CaptureEngine, CaptureEngineConfig, CaptureEvent};
use attune_codec::MimeType;
use attune_foundation::{SessionState, SessionStateManager, ShutdownToken};
use attune_playback::{AudioSink, CpalSink, PlaybackEngine, PlaybackEvent};
use attune_session::{
    epoch_millis, ChannelEvent, ClientMessage, Role, ServerMessage, SessionConfig, SessionStatus,
    SignalingChannel,
};
use attune_telemetry::PipelineMetrics;

/// Options for one interactive voice session.
#[derive(Clone, Debug)]
pub struct SessionOptions {
    /// Base WebSocket URL; a random session id is appended.
    pub server_url: String,
    /// Explicit session id; None generates one.
    pub session_id: Option<String>,
    pub input_device: Option<String>,
    pub output_device: Option<String>,
    pub config: SessionConfig,
}

/// Wire the full duplex pipeline and run until Ctrl-C or channel close.
///
/// Capture chunks flow out over the channel; inbound audio flows into the
/// sequential playback engine; after each assistant turn the played ledger
/// is forwarded for transcription and acknowledged.
pub async fn run_session(opts: SessionOptions) -> anyhow::Result<()> {
    let metrics = Arc::new(PipelineMetrics::default());
    let states = SessionStateManager::new();
    let shutdown = ShutdownToken::install();

    // --- Playback (output device) ---
    let sink: Arc<dyn AudioSink> =
        Arc::new(CpalSink::new(opts.output_device.clone()).context("opening output device")?);
    let (playback, mut playback_events) =
        PlaybackEngine::with_metrics(sink, Some(Arc::clone(&metrics)));

    // --- Capture (input device) ---
    let capture_config = CaptureEngineConfig {
        device: opts.input_device.clone(),
        ..Default::default()
    };
    let mut capture = CaptureEngine::initialize(capture_config)
        .context("opening input device")?
        .with_metrics(Arc::clone(&metrics));
    let mut capture_events = capture
        .events()
        .context("capture event stream already taken")?;
    let target_rate = attune_vad::SAMPLE_RATE_HZ;

    // --- Signaling channel ---
    let url = match &opts.session_id {
        Some(id) => format!("{}/{}", opts.server_url.trim_end_matches('/'), id),
        None => SignalingChannel::session_url(&opts.server_url),
    };
    let (mut channel, mut channel_events) = SignalingChannel::new(url);

    states.transition(SessionState::Connecting)?;
    channel
        .connect(&opts.config)
        .await
        .context("connecting to session backend")?;
    states.transition(SessionState::Connected)?;

    capture.start_recording();
    info!("Session running; speak when ready");

    // Sample rate of the most recent inbound audio, used when forwarding
    // the played ledger for transcription
    let mut last_playback_rate = target_rate;

    loop {
        tokio::select! {
            _ = shutdown.wait() => {
                info!("Shutting down session");
                break;
            }

            Some(event) = capture_events.recv() => match event {
                CaptureEvent::Chunk { chunk, vad } => {
                    // Barge-in: local speech while the assistant is talking
                    // cuts playback short. What was heard stays on the ledger.
                    if vad.is_speech
                        && opts.config.allow_interruptions
                        && states.current() == SessionState::Speaking
                    {
                        info!("Barge-in detected, stopping playback");
                        playback.stop_playback();
                    }

                    // Local VAD never gates transmission; the backend makes
                    // the authoritative call
                    channel
                        .send(&ClientMessage::Audio {
                            data: chunk.data,
                            sample_rate: chunk.sample_rate,
                        })
                        .await;
                    metrics.increment_chunks_sent();
                }
                CaptureEvent::Error(message) => {
                    error!("Capture failed: {}", message);
                    eprintln!("Microphone error: {message}");
                    break;
                }
            },

            Some(event) = channel_events.recv() => match event {
                ChannelEvent::Message(message) => {
                    metrics.increment_messages_received();
                    if let Some(rate) = handle_server_message(
                        message,
                        &playback,
                        &channel,
                        &states,
                        last_playback_rate,
                    )
                    .await
                    {
                        last_playback_rate = rate;
                    }
                }
                ChannelEvent::Error(message) => {
                    warn!("Channel error: {}", message);
                    eprintln!("Connection problem: {message}");
                }
                ChannelEvent::Closed => {
                    info!("Backend closed the session");
                    break;
                }
            },

            Some(event) = playback_events.recv() => match event {
                PlaybackEvent::Error(message) => {
                    // Decode failures already stopped the engine; surface it
                    error!("Playback stopped: {}", message);
                    eprintln!("Playback error: {message}");
                }
            },
        }
    }

    // Teardown in pipeline order: source, sink, transport
    capture.cleanup();
    playback.stop_playback();
    channel.disconnect().await;
    let _ = states.transition(SessionState::Disconnected);

    Ok(())
}

/// Apply one inbound envelope. Returns the inbound audio rate when the
/// message carried one, so the caller can track it for ledger forwarding.
async fn handle_server_message(
    message: ServerMessage,
    playback: &PlaybackEngine,
    channel: &SignalingChannel,
    states: &SessionStateManager,
    last_playback_rate: u32,
) -> Option<u32> {
    match message {
        ServerMessage::Audio { data, mime_type } => {
            let rate = MimeType::parse(&mime_type)
                .ok()
                .and_then(|m| m.rate);
            playback.play_audio(&data, &mime_type);
            rate
        }

        ServerMessage::Status { status, text } => {
            if let Some(text) = &text {
                info!("Backend status {:?}: {}", status, text);
            }
            let state = match status {
                SessionStatus::Idle | SessionStatus::ConfigReceived => SessionState::Idle,
                SessionStatus::Listening => SessionState::Listening,
                SessionStatus::Thinking => SessionState::Thinking,
                SessionStatus::Speaking => SessionState::Speaking,
                SessionStatus::Connected => SessionState::Connected,
            };
            if let Err(e) = states.transition(state) {
                warn!("Ignoring status transition: {}", e);
            }
            None
        }

        ServerMessage::Transcription { role, text, .. } => {
            print_transcript(role, &text, false);
            None
        }

        ServerMessage::TurnComplete { role, text, .. } => {
            print_transcript(role, &text, true);

            // After an assistant turn, forward exactly what was rendered to
            // the speaker and acknowledge the batch
            if role == Role::Assistant {
                let played = playback.played_chunks();
                if !played.is_empty() {
                    channel
                        .send(&ClientMessage::TranscribePlayedAudio {
                            audio_chunks: played,
                            sample_rate: last_playback_rate,
                            timestamp: epoch_millis(),
                        })
                        .await;
                    playback.clear_played();
                }
            }
            None
        }

        ServerMessage::Error { text } => {
            warn!("Backend error: {}", text);
            eprintln!("Backend error: {text}");
            None
        }
    }
}

fn print_transcript(role: Role, text: &str, complete: bool) {
    if text.is_empty() {
        return;
    }
    let speaker = match role {
        Role::User => "you",
        Role::Assistant => "attune",
    };
    if complete {
        println!("[{speaker}] {text}");
    } else {
        println!("[{speaker}…] {text}");
    }
}
