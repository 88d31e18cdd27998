use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use attune_codec::{decode_payload, EncodedChunk};
use attune_telemetry::PipelineMetrics;

use crate::ledger::PlayedLedger;
use crate::sink::{AudioSink, PlayOutcome};

/// A decoded buffer waiting its turn, paired with the chunk it came from
/// so the ledger can record exactly what was rendered.
struct PlaybackItem {
    samples: Vec<f32>,
    sample_rate: u32,
    original: EncodedChunk,
}

#[derive(Debug, Clone)]
pub enum PlaybackEvent {
    /// Decode or sink failure. The engine has already stopped and cleared
    /// its queue; the session decides what to tell the user.
    Error(String),
}

/// Plays logically-sequential chunks back-to-back, exactly one at a time.
///
/// `play_audio` never blocks on playback: it decodes, enqueues, and kicks
/// the drain task if idle. A failed decode or a failed play stops the
/// whole engine rather than skipping, since skipping would silently drop
/// audio and break the ordering guarantee.
pub struct PlaybackEngine {
    shared: Arc<Shared>,
}

struct Shared {
    queue: Mutex<VecDeque<PlaybackItem>>,
    ledger: PlayedLedger,
    sink: Arc<dyn AudioSink>,
    draining: AtomicBool,
    /// Latched on decode/sink failure. A failed engine drops every later
    /// chunk until the caller intervenes with `stop_playback`; resuming on
    /// its own would desynchronize what the user hears.
    failed: AtomicBool,
    event_tx: mpsc::Sender<PlaybackEvent>,
    metrics: Option<Arc<PipelineMetrics>>,
}

impl PlaybackEngine {
    pub fn new(sink: Arc<dyn AudioSink>) -> (Self, mpsc::Receiver<PlaybackEvent>) {
        Self::with_metrics(sink, None)
    }

    pub fn with_metrics(
        sink: Arc<dyn AudioSink>,
        metrics: Option<Arc<PipelineMetrics>>,
    ) -> (Self, mpsc::Receiver<PlaybackEvent>) {
        let (event_tx, event_rx) = mpsc::channel(16);
        (
            Self {
                shared: Arc::new(Shared {
                    queue: Mutex::new(VecDeque::new()),
                    ledger: PlayedLedger::new(),
                    sink,
                    draining: AtomicBool::new(false),
                    failed: AtomicBool::new(false),
                    event_tx,
                    metrics,
                }),
            },
            event_rx,
        )
    }

    /// Decode an inbound payload and queue it for sequential playback.
    ///
    /// Returns immediately; playback happens on the drain task. A payload
    /// that cannot be decoded stops the engine and clears the queue.
    pub fn play_audio(&self, base64_data: &str, mime_type: &str) {
        if self.shared.failed.load(Ordering::SeqCst) {
            tracing::warn!("Playback engine stopped after failure, dropping chunk");
            return;
        }

        let decoded = match decode_payload(base64_data, mime_type) {
            Ok(audio) => audio,
            Err(e) => {
                tracing::error!("Audio decode failed, stopping playback: {}", e);
                self.fail(format!("decode error: {}", e));
                return;
            }
        };

        let item = PlaybackItem {
            samples: decoded.samples,
            sample_rate: decoded.sample_rate,
            original: EncodedChunk {
                data: base64_data.to_string(),
                sample_rate: decoded.sample_rate,
            },
        };

        {
            let mut queue = self.shared.queue.lock();
            queue.push_back(item);
            if let Some(m) = &self.shared.metrics {
                m.update_queue_depth(queue.len());
            }
        }

        self.ensure_draining();
    }

    /// Immediately halt the current buffer and forget everything queued
    /// but unplayed. Chunks already rendered stay in the ledger.
    pub fn stop_playback(&self) {
        // An explicit stop is the caller's recovery point; it lifts the
        // failure latch along with the queue
        self.shared.failed.store(false, Ordering::SeqCst);
        let discarded = {
            let mut queue = self.shared.queue.lock();
            let n = queue.len();
            queue.clear();
            n
        };
        self.shared.sink.halt();

        if let Some(m) = &self.shared.metrics {
            m.update_queue_depth(0);
        }
        if discarded > 0 {
            tracing::debug!("Playback stopped, {} queued chunk(s) discarded", discarded);
        }
    }

    /// Base64 payloads of chunks whose playback completed, in order.
    pub fn played_chunks(&self) -> Vec<String> {
        self.shared.ledger.snapshot()
    }

    /// Acknowledge that the played batch has been forwarded downstream.
    pub fn clear_played(&self) {
        self.shared.ledger.clear()
    }

    pub fn is_playing(&self) -> bool {
        self.shared.draining.load(Ordering::SeqCst)
    }

    fn fail(&self, message: String) {
        self.stop_playback();
        self.shared.failed.store(true, Ordering::SeqCst);
        if let Some(m) = &self.shared.metrics {
            m.playback_errors.fetch_add(1, Ordering::Relaxed);
        }
        let _ = self.shared.event_tx.try_send(PlaybackEvent::Error(message));
    }

    /// Spawn the drain task unless one is already running (single-flight).
    fn ensure_draining(&self) {
        if self
            .shared
            .draining
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            loop {
                loop {
                    let next = shared.queue.lock().pop_front();
                    let Some(item) = next else { break };
                    if let Some(m) = &shared.metrics {
                        m.update_queue_depth(shared.queue.lock().len());
                    }

                    match shared.sink.play(&item.samples, item.sample_rate).await {
                        Ok(PlayOutcome::Completed) => {
                            shared.ledger.record(item.original.data);
                            if let Some(m) = &shared.metrics {
                                m.increment_chunks_played();
                            }
                        }
                        Ok(PlayOutcome::Interrupted) => {
                            // stop_playback() fired mid-buffer; the chunk
                            // was not fully heard and stays off the ledger.
                            // The queue is already cleared.
                            break;
                        }
                        Err(e) => {
                            tracing::error!("Playback failed, stopping engine: {}", e);
                            shared.queue.lock().clear();
                            shared.failed.store(true, Ordering::SeqCst);
                            let _ = shared
                                .event_tx
                                .try_send(PlaybackEvent::Error(format!("playback error: {}", e)));
                            break;
                        }
                    }
                }

                shared.draining.store(false, Ordering::SeqCst);

                // A chunk submitted between the final pop and the flag
                // store would otherwise strand until the next submission
                if shared.queue.lock().is_empty() {
                    break;
                }
                if shared
                    .draining
                    .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                    .is_err()
                {
                    break;
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;

    fn pcm_chunk(samples: &[f32], rate: u32) -> (String, String) {
        let chunk = EncodedChunk::from_samples(samples, rate);
        (chunk.data, format!("audio/pcm;rate={}", rate))
    }

    #[tokio::test]
    async fn played_chunk_enters_ledger_after_completion() {
        let sink = Arc::new(MemorySink::default());
        let (engine, _events) = PlaybackEngine::new(sink.clone());

        let (data, mime) = pcm_chunk(&[0.1, 0.2, 0.3], 16_000);
        engine.play_audio(&data, &mime);

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(engine.played_chunks(), vec![data]);
        assert_eq!(sink.started().len(), 1);
    }

    #[tokio::test]
    async fn decode_failure_stops_engine_and_reports() {
        let sink = Arc::new(MemorySink::default());
        let (engine, mut events) = PlaybackEngine::new(sink);

        engine.play_audio("!!!not-base64!!!", "audio/pcm;rate=16000");

        match events.recv().await {
            Some(PlaybackEvent::Error(msg)) => assert!(msg.contains("decode")),
            other => panic!("expected error event, got {:?}", other),
        }
        assert!(engine.played_chunks().is_empty());
    }

    #[tokio::test]
    async fn clear_played_resets_ledger() {
        let sink = Arc::new(MemorySink::default());
        let (engine, _events) = PlaybackEngine::new(sink);

        let (data, mime) = pcm_chunk(&[0.5; 8], 16_000);
        engine.play_audio(&data, &mime);
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        assert_eq!(engine.played_chunks().len(), 1);
        engine.clear_played();
        assert!(engine.played_chunks().is_empty());
    }
}
