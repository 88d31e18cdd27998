use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// How a single buffer's playback ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    /// The buffer was rendered to the end.
    Completed,
    /// `halt()` cut playback short; an unknown tail was never heard.
    Interrupted,
}

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Output device error: {0}")]
    Device(#[from] attune_foundation::DeviceError),

    #[error("Sink failure: {0}")]
    Failed(String),
}

/// Abstraction over an audio output sink.
///
/// `play` resolves at end-of-playback (or interruption); the sequential
/// drain loop awaits it to enforce the one-buffer-at-a-time invariant.
/// `halt` must take effect immediately, not at the next buffer boundary.
#[async_trait]
pub trait AudioSink: Send + Sync {
    async fn play(&self, samples: &[f32], sample_rate: u32) -> Result<PlayOutcome, SinkError>;

    fn halt(&self);
}

/// In-memory sink: records every buffer it is asked to play and completes
/// after a configurable simulated duration. Used by the engine tests and
/// by headless sessions that only need the ledger bookkeeping.
pub struct MemorySink {
    played: Mutex<Vec<(usize, u32)>>,
    epoch: AtomicU64,
    simulated_ms: u64,
    halt_notify: tokio::sync::Notify,
}

impl MemorySink {
    pub fn new(simulated_ms: u64) -> Self {
        Self {
            played: Mutex::new(Vec::new()),
            epoch: AtomicU64::new(0),
            simulated_ms,
            halt_notify: tokio::sync::Notify::new(),
        }
    }

    /// (sample count, sample rate) of every buffer whose playback started.
    pub fn started(&self) -> Vec<(usize, u32)> {
        self.played.lock().clone()
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new(0)
    }
}

#[async_trait]
impl AudioSink for MemorySink {
    async fn play(&self, samples: &[f32], sample_rate: u32) -> Result<PlayOutcome, SinkError> {
        let epoch = self.epoch.load(Ordering::SeqCst);
        self.played.lock().push((samples.len(), sample_rate));

        if self.simulated_ms > 0 {
            let sleep = tokio::time::sleep(std::time::Duration::from_millis(self.simulated_ms));
            tokio::pin!(sleep);
            loop {
                let halted = self.halt_notify.notified();
                tokio::pin!(halted);
                tokio::select! {
                    _ = &mut sleep => break,
                    _ = &mut halted => {
                        if self.epoch.load(Ordering::SeqCst) != epoch {
                            return Ok(PlayOutcome::Interrupted);
                        }
                    }
                }
            }
        }

        if self.epoch.load(Ordering::SeqCst) != epoch {
            return Ok(PlayOutcome::Interrupted);
        }
        Ok(PlayOutcome::Completed)
    }

    fn halt(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.halt_notify.notify_waiters();
    }
}
