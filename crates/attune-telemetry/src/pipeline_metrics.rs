use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Shared metrics for cross-task pipeline monitoring.
///
/// Every field is independently updatable from the capture worker, the
/// signaling channel, and the playback drain loop without coordination.
#[derive(Clone)]
pub struct PipelineMetrics {
    // Capture side
    pub capture_frames: Arc<AtomicU64>,
    pub chunks_emitted: Arc<AtomicU64>,
    pub capture_fps: Arc<AtomicU64>, // frames per second * 10
    pub current_rms: Arc<AtomicU64>, // RMS * 1000 for precision

    // Transport
    pub chunks_sent: Arc<AtomicU64>,
    pub messages_received: Arc<AtomicU64>,

    // Playback side
    pub chunks_played: Arc<AtomicU64>,
    pub playback_queue_depth: Arc<AtomicUsize>,
    pub playback_errors: Arc<AtomicU64>,

    // Activity indicators
    pub is_speaking: Arc<AtomicBool>,
    pub last_speech_time: Arc<RwLock<Option<Instant>>>,
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self {
            capture_frames: Arc::new(AtomicU64::new(0)),
            chunks_emitted: Arc::new(AtomicU64::new(0)),
            capture_fps: Arc::new(AtomicU64::new(0)),
            current_rms: Arc::new(AtomicU64::new(0)),

            chunks_sent: Arc::new(AtomicU64::new(0)),
            messages_received: Arc::new(AtomicU64::new(0)),

            chunks_played: Arc::new(AtomicU64::new(0)),
            playback_queue_depth: Arc::new(AtomicUsize::new(0)),
            playback_errors: Arc::new(AtomicU64::new(0)),

            is_speaking: Arc::new(AtomicBool::new(false)),
            last_speech_time: Arc::new(RwLock::new(None)),
        }
    }
}

impl PipelineMetrics {
    pub fn increment_capture_frames(&self) {
        self.capture_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_chunks_emitted(&self) {
        self.chunks_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_chunks_sent(&self) {
        self.chunks_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_messages_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_chunks_played(&self) {
        self.chunks_played.fetch_add(1, Ordering::Relaxed);
    }

    pub fn update_capture_fps(&self, fps: f64) {
        self.capture_fps.store((fps * 10.0) as u64, Ordering::Relaxed);
    }

    pub fn update_queue_depth(&self, depth: usize) {
        self.playback_queue_depth.store(depth, Ordering::Relaxed);
    }

    pub fn update_audio_level(&self, rms: f32) {
        self.current_rms
            .store((rms * 1000.0) as u64, Ordering::Relaxed);
    }

    pub fn mark_speaking(&self, speaking: bool) {
        self.is_speaking.store(speaking, Ordering::Relaxed);
        if speaking {
            *self.last_speech_time.write() = Some(Instant::now());
        }
    }
}

/// Tracks frames-per-second over a sliding one second window.
pub struct FpsTracker {
    window_start: Instant,
    frames_in_window: u64,
}

impl FpsTracker {
    pub fn new() -> Self {
        Self {
            window_start: Instant::now(),
            frames_in_window: 0,
        }
    }

    /// Count one frame; returns the rate when a full window has elapsed.
    pub fn tick(&mut self) -> Option<f64> {
        self.frames_in_window += 1;
        let elapsed = self.window_start.elapsed();
        if elapsed.as_secs_f64() >= 1.0 {
            let fps = self.frames_in_window as f64 / elapsed.as_secs_f64();
            self.window_start = Instant::now();
            self.frames_in_window = 0;
            Some(fps)
        } else {
            None
        }
    }
}

impl Default for FpsTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let m = PipelineMetrics::default();
        m.increment_chunks_emitted();
        m.increment_chunks_emitted();
        assert_eq!(m.chunks_emitted.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn fps_tracker_reports_after_window() {
        let mut tracker = FpsTracker::new();
        assert!(tracker.tick().is_none());
        tracker.window_start = Instant::now() - std::time::Duration::from_secs(2);
        let fps = tracker.tick().expect("window elapsed");
        assert!(fps > 0.0);
    }
}
