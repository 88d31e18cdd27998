use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use attune_codec::EncodedChunk;
use attune_foundation::DeviceError;
use attune_telemetry::{FpsTracker, PipelineMetrics};
use attune_vad::{EnergyZcrVad, VadConfig, VadEngine, VadStatus};

use super::capture::{CaptureThread, DeviceConfig};
use super::frame_reader::FrameReader;
use super::resampler::resample_linear;
use super::ring_buffer::AudioRingBuffer;

const RING_CAPACITY_SAMPLES: usize = 16_384 * 4;
const READ_BATCH_SAMPLES: usize = 4_096;

/// Events emitted by the capture engine, one per encoded chunk.
///
/// The VAD status rides along with every chunk: it is feedback for the UI,
/// and never a reason to withhold the chunk from the channel.
#[derive(Debug, Clone)]
pub enum CaptureEvent {
    Chunk { chunk: EncodedChunk, vad: VadStatus },
    Error(String),
}

#[derive(Debug, Clone)]
pub struct CaptureEngineConfig {
    /// Input device by name; None selects the platform default.
    pub device: Option<String>,
    /// Processing rate chunks are emitted at.
    pub target_sample_rate: u32,
    /// Samples per emitted chunk at the target rate.
    pub chunk_size_samples: usize,
    /// Sampling loop period. 32ms = 512 samples at 16kHz.
    pub tick_interval: Duration,
    pub vad: VadConfig,
}

impl Default for CaptureEngineConfig {
    fn default() -> Self {
        Self {
            device: None,
            target_sample_rate: attune_vad::SAMPLE_RATE_HZ,
            chunk_size_samples: attune_vad::FRAME_SIZE_SAMPLES,
            tick_interval: Duration::from_millis(32),
            vad: VadConfig::default(),
        }
    }
}

/// Owns the microphone and the fixed-period chunking loop.
///
/// Lifecycle: `initialize` acquires the device (failures surface there,
/// once); `start_recording`/`stop_recording` gate the loop without
/// releasing the device; `cleanup` tears everything down and is safe to
/// call repeatedly.
pub struct CaptureEngine {
    config: CaptureEngineConfig,
    capture: Option<CaptureThread>,
    device_config: DeviceConfig,
    recording: Arc<AtomicBool>,
    worker_handle: Option<JoinHandle<()>>,
    worker_state: Option<ChunkWorker>,
    event_rx: Option<mpsc::Receiver<CaptureEvent>>,
}

impl CaptureEngine {
    /// Acquire the microphone and negotiate the device's native config.
    ///
    /// The device may deliver a different rate than any requested value;
    /// the worker reconciles its resampling against the negotiated rate,
    /// and keeps reconciling if the platform renegotiates later.
    pub fn initialize(config: CaptureEngineConfig) -> Result<Self, DeviceError> {
        let ring = AudioRingBuffer::new(RING_CAPACITY_SAMPLES);
        let (producer, consumer) = ring.split();

        let (capture, device_config) = CaptureThread::spawn(producer, config.device.clone())?;

        let frame_reader = FrameReader::new(consumer, device_config.sample_rate);
        let (event_tx, event_rx) = mpsc::channel(64);

        let mut worker = ChunkWorker::new(
            frame_reader,
            event_tx,
            capture.config_watch(),
            &config,
            device_config,
        );
        worker.stream_failed = Some(capture.failure_flag());

        Ok(Self {
            config,
            capture: Some(capture),
            device_config,
            recording: Arc::new(AtomicBool::new(false)),
            worker_handle: None,
            worker_state: Some(worker),
            event_rx: Some(event_rx),
        })
    }

    /// Attach shared metrics. Only effective before `start_recording`
    /// hands the worker off to its task.
    pub fn with_metrics(mut self, metrics: Arc<PipelineMetrics>) -> Self {
        if let Some(worker) = &mut self.worker_state {
            worker.metrics = Some(metrics);
        }
        self
    }

    /// Take the event stream. Yields one `Chunk` per 512 target-rate
    /// samples while recording.
    pub fn events(&mut self) -> Option<mpsc::Receiver<CaptureEvent>> {
        self.event_rx.take()
    }

    pub fn device_config(&self) -> DeviceConfig {
        self.device_config
    }

    pub fn is_recording(&self) -> bool {
        self.recording.load(Ordering::SeqCst)
    }

    /// Begin the fixed-period sampling loop. Idempotent while recording.
    pub fn start_recording(&mut self) {
        if self.recording.swap(true, Ordering::SeqCst) {
            return;
        }

        if self.worker_handle.is_none() {
            if let Some(mut worker) = self.worker_state.take() {
                let recording = Arc::clone(&self.recording);
                let tick = self.config.tick_interval;

                self.worker_handle = Some(tokio::spawn(async move {
                    worker.run(recording, tick).await;
                }));
            }
        }

        tracing::debug!("Recording started");
    }

    /// Halt the sampling loop; the device stays acquired.
    pub fn stop_recording(&mut self) {
        self.recording.store(false, Ordering::SeqCst);
        tracing::debug!("Recording stopped");
    }

    /// Stop recording and release the microphone. Safe to call multiple
    /// times.
    pub fn cleanup(&mut self) {
        self.stop_recording();

        if let Some(handle) = self.worker_handle.take() {
            handle.abort();
        }
        self.worker_state = None;

        if let Some(mut capture) = self.capture.take() {
            capture.stop();
        }
    }
}

impl Drop for CaptureEngine {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// The per-tick chunking state machine.
///
/// The accumulator holds mono device-rate samples. Each tick the whole
/// accumulator is resampled to the target rate, complete chunks are sliced
/// off, and the remainder is converted back to device rate and carried to
/// the next tick, so no samples are dropped or duplicated across ticks.
struct ChunkWorker {
    frame_reader: FrameReader,
    event_tx: mpsc::Sender<CaptureEvent>,
    device_cfg_rx: tokio::sync::watch::Receiver<DeviceConfig>,
    vad: EnergyZcrVad,
    accumulator: Vec<f32>,
    target_rate: u32,
    chunk_size: usize,
    device_rate: u32,
    metrics: Option<Arc<PipelineMetrics>>,
    fps_tracker: FpsTracker,
    stream_failed: Option<Arc<AtomicBool>>,
    stream_error_reported: bool,
}

impl ChunkWorker {
    fn new(
        frame_reader: FrameReader,
        event_tx: mpsc::Sender<CaptureEvent>,
        device_cfg_rx: tokio::sync::watch::Receiver<DeviceConfig>,
        config: &CaptureEngineConfig,
        device_config: DeviceConfig,
    ) -> Self {
        Self {
            frame_reader,
            event_tx,
            device_cfg_rx,
            vad: EnergyZcrVad::new(config.vad.clone()),
            accumulator: Vec::with_capacity(RING_CAPACITY_SAMPLES / 4),
            target_rate: config.target_sample_rate,
            chunk_size: config.chunk_size_samples,
            device_rate: device_config.sample_rate,
            metrics: None,
            fps_tracker: FpsTracker::new(),
            stream_failed: None,
            stream_error_reported: false,
        }
    }

    async fn run(&mut self, recording: Arc<AtomicBool>, tick_interval: Duration) {
        tracing::info!(
            "Capture worker started: {} Hz device -> {} Hz chunks of {} samples",
            self.device_rate,
            self.target_rate,
            self.chunk_size
        );

        let mut ticker = time::interval(tick_interval);
        // Processing is assumed fast relative to the tick period; a late
        // tick just runs the next one on schedule rather than bursting.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            // Mid-stream device loss is reported once; no automatic retry
            if !self.stream_error_reported
                && self
                    .stream_failed
                    .as_ref()
                    .map(|f| f.load(Ordering::SeqCst))
                    .unwrap_or(false)
            {
                self.stream_error_reported = true;
                let _ = self
                    .event_tx
                    .try_send(CaptureEvent::Error("audio stream failed".to_string()));
            }

            self.reconcile_device_config();

            if !recording.load(Ordering::SeqCst) {
                // Keep the ring drained while paused so stale audio never
                // leaks into the next recording
                while self.frame_reader.read_frame(READ_BATCH_SAMPLES).is_some() {}
                self.accumulator.clear();
                continue;
            }

            self.process_tick();
        }
    }

    /// A renegotiated device rate invalidates the accumulator's rate
    /// assumption; rebuilding it is mandatory, not best-effort.
    fn reconcile_device_config(&mut self) {
        if self
            .device_cfg_rx
            .has_changed()
            .unwrap_or(false)
        {
            let cfg = *self.device_cfg_rx.borrow_and_update();
            if cfg.sample_rate > 0 && cfg.sample_rate != self.device_rate {
                tracing::info!(
                    "Reconciling capture pipeline: device rate {} -> {}",
                    self.device_rate,
                    cfg.sample_rate
                );
                // Carry the pending audio across the rate change
                let carried = resample_linear(&self.accumulator, self.device_rate, cfg.sample_rate);
                self.accumulator = carried;
                self.device_rate = cfg.sample_rate;
                self.frame_reader.update_sample_rate(cfg.sample_rate);
            }
        }
    }

    fn process_tick(&mut self) {
        // Drain everything the device produced since the last tick
        while let Some(frame) = self.frame_reader.read_frame(READ_BATCH_SAMPLES) {
            self.accumulator.extend_from_slice(&frame.samples);
            if let Some(m) = &self.metrics {
                m.increment_capture_frames();
                if let Some(fps) = self.fps_tracker.tick() {
                    m.update_capture_fps(fps);
                }
            }
        }

        if self.accumulator.is_empty() {
            return;
        }

        // Whole-accumulator conversion to the target rate
        let mut resampled = resample_linear(&self.accumulator, self.device_rate, self.target_rate);

        let mut offset = 0;
        while resampled.len() - offset >= self.chunk_size {
            let chunk = &resampled[offset..offset + self.chunk_size];
            offset += self.chunk_size;

            let vad = self.vad.assess(chunk);
            let encoded = EncodedChunk::from_samples(chunk, self.target_rate);

            if let Some(m) = &self.metrics {
                m.increment_chunks_emitted();
                m.update_audio_level(vad.confidence / 100.0);
                m.mark_speaking(vad.is_speech);
            }

            // Never block the tick loop on a slow consumer
            if let Err(e) = self.event_tx.try_send(CaptureEvent::Chunk {
                chunk: encoded,
                vad,
            }) {
                tracing::warn!("Dropping capture chunk: {}", e);
            }
        }

        // Convert the unchunked remainder back to device rate and retain it
        let remainder = resampled.split_off(offset);
        self.accumulator = resample_linear(&remainder, self.target_rate, self.device_rate);
    }
}
