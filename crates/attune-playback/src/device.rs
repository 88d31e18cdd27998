use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use attune_audio::resample_linear;
use attune_foundation::DeviceError;

use crate::sink::{AudioSink, PlayOutcome, SinkError};

/// Speaker-backed sink. Owns the output device exclusively; the capture
/// engine owns the microphone, and both run full duplex.
///
/// The cpal output stream lives on its own thread (streams are not Send).
/// The output callback drains a shared sample queue and signals when it
/// runs dry, which is the end-of-playback signal `play` awaits.
pub struct CpalSink {
    shared: Arc<SinkShared>,
    handle: Option<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    device_rate: u32,
}

struct SinkShared {
    queue: Mutex<VecDeque<f32>>,
    drained: tokio::sync::Notify,
    epoch: AtomicU64,
}

impl CpalSink {
    pub fn new(device_name: Option<String>) -> Result<Self, DeviceError> {
        let shared = Arc::new(SinkShared {
            queue: Mutex::new(VecDeque::new()),
            drained: tokio::sync::Notify::new(),
            epoch: AtomicU64::new(0),
        });
        let shutdown = Arc::new(AtomicBool::new(false));

        let (startup_tx, startup_rx) = mpsc::channel::<Result<u32, DeviceError>>();
        let thread_shared = Arc::clone(&shared);
        let thread_shutdown = Arc::clone(&shutdown);

        let handle = thread::Builder::new()
            .name("audio-playback".to_string())
            .spawn(move || {
                let stream = match open_output_stream(device_name.as_deref(), thread_shared) {
                    Ok((stream, rate)) => {
                        let _ = startup_tx.send(Ok(rate));
                        stream
                    }
                    Err(e) => {
                        let _ = startup_tx.send(Err(e));
                        return;
                    }
                };

                if let Err(e) = stream.play() {
                    tracing::error!("Failed to start output stream: {}", e);
                    return;
                }

                while !thread_shutdown.load(Ordering::SeqCst) {
                    thread::sleep(Duration::from_millis(50));
                }

                drop(stream);
                tracing::info!("Audio playback thread shut down");
            })
            .map_err(|e| DeviceError::Fatal(format!("Failed to spawn playback thread: {}", e)))?;

        let device_rate = startup_rx
            .recv_timeout(Duration::from_secs(5))
            .map_err(|_| DeviceError::Fatal("Timed out waiting for output device".to_string()))??;

        tracing::info!("Playback sink ready at {} Hz", device_rate);

        Ok(Self {
            shared,
            handle: Some(handle),
            shutdown,
            device_rate,
        })
    }

    pub fn device_rate(&self) -> u32 {
        self.device_rate
    }
}

impl Drop for CpalSink {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[async_trait]
impl AudioSink for CpalSink {
    async fn play(&self, samples: &[f32], sample_rate: u32) -> Result<PlayOutcome, SinkError> {
        let device_samples = resample_linear(samples, sample_rate, self.device_rate);
        let epoch = self.shared.epoch.load(Ordering::SeqCst);

        self.shared
            .queue
            .lock()
            .extend(device_samples.iter().copied());

        loop {
            // Create the future before checking, so a notify between the
            // check and the await is not lost
            let drained = self.shared.drained.notified();

            if self.shared.epoch.load(Ordering::SeqCst) != epoch {
                return Ok(PlayOutcome::Interrupted);
            }
            if self.shared.queue.lock().is_empty() {
                return Ok(PlayOutcome::Completed);
            }

            drained.await;
        }
    }

    fn halt(&self) {
        self.shared.epoch.fetch_add(1, Ordering::SeqCst);
        self.shared.queue.lock().clear();
        self.shared.drained.notify_waiters();
    }
}

fn open_output_stream(
    device_name: Option<&str>,
    shared: Arc<SinkShared>,
) -> Result<(cpal::Stream, u32), DeviceError> {
    let host = cpal::default_host();

    let device = match device_name {
        Some(name) => host
            .output_devices()?
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
            .ok_or(DeviceError::NoOutputDevice)?,
        None => host
            .default_output_device()
            .ok_or(DeviceError::NoOutputDevice)?,
    };

    if let Ok(name) = device.name() {
        tracing::info!("Selected output device: {}", name);
    }

    let default_config = device.default_output_config()?;
    let sample_format = default_config.sample_format();
    let config = StreamConfig {
        channels: default_config.channels(),
        sample_rate: default_config.sample_rate(),
        buffer_size: cpal::BufferSize::Default,
    };
    let channels = config.channels as usize;
    let rate = config.sample_rate;

    let err_fn = |err: cpal::StreamError| {
        tracing::error!("Output stream error: {}", err);
    };

    // Mono samples are duplicated across all output channels; silence is
    // written when the queue is dry.
    let stream = match sample_format {
        SampleFormat::F32 => device.build_output_stream(
            &config,
            move |data: &mut [f32], _: &_| {
                let mut queue = shared.queue.lock();
                for frame in data.chunks_exact_mut(channels) {
                    let sample = queue.pop_front().unwrap_or(0.0);
                    frame.fill(sample);
                }
                // Notify every period the queue is dry: notify_waiters does
                // not buffer a permit, so a one-shot edge signal can be lost
                // between a waiter's empty-check and its await
                if queue.is_empty() {
                    shared.drained.notify_waiters();
                }
            },
            err_fn,
            None,
        )?,
        SampleFormat::I16 => device.build_output_stream(
            &config,
            move |data: &mut [i16], _: &_| {
                let mut queue = shared.queue.lock();
                for frame in data.chunks_exact_mut(channels) {
                    let sample = queue.pop_front().unwrap_or(0.0);
                    let value = (sample.clamp(-1.0, 1.0) * 32767.0).round() as i16;
                    frame.fill(value);
                }
                if queue.is_empty() {
                    shared.drained.notify_waiters();
                }
            },
            err_fn,
            None,
        )?,
        other => {
            return Err(DeviceError::FormatNotSupported {
                format: format!("{:?}", other),
            });
        }
    };

    Ok((stream, rate))
}
