use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use attune_foundation::DeviceError;

use super::ring_buffer::AudioProducer;

/// Negotiated input device configuration.
///
/// The platform may silently deliver a different rate than requested; the
/// chunking engine must reconcile against these values, not the target
/// rate, or the pipeline aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceConfig {
    pub sample_rate: u32,
    pub channels: u16,
}

/// Handle to the dedicated microphone thread.
///
/// The cpal stream is created and kept on its own OS thread (streams are
/// not Send). Acquisition happens during `spawn` and failures surface
/// there, once; the thread never retries a lost device on its own.
pub struct CaptureThread {
    handle: Option<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    failed: Arc<AtomicBool>,
    config_rx: tokio::sync::watch::Receiver<DeviceConfig>,
}

impl CaptureThread {
    pub fn spawn(
        producer: AudioProducer,
        device_name: Option<String>,
    ) -> Result<(Self, DeviceConfig), DeviceError> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let failed = Arc::new(AtomicBool::new(false));

        let (startup_tx, startup_rx) = mpsc::channel::<Result<DeviceConfig, DeviceError>>();

        let thread_shutdown = Arc::clone(&shutdown);
        let thread_failed = Arc::clone(&failed);

        // Placeholder until the thread reports the negotiated config
        let (config_tx, config_rx) = tokio::sync::watch::channel(DeviceConfig {
            sample_rate: 0,
            channels: 0,
        });

        let handle = thread::Builder::new()
            .name("audio-capture".to_string())
            .spawn(move || {
                let (stream, device_config) =
                    match open_input_stream(device_name.as_deref(), producer, &thread_failed) {
                        Ok(pair) => pair,
                        Err(e) => {
                            let _ = startup_tx.send(Err(e));
                            return;
                        }
                    };

                if let Err(e) = stream.play() {
                    let _ = startup_tx.send(Err(e.into()));
                    return;
                }

                let _ = config_tx.send(device_config);
                let _ = startup_tx.send(Ok(device_config));

                while !thread_shutdown.load(Ordering::SeqCst) {
                    thread::sleep(Duration::from_millis(50));
                }

                drop(stream);
                tracing::info!("Audio capture thread shut down");
            })
            .map_err(|e| DeviceError::Fatal(format!("Failed to spawn audio thread: {}", e)))?;

        let device_config = startup_rx
            .recv_timeout(Duration::from_secs(5))
            .map_err(|_| DeviceError::Fatal("Timed out waiting for device".to_string()))??;

        tracing::info!(
            "Capture started: {} Hz, {} channel(s)",
            device_config.sample_rate,
            device_config.channels
        );

        Ok((
            Self {
                handle: Some(handle),
                shutdown,
                failed,
                config_rx,
            },
            device_config,
        ))
    }

    /// Watch the negotiated device config; the chunking engine subscribes
    /// so a rate/channel change always reconfigures the resampling path.
    pub fn config_watch(&self) -> tokio::sync::watch::Receiver<DeviceConfig> {
        self.config_rx.clone()
    }

    /// True after an unrecoverable mid-stream error. The engine reports it
    /// once; recovery is the caller's decision.
    pub fn has_failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }

    /// Shared failure flag, set from the stream error callback.
    pub fn failure_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.failed)
    }

    /// Stop and release the device. Safe to call more than once.
    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for CaptureThread {
    fn drop(&mut self) {
        self.stop();
    }
}

fn open_input_stream(
    device_name: Option<&str>,
    producer: AudioProducer,
    failed: &Arc<AtomicBool>,
) -> Result<(cpal::Stream, DeviceConfig), DeviceError> {
    let host = cpal::default_host();

    let device = match device_name {
        Some(name) => host
            .input_devices()?
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| DeviceError::DeviceNotFound {
                name: Some(name.to_string()),
            })?,
        None => host
            .default_input_device()
            .ok_or(DeviceError::DeviceNotFound { name: None })?,
    };

    if let Ok(name) = device.name() {
        tracing::info!("Selected input device: {}", name);
    }

    let default_config = device.default_input_config()?;
    let sample_format = default_config.sample_format();
    let config = StreamConfig {
        channels: default_config.channels(),
        sample_rate: default_config.sample_rate(),
        buffer_size: cpal::BufferSize::Default,
    };

    let device_config = DeviceConfig {
        sample_rate: config.sample_rate,
        channels: config.channels,
    };

    let stream = build_stream(&device, &config, sample_format, producer, failed)?;
    Ok((stream, device_config))
}

fn build_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    sample_format: SampleFormat,
    producer: AudioProducer,
    failed: &Arc<AtomicBool>,
) -> Result<cpal::Stream, DeviceError> {
    // The producer moves into the callback; the ring buffer is the only
    // channel out of the real-time thread.
    let producer = Arc::new(parking_lot::Mutex::new(producer));
    let channels = config.channels as usize;

    let err_failed = Arc::clone(failed);
    let err_fn = move |err: cpal::StreamError| {
        tracing::error!("Audio stream error: {}", err);
        err_failed.store(true, Ordering::SeqCst);
    };

    // Downmix to mono in the callback so the ring buffer always carries
    // mono device-rate samples. Thread-local scratch avoids allocating on
    // the audio thread.
    thread_local! {
        static MONO_BUFFER: std::cell::RefCell<Vec<f32>> = const { std::cell::RefCell::new(Vec::new()) };
    }

    let write_mono = move |data: &[f32]| {
        MONO_BUFFER.with(|buf| {
            let mut mono = buf.borrow_mut();
            mono.clear();
            if channels <= 1 {
                mono.extend_from_slice(data);
            } else {
                mono.reserve(data.len() / channels);
                for frame in data.chunks_exact(channels) {
                    let sum: f32 = frame.iter().sum();
                    mono.push(sum / channels as f32);
                }
            }
            let _ = producer.lock().write(&mono);
        });
    };

    let stream = match sample_format {
        SampleFormat::F32 => device.build_input_stream(
            config,
            move |data: &[f32], _: &_| write_mono(data),
            err_fn,
            None,
        )?,
        SampleFormat::I16 => {
            thread_local! {
                static CONVERT_BUFFER: std::cell::RefCell<Vec<f32>> = const { std::cell::RefCell::new(Vec::new()) };
            }
            device.build_input_stream(
                config,
                move |data: &[i16], _: &_| {
                    CONVERT_BUFFER.with(|buf| {
                        let mut converted = buf.borrow_mut();
                        converted.clear();
                        converted.reserve(data.len());
                        for &s in data {
                            converted.push(s as f32 / 32768.0);
                        }
                        write_mono(&converted);
                    });
                },
                err_fn,
                None,
            )?
        }
        SampleFormat::U16 => {
            thread_local! {
                static CONVERT_BUFFER: std::cell::RefCell<Vec<f32>> = const { std::cell::RefCell::new(Vec::new()) };
            }
            device.build_input_stream(
                config,
                move |data: &[u16], _: &_| {
                    CONVERT_BUFFER.with(|buf| {
                        let mut converted = buf.borrow_mut();
                        converted.clear();
                        converted.reserve(data.len());
                        // Center unsigned samples, then normalize
                        for &s in data {
                            converted.push((s as i32 - 32768) as f32 / 32768.0);
                        }
                        write_mono(&converted);
                    });
                },
                err_fn,
                None,
            )?
        }
        other => {
            return Err(DeviceError::FormatNotSupported {
                format: format!("{:?}", other),
            });
        }
    };

    Ok(stream)
}
