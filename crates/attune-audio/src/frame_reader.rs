use std::time::Instant;

use super::ring_buffer::AudioConsumer;

/// A batch of mono device-rate samples drained from the ring buffer.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub timestamp: Instant,
}

/// Reads audio from the ring buffer and reconstructs frame metadata.
///
/// Timestamps are derived from the running sample count, not wall-clock
/// reads, so they stay monotonic even when the worker polls late.
pub struct FrameReader {
    consumer: AudioConsumer,
    sample_rate: u32,
    samples_read: u64,
    start_time: Instant,
}

impl FrameReader {
    pub fn new(consumer: AudioConsumer, sample_rate: u32) -> Self {
        Self {
            consumer,
            sample_rate,
            samples_read: 0,
            start_time: Instant::now(),
        }
    }

    /// Apply a device config change (the platform renegotiated the rate).
    pub fn update_sample_rate(&mut self, sample_rate: u32) {
        if sample_rate != self.sample_rate && sample_rate > 0 {
            tracing::info!(
                "Device sample rate changed: {} -> {}",
                self.sample_rate,
                sample_rate
            );
            self.sample_rate = sample_rate;
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Read the next batch, up to `max_samples`. Returns None when the ring
    /// buffer is empty.
    pub fn read_frame(&mut self, max_samples: usize) -> Option<RawFrame> {
        let mut buffer = vec![0.0f32; max_samples];
        let samples_read = self.consumer.read(&mut buffer);

        if samples_read == 0 {
            return None;
        }

        buffer.truncate(samples_read);

        let elapsed_ms = (self.samples_read * 1000) / self.sample_rate.max(1) as u64;
        let timestamp = self.start_time + std::time::Duration::from_millis(elapsed_ms);

        self.samples_read += samples_read as u64;

        Some(RawFrame {
            samples: buffer,
            sample_rate: self.sample_rate,
            timestamp,
        })
    }

    pub fn available_samples(&self) -> usize {
        self.consumer.slots()
    }
}
