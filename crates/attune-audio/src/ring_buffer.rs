use rtrb::{Consumer, Producer, RingBuffer};
use tracing::warn;

/// Lock-free audio ring buffer between the cpal callback and the chunking
/// worker. Samples are normalized mono/interleaved f32.
pub struct AudioRingBuffer {
    producer: Producer<f32>,
    consumer: Consumer<f32>,
}

impl AudioRingBuffer {
    pub fn new(capacity: usize) -> Self {
        let (producer, consumer) = RingBuffer::new(capacity);
        Self { producer, consumer }
    }

    /// Split into halves for the capture thread and the worker task.
    pub fn split(self) -> (AudioProducer, AudioConsumer) {
        (
            AudioProducer {
                producer: self.producer,
            },
            AudioConsumer {
                consumer: self.consumer,
            },
        )
    }
}

/// Producer half, written from the real-time audio callback.
pub struct AudioProducer {
    producer: Producer<f32>,
}

impl AudioProducer {
    /// Non-blocking write. On overflow the whole slice is dropped; partial
    /// frames are worse than missing frames for downstream chunking.
    pub fn write(&mut self, samples: &[f32]) -> Result<usize, ()> {
        let mut chunk = match self.producer.write_chunk(samples.len()) {
            Ok(chunk) => chunk,
            Err(_) => {
                warn!(
                    "Ring buffer overflow: dropping {} samples",
                    samples.len()
                );
                return Err(());
            }
        };

        // The chunk may wrap around the end of the buffer
        let (first, second) = chunk.as_mut_slices();
        let split = first.len();
        first.copy_from_slice(&samples[..split]);
        if !second.is_empty() {
            second.copy_from_slice(&samples[split..]);
        }
        chunk.commit_all();
        Ok(samples.len())
    }

    pub fn slots(&self) -> usize {
        self.producer.slots()
    }
}

/// Consumer half, drained by the chunking worker.
pub struct AudioConsumer {
    consumer: Consumer<f32>,
}

impl AudioConsumer {
    /// Non-blocking read of up to `buffer.len()` samples; returns the count
    /// actually copied.
    pub fn read(&mut self, buffer: &mut [f32]) -> usize {
        let chunk = match self.consumer.read_chunk(buffer.len()) {
            Ok(chunk) => chunk,
            Err(rtrb::chunks::ChunkError::TooFewSlots(available)) => {
                if available == 0 {
                    return 0;
                }
                self.consumer.read_chunk(available).unwrap()
            }
        };

        let len = chunk.len();
        let (first, second) = chunk.as_slices();
        let split = first.len();
        buffer[..split].copy_from_slice(first);
        if !second.is_empty() {
            buffer[split..split + second.len()].copy_from_slice(second);
        }
        chunk.commit_all();
        len
    }

    pub fn slots(&self) -> usize {
        self.consumer.slots()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_preserves_order() {
        let rb = AudioRingBuffer::new(64);
        let (mut producer, mut consumer) = rb.split();

        let samples = vec![0.1f32, 0.2, 0.3, 0.4];
        assert_eq!(producer.write(&samples).unwrap(), 4);

        let mut buffer = vec![0.0f32; 8];
        assert_eq!(consumer.read(&mut buffer), 4);
        assert_eq!(&buffer[..4], &samples[..]);
    }

    #[test]
    fn oversized_write_is_dropped_whole() {
        let rb = AudioRingBuffer::new(8);
        let (mut producer, mut consumer) = rb.split();

        assert!(producer.write(&vec![1.0f32; 12]).is_err());
        let mut buffer = vec![0.0f32; 8];
        assert_eq!(consumer.read(&mut buffer), 0);
    }

    #[test]
    fn wrapping_read_returns_contiguous_samples() {
        let rb = AudioRingBuffer::new(8);
        let (mut producer, mut consumer) = rb.split();

        producer.write(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let mut buffer = vec![0.0f32; 6];
        consumer.read(&mut buffer);

        // Second write wraps around the ring's end
        producer.write(&[7.0, 8.0, 9.0, 10.0]).unwrap();
        let mut buffer = vec![0.0f32; 4];
        assert_eq!(consumer.read(&mut buffer), 4);
        assert_eq!(buffer, vec![7.0, 8.0, 9.0, 10.0]);
    }
}
