pub mod capture;
pub mod engine;
pub mod frame_reader;
pub mod resampler;
pub mod ring_buffer;

pub use capture::{CaptureThread, DeviceConfig};
pub use engine::{CaptureEngine, CaptureEngineConfig, CaptureEvent};
pub use frame_reader::{FrameReader, RawFrame};
pub use resampler::{resample_linear, LinearResampler};
pub use ring_buffer::AudioRingBuffer;
