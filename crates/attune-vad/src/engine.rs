use crate::types::VadStatus;

/// A trait for Voice Activity Detection (VAD) engines.
///
/// Engines classify one fixed-size frame at a time and carry no state
/// between frames, so they can be swapped without touching the pipeline.
pub trait VadEngine: Send {
    /// Classify a single frame of normalized mono samples.
    fn assess(&self, frame: &[f32]) -> VadStatus;

    fn required_sample_rate(&self) -> u32;
    fn required_frame_size_samples(&self) -> usize;
}
