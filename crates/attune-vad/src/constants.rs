//! Audio processing constants for the VAD pipeline

/// Standard sample rate for all VAD processing (Hz)
pub const SAMPLE_RATE_HZ: u32 = 16_000;

/// Standard frame size for all VAD processing (samples)
/// At 16kHz, 512 samples = 32ms frames
pub const FRAME_SIZE_SAMPLES: usize = 512;

/// Frame duration in milliseconds (derived constant)
pub const FRAME_DURATION_MS: f32 = (FRAME_SIZE_SAMPLES as f32 * 1000.0) / SAMPLE_RATE_HZ as f32;

/// RMS energy above which a frame is a speech candidate.
/// Empirically tuned; treat any change as a behavior change, not a fix.
pub const ENERGY_THRESHOLD: f32 = 0.002;

/// Zero-crossing-rate band for speech. Below the band is low-frequency
/// rumble, above it is broadband noise/fricative hiss.
pub const ZCR_MIN: f32 = 0.05;
pub const ZCR_MAX: f32 = 0.4;

/// Confidence scale factor: confidence = min(1, rms * CONFIDENCE_SCALE)
pub const CONFIDENCE_SCALE: f32 = 100.0;
