use crate::{
    config::VadConfig,
    constants::{FRAME_SIZE_SAMPLES, SAMPLE_RATE_HZ},
    energy::EnergyCalculator,
    engine::VadEngine,
    types::VadStatus,
};

/// Energy + zero-crossing-rate classifier.
///
/// A frame is speech when its RMS exceeds the energy threshold AND its ZCR
/// falls inside the speech band. This is a best-effort local indicator for
/// UI feedback; it must never gate whether audio is transmitted.
pub struct EnergyZcrVad {
    config: VadConfig,
    energy_calc: EnergyCalculator,
}

impl EnergyZcrVad {
    pub fn new(config: VadConfig) -> Self {
        Self {
            config,
            energy_calc: EnergyCalculator::new(),
        }
    }

    pub fn config(&self) -> &VadConfig {
        &self.config
    }
}

impl Default for EnergyZcrVad {
    fn default() -> Self {
        Self::new(VadConfig::default())
    }
}

impl VadEngine for EnergyZcrVad {
    fn assess(&self, frame: &[f32]) -> VadStatus {
        let rms = self.energy_calc.calculate_rms(frame);
        let zcr = self.energy_calc.zero_crossing_rate(frame);

        let is_speech = rms > self.config.energy_threshold
            && zcr > self.config.zcr_min
            && zcr < self.config.zcr_max;

        VadStatus {
            is_speech,
            confidence: (rms * self.config.confidence_scale).min(1.0),
        }
    }

    fn required_sample_rate(&self) -> u32 {
        SAMPLE_RATE_HZ
    }

    fn required_frame_size_samples(&self) -> usize {
        FRAME_SIZE_SAMPLES
    }
}
