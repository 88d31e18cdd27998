pub struct EnergyCalculator {
    epsilon: f32,
}

impl EnergyCalculator {
    pub fn new() -> Self {
        Self { epsilon: 1e-10 }
    }

    /// RMS energy of a normalized-float frame ([-1, 1] samples).
    pub fn calculate_rms(&self, frame: &[f32]) -> f32 {
        if frame.is_empty() {
            return 0.0;
        }

        let sum_squares: f64 = frame.iter().map(|&s| (s as f64) * (s as f64)).sum();
        (sum_squares / frame.len() as f64).sqrt() as f32
    }

    /// Fraction of adjacent sample pairs whose signs differ, in [0, 1].
    pub fn zero_crossing_rate(&self, frame: &[f32]) -> f32 {
        if frame.len() < 2 {
            return 0.0;
        }

        let crossings = frame
            .windows(2)
            .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
            .count();
        crossings as f32 / frame.len() as f32
    }

    pub fn rms_to_dbfs(&self, rms: f32) -> f32 {
        if rms <= self.epsilon {
            return -100.0;
        }
        20.0 * rms.log10()
    }
}

impl Default for EnergyCalculator {
    fn default() -> Self {
        Self::new()
    }
}
