/// Streaming mono resampler using linear interpolation.
///
/// Keeps a fractional read position across calls so arbitrary-sized input
/// chunks resample without seams. Quality is deliberately modest: the
/// capture path feeds a speech backend at 16 kHz, and linear interpolation
/// is what the backend's recognizer is tuned for.
pub struct LinearResampler {
    in_rate: u32,
    out_rate: u32,
    step: f64,
    pos: f64,
    buf: Vec<f32>,
}

impl LinearResampler {
    pub fn new(in_rate: u32, out_rate: u32) -> Self {
        Self {
            in_rate,
            out_rate,
            step: in_rate as f64 / out_rate.max(1) as f64,
            pos: 0.0,
            buf: Vec::new(),
        }
    }

    /// Process an arbitrary chunk of mono samples, returning whatever
    /// complete output samples are available at the output rate.
    pub fn process(&mut self, input: &[f32]) -> Vec<f32> {
        if self.in_rate == self.out_rate {
            // Fast path: identity
            return input.to_vec();
        }

        self.buf.extend_from_slice(input);

        let approx_len = ((input.len() as u64 * self.out_rate as u64)
            / self.in_rate.max(1) as u64)
            .saturating_add(2) as usize;
        let mut out = Vec::with_capacity(approx_len);

        while self.pos + 1.0 < self.buf.len() as f64 {
            let i = self.pos.floor() as usize;
            let frac = self.pos - i as f64;

            let a = self.buf[i];
            let b = self.buf[i + 1];
            out.push(a + (b - a) * frac as f32);

            self.pos += self.step;
        }

        // Drop consumed input, keeping one sample of history for the next
        // interpolation window
        let drain = self.pos.floor() as usize;
        if drain > 0 {
            let keep_from = drain.min(self.buf.len());
            self.buf.drain(..keep_from);
            self.pos -= keep_from as f64;
        }

        out
    }

    /// Reset internal state, clearing buffered samples.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.pos = 0.0;
    }

    pub fn input_rate(&self) -> u32 {
        self.in_rate
    }

    pub fn output_rate(&self) -> u32 {
        self.out_rate
    }
}

/// One-shot linear resample of a whole buffer.
///
/// The capture engine resamples its entire accumulator each tick and
/// converts the unchunked remainder back, so it needs the stateless form:
/// output length is floor(len * to / from), each output sample interpolated
/// between its two bracketing input samples.
pub fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let out_len = ((samples.len() as u64 * to_rate as u64) / from_rate as u64) as usize;
    let mut out = Vec::with_capacity(out_len);

    for n in 0..out_len {
        let pos = n as f64 * ratio;
        let i = pos.floor() as usize;
        let frac = (pos - i as f64) as f32;

        let a = samples[i];
        let b = if i + 1 < samples.len() {
            samples[i + 1]
        } else {
            a
        };
        out.push(a + (b - a) * frac);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_same_rate() {
        let mut rs = LinearResampler::new(16_000, 16_000);
        let input = vec![0.1f32, 0.2, 0.3, 0.4, 0.5];
        assert_eq!(rs.process(&input), input);
    }

    #[test]
    fn one_shot_identity() {
        let input = vec![0.25f32, -0.25, 0.5];
        assert_eq!(resample_linear(&input, 48_000, 48_000), input);
    }

    #[test]
    fn downsample_48k_to_16k_ratio() {
        let input: Vec<f32> = (0..4800).map(|i| (i as f32 / 4800.0).sin()).collect();
        let out = resample_linear(&input, 48_000, 16_000);
        assert_eq!(out.len(), 1600);
    }

    #[test]
    fn upsample_preserves_constant_signal() {
        let input = vec![0.5f32; 160];
        let out = resample_linear(&input, 16_000, 48_000);
        assert_eq!(out.len(), 480);
        for &s in &out {
            assert!((s - 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn round_trip_length_is_stable() {
        // Down then up should land back near the original length; the
        // capture accumulator relies on this not drifting across ticks.
        let input = vec![0.0f32; 512];
        let down = resample_linear(&input, 48_000, 16_000);
        let up = resample_linear(&down, 16_000, 48_000);
        assert_eq!(down.len(), 170);
        assert_eq!(up.len(), 510);
    }

    #[test]
    fn streaming_matches_ratio_across_chunks() {
        let mut rs = LinearResampler::new(48_000, 16_000);
        let input: Vec<f32> = (0..4800).map(|i| ((i % 100) as f32 / 100.0) - 0.5).collect();

        let mut total = 0;
        for chunk in input.chunks(1000) {
            total += rs.process(chunk).len();
        }
        // Within interpolation-window slack of the exact 1/3 ratio
        assert!((1595..=1600).contains(&total), "got {} samples", total);
    }

    #[test]
    fn streaming_interpolates_ramp() {
        let mut rs = LinearResampler::new(32_000, 16_000);
        let input: Vec<f32> = (0..64).map(|i| i as f32 / 64.0).collect();
        let out = rs.process(&input);
        // Every output sample sits on the input ramp
        for w in out.windows(2) {
            assert!(w[1] > w[0]);
        }
    }
}
