use crate::error::DecodeError;

/// Convert normalized float samples to 16-bit little-endian PCM bytes.
///
/// Samples are scaled by 32768 and clamped to the i16 range. The asymmetry
/// against [`decode_pcm16`] (multiply by 32768, clamp the positive side at
/// 32767) is part of the wire contract and must not be "fixed".
pub fn encode_pcm16(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let scaled = (sample * 32768.0).clamp(-32768.0, 32767.0) as i16;
        bytes.extend_from_slice(&scaled.to_le_bytes());
    }
    bytes
}

/// Convert 16-bit little-endian PCM bytes back to normalized floats.
///
/// Each sample is divided by 32768.0, so the decoded range is
/// [-1.0, 32767/32768].
pub fn decode_pcm16(bytes: &[u8]) -> Result<Vec<f32>, DecodeError> {
    if bytes.len() % 2 != 0 {
        return Err(DecodeError::TruncatedPcm { len: bytes.len() });
    }

    Ok(bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_within_quantization_error() {
        let samples: Vec<f32> = (0..=2000).map(|i| (i as f32 / 1000.0) - 1.0).collect();
        let decoded = decode_pcm16(&encode_pcm16(&samples)).unwrap();

        assert_eq!(decoded.len(), samples.len());
        for (orig, dec) in samples.iter().zip(&decoded) {
            assert!(
                (orig - dec).abs() <= 1.0 / 32768.0,
                "sample {} decoded as {}",
                orig,
                dec
            );
        }
    }

    #[test]
    fn positive_full_scale_clamps_to_i16_max() {
        let bytes = encode_pcm16(&[1.0]);
        assert_eq!(i16::from_le_bytes([bytes[0], bytes[1]]), 32767);
    }

    #[test]
    fn negative_full_scale_maps_to_i16_min() {
        let bytes = encode_pcm16(&[-1.0]);
        assert_eq!(i16::from_le_bytes([bytes[0], bytes[1]]), -32768);
    }

    #[test]
    fn out_of_range_input_is_clamped() {
        let bytes = encode_pcm16(&[1.5, -1.5]);
        let decoded = decode_pcm16(&bytes).unwrap();
        assert!((decoded[0] - 32767.0 / 32768.0).abs() < f32::EPSILON);
        assert!((decoded[1] + 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn odd_byte_count_is_rejected() {
        assert!(matches!(
            decode_pcm16(&[0u8, 1, 2]),
            Err(DecodeError::TruncatedPcm { len: 3 })
        ));
    }

    #[test]
    fn zero_is_exact() {
        let decoded = decode_pcm16(&encode_pcm16(&[0.0])).unwrap();
        assert_eq!(decoded[0], 0.0);
    }
}
