use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;

use crate::error::DecodeError;
use crate::mime::MimeType;
use crate::pcm::{decode_pcm16, encode_pcm16};

/// One transport-ready audio chunk: base64-wrapped PCM16 plus its rate.
///
/// Immutable once created. Ownership follows the chunk through the
/// pipeline: capture hands it to the channel, the channel hands inbound
/// chunks to playback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedChunk {
    pub data: String,
    pub sample_rate: u32,
}

impl EncodedChunk {
    /// Encode normalized float samples into a transport chunk.
    pub fn from_samples(samples: &[f32], sample_rate: u32) -> Self {
        Self {
            data: BASE64_STANDARD.encode(encode_pcm16(samples)),
            sample_rate,
        }
    }

    /// Decode this chunk back to normalized float samples.
    pub fn to_samples(&self) -> Result<Vec<f32>, DecodeError> {
        let bytes = BASE64_STANDARD.decode(&self.data)?;
        decode_pcm16(&bytes)
    }
}

/// Decoded playable audio, produced from an inbound `audio` message.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Decode an inbound base64 payload according to its declared mime type.
///
/// Only raw PCM (`audio/pcm;rate=N`) has a native decoder here; anything
/// else is a decode failure, which the playback engine treats as fatal to
/// the session rather than skippable.
pub fn decode_payload(base64_data: &str, mime_type: &str) -> Result<DecodedAudio, DecodeError> {
    let mime = MimeType::parse(mime_type)?;
    if !mime.is_raw_pcm() {
        return Err(DecodeError::UnsupportedMime(mime.essence));
    }

    let sample_rate = mime.require_rate()?;
    let bytes = BASE64_STANDARD.decode(base64_data)?;
    let samples = decode_pcm16(&bytes)?;

    Ok(DecodedAudio {
        samples,
        sample_rate,
    })
}
