use thiserror::Error;

/// A received audio payload could not be turned into playable samples.
///
/// Decode failures are fatal to the playback session that hits them:
/// skipping a chunk would silently drop audio and desynchronize ordering.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("PCM16 payload has odd byte length: {len}")]
    TruncatedPcm { len: usize },

    #[error("Malformed mime type: {0}")]
    MalformedMime(String),

    #[error("Mime type {essence:?} missing required rate parameter")]
    MissingRate { essence: String },

    #[error("No decoder for mime type: {0}")]
    UnsupportedMime(String),
}
