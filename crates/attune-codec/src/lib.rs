//! Transport encoding for audio chunks: 16-bit little-endian PCM wrapped in
//! base64, plus the `audio/pcm;rate=N` mime framing used on the wire.

pub mod chunk;
pub mod error;
pub mod mime;
pub mod pcm;

pub use chunk::{decode_payload, DecodedAudio, EncodedChunk};
pub use error::DecodeError;
pub use mime::MimeType;
pub use pcm::{decode_pcm16, encode_pcm16};
