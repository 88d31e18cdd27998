use crate::error::DecodeError;

/// Parsed mime type for inbound audio payloads, e.g. `audio/pcm;rate=24000`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimeType {
    pub essence: String,
    pub rate: Option<u32>,
}

impl MimeType {
    pub fn parse(raw: &str) -> Result<Self, DecodeError> {
        let mut parts = raw.split(';');
        let essence = parts
            .next()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| DecodeError::MalformedMime(raw.to_string()))?
            .to_ascii_lowercase();

        if !essence.contains('/') {
            return Err(DecodeError::MalformedMime(raw.to_string()));
        }

        let mut rate = None;
        for param in parts {
            let mut kv = param.splitn(2, '=');
            let key = kv.next().map(str::trim).unwrap_or_default();
            let value = kv.next().map(str::trim);
            if key.eq_ignore_ascii_case("rate") {
                let value = value.ok_or_else(|| DecodeError::MalformedMime(raw.to_string()))?;
                rate = Some(
                    value
                        .parse::<u32>()
                        .map_err(|_| DecodeError::MalformedMime(raw.to_string()))?,
                );
            }
            // Unknown parameters are ignored
        }

        Ok(Self { essence, rate })
    }

    pub fn is_raw_pcm(&self) -> bool {
        self.essence == "audio/pcm"
    }

    /// Sample rate for raw PCM payloads; required when `is_raw_pcm`.
    pub fn require_rate(&self) -> Result<u32, DecodeError> {
        self.rate.ok_or_else(|| DecodeError::MissingRate {
            essence: self.essence.clone(),
        })
    }
}
