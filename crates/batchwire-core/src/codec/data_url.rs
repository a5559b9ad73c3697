//! `data:<media type>;base64,<payload>` URLs, the wire form of binary features.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::DecodingError;

pub(crate) fn encode(media_type: &str, data: &[u8]) -> String {
    format!("data:{media_type};base64,{}", STANDARD.encode(data))
}

/// Splits a data URL into its media type and decoded payload.
pub(crate) fn decode(feature: &str, url: &str) -> Result<(String, Vec<u8>), DecodingError> {
    let malformed = || DecodingError::DataUrl {
        feature: feature.to_string(),
    };

    let rest = url.strip_prefix("data:").ok_or_else(malformed)?;
    let (meta, payload) = rest.split_once(',').ok_or_else(malformed)?;
    let (media_type, encoding) = meta.split_once(';').ok_or_else(malformed)?;
    if encoding != "base64" {
        return Err(malformed());
    }

    let data = STANDARD
        .decode(payload.trim())
        .map_err(|e| DecodingError::Base64 {
            feature: feature.to_string(),
            reason: e.to_string(),
        })?;
    Ok((media_type.to_string(), data))
}

/// Like [`decode`], but the media type must be one of `accepted`.
pub(crate) fn decode_expecting(
    feature: &str,
    url: &str,
    accepted: &[&str],
) -> Result<(String, Vec<u8>), DecodingError> {
    let (media_type, data) = decode(feature, url)?;
    if !accepted.contains(&media_type.as_str()) {
        return Err(DecodingError::MediaType {
            feature: feature.to_string(),
            expected: accepted.join(" | "),
            actual: media_type,
        });
    }
    Ok((media_type, data))
}
