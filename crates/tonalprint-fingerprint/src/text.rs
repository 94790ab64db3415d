// SPDX-License-Identifier: GPL-3.0-or-later

//! Printable transport for compressed fingerprints.
//!
//! Compressed bytes are rendered with the URL-safe base64 alphabet and no
//! padding, so the result can be dropped into query strings and JSON as is.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::codec;
use crate::fingerprint::AlgorithmTag;
use crate::{FingerprintError, Result};

/// How compressed fingerprint bytes are wrapped for transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextEncoding {
    #[default]
    Base64,
    /// Compressed bytes, unwrapped.
    Raw,
}

pub fn encode_text(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Check that `text` could have been produced by [`encode_text`].
pub fn validate_text(text: &str) -> Result<()> {
    if text.is_empty() {
        return Err(FingerprintError::InvalidText(
            "fingerprint text is empty".to_string(),
        ));
    }

    if text.contains('=') {
        return Err(FingerprintError::InvalidText(
            "padding character '=' is not used".to_string(),
        ));
    }

    if !text
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(FingerprintError::InvalidText(
            "fingerprint contains invalid characters".to_string(),
        ));
    }

    // A single leftover character cannot carry a whole byte.
    if text.len() % 4 == 1 {
        return Err(FingerprintError::InvalidText(format!(
            "invalid length {}",
            text.len()
        )));
    }

    Ok(())
}

/// Decode text produced by [`encode_text`]. Surrounding whitespace is ignored.
pub fn decode_text(text: &str) -> Result<Vec<u8>> {
    let text = text.trim();
    validate_text(text)?;
    URL_SAFE_NO_PAD
        .decode(text)
        .map_err(|e| FingerprintError::InvalidText(e.to_string()))
}

/// Compress `raw` and wrap it according to `encoding`.
pub fn encode_fingerprint(
    raw: &[u32],
    tag: AlgorithmTag,
    encoding: TextEncoding,
) -> Result<Vec<u8>> {
    let compressed = codec::compress(raw, tag)?;
    Ok(match encoding {
        TextEncoding::Base64 => encode_text(&compressed).into_bytes(),
        TextEncoding::Raw => compressed,
    })
}

/// Inverse of [`encode_fingerprint`].
pub fn decode_fingerprint(data: &[u8], encoding: TextEncoding) -> Result<(Vec<u32>, AlgorithmTag)> {
    match encoding {
        TextEncoding::Raw => codec::decompress(data),
        TextEncoding::Base64 => {
            let text = std::str::from_utf8(data)
                .map_err(|e| FingerprintError::InvalidText(e.to_string()))?;
            codec::decompress(&decode_text(text)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_empty_fingerprint() {
        let encoded = encode_fingerprint(&[], AlgorithmTag::new(1), TextEncoding::Base64).unwrap();
        assert_eq!(encoded, b"AQAAAA");
    }

    #[test]
    fn test_uses_url_safe_alphabet() {
        assert_eq!(encode_text(&[0xFB, 0xFF]), "-_8");
        assert_eq!(decode_text("-_8").unwrap(), vec![0xFB, 0xFF]);
    }

    #[test]
    fn test_decode_trims_whitespace() {
        assert_eq!(decode_text("  AQAAAA\n").unwrap(), vec![1, 0, 0, 0]);
    }

    #[test]
    fn test_validate_empty() {
        assert!(validate_text("").is_err());
    }

    #[test]
    fn test_validate_rejects_padding() {
        assert!(validate_text("AQAAAA==").is_err());
    }

    #[test]
    fn test_validate_rejects_standard_alphabet() {
        assert!(validate_text("ab+/").is_err());
    }

    #[test]
    fn test_validate_rejects_impossible_length() {
        assert!(validate_text("AQAAA").is_err());
    }

    #[test]
    fn test_validate_valid() {
        assert!(validate_text("AQAAAA").is_ok());
    }

    #[test]
    fn test_raw_encoding_is_compressed_bytes() {
        let raw = [5, 6, 7];
        let tag = AlgorithmTag::new(3);
        let encoded = encode_fingerprint(&raw, tag, TextEncoding::Raw).unwrap();
        assert_eq!(encoded, codec::compress(&raw, tag).unwrap());
    }

    #[test]
    fn test_text_round_trip() {
        let raw = [0, 1, 1, 0xFFFF_FFFF];
        let tag = AlgorithmTag::new(2);
        for encoding in [TextEncoding::Base64, TextEncoding::Raw] {
            let encoded = encode_fingerprint(&raw, tag, encoding).unwrap();
            let (decoded, decoded_tag) = decode_fingerprint(&encoded, encoding).unwrap();
            assert_eq!(decoded, raw);
            assert_eq!(decoded_tag, tag);
        }
    }

    #[test]
    fn test_decode_non_utf8_text() {
        let err = decode_fingerprint(&[0xFF, 0xFE], TextEncoding::Base64).unwrap_err();
        assert!(matches!(err, FingerprintError::InvalidText(_)));
    }
}
