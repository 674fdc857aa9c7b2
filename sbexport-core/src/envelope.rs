//! Export envelope codec
//!
//! An export token is `base64( "SBAE" + gzip( utf8(json(document)) ) )`.
//! Older exports omit the 4-byte `SBAE` prefix; decoding tolerates that by
//! treating the whole decoded buffer as the gzip stream. Encoding always
//! writes the prefix.

use std::io::{Read, Write};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::Value;

/// Magic prefix written at the start of every encoded envelope.
pub const ENVELOPE_MAGIC: &[u8; 4] = b"SBAE";

/// Error types for envelope encoding/decoding
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("Empty export token")]
    MissingInput,

    #[error("Invalid base64 token: {0}")]
    InvalidEncoding(#[from] base64::DecodeError),

    #[error("Invalid gzip stream: {0}")]
    InvalidCompression(#[from] std::io::Error),

    #[error("Invalid JSON document: {0}")]
    InvalidDocument(#[from] serde_json::Error),
}

/// Decode an export token into its JSON document.
///
/// Leading/trailing whitespace is ignored (tokens are usually pasted or read
/// from a text file with a trailing newline).
pub fn decode_token(token: &str) -> Result<Value, EnvelopeError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(EnvelopeError::MissingInput);
    }

    let envelope = BASE64.decode(token)?;

    // Strip the magic prefix if present; legacy envelopes start directly
    // with the gzip stream.
    let compressed = match envelope.strip_prefix(ENVELOPE_MAGIC) {
        Some(rest) => rest,
        None => &envelope[..],
    };

    let mut json_bytes = Vec::new();
    GzDecoder::new(compressed).read_to_end(&mut json_bytes)?;

    let document = serde_json::from_slice(&json_bytes)?;
    Ok(document)
}

/// Encode a JSON document into an export token.
///
/// The document is serialized compactly; `decode_token(encode_document(d))`
/// returns a document structurally equal to `d`.
pub fn encode_document(document: &Value) -> Result<String, EnvelopeError> {
    let json_bytes = serde_json::to_vec(document)?;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&json_bytes)?;
    let compressed = encoder.finish()?;

    let mut envelope = Vec::with_capacity(ENVELOPE_MAGIC.len() + compressed.len());
    envelope.extend_from_slice(ENVELOPE_MAGIC);
    envelope.extend_from_slice(&compressed);

    Ok(BASE64.encode(envelope))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn gzip(bytes: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(bytes).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_round_trip() {
        let document = json!({
            "name": "Custom Points System",
            "actions": [
                {"name": "Add Points", "byteCode": "dXNpbmcgU3lzdGVtOw=="},
                {"enabled": true, "queue": null, "weight": 1.5}
            ]
        });

        let token = encode_document(&document).unwrap();
        assert!(token.is_ascii());
        let decoded = decode_token(&token).unwrap();
        assert_eq!(decoded, document);
    }

    #[test]
    fn test_encoded_envelope_carries_magic() {
        let token = encode_document(&json!({})).unwrap();
        let envelope = BASE64.decode(token).unwrap();
        assert_eq!(&envelope[..4], ENVELOPE_MAGIC);
    }

    #[test]
    fn test_decode_legacy_envelope_without_magic() {
        let compressed = gzip(br#"{"name":"legacy"}"#);
        let token = BASE64.encode(compressed);

        let document = decode_token(&token).unwrap();
        assert_eq!(document, json!({"name": "legacy"}));
    }

    #[test]
    fn test_magic_is_stripped_exactly_once() {
        // A document whose compressed stream happens to follow a real magic
        // prefix must decompress from byte 4 onward.
        let mut envelope = ENVELOPE_MAGIC.to_vec();
        envelope.extend_from_slice(&gzip(br#"{"k":1}"#));
        let token = BASE64.encode(envelope);

        let document = decode_token(&token).unwrap();
        assert_eq!(document, json!({"k": 1}));
    }

    #[test]
    fn test_partial_magic_is_not_stripped() {
        // "SBA" + gzip stream: no full prefix match, so nothing is stripped
        // and the envelope is simply an invalid gzip stream.
        let mut envelope = b"SBA".to_vec();
        envelope.extend_from_slice(&gzip(b"{}"));
        let token = BASE64.encode(envelope);

        assert!(matches!(
            decode_token(&token),
            Err(EnvelopeError::InvalidCompression(_))
        ));
    }

    #[test]
    fn test_empty_token() {
        assert!(matches!(decode_token(""), Err(EnvelopeError::MissingInput)));
        assert!(matches!(
            decode_token("  \n"),
            Err(EnvelopeError::MissingInput)
        ));
    }

    #[test]
    fn test_invalid_base64() {
        assert!(matches!(
            decode_token("not!!valid@@base64"),
            Err(EnvelopeError::InvalidEncoding(_))
        ));
    }

    #[test]
    fn test_truncated_gzip_stream() {
        let mut envelope = ENVELOPE_MAGIC.to_vec();
        let compressed = gzip(br#"{"name":"truncated"}"#);
        envelope.extend_from_slice(&compressed[..compressed.len() / 2]);
        let token = BASE64.encode(envelope);

        assert!(matches!(
            decode_token(&token),
            Err(EnvelopeError::InvalidCompression(_))
        ));
    }

    #[test]
    fn test_invalid_json_payload() {
        let mut envelope = ENVELOPE_MAGIC.to_vec();
        envelope.extend_from_slice(&gzip(b"{not json"));
        let token = BASE64.encode(envelope);

        assert!(matches!(
            decode_token(&token),
            Err(EnvelopeError::InvalidDocument(_))
        ));
    }

    #[test]
    fn test_token_whitespace_is_trimmed() {
        let token = encode_document(&json!({"a": 1})).unwrap();
        let padded = format!("  {}\n", token);
        assert_eq!(decode_token(&padded).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn test_key_order_survives_round_trip() {
        let document: Value =
            serde_json::from_str(r#"{"zeta":1,"alpha":2,"mid":3}"#).unwrap();
        let decoded = decode_token(&encode_document(&document).unwrap()).unwrap();

        let keys: Vec<&String> = decoded.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["zeta", "alpha", "mid"]);
    }
}
