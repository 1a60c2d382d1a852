//! Payload text codec.
//!
//! Text payloads are stored as JSON string bytes. Decoding never fails: a
//! payload that is not a JSON string comes back as the decoder's error text,
//! so a client is never left without a readable body.

/// Encodes `text` into payload bytes.
pub fn encode_text(text: &str) -> Vec<u8> {
    // Serializing a `&str` into a Vec cannot fail.
    serde_json::to_vec(text).unwrap_or_default()
}

/// Decodes payload bytes back into text, or into the decode error text.
pub fn decode_text(payload: &[u8]) -> String {
    match serde_json::from_slice::<String>(payload) {
        Ok(text) => text,
        Err(e) => e.to_string(),
    }
}

/// Serde adapter carrying raw bytes as standard base64 text.
pub mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        STANDARD.decode(text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_survives_encoding() {
        assert_eq!(decode_text(&encode_text("Pulse Number 3")), "Pulse Number 3");
    }

    #[test]
    fn undecodable_payload_returns_error_text() {
        let text = decode_text(&[0xff, 0x00, 0x12]);
        assert!(!text.is_empty());
        assert!(text.contains("line 1"), "unexpected error text: {text}");
    }
}
