//! Encoders turn a raw signal into the text that is handed to a formatter.

use sha2::{Digest, Sha256};

/// Pure, deterministic transform applied to a component's raw value.
pub trait Encoder: Send + Sync {
    fn encode(&self, raw: &str) -> String;
}

/// Pass-through encoder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlainTextEncoder;

impl Encoder for PlainTextEncoder {
    fn encode(&self, raw: &str) -> String {
        raw.to_string()
    }
}

/// SHA-256 of the UTF-8 bytes, lowercase hex.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HashEncoder {
    width: Option<usize>,
}

impl HashEncoder {
    /// Full-width digest.
    pub fn new() -> Self {
        Self { width: None }
    }

    /// Keep only the first `width` hex characters of the digest.
    pub fn truncated(width: usize) -> Self {
        Self { width: Some(width) }
    }
}

impl Encoder for HashEncoder {
    fn encode(&self, raw: &str) -> String {
        let mut digest = sha256_hex(raw.as_bytes());
        if let Some(width) = self.width {
            digest.truncate(width);
        }
        digest
    }
}

pub(crate) fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_identity() {
        assert_eq!(PlainTextEncoder.encode("/etc/machine-id"), "/etc/machine-id");
    }

    #[test]
    fn test_hash_is_stable_sha256() {
        assert_eq!(
            HashEncoder::new().encode("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(HashEncoder::new().encode(""), sha256_hex(b""));
    }

    #[test]
    fn test_truncated_width() {
        let short = HashEncoder::truncated(16).encode("abc");
        assert_eq!(short, "ba7816bf8f01cfea");
        assert_eq!(HashEncoder::truncated(1000).encode("abc").len(), 64);
    }
}
