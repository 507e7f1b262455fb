//! Strict base64 validation and codec helpers.
//!
//! The container runtime and its HTTP callers agree on RFC 4648 core
//! alphabet base64 with padding. `is_valid_base64` enforces that grammar
//! directly rather than relying on the decoder's own leniency, since the
//! `base64` crate is happy to accept a few shapes (e.g. missing padding in
//! some configurations) the wire contract does not.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{IoError, Result};

lazy_static! {
    static ref BASE64_RE: Regex =
        Regex::new(r"^(?:[A-Za-z0-9+/]{4})*(?:[A-Za-z0-9+/]{2}==|[A-Za-z0-9+/]{3}=)?$")
            .expect("static base64 regex is valid");
}

/// Validates `s` against the canonical base64 alphabet with correct
/// padding. The empty string validates as empty.
pub fn is_valid_base64(s: &str) -> bool {
    BASE64_RE.is_match(s)
}

/// Decodes a base64 payload, failing with [`IoError::InvalidEncoding`] if
/// the input does not match the strict grammar `is_valid_base64` checks.
pub fn decode_base64(s: &str) -> Result<Vec<u8>> {
    if !is_valid_base64(s) {
        return Err(IoError::InvalidEncoding);
    }
    STANDARD.decode(s).map_err(|_| IoError::InvalidEncoding)
}

/// Encodes bytes to base64, always producing a string that round-trips
/// through [`decode_base64`] and validates under [`is_valid_base64`].
pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_is_valid_and_decodes_empty() {
        assert!(is_valid_base64(""));
        assert_eq!(decode_base64("").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn hello_world_round_trip() {
        let encoded = "SGVsbG8sIHdvcmxkIQo=";
        let decoded = decode_base64(encoded).unwrap();
        assert_eq!(decoded, b"Hello, world!\n");
        assert_eq!(encode_base64(&decoded), encoded);
    }

    #[test]
    fn round_trip_is_total_over_arbitrary_bytes() {
        for payload in [&b""[..], b"a", b"ab", b"abc", b"\x00\x01\x02\xff", b"sandbox engine"] {
            let encoded = encode_base64(payload);
            assert!(is_valid_base64(&encoded));
            assert_eq!(decode_base64(&encoded).unwrap(), payload);
        }
    }

    #[test]
    fn rejects_wrong_padding() {
        assert!(!is_valid_base64("SGVsbG8="));
        assert!(decode_base64("SGVsbG8=").is_err());
    }

    #[test]
    fn rejects_invalid_characters() {
        assert!(!is_valid_base64("not base64 at all!!"));
        assert!(matches!(
            decode_base64("not base64 at all!!"),
            Err(IoError::InvalidEncoding)
        ));
    }

    #[test]
    fn rejects_truncated_group() {
        assert!(!is_valid_base64("QQ"));
    }
}
