//! LINE webhook signature verification.
//!
//! LINE signs every webhook delivery with the channel secret:
//!
//! 1. Compute `HMAC-SHA256(channel_secret, raw_body)`.
//! 2. Base64-encode the digest.
//! 3. Compare against the `X-Line-Signature` header.
//!
//! The body must be the exact bytes received; re-serialized JSON will not
//! match.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha2::Sha256;

/// Header carrying the signature.
pub const SIGNATURE_HEADER: &str = "x-line-signature";

type HmacSha256 = Hmac<Sha256>;

/// Verify a LINE webhook signature.
///
/// Returns `false` for an empty secret, a header that is not base64, or a
/// digest mismatch. The digest comparison is constant-time.
pub fn verify_signature(channel_secret: &str, body: &[u8], signature: &str) -> bool {
    if channel_secret.is_empty() {
        return false;
    }
    let Ok(expected) = STANDARD.decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(channel_secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// Compute the signature LINE would send for `body`.
pub fn compute_signature(channel_secret: &str, body: &[u8]) -> String {
    // HMAC accepts keys of any length.
    let mut mac = match HmacSha256::new_from_slice(channel_secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(body);
    STANDARD.encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "4f8c2ab1e7d94b6a9c1d0e3f5a7b8c9d";
    const BODY: &[u8] = br#"{"destination":"Uxxx","events":[]}"#;

    #[test]
    fn valid_signature() {
        let sig = compute_signature(SECRET, BODY);
        assert!(verify_signature(SECRET, BODY, &sig));
    }

    #[test]
    fn known_vector() {
        // echo -n 'hello' | openssl dgst -sha256 -hmac 'key' -binary | base64
        assert_eq!(
            compute_signature("key", b"hello"),
            "kwezuRXvtRcf8U2MtV+8x5jGwO8UVtZt7RpqpyOli3s="
        );
    }

    #[test]
    fn tampered_body_fails() {
        let sig = compute_signature(SECRET, BODY);
        assert!(!verify_signature(SECRET, b"{\"events\":[{}]}", &sig));
    }

    #[test]
    fn wrong_secret_fails() {
        let sig = compute_signature("other-secret", BODY);
        assert!(!verify_signature(SECRET, BODY, &sig));
    }

    #[test]
    fn garbage_header_fails() {
        assert!(!verify_signature(SECRET, BODY, "not base64 !!"));
        assert!(!verify_signature(SECRET, BODY, ""));
    }

    #[test]
    fn empty_secret_never_verifies() {
        let sig = compute_signature("", BODY);
        assert!(!verify_signature("", BODY, &sig));
    }
}
