//! HMAC-signed streaming URLs (§4.1, §6), ported from
//! `original_source/services/api/main.py`'s `generate_signed_url`/
//! `verify_signed_url`: the signature covers `"{endpoint}:{expires}:{token}"`
//! and comparison is constant-time via `subtle`, matching the original's
//! use of `hmac.compare_digest`.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

fn signature_data(endpoint_path: &str, expires_at: i64, token: &str) -> String {
    format!("{endpoint_path}:{expires_at}:{token}")
}

/// Returns the lowercase-hex HMAC-SHA256 signature for the given endpoint
/// path, expiry, and opaque token.
pub fn sign(secret: &str, endpoint_path: &str, expires_at: i64, token: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(signature_data(endpoint_path, expires_at, token).as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// A strong ETag derived from `{path, mtime, size}` (§4.1 "Get audio
/// chunk"), so it changes iff the underlying file does.
pub fn strong_etag(path: &str, mtime: i64, size: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{path}:{mtime}:{size}").as_bytes());
    format!("\"{}\"", hex::encode(hasher.finalize()))
}

/// Recomputes the expected signature and compares it to `signature` in
/// constant time. Also rejects an already-expired `expires_at`.
pub fn verify(secret: &str, endpoint_path: &str, expires_at: i64, token: &str, signature: &str, now: i64) -> bool {
    if expires_at < now {
        return false;
    }
    let expected = sign(secret, endpoint_path, expires_at, token);
    let expected_bytes = expected.as_bytes();
    let given_bytes = signature.as_bytes();
    if expected_bytes.len() != given_bytes.len() {
        return false;
    }
    expected_bytes.ct_eq(given_bytes).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_verify_succeeds_before_expiry() {
        let sig = sign("secret", "/api/v1/books/b/chunks/0", 9_999_999_999, "tok");
        assert!(verify("secret", "/api/v1/books/b/chunks/0", 9_999_999_999, "tok", &sig, 1));
    }

    #[test]
    fn verify_rejects_expired_url() {
        let sig = sign("secret", "/path", 100, "tok");
        assert!(!verify("secret", "/path", 100, "tok", &sig, 200));
    }

    #[test]
    fn verify_rejects_tampered_signature() {
        let sig = sign("secret", "/path", 9_999_999_999, "tok");
        let mut tampered = sig.clone();
        tampered.push('0');
        assert!(!verify("secret", "/path", 9_999_999_999, "tok", &tampered, 1));
    }

    #[test]
    fn verify_rejects_wrong_endpoint() {
        let sig = sign("secret", "/path/a", 9_999_999_999, "tok");
        assert!(!verify("secret", "/path/b", 9_999_999_999, "tok", &sig, 1));
    }

    #[test]
    fn strong_etag_changes_with_any_field() {
        let base = strong_etag("/ogg/chunk_000000.ogg", 100, 2048);
        assert_eq!(base, strong_etag("/ogg/chunk_000000.ogg", 100, 2048));
        assert_ne!(base, strong_etag("/ogg/chunk_000000.ogg", 101, 2048));
        assert_ne!(base, strong_etag("/ogg/chunk_000000.ogg", 100, 2049));
    }
}
