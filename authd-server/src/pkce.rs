//! PKCE (RFC 7636) challenge computation and verification, S256 only.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// RFC 7636 bounds for both the verifier and its derived challenge
pub const MIN_VERIFIER_LEN: usize = 43;
pub const MAX_VERIFIER_LEN: usize = 128;

/// The only challenge method this server accepts
pub const METHOD_S256: &str = "S256";

/// Compute the S256 challenge for a verifier: `base64url(sha256(verifier))`
pub fn challenge_from_verifier(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

/// Check that a declared `code_challenge_method` is acceptable.
/// An absent method defaults to S256; anything other than S256 is rejected.
pub fn method_is_supported(method: Option<&str>) -> bool {
    matches!(method, None | Some(METHOD_S256))
}

/// Syntactic validation of a challenge as sent to the authorization endpoint:
/// base64url alphabet, no padding, within RFC length bounds.
pub fn challenge_is_well_formed(challenge: &str) -> bool {
    (MIN_VERIFIER_LEN..=MAX_VERIFIER_LEN).contains(&challenge.len())
        && challenge
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Verify a presented verifier against the stored challenge.
///
/// The comparison is constant-time; a mismatch here means the caller does
/// not hold the pre-image the authorization code was bound to.
pub fn verify(challenge: &str, verifier: &str) -> bool {
    if !(MIN_VERIFIER_LEN..=MAX_VERIFIER_LEN).contains(&verifier.len()) {
        return false;
    }
    let expected = challenge_from_verifier(verifier);
    bool::from(expected.as_bytes().ct_eq(challenge.as_bytes()))
}
