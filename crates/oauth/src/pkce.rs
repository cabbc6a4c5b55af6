use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::types::PkceChallenge;

/// Generate an opaque anti-forgery `state` token: 24 CSPRNG bytes,
/// base64url without padding (32 printable characters).
pub fn generate_state() -> String {
    let mut bytes = [0u8; 24];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Generate a PKCE verifier and its S256 challenge.
pub fn generate_challenge() -> PkceChallenge {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    let verifier = URL_SAFE_NO_PAD.encode(bytes);
    let challenge = challenge_for(&verifier);
    PkceChallenge {
        verifier,
        challenge,
    }
}

/// S256 code challenge for a verifier: base64url(SHA-256(verifier)).
pub fn challenge_for(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_is_long_printable_and_unique() {
        let a = generate_state();
        let b = generate_state();
        assert!(a.len() >= 16);
        assert!(a.chars().all(|c| c.is_ascii_graphic()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_challenge_matches_rfc7636_vector() {
        // RFC 7636 appendix B.
        let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
        assert_eq!(
            challenge_for(verifier),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn test_generated_pair_is_consistent() {
        let pair = generate_challenge();
        assert!(pair.verifier.len() >= 43);
        assert_eq!(pair.challenge, challenge_for(&pair.verifier));
    }
}
