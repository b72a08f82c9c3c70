//! Password digest for Blynk-family authentication.
//!
//! Provides the one primitive the core transport engine needs from
//! cryptography: the salted SHA-256 digest placed into `LOGIN`/`REGISTER`
//! request bodies instead of the plaintext password.

mod sha;

/// Compute the Base64(SHA-256) password digest the server expects.
///
/// `salt = SHA-256(lowercase(email))`, `digest = SHA-256(password || salt)`,
/// returned as standard-alphabet Base64. Pure and stateless: safe to call
/// from any thread, any number of times, for the same inputs.
///
/// Some legacy clients in the wild instead salt with the raw (non-lowercased)
/// email; that variant is not implemented here, since it does not match what
/// the server actually checks against.
pub fn hash_password(password: &str, email: &str) -> String {
    use base64::Engine as _;

    let salt = sha::sha256!(email.to_lowercase().as_bytes());
    let digest = sha::sha256!(password.as_bytes(), &salt);
    base64::engine::general_purpose::STANDARD.encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_for_same_inputs() {
        let a = hash_password("hunter2", "a@b.com");
        let b = hash_password("hunter2", "a@b.com");
        assert_eq!(a, b);
    }

    #[test]
    fn email_is_case_insensitive() {
        let a = hash_password("hunter2", "A@B.COM");
        let b = hash_password("hunter2", "a@b.com");
        assert_eq!(a, b);
    }

    #[test]
    fn different_password_different_digest() {
        let a = hash_password("hunter2", "a@b.com");
        let b = hash_password("hunter3", "a@b.com");
        assert_ne!(a, b);
    }

    #[test]
    fn matches_known_vector() {
        // SHA-256("p" || SHA-256("a@b")), Base64-encoded.
        use sha2::{Digest, Sha256};
        let salt = Sha256::digest(b"a@b");
        let mut h = Sha256::new();
        h.update(b"p");
        h.update(&salt);
        let digest = h.finalize();
        use base64::Engine as _;
        let expected = base64::engine::general_purpose::STANDARD.encode(digest);
        assert_eq!(hash_password("p", "a@b"), expected);
    }
}
