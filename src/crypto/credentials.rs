//! PBKDF2-SHA256 hashing for patient PINs and doctor passwords.
//!
//! Encoded form: `pbkdf2-sha256$<iterations>$<salt b64>$<hash b64>`.

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use super::CryptoError;

pub const PBKDF2_ITERATIONS: u32 = 600_000;
pub const HASH_LENGTH: usize = 32;
pub const SALT_LENGTH: usize = 32;

const SCHEME: &str = "pbkdf2-sha256";

/// Hash a secret with a fresh random salt.
pub fn hash_secret(secret: &str, iterations: u32) -> String {
    let salt = generate_salt();
    let hash = derive(secret, &salt, iterations);
    format!(
        "{SCHEME}${iterations}${}${}",
        STANDARD_NO_PAD.encode(salt),
        STANDARD_NO_PAD.encode(hash.as_slice())
    )
}

/// Check a secret against an encoded hash in constant time.
pub fn verify_secret(secret: &str, encoded: &str) -> Result<bool, CryptoError> {
    let mut parts = encoded.split('$');
    let (Some(scheme), Some(iterations), Some(salt), Some(expected), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return Err(CryptoError::MalformedHash);
    };

    if scheme != SCHEME {
        return Err(CryptoError::UnsupportedScheme(scheme.to_string()));
    }
    let iterations: u32 = iterations.parse().map_err(|_| CryptoError::MalformedHash)?;
    if iterations == 0 {
        return Err(CryptoError::MalformedHash);
    }
    let salt = STANDARD_NO_PAD
        .decode(salt)
        .map_err(|_| CryptoError::MalformedHash)?;
    let expected = STANDARD_NO_PAD
        .decode(expected)
        .map_err(|_| CryptoError::MalformedHash)?;
    if expected.len() != HASH_LENGTH {
        return Err(CryptoError::MalformedHash);
    }

    let actual = derive(secret, &salt, iterations);
    Ok(actual.as_slice().ct_eq(&expected).into())
}

fn derive(secret: &str, salt: &[u8], iterations: u32) -> Zeroizing<[u8; HASH_LENGTH]> {
    let mut out = Zeroizing::new([0u8; HASH_LENGTH]);
    pbkdf2_hmac::<Sha256>(secret.as_bytes(), salt, iterations, &mut out[..]);
    out
}

fn generate_salt() -> [u8; SALT_LENGTH] {
    use rand::RngCore;
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

#[cfg(test)]
mod tests {
    use super::*;

    // Low cost keeps tests fast; the format is identical.
    const TEST_ITERATIONS: u32 = 1_000;

    #[test]
    fn correct_secret_verifies() {
        let encoded = hash_secret("123456", TEST_ITERATIONS);
        assert!(verify_secret("123456", &encoded).unwrap());
    }

    #[test]
    fn wrong_secret_rejected() {
        let encoded = hash_secret("Str0ng@Pass", TEST_ITERATIONS);
        assert!(!verify_secret("Str0ng@Pasz", &encoded).unwrap());
    }

    #[test]
    fn same_secret_hashes_differently() {
        let a = hash_secret("123456", TEST_ITERATIONS);
        let b = hash_secret("123456", TEST_ITERATIONS);
        assert_ne!(a, b);
    }

    #[test]
    fn encoded_form_carries_scheme_and_cost() {
        let encoded = hash_secret("123456", TEST_ITERATIONS);
        assert!(encoded.starts_with("pbkdf2-sha256$1000$"));
        assert_eq!(encoded.split('$').count(), 4);
    }

    #[test]
    fn malformed_hash_is_error() {
        assert!(matches!(
            verify_secret("x", "not-a-hash"),
            Err(CryptoError::MalformedHash)
        ));
        assert!(matches!(
            verify_secret("x", "pbkdf2-sha256$abc$AAAA$AAAA"),
            Err(CryptoError::MalformedHash)
        ));
    }

    #[test]
    fn foreign_scheme_is_error() {
        assert!(matches!(
            verify_secret("x", "bcrypt$10$AAAA$AAAA"),
            Err(CryptoError::UnsupportedScheme(_))
        ));
    }
}
