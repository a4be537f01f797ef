//! Signing key derivation.
//!
//! Signing keys are never the application secret itself: each signer derives
//! its own key with HKDF-SHA256 (RFC 5869), using its salt as the context.

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::CryptoError;

/// Size of a derived signing key in bytes.
pub const SIGNING_KEY_SIZE: usize = 32;

/// HKDF salt shared by all signers.
const SIGNER_KDF_SALT: &[u8] = b"gatehouse-signer-v1";

/// Derives the HMAC key for a signer namespaced under `salt`.
///
/// Two signers sharing a secret but using different salts end up with
/// unrelated keys.
pub fn derive_signing_key(
    secret: &[u8],
    salt: &str,
) -> Result<Zeroizing<[u8; SIGNING_KEY_SIZE]>, CryptoError> {
    if secret.is_empty() {
        return Err(CryptoError::InvalidKey("empty secret".to_string()));
    }

    let info = format!("{salt}signer");
    let mut key = Zeroizing::new([0u8; SIGNING_KEY_SIZE]);
    Hkdf::<Sha256>::new(Some(SIGNER_KDF_SALT), secret)
        .expand(info.as_bytes(), &mut key[..])
        .map_err(|e| CryptoError::KeyDerivationFailed(e.to_string()))?;

    Ok(key)
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        let a = derive_signing_key(b"application secret", "email_registration").unwrap();
        let b = derive_signing_key(b"application secret", "email_registration").unwrap();
        assert_eq!(*a, *b);
    }

    #[test]
    fn test_matches_plain_hkdf() {
        let key = derive_signing_key(b"application secret", "email_registration").unwrap();

        let mut expected = [0u8; SIGNING_KEY_SIZE];
        Hkdf::<Sha256>::new(Some(b"gatehouse-signer-v1"), b"application secret")
            .expand(b"email_registrationsigner", &mut expected)
            .unwrap();

        assert_eq!(hex::encode(*key), hex::encode(expected));
        assert_ne!(&key[..], b"application secret".as_slice());
    }

    #[test]
    fn test_keys_differ_per_salt() {
        let a = derive_signing_key(b"application secret", "email_registration").unwrap();
        let b = derive_signing_key(b"application secret", "magic_link").unwrap();
        assert_ne!(*a, *b);
    }

    #[test]
    fn test_keys_differ_per_secret() {
        let a = derive_signing_key(b"first secret", "email_registration").unwrap();
        let b = derive_signing_key(b"second secret", "email_registration").unwrap();
        assert_ne!(*a, *b);
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert!(matches!(
            derive_signing_key(b"", "email_registration"),
            Err(CryptoError::InvalidKey(_))
        ));
    }
}
