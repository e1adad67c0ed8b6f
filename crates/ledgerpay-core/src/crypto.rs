//! Order-token encryption and signature verification
//!
//! Order tokens are `base64(nonce || AES-256-GCM ciphertext || tag)` where
//! the key is the merchant's `sign_key` (32 random bytes, hex-encoded in
//! storage). The token doubles as a checkout URL component and as proof of
//! merchant origin: only the holder of the sign key can mint one.

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use thiserror::Error;

/// AES-GCM nonce size in bytes.
const NONCE_LEN: usize = 12;

/// Errors from token encryption/decryption.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("sign key must be 32 bytes (64 hex characters)")]
    InvalidSignKey,

    #[error("ciphertext is not valid base64")]
    InvalidEncoding,

    #[error("ciphertext too short")]
    CiphertextTooShort,

    #[error("encryption failed")]
    Encrypt,

    #[error("decryption failed")]
    Decrypt,

    #[error("decrypted payload is not valid UTF-8")]
    InvalidPlaintext,
}

fn cipher_for(sign_key: &str) -> Result<Aes256Gcm, CryptoError> {
    let key_bytes = hex::decode(sign_key).map_err(|_| CryptoError::InvalidSignKey)?;
    if key_bytes.len() != 32 {
        return Err(CryptoError::InvalidSignKey);
    }
    let key = Key::<Aes256Gcm>::from_slice(&key_bytes);
    Ok(Aes256Gcm::new(key))
}

/// Encrypt a plaintext string under the merchant's hex-encoded sign key.
///
/// Returns the standard-base64 token `nonce || ciphertext || tag`.
pub fn encrypt(sign_key: &str, plaintext: &str) -> Result<String, CryptoError> {
    let cipher = cipher_for(sign_key)?;
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plaintext.as_bytes())
        .map_err(|_| CryptoError::Encrypt)?;

    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    Ok(STANDARD.encode(out))
}

/// Decrypt a base64 token produced by [`encrypt`] back to its plaintext.
pub fn decrypt(sign_key: &str, token: &str) -> Result<String, CryptoError> {
    let cipher = cipher_for(sign_key)?;
    let data = STANDARD
        .decode(token)
        .map_err(|_| CryptoError::InvalidEncoding)?;
    if data.len() < NONCE_LEN {
        return Err(CryptoError::CiphertextTooShort);
    }

    let (nonce, ciphertext) = data.split_at(NONCE_LEN);
    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::Decrypt)?;
    String::from_utf8(plaintext).map_err(|_| CryptoError::InvalidPlaintext)
}

/// Verify an Ed25519 signature over raw key/signature bytes.
///
/// Length mismatches and malformed keys verify as `false` rather than
/// erroring; the OAuth edge treats any failure the same way.
pub fn ed25519_verify(public_key: &[u8], message: &[u8], signature: &[u8]) -> bool {
    let Ok(key_bytes) = <[u8; 32]>::try_from(public_key) else {
        return false;
    };
    let Ok(verifying_key) = VerifyingKey::from_bytes(&key_bytes) else {
        return false;
    };
    let Ok(sig_bytes) = <[u8; 64]>::try_from(signature) else {
        return false;
    };
    let signature = Signature::from_bytes(&sig_bytes);
    verifying_key.verify(message, &signature).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> String {
        hex::encode([7u8; 32])
    }

    #[test]
    fn test_round_trip() {
        let key = test_key();
        let token = encrypt(&key, "123456789").unwrap();
        assert_eq!(decrypt(&key, &token).unwrap(), "123456789");
    }

    #[test]
    fn test_tokens_are_randomised() {
        let key = test_key();
        let a = encrypt(&key, "42").unwrap();
        let b = encrypt(&key, "42").unwrap();
        assert_ne!(a, b);
        assert_eq!(decrypt(&key, &a).unwrap(), decrypt(&key, &b).unwrap());
    }

    #[test]
    fn test_wrong_key_fails() {
        let token = encrypt(&test_key(), "42").unwrap();
        let other = hex::encode([9u8; 32]);
        assert!(matches!(
            decrypt(&other, &token),
            Err(CryptoError::Decrypt)
        ));
    }

    #[test]
    fn test_invalid_sign_key() {
        assert!(matches!(
            encrypt("deadbeef", "42"),
            Err(CryptoError::InvalidSignKey)
        ));
        assert!(matches!(
            encrypt("not-hex!", "42"),
            Err(CryptoError::InvalidSignKey)
        ));
    }

    #[test]
    fn test_truncated_token() {
        let short = STANDARD.encode([1u8; 4]);
        assert!(matches!(
            decrypt(&test_key(), &short),
            Err(CryptoError::CiphertextTooShort)
        ));
    }

    #[test]
    fn test_ed25519_verify() {
        use ed25519_dalek::{Signer, SigningKey};
        use rand::rngs::OsRng;

        let signing_key = SigningKey::generate(&mut OsRng);
        let message = b"order:42";
        let signature = signing_key.sign(message);

        let pk = signing_key.verifying_key().to_bytes();
        assert!(ed25519_verify(&pk, message, &signature.to_bytes()));
        assert!(!ed25519_verify(&pk, b"order:43", &signature.to_bytes()));
        assert!(!ed25519_verify(&pk[..16], message, &signature.to_bytes()));
    }
}
