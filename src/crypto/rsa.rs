//! RSA PKCS#1 v1.5 encryption

use rand::rngs::OsRng;
use rsa::Pkcs1v15Encrypt;

use super::{Cipher, SecureBytes};
use crate::error::{CryptoError, Result};
use crate::keys::{KeyMaterial, RsaKey};

/// PKCS#1 v1.5 padding overhead in bytes
pub const PKCS1_OVERHEAD: usize = 11;

/// Single-block RSA encryption with PKCS#1 v1.5 padding
#[derive(Debug, Clone)]
pub struct RsaCipher {
    key: RsaKey,
}

impl RsaCipher {
    pub fn new(key: RsaKey) -> Self {
        Self { key }
    }

    /// Build from a `KeyMaterial`, failing unless it is an RSA key
    pub fn from_key(key: &KeyMaterial) -> Result<Self> {
        Ok(Self::new(key.as_rsa()?.clone()))
    }

    /// Largest plaintext a single block can hold
    pub fn max_plaintext_len(&self) -> usize {
        self.key.size().saturating_sub(PKCS1_OVERHEAD)
    }
}

impl Cipher for RsaCipher {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let max = self.max_plaintext_len();
        if plaintext.len() > max {
            return Err(CryptoError::InputTooLarge {
                len: plaintext.len(),
                max,
            });
        }

        self.key
            .public()
            .encrypt(&mut OsRng, Pkcs1v15Encrypt, plaintext)
            .map_err(|e| CryptoError::crypto("RSA encryption failed", e))
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<SecureBytes> {
        let private = self
            .key
            .private()
            .ok_or(CryptoError::MissingKeyComponent("private"))?;

        if ciphertext.len() != self.key.size() {
            return Err(CryptoError::CryptoFailure(format!(
                "RSA ciphertext must be {} bytes, got {}",
                self.key.size(),
                ciphertext.len()
            )));
        }

        private
            .decrypt(Pkcs1v15Encrypt, ciphertext)
            .map(SecureBytes::new)
            .map_err(|e| CryptoError::crypto("RSA decryption failed", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{fixtures, generate_keypair};

    fn cipher() -> RsaCipher {
        RsaCipher::from_key(fixtures::rsa_2048()).unwrap()
    }

    #[test]
    fn test_roundtrip() {
        let cipher = cipher();
        let ciphertext = cipher.encrypt(b"testdata").unwrap();

        assert_eq!(ciphertext.len(), 256);
        assert_eq!(&*cipher.decrypt(&ciphertext).unwrap(), b"testdata");
    }

    #[test]
    fn test_plaintext_boundary() {
        let cipher = cipher();
        assert_eq!(cipher.max_plaintext_len(), 245);

        let ciphertext = cipher.encrypt(&[0x42; 245]).unwrap();
        assert_eq!(&*cipher.decrypt(&ciphertext).unwrap(), &[0x42; 245][..]);

        assert!(matches!(
            cipher.encrypt(&[0x42; 246]),
            Err(CryptoError::InputTooLarge { len: 246, max: 245 })
        ));
    }

    #[test]
    fn test_encryption_is_randomized() {
        let cipher = cipher();
        assert_ne!(cipher.encrypt(b"same").unwrap(), cipher.encrypt(b"same").unwrap());
    }

    #[test]
    fn test_decrypt_needs_private_key() {
        let public = RsaCipher::from_key(&fixtures::rsa_2048().to_public()).unwrap();
        let ciphertext = public.encrypt(b"testdata").unwrap();

        assert!(matches!(
            public.decrypt(&ciphertext),
            Err(CryptoError::MissingKeyComponent(_))
        ));
    }

    #[test]
    fn test_decrypt_rejects_wrong_length() {
        assert!(matches!(
            cipher().decrypt(&[0u8; 255]),
            Err(CryptoError::CryptoFailure(_))
        ));
    }

    #[test]
    fn test_rejects_other_algorithms() {
        assert!(matches!(
            RsaCipher::from_key(&generate_keypair()),
            Err(CryptoError::AlgorithmMismatch { .. })
        ));
    }
}
