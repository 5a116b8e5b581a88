//! Public-key encryption for RSA, ECDSA and Ed25519 keys
//!
//! - RSA: PKCS#1 v1.5, one block
//! - ECDSA: ECIES (ECDH, AES-128-CBC, HMAC-SHA1)
//! - Ed25519: X25519 with a SHA-512 keystream, unauthenticated, 64 bytes max
//!
//!
//! `CommonKeyCipher` covers the shared-key case with AES-OFB.
//!
//! Decrypted data is returned as `SecureBytes`, which is zeroed on drop.

pub mod common_key;
pub mod curve25519;
mod ecies;
mod ed25519;
mod rsa;
mod secure_bytes;
pub mod symmetric;

pub use common_key::CommonKeyCipher;
pub use ecies::EcdsaCipher;
pub use ed25519::{Ed25519Cipher, MAX_PLAINTEXT_LEN as ED25519_MAX_PLAINTEXT_LEN};
pub use self::rsa::{RsaCipher, PKCS1_OVERHEAD};
pub use secure_bytes::SecureBytes;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::debug;
use zeroize::Zeroizing;

use crate::error::{CryptoError, Result};
use crate::format;
use crate::keys::KeyMaterial;

/// Encrypt to a public key, decrypt with the matching private key
pub trait Cipher {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>>;

    /// Fails with `MissingKeyComponent` when only the public key is held
    fn decrypt(&self, ciphertext: &[u8]) -> Result<SecureBytes>;
}

/// Owns a key and the cipher chosen for its algorithm
pub struct PublicKeyCipher {
    key: KeyMaterial,
    cipher: Box<dyn Cipher + Send + Sync>,
}

impl PublicKeyCipher {
    pub fn new(key: KeyMaterial) -> Self {
        let cipher: Box<dyn Cipher + Send + Sync> = match &key {
            KeyMaterial::Rsa(rsa) => Box::new(RsaCipher::new(rsa.clone())),
            KeyMaterial::Ecdsa(ec) => Box::new(EcdsaCipher::new(ec.clone())),
            KeyMaterial::Ed25519(ed) => Box::new(Ed25519Cipher::new(ed.clone())),
        };
        debug!(kind = %key.kind(), private = key.has_private(), "cipher ready");

        Self { key, cipher }
    }

    /// Decode a PEM key or `authorized_keys` line and wrap it
    pub fn from_pem(input: impl AsRef<[u8]>) -> Result<Self> {
        Ok(Self::new(format::decode(input)?))
    }

    pub fn key(&self) -> &KeyMaterial {
        &self.key
    }

    /// Encrypt and encode the ciphertext as standard base64
    pub fn encrypt_base64(&self, plaintext: &[u8]) -> Result<String> {
        Ok(STANDARD.encode(self.cipher.encrypt(plaintext)?))
    }

    /// Decode standard base64 and decrypt
    pub fn decrypt_base64(&self, encoded: &str) -> Result<SecureBytes> {
        let ciphertext = STANDARD
            .decode(encoded.trim())
            .map_err(|e| CryptoError::format("Ciphertext is not valid base64", e))?;
        self.cipher.decrypt(&ciphertext)
    }

    /// Canonical encoding of the held key
    pub fn export(&self) -> Result<Zeroizing<String>> {
        format::encode(&self.key)
    }

    /// PKIX `PUBLIC KEY` encoding of the held key
    pub fn export_public(&self) -> Result<String> {
        format::encode_public(&self.key)
    }
}

impl Cipher for PublicKeyCipher {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        self.cipher.encrypt(plaintext)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<SecureBytes> {
        self.cipher.decrypt(ciphertext)
    }
}

impl From<KeyMaterial> for PublicKeyCipher {
    fn from(key: KeyMaterial) -> Self {
        Self::new(key)
    }
}

impl std::fmt::Debug for PublicKeyCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublicKeyCipher").field("key", &self.key).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{fixtures, generate, generate_keypair, EcCurve, KeyAlgorithm};

    #[test]
    fn test_base64_roundtrip_every_algorithm() {
        let keys = vec![
            fixtures::rsa_2048().clone(),
            generate(KeyAlgorithm::Ecdsa(EcCurve::P256)).unwrap(),
            generate_keypair(),
        ];

        for key in keys {
            let cipher = PublicKeyCipher::new(key);
            let encoded = cipher.encrypt_base64(b"testdata").unwrap();
            assert_eq!(&*cipher.decrypt_base64(&encoded).unwrap(), b"testdata");
        }
    }

    #[test]
    fn test_public_pem_cannot_decrypt() {
        let private = PublicKeyCipher::new(generate_keypair());
        let public = PublicKeyCipher::from_pem(private.export_public().unwrap()).unwrap();

        let encoded = public.encrypt_base64(b"secret").unwrap();
        assert!(matches!(
            public.decrypt_base64(&encoded),
            Err(CryptoError::MissingKeyComponent(_))
        ));
        assert_eq!(&*private.decrypt_base64(&encoded).unwrap(), b"secret");
    }

    #[test]
    fn test_invalid_base64() {
        let cipher = PublicKeyCipher::new(generate_keypair());
        assert!(matches!(
            cipher.decrypt_base64("not base64!"),
            Err(CryptoError::Format(_))
        ));
    }

    #[test]
    fn test_export_reloads_same_key() {
        let cipher = PublicKeyCipher::new(generate(KeyAlgorithm::Ecdsa(EcCurve::P384)).unwrap());
        let reloaded = PublicKeyCipher::from_pem(cipher.export().unwrap().as_bytes()).unwrap();

        assert_eq!(reloaded.key(), cipher.key());
    }
}
