//! X25519 stream encryption to an Ed25519 key
//!
//! ```text
//! R = X25519(r, 9)          S = X25519(r, K)          keystream = SHA-512(S)
//! ciphertext = R || plaintext XOR keystream
//! ```
//!
//! `K` is the recipient's key bridged to Montgomery form. The keystream is a
//! single SHA-512 block, so plaintexts are limited to 64 bytes.
//!
//! There is no integrity tag. A modified ciphertext decrypts to modified
//! plaintext without error, and a successful decryption says nothing about
//! who produced the ciphertext.

use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha512};
use x25519_dalek::{x25519, X25519_BASEPOINT_BYTES};
use zeroize::Zeroizing;

use super::curve25519::{self, KEY_LEN};
use super::{Cipher, SecureBytes};
use crate::error::{CryptoError, Result};
use crate::keys::{Ed25519Key, KeyMaterial};

/// Largest plaintext: one SHA-512 output
pub const MAX_PLAINTEXT_LEN: usize = 64;

fn keystream(shared: &[u8; KEY_LEN]) -> Zeroizing<[u8; MAX_PLAINTEXT_LEN]> {
    let mut stream = Zeroizing::new([0u8; MAX_PLAINTEXT_LEN]);
    stream.copy_from_slice(&Sha512::digest(shared));
    stream
}

/// Unauthenticated X25519 + SHA-512 stream cipher
#[derive(Debug, Clone)]
pub struct Ed25519Cipher {
    key: Ed25519Key,
}

impl Ed25519Cipher {
    pub fn new(key: Ed25519Key) -> Self {
        Self { key }
    }

    /// Build from a `KeyMaterial`, failing unless it is an Ed25519 key
    pub fn from_key(key: &KeyMaterial) -> Result<Self> {
        Ok(Self::new(key.as_ed25519()?.clone()))
    }

    /// Encrypt with a caller-chosen ephemeral scalar. The scalar is clamped
    /// before use. Reusing a scalar reuses the keystream.
    pub fn encrypt_with_ephemeral(&self, plaintext: &[u8], ephemeral: &[u8; KEY_LEN]) -> Result<Vec<u8>> {
        if plaintext.len() > MAX_PLAINTEXT_LEN {
            return Err(CryptoError::InputTooLarge {
                len: plaintext.len(),
                max: MAX_PLAINTEXT_LEN,
            });
        }

        let recipient = curve25519::montgomery_public(&self.key)?;

        let mut r = Zeroizing::new(*ephemeral);
        curve25519::clamp(&mut r);

        let point = x25519(*r, X25519_BASEPOINT_BYTES);
        let shared = Zeroizing::new(x25519(*r, recipient));
        let stream = keystream(&shared);

        let mut out = Vec::with_capacity(KEY_LEN + plaintext.len());
        out.extend_from_slice(&point);
        out.extend(plaintext.iter().zip(stream.iter()).map(|(p, k)| p ^ k));
        Ok(out)
    }
}

impl Cipher for Ed25519Cipher {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut ephemeral = Zeroizing::new([0u8; KEY_LEN]);
        OsRng.fill_bytes(&mut *ephemeral);
        self.encrypt_with_ephemeral(plaintext, &ephemeral)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<SecureBytes> {
        let secret = curve25519::montgomery_secret(&self.key)?;

        if ciphertext.len() < KEY_LEN {
            return Err(CryptoError::Format(format!(
                "Ciphertext shorter than the {}-byte ephemeral key",
                KEY_LEN
            )));
        }
        if ciphertext.len() > KEY_LEN + MAX_PLAINTEXT_LEN {
            return Err(CryptoError::InputTooLarge {
                len: ciphertext.len(),
                max: KEY_LEN + MAX_PLAINTEXT_LEN,
            });
        }

        let (point, body) = ciphertext.split_at(KEY_LEN);
        let mut ephemeral = [0u8; KEY_LEN];
        ephemeral.copy_from_slice(point);

        let shared = Zeroizing::new(x25519(*secret, ephemeral));
        let stream = keystream(&shared);

        Ok(SecureBytes::new(
            body.iter().zip(stream.iter()).map(|(c, k)| c ^ k).collect(),
        ))
    }
}
