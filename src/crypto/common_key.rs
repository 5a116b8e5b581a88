//! Shared-key encryption: AES in OFB mode
//!
//! ```text
//! ciphertext = IV (16, random per message) || AES-OFB(key, IV, plaintext)
//! ```
//!
//! The key length selects AES-128, AES-192 or AES-256. OFB is a stream mode,
//! so the ciphertext is exactly 16 bytes longer than the plaintext. There is
//! no integrity tag: decrypting with the wrong key yields garbage, not an
//! error.

use aes::{Aes128, Aes192, Aes256};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use ofb::cipher::{InvalidLength, KeyIvInit, StreamCipher};
use ofb::Ofb;
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::SecureBytes;
use crate::error::{CryptoError, Result};

pub const IV_LEN: usize = 16;

/// Accepted key lengths in bytes
pub const KEY_LENGTHS: [usize; 3] = [16, 24, 32];

/// AES-OFB cipher bound to one shared key
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct CommonKeyCipher {
    key: Vec<u8>,
}

impl CommonKeyCipher {
    /// Fails unless the key is 16, 24 or 32 bytes long
    pub fn new(key: &[u8]) -> Result<Self> {
        if !KEY_LENGTHS.contains(&key.len()) {
            return Err(CryptoError::CryptoFailure(format!(
                "AES key must be 16, 24 or 32 bytes, got {}",
                key.len()
            )));
        }
        Ok(Self { key: key.to_vec() })
    }

    /// Random key of `len` bytes
    pub fn generate_key(len: usize) -> Result<Zeroizing<Vec<u8>>> {
        if !KEY_LENGTHS.contains(&len) {
            return Err(CryptoError::CryptoFailure(format!(
                "AES key must be 16, 24 or 32 bytes, got {}",
                len
            )));
        }
        let mut key = Zeroizing::new(vec![0u8; len]);
        OsRng.fill_bytes(&mut key);
        Ok(key)
    }

    pub fn key_bits(&self) -> usize {
        self.key.len() * 8
    }

    fn apply(&self, iv: &[u8; IV_LEN], data: &mut [u8]) -> Result<()> {
        let failed = |e: InvalidLength| CryptoError::crypto("AES-OFB setup failed", e);
        match self.key.len() {
            16 => Ofb::<Aes128>::new_from_slices(&self.key, iv)
                .map_err(failed)?
                .apply_keystream(data),
            24 => Ofb::<Aes192>::new_from_slices(&self.key, iv)
                .map_err(failed)?
                .apply_keystream(data),
            _ => Ofb::<Aes256>::new_from_slices(&self.key, iv)
                .map_err(failed)?
                .apply_keystream(data),
        }
        Ok(())
    }

    /// Encrypt with a caller-chosen IV. Reusing an IV under the same key
    /// reuses the keystream.
    pub fn encrypt_with_iv(&self, plaintext: &[u8], iv: &[u8; IV_LEN]) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(IV_LEN + plaintext.len());
        out.extend_from_slice(iv);
        out.extend_from_slice(plaintext);
        self.apply(iv, &mut out[IV_LEN..])?;
        Ok(out)
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut iv);
        self.encrypt_with_iv(plaintext, &iv)
    }

    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<SecureBytes> {
        if ciphertext.len() < IV_LEN {
            return Err(CryptoError::Format(format!(
                "Ciphertext shorter than the {}-byte IV",
                IV_LEN
            )));
        }
        let (iv, body) = ciphertext.split_at(IV_LEN);
        let mut iv_block = [0u8; IV_LEN];
        iv_block.copy_from_slice(iv);

        let mut plaintext = SecureBytes::from_slice(body);
        self.apply(&iv_block, &mut plaintext)?;
        Ok(plaintext)
    }

    /// Encrypt and encode as standard base64
    pub fn encrypt_base64(&self, plaintext: &[u8]) -> Result<String> {
        Ok(STANDARD.encode(self.encrypt(plaintext)?))
    }

    /// Decode standard base64 and decrypt
    pub fn decrypt_base64(&self, encoded: &str) -> Result<SecureBytes> {
        let ciphertext = STANDARD
            .decode(encoded.trim())
            .map_err(|e| CryptoError::format("Ciphertext is not valid base64", e))?;
        self.decrypt(&ciphertext)
    }
}

impl std::fmt::Debug for CommonKeyCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommonKeyCipher")
            .field("bits", &self.key_bits())
            .finish()
    }
}
