//! Zero-on-drop byte container for decrypted plaintexts and derived secrets
//!
//! The wrapper is not `Clone`, and its `Debug` output never shows the bytes.

use std::ops::{Deref, DerefMut};

use zeroize::{Zeroize, Zeroizing};

use crate::error::{CryptoError, Result};

/// Sensitive bytes, zeroed when dropped
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct SecureBytes(Vec<u8>);

impl SecureBytes {
    pub fn new(data: Vec<u8>) -> Self {
        Self(data)
    }

    pub fn from_slice(data: &[u8]) -> Self {
        Self(data.to_vec())
    }

    /// A zeroed buffer of `len` bytes
    pub fn zeroed(len: usize) -> Self {
        Self(vec![0u8; len])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Interpret the bytes as UTF-8. The result is still wiped on drop.
    pub fn into_string(mut self) -> Result<Zeroizing<String>> {
        let bytes = std::mem::take(&mut self.0);
        match String::from_utf8(bytes) {
            Ok(text) => Ok(Zeroizing::new(text)),
            Err(err) => {
                let mut bytes = err.into_bytes();
                bytes.zeroize();
                Err(CryptoError::Format("Plaintext is not valid UTF-8".into()))
            }
        }
    }

    /// Convert to a regular Vec, consuming self.
    /// The returned Vec is no longer wiped on drop.
    pub fn into_vec(mut self) -> Vec<u8> {
        std::mem::take(&mut self.0)
    }
}

impl Deref for SecureBytes {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for SecureBytes {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl AsRef<[u8]> for SecureBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for SecureBytes {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl From<&[u8]> for SecureBytes {
    fn from(data: &[u8]) -> Self {
        Self::from_slice(data)
    }
}

impl Default for SecureBytes {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl PartialEq<[u8]> for SecureBytes {
    fn eq(&self, other: &[u8]) -> bool {
        self.0 == other
    }
}

// Prevent accidental debug printing of secrets
impl std::fmt::Debug for SecureBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureBytes")
            .field("len", &self.0.len())
            .field("data", &"[REDACTED]")
            .finish()
    }
}
