//! keycrypt - key format conversion and public-key encryption
//!
//! This crate provides:
//! - Decoding and encoding of RSA, ECDSA and Ed25519 keys in PEM (PKCS#1,
//!   PKCS#8, SEC1, PKIX), OpenSSH and JWK forms
//! - Encryption to any of those keys: RSA PKCS#1 v1.5, ECIES for NIST
//!   curves, and an X25519 stream cipher for Ed25519
//! - Shared-key AES-OFB encryption
//! - Passphrase-protected PKCS#8 output
//! - Zero-on-drop handling of private key material and plaintexts

pub mod cli;
pub mod config;
pub mod crypto;
pub mod error;
pub mod format;
pub mod keys;

pub use crypto::{Cipher, CommonKeyCipher, PublicKeyCipher, SecureBytes};
pub use error::{CryptoError, Result};
pub use keys::{KeyKind, KeyMaterial};
