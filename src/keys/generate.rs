//! Key pair generation
//!
//! Thin wrappers over the RSA, NIST-curve and Ed25519 generators. All of
//! them draw from the operating system CSPRNG.

use ed25519_dalek::SigningKey;
use elliptic_curve::SecretKey;
use p256::NistP256;
use p384::NistP384;
use p521::NistP521;
use rand::rngs::OsRng;
use rsa::RsaPrivateKey;
use tracing::debug;

use super::{EcCurve, EcKeyPair, EcdsaKey, Ed25519Key, KeyMaterial, RsaKey};
use crate::error::{CryptoError, Result};

/// Smallest RSA modulus accepted for new keys
pub const MIN_RSA_BITS: usize = 1024;

/// Which kind of key to generate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAlgorithm {
    Rsa { bits: usize },
    Ecdsa(EcCurve),
    Ed25519,
}

/// Generate a new random key pair
pub fn generate(algorithm: KeyAlgorithm) -> Result<KeyMaterial> {
    debug!(?algorithm, "generating key pair");

    match algorithm {
        KeyAlgorithm::Rsa { bits } => {
            if bits < MIN_RSA_BITS || bits % 8 != 0 {
                return Err(CryptoError::CryptoFailure(format!(
                    "Invalid RSA key size: {} bits",
                    bits
                )));
            }
            let private = RsaPrivateKey::new(&mut OsRng, bits)
                .map_err(|e| CryptoError::crypto("RSA key generation failed", e))?;
            Ok(KeyMaterial::Rsa(RsaKey::from_private(private)?))
        }
        KeyAlgorithm::Ecdsa(curve) => {
            let key = match curve {
                EcCurve::P256 => {
                    EcdsaKey::P256(EcKeyPair::from_secret(SecretKey::<NistP256>::random(&mut OsRng)))
                }
                EcCurve::P384 => {
                    EcdsaKey::P384(EcKeyPair::from_secret(SecretKey::<NistP384>::random(&mut OsRng)))
                }
                EcCurve::P521 => {
                    EcdsaKey::P521(EcKeyPair::from_secret(SecretKey::<NistP521>::random(&mut OsRng)))
                }
            };
            Ok(KeyMaterial::Ecdsa(key))
        }
        KeyAlgorithm::Ed25519 => {
            let signing_key = SigningKey::generate(&mut OsRng);
            Ok(KeyMaterial::Ed25519(Ed25519Key::from_private(signing_key)))
        }
    }
}

/// Generate a new Ed25519 keypair
pub fn generate_keypair() -> KeyMaterial {
    KeyMaterial::Ed25519(Ed25519Key::from_private(SigningKey::generate(&mut OsRng)))
}
