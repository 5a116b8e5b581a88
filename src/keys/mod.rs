//! Key material and key generation
//!
//! `KeyMaterial` is resolved once, when a key is decoded or generated.
//! Ciphers and encoders match on its tag; nothing downcasts at a call site.

mod generate;
mod material;

pub use generate::{generate, generate_keypair, KeyAlgorithm, MIN_RSA_BITS};
pub use material::{EcCurve, EcKeyPair, EcdsaKey, Ed25519Key, KeyKind, KeyMaterial, RsaKey};
