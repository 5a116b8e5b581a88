//! Edwards → Montgomery conversion for Ed25519 keys
//!
//! Public keys map through the birational equivalence `u = (1 + y) / (1 - y)`.
//! Private keys map to the clamped lower half of `SHA-512(seed)`, the same
//! scalar Ed25519 signs with.

use curve25519_dalek::edwards::CompressedEdwardsY;
use sha2::{Digest, Sha512};
use zeroize::{Zeroize, Zeroizing};

use crate::error::{CryptoError, Result};
use crate::keys::Ed25519Key;

pub const KEY_LEN: usize = 32;

/// Standard X25519 scalar clamp
pub fn clamp(scalar: &mut [u8; KEY_LEN]) {
    scalar[0] &= 248;
    scalar[31] &= 127;
    scalar[31] |= 64;
}

/// Montgomery `u` coordinate of an encoded Edwards point
pub fn public_to_montgomery(edwards: &[u8; KEY_LEN]) -> Result<[u8; KEY_LEN]> {
    let point = CompressedEdwardsY(*edwards)
        .decompress()
        .ok_or(CryptoError::InvalidCurvePoint)?;
    Ok(point.to_montgomery().to_bytes())
}

/// Clamped X25519 scalar for a 32-byte Ed25519 seed
pub fn seed_to_montgomery(seed: &[u8; KEY_LEN]) -> Zeroizing<[u8; KEY_LEN]> {
    let mut digest = Sha512::digest(seed);
    let mut scalar = Zeroizing::new([0u8; KEY_LEN]);
    scalar.copy_from_slice(&digest[..KEY_LEN]);
    digest.as_mut_slice().zeroize();

    clamp(&mut scalar);
    scalar
}

/// Montgomery public value for an Ed25519 key
pub fn montgomery_public(key: &Ed25519Key) -> Result<[u8; KEY_LEN]> {
    public_to_montgomery(&key.public_bytes())
}

/// Montgomery private scalar for an Ed25519 key.
///
/// Reads the seed through the 64-byte `seed || public` accessor.
pub fn montgomery_secret(key: &Ed25519Key) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    let keypair = key
        .keypair_bytes()
        .ok_or(CryptoError::MissingKeyComponent("private"))?;

    let mut seed = Zeroizing::new([0u8; KEY_LEN]);
    seed.copy_from_slice(&keypair[..KEY_LEN]);
    Ok(seed_to_montgomery(&seed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use x25519_dalek::{x25519, X25519_BASEPOINT_BYTES};

    #[test]
    fn test_clamp() {
        let mut scalar = [0xff; 32];
        clamp(&mut scalar);
        assert_eq!(scalar[0], 0xf8);
        assert_eq!(scalar[31], 0x7f);

        let mut scalar = [0u8; 32];
        clamp(&mut scalar);
        assert_eq!(scalar[31], 0x40);
    }

    #[test]
    fn test_bridged_keys_form_a_pair() {
        for seed in [[1u8; 32], [0x42; 32], [0xfe; 32]] {
            let key = Ed25519Key::from_seed(&seed);
            let public = montgomery_public(&key).unwrap();
            let secret = montgomery_secret(&key).unwrap();

            assert_eq!(x25519(*secret, X25519_BASEPOINT_BYTES), public);
        }
    }

    #[test]
    fn test_rfc8032_key_converts() {
        // RFC 8032 section 7.1, TEST 1
        let seed: [u8; 32] = hex::decode("9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60")
            .unwrap()
            .try_into()
            .unwrap();
        let key = Ed25519Key::from_seed(&seed);

        assert_eq!(
            hex::encode(key.public_bytes()),
            "d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a"
        );
        assert_eq!(
            hex::encode(montgomery_public(&key).unwrap()),
            "d85e07ec22b0ad881537c2f44d662d1a143cf830c57aca4305d85c7a90f6b62e"
        );
        assert_eq!(
            hex::encode(*montgomery_secret(&key).unwrap()),
            "307c83864f2833cb427a2ef1c00a013cfdff2768d980c0a3a520f006904de94f"
        );
    }

    #[test]
    fn test_invalid_point() {
        // y = 2 has no matching x on edwards25519
        let mut encoded = [0u8; 32];
        encoded[0] = 2;
        assert!(matches!(
            public_to_montgomery(&encoded),
            Err(CryptoError::InvalidCurvePoint)
        ));
    }

    #[test]
    fn test_public_only_has_no_secret() {
        let key = Ed25519Key::from_seed(&[1u8; 32]);
        let public = Ed25519Key::from_public(*key.public());

        assert!(matches!(
            montgomery_secret(&public),
            Err(CryptoError::MissingKeyComponent(_))
        ));
    }
}
