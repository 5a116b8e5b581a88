//! Hybrid ECIES-style encryption to a NIST-curve public key
//!
//! ```text
//! [1: len(R)] [R: uncompressed ephemeral point] [IV: 16] [AES-128-CBC ciphertext] [HMAC-SHA1: 20]
//! ```
//!
//! `D = SHA-256(x(r·P))` with the x-coordinate in minimal big-endian form.
//! `D[0..16]` is the AES key, `D[16..32]` the MAC key. The tag covers
//! `IV || ciphertext` and is checked before anything is decrypted.

use elliptic_curve::ecdh::{diffie_hellman, EphemeralSecret};
use elliptic_curve::sec1::{FromEncodedPoint, ModulusSize, ToEncodedPoint};
use elliptic_curve::{AffinePoint, CurveArithmetic, FieldBytesSize, PublicKey, SecretKey};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::symmetric::{self, AES_KEY_LEN, BLOCK_LEN, IV_LEN, MAC_KEY_LEN, TAG_LEN};
use super::{Cipher, SecureBytes};
use crate::error::{CryptoError, Result};
use crate::keys::{EcKeyPair, EcdsaKey, KeyMaterial};

/// Smallest possible body after the ephemeral point: IV, one block, tag
const MIN_BODY_LEN: usize = IV_LEN + BLOCK_LEN + TAG_LEN;

/// AES and MAC keys derived from the ECDH shared x-coordinate
#[derive(Zeroize, ZeroizeOnDrop)]
struct SessionKeys {
    aes: [u8; AES_KEY_LEN],
    mac: [u8; MAC_KEY_LEN],
}

impl SessionKeys {
    fn derive(shared_x: &[u8]) -> Self {
        let start = shared_x.iter().position(|&b| b != 0).unwrap_or(shared_x.len());
        let mut digest = Sha256::digest(&shared_x[start..]);

        let mut keys = SessionKeys {
            aes: [0u8; AES_KEY_LEN],
            mac: [0u8; MAC_KEY_LEN],
        };
        keys.aes.copy_from_slice(&digest[..AES_KEY_LEN]);
        keys.mac.copy_from_slice(&digest[AES_KEY_LEN..AES_KEY_LEN + MAC_KEY_LEN]);
        digest.as_mut_slice().zeroize();
        keys
    }
}

fn seal<C>(recipient: &PublicKey<C>, plaintext: &[u8]) -> Result<Vec<u8>>
where
    C: CurveArithmetic,
    AffinePoint<C>: FromEncodedPoint<C> + ToEncodedPoint<C>,
    FieldBytesSize<C>: ModulusSize,
{
    let ephemeral = EphemeralSecret::<C>::random(&mut OsRng);
    let point = ephemeral.public_key().to_encoded_point(false);
    let shared = ephemeral.diffie_hellman(recipient);
    let keys = SessionKeys::derive(shared.raw_secret_bytes());

    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);

    seal_with(point.as_bytes(), &keys, &iv, plaintext)
}

fn seal_with(point: &[u8], keys: &SessionKeys, iv: &[u8; IV_LEN], plaintext: &[u8]) -> Result<Vec<u8>> {
    let point_len = u8::try_from(point.len())
        .map_err(|_| CryptoError::CryptoFailure("Ephemeral point too long".into()))?;
    let ciphertext = symmetric::aes_cbc_encrypt(&keys.aes, iv, plaintext);

    let mut out = Vec::with_capacity(1 + point.len() + IV_LEN + ciphertext.len() + TAG_LEN);
    out.push(point_len);
    out.extend_from_slice(point);
    let body_start = out.len();
    out.extend_from_slice(iv);
    out.extend_from_slice(&ciphertext);

    let tag = symmetric::hmac_sha1(&keys.mac, &out[body_start..])?;
    out.extend_from_slice(&tag);
    Ok(out)
}

fn open<C>(secret: &SecretKey<C>, data: &[u8]) -> Result<SecureBytes>
where
    C: CurveArithmetic,
    AffinePoint<C>: FromEncodedPoint<C> + ToEncodedPoint<C>,
    FieldBytesSize<C>: ModulusSize,
{
    let (&point_len, rest) = data
        .split_first()
        .ok_or_else(|| CryptoError::Format("Empty ECIES ciphertext".into()))?;
    let point_len = point_len as usize;
    if rest.len() < point_len {
        return Err(CryptoError::Format("Truncated ECIES ephemeral point".into()));
    }
    let (point, body) = rest.split_at(point_len);

    let ephemeral = PublicKey::<C>::from_sec1_bytes(point).map_err(|_| CryptoError::InvalidCurvePoint)?;

    if body.len() < MIN_BODY_LEN {
        return Err(CryptoError::Format(format!(
            "ECIES ciphertext too short: {} bytes after the ephemeral point",
            body.len()
        )));
    }

    let shared = diffie_hellman(secret.to_nonzero_scalar(), ephemeral.as_affine());
    let keys = SessionKeys::derive(shared.raw_secret_bytes());

    open_with(&keys, body)
}

fn open_with(keys: &SessionKeys, body: &[u8]) -> Result<SecureBytes> {
    let (authenticated, tag) = body.split_at(body.len() - TAG_LEN);

    if let Err(err) = symmetric::verify_hmac_sha1(&keys.mac, authenticated, tag) {
        warn!("ECIES authentication tag mismatch");
        return Err(err);
    }

    let (iv, ciphertext) = authenticated.split_at(IV_LEN);
    let mut iv_block = [0u8; IV_LEN];
    iv_block.copy_from_slice(iv);

    symmetric::aes_cbc_decrypt(&keys.aes, &iv_block, ciphertext)
}

/// ECIES encryption to an ECDSA key on P-256, P-384 or P-521
#[derive(Debug, Clone)]
pub struct EcdsaCipher {
    key: EcdsaKey,
}

impl EcdsaCipher {
    pub fn new(key: EcdsaKey) -> Self {
        Self { key }
    }

    /// Build from a `KeyMaterial`, failing unless it is an ECDSA key
    pub fn from_key(key: &KeyMaterial) -> Result<Self> {
        Ok(Self::new(key.as_ecdsa()?.clone()))
    }
}

fn secret_of<C: CurveArithmetic>(pair: &EcKeyPair<C>) -> Result<&SecretKey<C>> {
    pair.secret().ok_or(CryptoError::MissingKeyComponent("private"))
}

impl Cipher for EcdsaCipher {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        debug!(curve = %self.key.curve(), len = plaintext.len(), "ECIES encrypt");
        match &self.key {
            EcdsaKey::P256(pair) => seal(pair.public(), plaintext),
            EcdsaKey::P384(pair) => seal(pair.public(), plaintext),
            EcdsaKey::P521(pair) => seal(pair.public(), plaintext),
        }
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<SecureBytes> {
        debug!(curve = %self.key.curve(), len = ciphertext.len(), "ECIES decrypt");
        match &self.key {
            EcdsaKey::P256(pair) => open(secret_of(pair)?, ciphertext),
            EcdsaKey::P384(pair) => open(secret_of(pair)?, ciphertext),
            EcdsaKey::P521(pair) => open(secret_of(pair)?, ciphertext),
        }
    }
}
