//! The `KeyMaterial` tagged union
//!
//! Every decoded, generated or JWK-imported key ends up here. The public
//! component is always present; the private component is optional and, when
//! present, the public half was derived from it at construction time. All
//! private types used below (`RsaPrivateKey`, `SecretKey`, `SigningKey`)
//! zero their memory on drop.

use std::fmt;
use std::str::FromStr;

use ed25519_dalek::{SigningKey, VerifyingKey, KEYPAIR_LENGTH, SECRET_KEY_LENGTH};
use elliptic_curve::sec1::ToEncodedPoint;
use elliptic_curve::{CurveArithmetic, PublicKey, SecretKey};
use p256::NistP256;
use p384::NistP384;
use p521::NistP521;
use pkcs8::{AssociatedOid, ObjectIdentifier};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::{CryptoError, Result};

/// Algorithm tag of a `KeyMaterial`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    Rsa,
    Ecdsa,
    Ed25519,
}

impl KeyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyKind::Rsa => "rsa",
            KeyKind::Ecdsa => "ecdsa",
            KeyKind::Ed25519 => "ed25519",
        }
    }
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named NIST curves supported for ECDSA keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EcCurve {
    #[serde(rename = "P-256")]
    P256,
    #[serde(rename = "P-384")]
    P384,
    #[serde(rename = "P-521")]
    P521,
}

impl EcCurve {
    /// Select a curve by its bit size (256, 384 or 521)
    pub fn from_bits(bits: usize) -> Result<Self> {
        match bits {
            256 => Ok(EcCurve::P256),
            384 => Ok(EcCurve::P384),
            521 => Ok(EcCurve::P521),
            other => Err(CryptoError::Format(format!(
                "Unsupported curve size: {} bits",
                other
            ))),
        }
    }

    /// JOSE / NIST display name
    pub fn name(&self) -> &'static str {
        match self {
            EcCurve::P256 => "P-256",
            EcCurve::P384 => "P-384",
            EcCurve::P521 => "P-521",
        }
    }

    /// Curve identifier used inside SSH key blobs
    pub fn ssh_id(&self) -> &'static str {
        match self {
            EcCurve::P256 => "nistp256",
            EcCurve::P384 => "nistp384",
            EcCurve::P521 => "nistp521",
        }
    }

    /// JWS algorithm conventionally paired with the curve
    pub fn jwa(&self) -> &'static str {
        match self {
            EcCurve::P256 => "ES256",
            EcCurve::P384 => "ES384",
            EcCurve::P521 => "ES512",
        }
    }

    /// Length of a field element / scalar in bytes
    pub fn field_size(&self) -> usize {
        match self {
            EcCurve::P256 => 32,
            EcCurve::P384 => 48,
            EcCurve::P521 => 66,
        }
    }

    pub fn oid(&self) -> ObjectIdentifier {
        match self {
            EcCurve::P256 => NistP256::OID,
            EcCurve::P384 => NistP384::OID,
            EcCurve::P521 => NistP521::OID,
        }
    }

    pub fn from_oid(oid: ObjectIdentifier) -> Option<Self> {
        [EcCurve::P256, EcCurve::P384, EcCurve::P521]
            .into_iter()
            .find(|curve| curve.oid() == oid)
    }

    pub fn from_ssh_id(id: &str) -> Option<Self> {
        [EcCurve::P256, EcCurve::P384, EcCurve::P521]
            .into_iter()
            .find(|curve| curve.ssh_id() == id)
    }
}

impl fmt::Display for EcCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EcCurve {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "p-256" | "p256" | "nistp256" | "256" => Ok(EcCurve::P256),
            "p-384" | "p384" | "nistp384" | "384" => Ok(EcCurve::P384),
            "p-521" | "p521" | "nistp521" | "521" => Ok(EcCurve::P521),
            _ => Err(CryptoError::Format(format!("Unknown curve: {}", s))),
        }
    }
}

/// RSA public key with an optional private half
#[derive(Clone, PartialEq)]
pub struct RsaKey {
    public: RsaPublicKey,
    private: Option<RsaPrivateKey>,
}

impl RsaKey {
    pub fn from_public(public: RsaPublicKey) -> Self {
        Self {
            public,
            private: None,
        }
    }

    /// Wrap a private key, precomputing CRT values and deriving the public half
    pub fn from_private(mut private: RsaPrivateKey) -> Result<Self> {
        private
            .precompute()
            .map_err(|e| CryptoError::crypto("RSA precomputation failed", e))?;

        Ok(Self {
            public: private.to_public_key(),
            private: Some(private),
        })
    }

    pub fn public(&self) -> &RsaPublicKey {
        &self.public
    }

    pub fn private(&self) -> Option<&RsaPrivateKey> {
        self.private.as_ref()
    }

    /// Modulus length in bytes
    pub fn size(&self) -> usize {
        self.public.size()
    }

    pub fn bits(&self) -> usize {
        self.public.n().bits()
    }
}

impl fmt::Debug for RsaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaKey")
            .field("bits", &self.bits())
            .field("private", &self.private.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Public point on curve `C` with an optional secret scalar
#[derive(Clone)]
pub struct EcKeyPair<C: CurveArithmetic> {
    public: PublicKey<C>,
    secret: Option<SecretKey<C>>,
}

impl<C: CurveArithmetic> EcKeyPair<C> {
    pub fn from_public(public: PublicKey<C>) -> Self {
        Self {
            public,
            secret: None,
        }
    }

    pub fn from_secret(secret: SecretKey<C>) -> Self {
        Self {
            public: secret.public_key(),
            secret: Some(secret),
        }
    }

    pub fn public(&self) -> &PublicKey<C> {
        &self.public
    }

    pub fn secret(&self) -> Option<&SecretKey<C>> {
        self.secret.as_ref()
    }
}

impl<C: CurveArithmetic> PartialEq for EcKeyPair<C> {
    fn eq(&self, other: &Self) -> bool {
        self.public == other.public && self.secret == other.secret
    }
}

/// ECDSA key on one of the supported named curves
#[derive(Clone, PartialEq)]
pub enum EcdsaKey {
    P256(EcKeyPair<NistP256>),
    P384(EcKeyPair<NistP384>),
    P521(EcKeyPair<NistP521>),
}

impl EcdsaKey {
    pub fn curve(&self) -> EcCurve {
        match self {
            EcdsaKey::P256(_) => EcCurve::P256,
            EcdsaKey::P384(_) => EcCurve::P384,
            EcdsaKey::P521(_) => EcCurve::P521,
        }
    }

    pub fn has_private(&self) -> bool {
        match self {
            EcdsaKey::P256(pair) => pair.secret.is_some(),
            EcdsaKey::P384(pair) => pair.secret.is_some(),
            EcdsaKey::P521(pair) => pair.secret.is_some(),
        }
    }

    /// Public point in uncompressed SEC1 encoding (`04 || x || y`)
    pub fn public_point(&self) -> Vec<u8> {
        match self {
            EcdsaKey::P256(pair) => pair.public.to_encoded_point(false).as_bytes().to_vec(),
            EcdsaKey::P384(pair) => pair.public.to_encoded_point(false).as_bytes().to_vec(),
            EcdsaKey::P521(pair) => pair.public.to_encoded_point(false).as_bytes().to_vec(),
        }
    }

    /// Big-endian secret scalar, padded to the curve's field size
    pub fn secret_scalar(&self) -> Option<Zeroizing<Vec<u8>>> {
        match self {
            EcdsaKey::P256(pair) => pair.secret.as_ref().map(|s| Zeroizing::new(s.to_bytes().to_vec())),
            EcdsaKey::P384(pair) => pair.secret.as_ref().map(|s| Zeroizing::new(s.to_bytes().to_vec())),
            EcdsaKey::P521(pair) => pair.secret.as_ref().map(|s| Zeroizing::new(s.to_bytes().to_vec())),
        }
    }

    /// Build a key from a SEC1 public point and optional secret scalar.
    ///
    /// When both are given the point must match the scalar.
    pub fn from_parts(curve: EcCurve, point: &[u8], scalar: Option<&[u8]>) -> Result<Self> {
        fn build<C>(point: &[u8], scalar: Option<&[u8]>) -> Result<EcKeyPair<C>>
        where
            C: CurveArithmetic,
            elliptic_curve::AffinePoint<C>: elliptic_curve::sec1::FromEncodedPoint<C>
                + elliptic_curve::sec1::ToEncodedPoint<C>,
            elliptic_curve::FieldBytesSize<C>: elliptic_curve::sec1::ModulusSize,
        {
            let public =
                PublicKey::<C>::from_sec1_bytes(point).map_err(|_| CryptoError::InvalidCurvePoint)?;
            match scalar {
                None => Ok(EcKeyPair::from_public(public)),
                Some(scalar) => {
                    let secret = SecretKey::<C>::from_slice(scalar)
                        .map_err(|_| CryptoError::Format("Invalid EC secret scalar".into()))?;
                    let pair = EcKeyPair::from_secret(secret);
                    if pair.public != public {
                        return Err(CryptoError::Format(
                            "EC public point does not match the secret scalar".into(),
                        ));
                    }
                    Ok(pair)
                }
            }
        }

        Ok(match curve {
            EcCurve::P256 => EcdsaKey::P256(build(point, scalar)?),
            EcCurve::P384 => EcdsaKey::P384(build(point, scalar)?),
            EcCurve::P521 => EcdsaKey::P521(build(point, scalar)?),
        })
    }

    fn to_public(&self) -> Self {
        match self {
            EcdsaKey::P256(pair) => EcdsaKey::P256(EcKeyPair::from_public(pair.public.clone())),
            EcdsaKey::P384(pair) => EcdsaKey::P384(EcKeyPair::from_public(pair.public.clone())),
            EcdsaKey::P521(pair) => EcdsaKey::P521(EcKeyPair::from_public(pair.public.clone())),
        }
    }
}

impl fmt::Debug for EcdsaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EcdsaKey")
            .field("curve", &self.curve())
            .field("public", &hex::encode(self.public_point()))
            .field("private", &self.has_private().then_some("[REDACTED]"))
            .finish()
    }
}

/// Ed25519 verifying key with an optional signing key
#[derive(Clone, PartialEq)]
pub struct Ed25519Key {
    public: VerifyingKey,
    private: Option<SigningKey>,
}

impl Ed25519Key {
    pub fn from_public(public: VerifyingKey) -> Self {
        Self {
            public,
            private: None,
        }
    }

    pub fn from_private(private: SigningKey) -> Self {
        Self {
            public: private.verifying_key(),
            private: Some(private),
        }
    }

    /// Create from the 32-byte seed
    pub fn from_seed(seed: &[u8; SECRET_KEY_LENGTH]) -> Self {
        Self::from_private(SigningKey::from_bytes(seed))
    }

    pub fn public(&self) -> &VerifyingKey {
        &self.public
    }

    pub fn private(&self) -> Option<&SigningKey> {
        self.private.as_ref()
    }

    pub fn public_bytes(&self) -> [u8; 32] {
        self.public.to_bytes()
    }

    /// The 32-byte private seed, by copy
    pub fn seed(&self) -> Option<Zeroizing<[u8; SECRET_KEY_LENGTH]>> {
        self.private.as_ref().map(|key| Zeroizing::new(key.to_bytes()))
    }

    /// The 64-byte `seed || public` value, by copy
    pub fn keypair_bytes(&self) -> Option<Zeroizing<[u8; KEYPAIR_LENGTH]>> {
        self.private
            .as_ref()
            .map(|key| Zeroizing::new(key.to_keypair_bytes()))
    }
}

impl fmt::Debug for Ed25519Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ed25519Key")
            .field("public", &hex::encode(self.public.as_bytes()))
            .field("private", &self.private.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// One algorithm's public and (optional) private key components
#[derive(Debug, Clone, PartialEq)]
pub enum KeyMaterial {
    Rsa(RsaKey),
    Ecdsa(EcdsaKey),
    Ed25519(Ed25519Key),
}

impl KeyMaterial {
    pub fn kind(&self) -> KeyKind {
        match self {
            KeyMaterial::Rsa(_) => KeyKind::Rsa,
            KeyMaterial::Ecdsa(_) => KeyKind::Ecdsa,
            KeyMaterial::Ed25519(_) => KeyKind::Ed25519,
        }
    }

    pub fn has_private(&self) -> bool {
        match self {
            KeyMaterial::Rsa(key) => key.private.is_some(),
            KeyMaterial::Ecdsa(key) => key.has_private(),
            KeyMaterial::Ed25519(key) => key.private.is_some(),
        }
    }

    /// A copy holding only the public component
    pub fn to_public(&self) -> KeyMaterial {
        match self {
            KeyMaterial::Rsa(key) => KeyMaterial::Rsa(RsaKey::from_public(key.public.clone())),
            KeyMaterial::Ecdsa(key) => KeyMaterial::Ecdsa(key.to_public()),
            KeyMaterial::Ed25519(key) => KeyMaterial::Ed25519(Ed25519Key::from_public(key.public)),
        }
    }

    pub fn expect_kind(&self, kind: KeyKind) -> Result<()> {
        if self.kind() == kind {
            Ok(())
        } else {
            Err(CryptoError::mismatch(kind, self.kind()))
        }
    }

    pub fn as_rsa(&self) -> Result<&RsaKey> {
        match self {
            KeyMaterial::Rsa(key) => Ok(key),
            other => Err(CryptoError::mismatch(KeyKind::Rsa, other.kind())),
        }
    }

    pub fn as_ecdsa(&self) -> Result<&EcdsaKey> {
        match self {
            KeyMaterial::Ecdsa(key) => Ok(key),
            other => Err(CryptoError::mismatch(KeyKind::Ecdsa, other.kind())),
        }
    }

    pub fn as_ed25519(&self) -> Result<&Ed25519Key> {
        match self {
            KeyMaterial::Ed25519(key) => Ok(key),
            other => Err(CryptoError::mismatch(KeyKind::Ed25519, other.kind())),
        }
    }

    /// Short stable identifier: hex of the first 16 bytes of SHA-256 over
    /// the PKIX public key DER
    pub fn key_id(&self) -> Result<String> {
        let der = crate::format::der::encode_public_der(self)?;
        let digest = Sha256::digest(&der);
        Ok(hex::encode(&digest[..16]))
    }
}

impl From<RsaKey> for KeyMaterial {
    fn from(key: RsaKey) -> Self {
        KeyMaterial::Rsa(key)
    }
}

impl From<EcdsaKey> for KeyMaterial {
    fn from(key: EcdsaKey) -> Self {
        KeyMaterial::Ecdsa(key)
    }
}

impl From<Ed25519Key> for KeyMaterial {
    fn from(key: Ed25519Key) -> Self {
        KeyMaterial::Ed25519(key)
    }
}
