//! DER key bodies: PKCS#1, PKCS#8, SEC1 and SubjectPublicKeyInfo
//!
//! PKCS#8 and SPKI containers are resolved to a concrete algorithm by their
//! algorithm OID (and curve OID for EC keys) before the inner key is parsed.

use ed25519_dalek::{SigningKey, VerifyingKey};
use elliptic_curve::sec1::{FromEncodedPoint, ModulusSize, ToEncodedPoint};
use elliptic_curve::{AffinePoint, CurveArithmetic, FieldBytesSize, PublicKey, SecretKey};
use p256::NistP256;
use p384::NistP384;
use p521::NistP521;
use pkcs8::spki::SubjectPublicKeyInfoRef;
use pkcs8::pkcs5::pbes2;
use pkcs8::{
    AssociatedOid, DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey,
    EncryptedPrivateKeyInfo, ObjectIdentifier, PrivateKeyInfo,
};
use rand::rngs::OsRng;
use rand::RngCore;
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey, EncodeRsaPrivateKey, EncodeRsaPublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sec1::der::Encode;
use sec1::EcParameters;
use tracing::debug;
use zeroize::Zeroizing;

use crate::error::{CryptoError, Result};
use crate::keys::{EcCurve, EcKeyPair, EcdsaKey, Ed25519Key, KeyKind, KeyMaterial, RsaKey};

/// rsaEncryption
pub const RSA_ENCRYPTION_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");
/// id-ecPublicKey
pub const EC_PUBLIC_KEY_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");
/// id-Ed25519
pub const ED25519_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.101.112");

/// PBKDF2 rounds for newly encrypted keys
pub const PBKDF2_ITERATIONS: u32 = 100_000;
const PBES2_SALT_LEN: usize = 16;

fn missing_private() -> CryptoError {
    CryptoError::MissingKeyComponent("private")
}

fn ec_curve_of(oid: std::result::Result<ObjectIdentifier, pkcs8::spki::Error>) -> Result<EcCurve> {
    let oid = oid.map_err(|e| CryptoError::format("EC key has no named curve", e))?;
    EcCurve::from_oid(oid).ok_or_else(|| CryptoError::Format(format!("Unsupported curve OID {}", oid)))
}

/// PKCS#1 `RSAPrivateKey`
pub fn parse_pkcs1_private(der: &[u8]) -> Result<KeyMaterial> {
    let key = RsaPrivateKey::from_pkcs1_der(der)
        .map_err(|e| CryptoError::format("Invalid PKCS#1 private key", e))?;
    Ok(KeyMaterial::Rsa(RsaKey::from_private(key)?))
}

/// PKCS#1 `RSAPublicKey`
pub fn parse_pkcs1_public(der: &[u8]) -> Result<KeyMaterial> {
    let key = RsaPublicKey::from_pkcs1_der(der)
        .map_err(|e| CryptoError::format("Invalid PKCS#1 public key", e))?;
    Ok(KeyMaterial::Rsa(RsaKey::from_public(key)))
}

/// SEC1 `ECPrivateKey`; the curve comes from the embedded parameters
pub fn parse_sec1_private(der: &[u8]) -> Result<KeyMaterial> {
    let parsed = sec1::EcPrivateKey::try_from(der)
        .map_err(|e| CryptoError::format("Invalid SEC1 private key", e))?;
    let oid = parsed
        .parameters
        .and_then(|params| params.named_curve())
        .ok_or_else(|| CryptoError::Format("SEC1 key does not name its curve".into()))?;
    let curve = EcCurve::from_oid(oid)
        .ok_or_else(|| CryptoError::Format(format!("Unsupported curve OID {}", oid)))?;

    debug!(%curve, "parsing SEC1 private key");

    let invalid = |e: elliptic_curve::Error| CryptoError::format("Invalid SEC1 private key", e);
    let key = match curve {
        EcCurve::P256 => EcdsaKey::P256(EcKeyPair::from_secret(
            SecretKey::<NistP256>::from_sec1_der(der).map_err(invalid)?,
        )),
        EcCurve::P384 => EcdsaKey::P384(EcKeyPair::from_secret(
            SecretKey::<NistP384>::from_sec1_der(der).map_err(invalid)?,
        )),
        EcCurve::P521 => EcdsaKey::P521(EcKeyPair::from_secret(
            SecretKey::<NistP521>::from_sec1_der(der).map_err(invalid)?,
        )),
    };
    Ok(KeyMaterial::Ecdsa(key))
}

/// PKCS#8 `PrivateKeyInfo` holding an RSA, EC or Ed25519 key
pub fn parse_pkcs8_private(der: &[u8]) -> Result<KeyMaterial> {
    let info = PrivateKeyInfo::try_from(der)
        .map_err(|e| CryptoError::format("Invalid PKCS#8 private key", e))?;
    let invalid = |e: pkcs8::Error| CryptoError::format("Invalid PKCS#8 private key", e);
    let oid = info.algorithm.oid;

    if oid == RSA_ENCRYPTION_OID {
        debug!("PKCS#8 container holds an RSA key");
        let key = RsaPrivateKey::from_pkcs8_der(der).map_err(invalid)?;
        Ok(KeyMaterial::Rsa(RsaKey::from_private(key)?))
    } else if oid == EC_PUBLIC_KEY_OID {
        let curve = ec_curve_of(info.algorithm.parameters_oid())?;
        debug!(%curve, "PKCS#8 container holds an EC key");
        let key = match curve {
            EcCurve::P256 => EcdsaKey::P256(EcKeyPair::from_secret(
                SecretKey::<NistP256>::from_pkcs8_der(der).map_err(invalid)?,
            )),
            EcCurve::P384 => EcdsaKey::P384(EcKeyPair::from_secret(
                SecretKey::<NistP384>::from_pkcs8_der(der).map_err(invalid)?,
            )),
            EcCurve::P521 => EcdsaKey::P521(EcKeyPair::from_secret(
                SecretKey::<NistP521>::from_pkcs8_der(der).map_err(invalid)?,
            )),
        };
        Ok(KeyMaterial::Ecdsa(key))
    } else if oid == ED25519_OID {
        debug!("PKCS#8 container holds an Ed25519 key");
        let key = SigningKey::from_pkcs8_der(der).map_err(invalid)?;
        Ok(KeyMaterial::Ed25519(Ed25519Key::from_private(key)))
    } else {
        Err(CryptoError::Format(format!(
            "Not an RSA / ECDSA / Ed25519 private key (algorithm {})",
            oid
        )))
    }
}

/// X.509 `SubjectPublicKeyInfo` holding an RSA, EC or Ed25519 key
pub fn parse_spki(der: &[u8]) -> Result<KeyMaterial> {
    let info = SubjectPublicKeyInfoRef::try_from(der)
        .map_err(|e| CryptoError::format("Invalid public key", e))?;
    let invalid = |e: pkcs8::spki::Error| CryptoError::format("Invalid public key", e);
    let oid = info.algorithm.oid;

    if oid == RSA_ENCRYPTION_OID {
        let key = RsaPublicKey::from_public_key_der(der).map_err(invalid)?;
        Ok(KeyMaterial::Rsa(RsaKey::from_public(key)))
    } else if oid == EC_PUBLIC_KEY_OID {
        let curve = ec_curve_of(info.algorithm.parameters_oid())?;
        // SPKI decoding checks the point is on the curve
        let key = match curve {
            EcCurve::P256 => EcdsaKey::P256(EcKeyPair::from_public(
                PublicKey::<NistP256>::from_public_key_der(der).map_err(invalid)?,
            )),
            EcCurve::P384 => EcdsaKey::P384(EcKeyPair::from_public(
                PublicKey::<NistP384>::from_public_key_der(der).map_err(invalid)?,
            )),
            EcCurve::P521 => EcdsaKey::P521(EcKeyPair::from_public(
                PublicKey::<NistP521>::from_public_key_der(der).map_err(invalid)?,
            )),
        };
        Ok(KeyMaterial::Ecdsa(key))
    } else if oid == ED25519_OID {
        let key = VerifyingKey::from_public_key_der(der).map_err(invalid)?;
        Ok(KeyMaterial::Ed25519(Ed25519Key::from_public(key)))
    } else {
        Err(CryptoError::Format(format!(
            "Not an RSA / ECDSA / Ed25519 public key (algorithm {})",
            oid
        )))
    }
}

pub fn encode_pkcs1_private(key: &RsaKey) -> Result<Zeroizing<Vec<u8>>> {
    let private = key.private().ok_or_else(missing_private)?;
    let doc = private
        .to_pkcs1_der()
        .map_err(|e| CryptoError::crypto("PKCS#1 encoding failed", e))?;
    Ok(Zeroizing::new(doc.as_bytes().to_vec()))
}

pub fn encode_pkcs1_public(key: &RsaKey) -> Result<Vec<u8>> {
    let doc = key
        .public()
        .to_pkcs1_der()
        .map_err(|e| CryptoError::crypto("PKCS#1 encoding failed", e))?;
    Ok(doc.as_bytes().to_vec())
}

fn sec1_der<C>(pair: &EcKeyPair<C>) -> Result<Zeroizing<Vec<u8>>>
where
    C: CurveArithmetic + AssociatedOid,
    AffinePoint<C>: FromEncodedPoint<C> + ToEncodedPoint<C>,
    FieldBytesSize<C>: ModulusSize,
{
    let secret = pair.secret().ok_or_else(missing_private)?;
    let scalar = Zeroizing::new(secret.to_bytes().to_vec());
    let point = pair.public().to_encoded_point(false);

    let key = sec1::EcPrivateKey {
        private_key: scalar.as_slice(),
        parameters: Some(EcParameters::NamedCurve(C::OID)),
        public_key: Some(point.as_bytes()),
    };
    key.to_der()
        .map(Zeroizing::new)
        .map_err(|e| CryptoError::crypto("SEC1 encoding failed", e))
}

/// SEC1 `ECPrivateKey` with named-curve parameters and the public point
pub fn encode_sec1_private(key: &EcdsaKey) -> Result<Zeroizing<Vec<u8>>> {
    match key {
        EcdsaKey::P256(pair) => sec1_der(pair),
        EcdsaKey::P384(pair) => sec1_der(pair),
        EcdsaKey::P521(pair) => sec1_der(pair),
    }
}

/// PKCS#8 `PrivateKeyInfo` for any algorithm
pub fn encode_pkcs8_private(key: &KeyMaterial) -> Result<Zeroizing<Vec<u8>>> {
    let doc = match key {
        KeyMaterial::Rsa(rsa) => rsa.private().ok_or_else(missing_private)?.to_pkcs8_der(),
        KeyMaterial::Ecdsa(EcdsaKey::P256(pair)) => {
            pair.secret().ok_or_else(missing_private)?.to_pkcs8_der()
        }
        KeyMaterial::Ecdsa(EcdsaKey::P384(pair)) => {
            pair.secret().ok_or_else(missing_private)?.to_pkcs8_der()
        }
        KeyMaterial::Ecdsa(EcdsaKey::P521(pair)) => {
            pair.secret().ok_or_else(missing_private)?.to_pkcs8_der()
        }
        KeyMaterial::Ed25519(ed) => ed.private().ok_or_else(missing_private)?.to_pkcs8_der(),
    }
    .map_err(|e| CryptoError::crypto("PKCS#8 encoding failed", e))?;

    Ok(Zeroizing::new(doc.as_bytes().to_vec()))
}

/// Encrypt a PKCS#8 `PrivateKeyInfo` under a passphrase (PBES2 with
/// PBKDF2-SHA256 and AES-256-CBC)
pub fn encrypt_pkcs8(der: &[u8], passphrase: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    let info = PrivateKeyInfo::try_from(der)
        .map_err(|e| CryptoError::format("Invalid PKCS#8 private key", e))?;

    let mut salt = [0u8; PBES2_SALT_LEN];
    let mut iv = [0u8; 16];
    OsRng.fill_bytes(&mut salt);
    OsRng.fill_bytes(&mut iv);

    let params = pbes2::Parameters::pbkdf2_sha256_aes256cbc(PBKDF2_ITERATIONS, &salt, &iv)
        .map_err(|e| CryptoError::crypto("Invalid PBES2 parameters", e))?;
    let doc = info
        .encrypt_with_params(params, passphrase)
        .map_err(|e| CryptoError::crypto("PKCS#8 encryption failed", e))?;

    Ok(Zeroizing::new(doc.as_bytes().to_vec()))
}

/// Decrypt an `EncryptedPrivateKeyInfo` and parse the key inside
pub fn parse_pkcs8_encrypted(der: &[u8], passphrase: &[u8]) -> Result<KeyMaterial> {
    let info = EncryptedPrivateKeyInfo::try_from(der)
        .map_err(|e| CryptoError::format("Invalid encrypted PKCS#8 key", e))?;
    debug!(oid = %info.encryption_algorithm.oid(), "decrypting PKCS#8 key");

    // A wrong passphrase can still yield valid CBC padding
    let wrong = || CryptoError::CryptoFailure("Wrong passphrase or corrupted key".into());
    let doc = info.decrypt(passphrase).map_err(|_| wrong())?;
    parse_pkcs8_private(doc.as_bytes()).map_err(|_| wrong())
}

/// X.509 `SubjectPublicKeyInfo` for any algorithm
pub fn encode_public_der(key: &KeyMaterial) -> Result<Vec<u8>> {
    let doc = match key {
        KeyMaterial::Rsa(rsa) => rsa.public().to_public_key_der(),
        KeyMaterial::Ecdsa(EcdsaKey::P256(pair)) => pair.public().to_public_key_der(),
        KeyMaterial::Ecdsa(EcdsaKey::P384(pair)) => pair.public().to_public_key_der(),
        KeyMaterial::Ecdsa(EcdsaKey::P521(pair)) => pair.public().to_public_key_der(),
        KeyMaterial::Ed25519(ed) => ed.public().to_public_key_der(),
    }
    .map_err(|e| CryptoError::crypto("Public key encoding failed", e))?;

    Ok(doc.as_bytes().to_vec())
}

/// Parse SPKI and require an EC key
pub fn parse_ec_spki(der: &[u8]) -> Result<KeyMaterial> {
    let key = parse_spki(der)?;
    key.expect_kind(KeyKind::Ecdsa)?;
    Ok(key)
}
