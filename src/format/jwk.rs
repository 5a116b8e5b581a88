//! JSON Web Key mapping for RSA and EC keys
//!
//! Numeric members are base64url without padding. Ed25519 keys have no
//! mapping here.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::{Zeroize, Zeroizing};

use crate::error::{CryptoError, Result};
use crate::keys::{EcCurve, EcdsaKey, KeyKind, KeyMaterial, RsaKey};

pub const KTY_RSA: &str = "RSA";
pub const KTY_EC: &str = "EC";
pub const ALG_RSA: &str = "RS256";

/// The recognized members of a JWK object
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,

    /// Private exponent (RSA) or private scalar (EC)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dq: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qi: Option<String>,
}

impl Jwk {
    /// An empty key of type `kty`
    pub fn new(kty: &str) -> Self {
        Self {
            kty: kty.to_string(),
            kid: None,
            alg: None,
            crv: None,
            x: None,
            y: None,
            n: None,
            e: None,
            d: None,
            p: None,
            q: None,
            dp: None,
            dq: None,
            qi: None,
        }
    }

    pub fn is_private(&self) -> bool {
        self.d.is_some()
    }

    /// Drop every private member
    pub fn to_public(&self) -> Jwk {
        let mut public = Jwk::new(&self.kty);
        public.kid = self.kid.clone();
        public.alg = self.alg.clone();
        public.crv = self.crv.clone();
        public.x = self.x.clone();
        public.y = self.y.clone();
        public.n = self.n.clone();
        public.e = self.e.clone();
        public
    }
}

impl std::fmt::Debug for Jwk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Jwk")
            .field("kty", &self.kty)
            .field("kid", &self.kid)
            .field("alg", &self.alg)
            .field("crv", &self.crv)
            .field("private", &self.is_private().then_some("[REDACTED]"))
            .finish()
    }
}

impl Drop for Jwk {
    fn drop(&mut self) {
        for member in [&mut self.d, &mut self.p, &mut self.q, &mut self.dp, &mut self.dq, &mut self.qi] {
            member.zeroize();
        }
    }
}

fn b64(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

fn b64_uint(value: &BigUint) -> String {
    b64(&value.to_bytes_be())
}

fn b64_secret(value: &BigUint) -> String {
    b64(&Zeroizing::new(value.to_bytes_be()))
}

fn member<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| CryptoError::Format(format!("JWK is missing '{}'", name)))
}

fn decode_member(value: &Option<String>, name: &'static str) -> Result<Zeroizing<Vec<u8>>> {
    let encoded = member(value, name)?;
    URL_SAFE_NO_PAD
        .decode(encoded)
        .map(Zeroizing::new)
        .map_err(|e| CryptoError::Format(format!("JWK member '{}' is not base64url: {}", name, e)))
}

fn decode_uint(value: &Option<String>, name: &'static str) -> Result<BigUint> {
    Ok(BigUint::from_bytes_be(&decode_member(value, name)?))
}

/// Map a key to its JWK form. `kid` defaults to the key id.
pub fn to_jwk(key: &KeyMaterial, kid: Option<&str>) -> Result<Jwk> {
    let kid = match kid {
        Some(kid) => kid.to_string(),
        None => key.key_id()?,
    };

    let mut jwk = match key {
        KeyMaterial::Rsa(rsa) => rsa_to_jwk(rsa)?,
        KeyMaterial::Ecdsa(ec) => ec_to_jwk(ec),
        KeyMaterial::Ed25519(_) => return Err(CryptoError::mismatch("RSA or EC", KeyKind::Ed25519)),
    };
    jwk.kid = Some(kid);
    Ok(jwk)
}

fn rsa_to_jwk(rsa: &RsaKey) -> Result<Jwk> {
    let public = rsa.public();
    let mut jwk = Jwk::new(KTY_RSA);
    jwk.alg = Some(ALG_RSA.to_string());
    jwk.n = Some(b64_uint(public.n()));
    jwk.e = Some(b64_uint(public.e()));

    if let Some(private) = rsa.private() {
        let [p, q] = private.primes() else {
            return Err(CryptoError::CryptoFailure(
                "Multi-prime RSA keys have no JWK mapping".into(),
            ));
        };
        let precomputed = || CryptoError::CryptoFailure("RSA CRT values unavailable".into());
        let dp = private.dp().ok_or_else(precomputed)?;
        let dq = private.dq().ok_or_else(precomputed)?;
        let qi = private.crt_coefficient().ok_or_else(precomputed)?;

        jwk.d = Some(b64_secret(private.d()));
        jwk.p = Some(b64_secret(p));
        jwk.q = Some(b64_secret(q));
        jwk.dp = Some(b64_secret(dp));
        jwk.dq = Some(b64_secret(dq));
        jwk.qi = Some(b64_secret(&qi));
    }
    Ok(jwk)
}

fn ec_to_jwk(ec: &EcdsaKey) -> Jwk {
    let curve = ec.curve();
    let point = ec.public_point();
    let (x, y) = point[1..].split_at(curve.field_size());

    let mut jwk = Jwk::new(KTY_EC);
    jwk.alg = Some(curve.jwa().to_string());
    jwk.crv = Some(curve.name().to_string());
    jwk.x = Some(b64(x));
    jwk.y = Some(b64(y));
    jwk.d = ec.secret_scalar().map(|d| b64(&d));
    jwk
}

/// Build a key from its JWK form
pub fn from_jwk(jwk: &Jwk) -> Result<KeyMaterial> {
    debug!(kty = %jwk.kty, private = jwk.is_private(), "importing JWK");

    match jwk.kty.as_str() {
        KTY_RSA => rsa_from_jwk(jwk),
        KTY_EC => ec_from_jwk(jwk),
        "OKP" => Err(CryptoError::mismatch("RSA or EC", KeyKind::Ed25519)),
        other => Err(CryptoError::Format(format!("Unsupported JWK key type '{}'", other))),
    }
}

fn rsa_from_jwk(jwk: &Jwk) -> Result<KeyMaterial> {
    let n = decode_uint(&jwk.n, "n")?;
    let e = decode_uint(&jwk.e, "e")?;

    if !jwk.is_private() {
        let public = RsaPublicKey::new(n, e).map_err(|e| CryptoError::format("Invalid RSA JWK", e))?;
        return Ok(KeyMaterial::Rsa(RsaKey::from_public(public)));
    }

    let d = decode_uint(&jwk.d, "d")?;
    let p = decode_uint(&jwk.p, "p")?;
    let q = decode_uint(&jwk.q, "q")?;

    let private = RsaPrivateKey::from_components(n, e, d, vec![p, q])
        .map_err(|e| CryptoError::format("Invalid RSA JWK", e))?;
    private
        .validate()
        .map_err(|e| CryptoError::format("Inconsistent RSA JWK", e))?;
    Ok(KeyMaterial::Rsa(RsaKey::from_private(private)?))
}

fn ec_from_jwk(jwk: &Jwk) -> Result<KeyMaterial> {
    let curve: EcCurve = member(&jwk.crv, "crv")?.parse()?;
    let size = curve.field_size();

    let x = decode_member(&jwk.x, "x")?;
    let y = decode_member(&jwk.y, "y")?;
    if x.len() != size || y.len() != size {
        return Err(CryptoError::Format(format!(
            "JWK coordinates must be {} bytes for {}",
            size, curve
        )));
    }

    let mut point = Vec::with_capacity(1 + 2 * size);
    point.push(0x04);
    point.extend_from_slice(&x);
    point.extend_from_slice(&y);

    let d = match jwk.d {
        Some(_) => {
            let d = decode_member(&jwk.d, "d")?;
            if d.len() != size {
                return Err(CryptoError::Format(format!(
                    "JWK private scalar must be {} bytes for {}",
                    size, curve
                )));
            }
            Some(d)
        }
        None => None,
    };

    let key = EcdsaKey::from_parts(curve, &point, d.as_ref().map(|d| d.as_slice()))?;
    Ok(KeyMaterial::Ecdsa(key))
}

pub fn to_jwk_json(key: &KeyMaterial, kid: Option<&str>) -> Result<Zeroizing<String>> {
    let jwk = to_jwk(key, kid)?;
    Ok(Zeroizing::new(serde_json::to_string_pretty(&jwk)?))
}

pub fn from_jwk_json(json: &str) -> Result<KeyMaterial> {
    let jwk: Jwk = serde_json::from_str(json)?;
    from_jwk(&jwk)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{fixtures, generate, generate_keypair, KeyAlgorithm};

    #[test]
    fn test_rsa_private_roundtrip() {
        let key = fixtures::rsa_2048();
        let jwk = to_jwk(key, None).unwrap();

        assert_eq!(jwk.kty, "RSA");
        assert_eq!(jwk.alg.as_deref(), Some("RS256"));
        assert_eq!(jwk.kid, Some(key.key_id().unwrap()));
        assert_eq!(jwk.e.as_deref(), Some("AQAB"));
        assert!(jwk.dp.is_some() && jwk.dq.is_some() && jwk.qi.is_some());

        assert_eq!(&from_jwk(&jwk).unwrap(), key);
    }

    #[test]
    fn test_rsa_public_roundtrip() {
        let key = fixtures::rsa_2048().to_public();
        let jwk = to_jwk(&key, Some("mine")).unwrap();

        assert_eq!(jwk.kid.as_deref(), Some("mine"));
        assert!(!jwk.is_private());
        assert_eq!(from_jwk(&jwk).unwrap(), key);
    }

    #[test]
    fn test_rsa_private_requires_primes() {
        let mut jwk = to_jwk(fixtures::rsa_2048(), None).unwrap();
        jwk.p = None;

        assert!(matches!(from_jwk(&jwk), Err(CryptoError::Format(_))));
    }

    #[test]
    fn test_ec_roundtrip_every_curve() {
        for curve in [EcCurve::P256, EcCurve::P384, EcCurve::P521] {
            let key = generate(KeyAlgorithm::Ecdsa(curve)).unwrap();
            let jwk = to_jwk(&key, None).unwrap();

            assert_eq!(jwk.crv.as_deref(), Some(curve.name()));
            assert_eq!(jwk.alg.as_deref(), Some(curve.jwa()));
            assert_eq!(from_jwk(&jwk).unwrap(), key);
            assert_eq!(from_jwk(&jwk.to_public()).unwrap(), key.to_public());
        }
    }

    #[test]
    fn test_ec_private_must_match_point() {
        let a = to_jwk(&generate(KeyAlgorithm::Ecdsa(EcCurve::P256)).unwrap(), None).unwrap();
        let b = to_jwk(&generate(KeyAlgorithm::Ecdsa(EcCurve::P256)).unwrap(), None).unwrap();

        let mut mixed = a.clone();
        mixed.d = b.d.clone();
        assert!(matches!(from_jwk(&mixed), Err(CryptoError::Format(_))));
    }

    #[test]
    fn test_json_roundtrip_omits_absent_members() {
        let key = generate(KeyAlgorithm::Ecdsa(EcCurve::P256)).unwrap().to_public();
        let json = to_jwk_json(&key, Some("k1")).unwrap();

        assert!(json.contains("\"kty\": \"EC\""));
        assert!(!json.contains("\"d\""));
        assert!(!json.contains("\"n\""));
        assert_eq!(from_jwk_json(&json).unwrap(), key);
    }

    #[test]
    fn test_ed25519_has_no_mapping() {
        assert!(matches!(
            to_jwk(&generate_keypair(), None),
            Err(CryptoError::AlgorithmMismatch { .. })
        ));
    }

    #[test]
    fn test_unknown_kty() {
        assert!(matches!(
            from_jwk_json(r#"{"kty":"oct","k":"AAAA"}"#),
            Err(CryptoError::Format(_))
        ));
    }

    #[test]
    fn test_debug_redacts_private() {
        let jwk = to_jwk(fixtures::rsa_2048(), None).unwrap();
        let printed = format!("{:?}", jwk);

        assert!(printed.contains("[REDACTED]"));
        assert!(!printed.contains(jwk.d.as_deref().unwrap()));
    }
}
