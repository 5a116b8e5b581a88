//! OpenSSH key formats
//!
//! - `openssh-key-v1` private key container (unencrypted only)
//! - SSH public key blob
//! - `authorized_keys` line: `<algorithm> <base64 blob> [comment]`
//!
//! Container layout:
//! ```text
//! "openssh-key-v1\0"
//! string ciphername ("none")   string kdfname ("none")   string kdfoptions ("")
//! uint32 number of keys (1)
//! string public key blob
//! string private block:
//!     uint32 check  uint32 check
//!     string algorithm  <algorithm specific fields>  string comment
//!     padding 1, 2, 3, ... up to a multiple of 8
//! ```

use base64::{engine::general_purpose::STANDARD, Engine as _};
use ed25519_dalek::{VerifyingKey, KEYPAIR_LENGTH, PUBLIC_KEY_LENGTH, SECRET_KEY_LENGTH};
use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};
use tracing::debug;
use zeroize::Zeroizing;

use super::sshbuf::{SshReader, SshWriter};
use crate::error::{CryptoError, Result};
use crate::keys::{EcCurve, EcdsaKey, Ed25519Key, KeyMaterial, RsaKey};

/// Container magic, including the trailing NUL
pub const MAGIC: &[u8] = b"openssh-key-v1\0";

pub const SSH_ED25519: &str = "ssh-ed25519";
pub const SSH_RSA: &str = "ssh-rsa";

const NONE: &str = "none";
const BLOCK_SIZE: usize = 8;

/// A parsed private key container
#[derive(Debug, Clone, PartialEq)]
pub struct OpenSshPrivateKey {
    pub key: KeyMaterial,
    pub comment: String,
    /// The repeated check integer. Only a consistency marker for
    /// unencrypted containers.
    pub check: u32,
}

/// SSH algorithm name for a key
pub fn algorithm_name(key: &KeyMaterial) -> &'static str {
    match key {
        KeyMaterial::Rsa(_) => SSH_RSA,
        KeyMaterial::Ecdsa(ec) => ecdsa_algorithm(ec.curve()),
        KeyMaterial::Ed25519(_) => SSH_ED25519,
    }
}

fn ecdsa_algorithm(curve: EcCurve) -> &'static str {
    match curve {
        EcCurve::P256 => "ecdsa-sha2-nistp256",
        EcCurve::P384 => "ecdsa-sha2-nistp384",
        EcCurve::P521 => "ecdsa-sha2-nistp521",
    }
}

fn ecdsa_curve_for(algorithm: &str) -> Option<EcCurve> {
    algorithm
        .strip_prefix("ecdsa-sha2-")
        .and_then(EcCurve::from_ssh_id)
}

/// Marshal a private key into the container with a fresh check integer
pub fn marshal(key: &KeyMaterial, comment: &str) -> Result<Zeroizing<Vec<u8>>> {
    // Consistency marker only, never key material
    let check = SmallRng::from_entropy().next_u32();
    marshal_with_check(key, comment, check)
}

/// Marshal a private key into the container using the given check integer
pub fn marshal_with_check(key: &KeyMaterial, comment: &str, check: u32) -> Result<Zeroizing<Vec<u8>>> {
    let public_blob = public_blob(key)?;

    let mut block = SshWriter::new();
    block.write_u32(check);
    block.write_u32(check);
    write_private_fields(&mut block, key)?;
    block.write_str(comment);

    let pad = (BLOCK_SIZE - block.len() % BLOCK_SIZE) % BLOCK_SIZE;
    for i in 1..=pad {
        block.write_u8(i as u8);
    }
    let block = Zeroizing::new(block.into_inner());

    let mut out = SshWriter::new();
    out.write_raw(MAGIC);
    out.write_str(NONE);
    out.write_str(NONE);
    out.write_string(&[]);
    out.write_u32(1);
    out.write_string(&public_blob);
    out.write_string(&block);

    debug!(algorithm = algorithm_name(key), "marshaled OpenSSH private key");
    Ok(Zeroizing::new(out.into_inner()))
}

fn write_private_fields(w: &mut SshWriter, key: &KeyMaterial) -> Result<()> {
    let missing = || CryptoError::MissingKeyComponent("private");

    match key {
        KeyMaterial::Ed25519(ed) => {
            let keypair = ed.keypair_bytes().ok_or_else(missing)?;
            w.write_str(SSH_ED25519);
            w.write_string(&ed.public_bytes());
            w.write_string(&keypair[..]);
        }
        KeyMaterial::Rsa(rsa) => {
            let private = rsa.private().ok_or_else(missing)?;
            let [p, q] = private.primes() else {
                return Err(CryptoError::CryptoFailure(
                    "Multi-prime RSA keys cannot be stored in OpenSSH format".into(),
                ));
            };
            let iqmp = private
                .crt_coefficient()
                .ok_or_else(|| CryptoError::CryptoFailure("RSA CRT coefficient unavailable".into()))?;

            w.write_str(SSH_RSA);
            w.write_mpint(&private.n().to_bytes_be());
            w.write_mpint(&private.e().to_bytes_be());
            w.write_mpint(&Zeroizing::new(private.d().to_bytes_be()));
            w.write_mpint(&Zeroizing::new(iqmp.to_bytes_be()));
            w.write_mpint(&Zeroizing::new(p.to_bytes_be()));
            w.write_mpint(&Zeroizing::new(q.to_bytes_be()));
        }
        KeyMaterial::Ecdsa(ec) => {
            let scalar = ec.secret_scalar().ok_or_else(missing)?;
            w.write_str(ecdsa_algorithm(ec.curve()));
            w.write_str(ec.curve().ssh_id());
            w.write_string(&ec.public_point());
            w.write_mpint(&scalar);
        }
    }
    Ok(())
}

/// Parse an `openssh-key-v1` container
pub fn parse(data: &[u8]) -> Result<OpenSshPrivateKey> {
    let body = data
        .strip_prefix(MAGIC)
        .ok_or_else(|| CryptoError::Format("Missing openssh-key-v1 magic".into()))?;
    let mut r = SshReader::new(body);

    let cipher = r.read_str()?;
    let kdf = r.read_str()?;
    let _kdf_options = r.read_string()?;
    if cipher != NONE || kdf != NONE {
        return Err(CryptoError::Format(format!(
            "Encrypted OpenSSH keys are not supported (cipher '{}', kdf '{}')",
            cipher, kdf
        )));
    }

    let count = r.read_u32()?;
    if count != 1 {
        return Err(CryptoError::Format(format!(
            "Expected exactly one key in container, found {}",
            count
        )));
    }

    let public = r.read_string()?;
    let block = r.read_string()?;
    r.finish()?;

    if block.len() % BLOCK_SIZE != 0 {
        return Err(CryptoError::Format(
            "Private key block is not padded to the block size".into(),
        ));
    }

    let mut b = SshReader::new(block);
    let check = b.read_u32()?;
    if b.read_u32()? != check {
        return Err(CryptoError::Format("OpenSSH check integers differ".into()));
    }

    let key = read_private_fields(&mut b)?;
    let comment = b.read_str()?.to_string();

    let padding = b.remaining();
    if padding.len() >= BLOCK_SIZE || padding.iter().enumerate().any(|(i, &p)| p as usize != i + 1) {
        return Err(CryptoError::Format("Invalid private key block padding".into()));
    }

    if public_blob(&key)? != public {
        return Err(CryptoError::Format(
            "Public key blob does not match the private key".into(),
        ));
    }

    debug!(kind = %key.kind(), "parsed OpenSSH private key");
    Ok(OpenSshPrivateKey {
        key,
        comment,
        check,
    })
}

fn read_private_fields(r: &mut SshReader<'_>) -> Result<KeyMaterial> {
    let algorithm = r.read_str()?;

    match algorithm {
        SSH_ED25519 => {
            let public = r.read_string()?;
            let keypair = r.read_string()?;
            if public.len() != PUBLIC_KEY_LENGTH || keypair.len() != KEYPAIR_LENGTH {
                return Err(CryptoError::Format("Invalid Ed25519 key lengths".into()));
            }

            let mut seed = Zeroizing::new([0u8; SECRET_KEY_LENGTH]);
            seed.copy_from_slice(&keypair[..SECRET_KEY_LENGTH]);
            let key = Ed25519Key::from_seed(&seed);

            if key.public_bytes()[..] != keypair[SECRET_KEY_LENGTH..] || key.public_bytes()[..] != *public {
                return Err(CryptoError::Format(
                    "Ed25519 public key does not match the seed".into(),
                ));
            }
            Ok(KeyMaterial::Ed25519(key))
        }
        SSH_RSA => {
            let n = BigUint::from_bytes_be(r.read_mpint()?);
            let e = BigUint::from_bytes_be(r.read_mpint()?);
            let d = BigUint::from_bytes_be(r.read_mpint()?);
            let _iqmp = r.read_mpint()?;
            let p = BigUint::from_bytes_be(r.read_mpint()?);
            let q = BigUint::from_bytes_be(r.read_mpint()?);

            let private = RsaPrivateKey::from_components(n, e, d, vec![p, q])
                .map_err(|e| CryptoError::format("Invalid RSA key in OpenSSH container", e))?;
            Ok(KeyMaterial::Rsa(RsaKey::from_private(private)?))
        }
        other => {
            let curve = ecdsa_curve_for(other)
                .ok_or_else(|| CryptoError::Format(format!("Unsupported OpenSSH key type '{}'", other)))?;
            let point = read_ecdsa_curve_and_point(r, curve)?;
            let scalar = r.read_mpint()?;
            if scalar.len() > curve.field_size() {
                return Err(CryptoError::Format("EC scalar too long".into()));
            }
            let mut padded = Zeroizing::new(vec![0u8; curve.field_size()]);
            padded[curve.field_size() - scalar.len()..].copy_from_slice(scalar);

            Ok(KeyMaterial::Ecdsa(EcdsaKey::from_parts(curve, point, Some(padded.as_slice()))?))
        }
    }
}

fn read_ecdsa_curve_and_point<'a>(r: &mut SshReader<'a>, curve: EcCurve) -> Result<&'a [u8]> {
    let id = r.read_str()?;
    if id != curve.ssh_id() {
        return Err(CryptoError::Format(format!(
            "Curve '{}' does not match key type {}",
            id,
            ecdsa_algorithm(curve)
        )));
    }
    r.read_string()
}

/// SSH wire-format public key blob
pub fn public_blob(key: &KeyMaterial) -> Result<Vec<u8>> {
    let mut w = SshWriter::new();
    w.write_str(algorithm_name(key));

    match key {
        KeyMaterial::Ed25519(ed) => w.write_string(&ed.public_bytes()),
        KeyMaterial::Rsa(rsa) => {
            w.write_mpint(&rsa.public().e().to_bytes_be());
            w.write_mpint(&rsa.public().n().to_bytes_be());
        }
        KeyMaterial::Ecdsa(ec) => {
            w.write_str(ec.curve().ssh_id());
            w.write_string(&ec.public_point());
        }
    }
    Ok(w.into_inner())
}

/// Parse an SSH wire-format public key blob
pub fn parse_public_blob(blob: &[u8]) -> Result<KeyMaterial> {
    let mut r = SshReader::new(blob);
    let algorithm = r.read_str()?;

    let key = match algorithm {
        SSH_ED25519 => {
            let bytes: [u8; PUBLIC_KEY_LENGTH] = r
                .read_string()?
                .try_into()
                .map_err(|_| CryptoError::Format("Invalid Ed25519 public key length".into()))?;
            let public = VerifyingKey::from_bytes(&bytes).map_err(|_| CryptoError::InvalidCurvePoint)?;
            KeyMaterial::Ed25519(Ed25519Key::from_public(public))
        }
        SSH_RSA => {
            let e = BigUint::from_bytes_be(r.read_mpint()?);
            let n = BigUint::from_bytes_be(r.read_mpint()?);
            let public = RsaPublicKey::new(n, e)
                .map_err(|e| CryptoError::format("Invalid RSA public key", e))?;
            KeyMaterial::Rsa(RsaKey::from_public(public))
        }
        other => {
            let curve = ecdsa_curve_for(other)
                .ok_or_else(|| CryptoError::Format(format!("Unsupported SSH key type '{}'", other)))?;
            let point = read_ecdsa_curve_and_point(&mut r, curve)?;
            KeyMaterial::Ecdsa(EcdsaKey::from_parts(curve, point, None)?)
        }
    };

    r.finish()?;
    Ok(key)
}

/// Cheap check for whether `body` starts like an SSH public key blob
pub fn looks_like_public_blob(body: &[u8]) -> bool {
    let mut r = SshReader::new(body);
    matches!(r.read_str(), Ok(name) if name.starts_with("ssh-") || name.starts_with("ecdsa-"))
}

/// Format a public key as an `authorized_keys` line
pub fn encode_authorized_key(key: &KeyMaterial, comment: &str) -> Result<String> {
    let encoded = STANDARD.encode(public_blob(key)?);
    let line = format!("{} {} {}", algorithm_name(key), encoded, comment);
    Ok(line.trim_end().to_string())
}

/// Parse an `authorized_keys` line. Returns the key and its comment.
pub fn parse_authorized_key(line: &str) -> Result<(KeyMaterial, String)> {
    let mut parts = line.trim().splitn(3, char::is_whitespace);
    let algorithm = parts
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CryptoError::Format("Empty authorized key line".into()))?;
    let encoded = parts
        .next()
        .ok_or_else(|| CryptoError::Format("Authorized key line has no key data".into()))?;
    let comment = parts.next().unwrap_or("").trim().to_string();

    let blob = STANDARD
        .decode(encoded.trim())
        .map_err(|e| CryptoError::format("Invalid authorized key data", e))?;
    let key = parse_public_blob(&blob)?;

    if algorithm_name(&key) != algorithm {
        return Err(CryptoError::mismatch(algorithm, algorithm_name(&key)));
    }
    Ok((key, comment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{fixtures, generate, generate_keypair, KeyAlgorithm};

    #[test]
    fn test_ed25519_container_roundtrip() {
        let key = generate_keypair();
        let bytes = marshal(&key, "user@host").unwrap();
        let parsed = parse(&bytes).unwrap();

        assert_eq!(parsed.key, key);
        assert_eq!(parsed.comment, "user@host");
    }

    #[test]
    fn test_byte_exact_remarshal() {
        for key in [
            generate_keypair(),
            fixtures::rsa_2048().clone(),
            generate(KeyAlgorithm::Ecdsa(EcCurve::P384)).unwrap(),
        ] {
            let original = marshal(&key, "comment").unwrap();
            let parsed = parse(&original).unwrap();
            let again = marshal_with_check(&parsed.key, &parsed.comment, parsed.check).unwrap();

            assert_eq!(*again, *original);
        }
    }

    #[test]
    fn test_ed25519_container_layout() {
        let key = KeyMaterial::Ed25519(Ed25519Key::from_seed(&[9u8; 32]));
        let bytes = marshal_with_check(&key, "", 0x01020304).unwrap();

        assert!(bytes.starts_with(MAGIC));
        let mut r = SshReader::new(&bytes[MAGIC.len()..]);
        assert_eq!(r.read_str().unwrap(), "none");
        assert_eq!(r.read_str().unwrap(), "none");
        assert!(r.read_string().unwrap().is_empty());
        assert_eq!(r.read_u32().unwrap(), 1);

        let public = r.read_string().unwrap();
        assert_eq!(&public[..15], &[0, 0, 0, 0x0b, b's', b's', b'h', b'-', b'e', b'd', b'2', b'5', b'5', b'1', b'9']);
        assert_eq!(&public[15..19], &[0, 0, 0, 0x20]);

        let block = r.read_string().unwrap();
        assert_eq!(block.len() % 8, 0);
        assert_eq!(&block[..8], &[1, 2, 3, 4, 1, 2, 3, 4]);
        // 8 check + 15 name + 36 public + 68 private + 4 empty comment = 131, pad 5
        assert_eq!(&block[131..], &[1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_interop_with_ssh_key_crate() {
        let key = generate_keypair();
        let bytes = marshal(&key, "interop").unwrap();

        let parsed = ssh_key::PrivateKey::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.comment(), "interop");
        assert_eq!(
            parsed.public_key().key_data().ed25519().unwrap().0,
            key.as_ed25519().unwrap().public_bytes()
        );
    }

    #[test]
    fn test_ssh_key_rsa_container_remarshals_exactly() {
        let private = fixtures::rsa_2048().as_rsa().unwrap().private().unwrap();
        let keypair = ssh_key::private::RsaKeypair::try_from(private).unwrap();
        let foreign = ssh_key::PrivateKey::new(ssh_key::private::KeypairData::from(keypair), "rsa@interop")
            .unwrap()
            .to_bytes()
            .unwrap();

        let parsed = parse(&foreign).unwrap();
        assert_eq!(&parsed.key, fixtures::rsa_2048());
        assert_eq!(parsed.comment, "rsa@interop");

        let again = marshal_with_check(&parsed.key, &parsed.comment, parsed.check).unwrap();
        assert_eq!(*again, *foreign);
    }

    #[test]
    fn test_ssh_key_ecdsa_container_remarshals_exactly() {
        use ssh_key::{Algorithm, EcdsaCurve as SshCurve};

        for (curve, ours) in [(SshCurve::NistP256, EcCurve::P256), (SshCurve::NistP384, EcCurve::P384)] {
            // ssh-key writes the scalar at full field width, which equals the
            // minimal mpint only when the top byte is 0x01..=0x7f
            let (foreign, parsed) = loop {
                let mut key = ssh_key::PrivateKey::random(&mut rand::rngs::OsRng, Algorithm::Ecdsa { curve })
                    .unwrap();
                key.set_comment("ec@interop");
                let bytes = key.to_bytes().unwrap();
                let parsed = parse(&bytes).unwrap();
                let scalar = parsed.key.as_ecdsa().unwrap().secret_scalar().unwrap();
                if (0x01..0x80).contains(&scalar[0]) {
                    break (bytes, parsed);
                }
            };

            assert_eq!(parsed.key.as_ecdsa().unwrap().curve(), ours);
            assert_eq!(parsed.comment, "ec@interop");

            let again = marshal_with_check(&parsed.key, &parsed.comment, parsed.check).unwrap();
            assert_eq!(*again, *foreign, "{:?}", ours);
        }
    }

    #[test]
    fn test_parse_rejects_mismatched_check() {
        let key = generate_keypair();
        let mut bytes = marshal_with_check(&key, "", 0xAAAA_AAAA).unwrap().to_vec();

        // First byte of the second check integer sits right after the first
        let pos = bytes.windows(4).position(|w| w == [0xAA; 4]).unwrap() + 4;
        bytes[pos] ^= 0x01;

        assert!(matches!(parse(&bytes), Err(CryptoError::Format(_))));
    }

    #[test]
    fn test_parse_rejects_encrypted_container() {
        let mut w = SshWriter::new();
        w.write_raw(MAGIC);
        w.write_str("aes256-ctr");
        w.write_str("bcrypt");
        w.write_string(&[]);
        w.write_u32(1);

        assert!(matches!(parse(&w.into_inner()), Err(CryptoError::Format(_))));
    }

    #[test]
    fn test_parse_rejects_truncated_container() {
        let bytes = marshal(&generate_keypair(), "").unwrap();
        assert!(matches!(
            parse(&bytes[..bytes.len() - 10]),
            Err(CryptoError::Format(_))
        ));
    }

    #[test]
    fn test_authorized_key_roundtrip() {
        for key in [
            generate_keypair().to_public(),
            fixtures::rsa_2048().to_public(),
            generate(KeyAlgorithm::Ecdsa(EcCurve::P256)).unwrap().to_public(),
        ] {
            let line = encode_authorized_key(&key, "me@example").unwrap();
            let (parsed, comment) = parse_authorized_key(&line).unwrap();

            assert_eq!(parsed, key);
            assert_eq!(comment, "me@example");
            assert!(ssh_key::PublicKey::from_openssh(&line).is_ok());
        }
    }

    #[test]
    fn test_authorized_key_without_comment() {
        let key = generate_keypair().to_public();
        let line = encode_authorized_key(&key, "").unwrap();

        assert!(line.starts_with("ssh-ed25519 "));
        assert!(!line.ends_with(' '));
        assert_eq!(parse_authorized_key(&line).unwrap().1, "");
    }

    #[test]
    fn test_authorized_key_algorithm_mismatch() {
        let key = generate_keypair().to_public();
        let line = encode_authorized_key(&key, "").unwrap().replacen("ssh-ed25519", "ssh-rsa", 1);

        assert!(matches!(
            parse_authorized_key(&line),
            Err(CryptoError::AlgorithmMismatch { .. })
        ));
    }
}
