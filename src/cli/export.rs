//! Экспорт ключа в другой формат

use std::io::{self, Write};
use std::path::Path;

use zeroize::Zeroizing;

use super::{read_key, ExportFormat};
use crate::error::{CryptoError, Result};
use crate::format;
use crate::keys::KeyMaterial;

/// Encode `key` in the requested format. Private forms are used whenever
/// the key holds a private component and the format has one.
pub fn export_key(key: &KeyMaterial, target: ExportFormat, comment: &str) -> Result<Zeroizing<String>> {
    let private = key.has_private();

    match target {
        ExportFormat::Pkix => format::encode_public(key).map(Zeroizing::new),
        ExportFormat::Pkcs1 if private => format::encode_rsa_pkcs1(key),
        ExportFormat::Pkcs1 => format::encode_rsa_public_pkcs1(key).map(Zeroizing::new),
        ExportFormat::Pkcs8 => format::encode_pkcs8(key),
        ExportFormat::Sec1 if private => format::encode_ec_sec1(key),
        ExportFormat::Sec1 => format::encode_ec_public(key).map(Zeroizing::new),
        ExportFormat::Openssh if private => format::encode_openssh_private(key, comment),
        ExportFormat::Openssh => format::encode_openssh_public_pem(key).map(Zeroizing::new),
        ExportFormat::Authorized => format::encode_authorized_key(key, comment)
            .map(|line| Zeroizing::new(line + "\n")),
        ExportFormat::Jwk => format::to_jwk_json(key, None).map(|json| Zeroizing::new(format!("{}\n", *json))),
    }
}

/// Encrypted PKCS#8 is the only passphrase-protected output
pub fn export_encrypted(key: &KeyMaterial, target: ExportFormat, passphrase: &[u8]) -> Result<Zeroizing<String>> {
    if target != ExportFormat::Pkcs8 {
        return Err(CryptoError::Format(format!(
            "Шифрование паролем доступно только для pkcs8, не для {:?}",
            target
        )));
    }
    format::encode_pkcs8_encrypted(key, passphrase)
}

/// `passphrase` protects the output; it is only valid with `pkcs8`
pub fn run(
    path: &Path,
    target: ExportFormat,
    public_only: bool,
    comment: &str,
    passphrase: Option<&[u8]>,
) -> Result<()> {
    let mut key = read_key(path)?;
    if public_only {
        key = key.to_public();
    }

    let encoded = match passphrase {
        Some(passphrase) => export_encrypted(&key, target, passphrase)?,
        None => export_key(&key, target, comment)?,
    };
    let mut stdout = io::stdout().lock();
    stdout.write_all(encoded.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{fixtures, generate, generate_keypair, EcCurve, KeyAlgorithm};

    #[test]
    fn test_every_format_reloads() {
        let rsa = fixtures::rsa_2048();
        for target in [ExportFormat::Pkix, ExportFormat::Pkcs1, ExportFormat::Pkcs8, ExportFormat::Openssh] {
            let text = export_key(rsa, target, "").unwrap();
            assert_eq!(format::decode(text.as_bytes()).unwrap().kind(), rsa.kind(), "{:?}", target);
        }

        let ec = generate(KeyAlgorithm::Ecdsa(EcCurve::P256)).unwrap();
        for target in [ExportFormat::Sec1, ExportFormat::Pkcs8, ExportFormat::Authorized] {
            let text = export_key(&ec, target, "me").unwrap();
            let decoded = format::decode(text.trim_end().as_bytes()).unwrap();
            assert_eq!(decoded.to_public(), ec.to_public(), "{:?}", target);
        }

        let jwk = export_key(&ec, ExportFormat::Jwk, "").unwrap();
        assert_eq!(format::from_jwk_json(&jwk).unwrap(), ec);
    }

    #[test]
    fn test_public_forms_for_public_keys() {
        let public = generate(KeyAlgorithm::Ecdsa(EcCurve::P256)).unwrap().to_public();
        let text = export_key(&public, ExportFormat::Sec1, "").unwrap();

        assert!(text.starts_with("-----BEGIN EC PUBLIC KEY-----"));
    }

    #[test]
    fn test_format_not_available_for_algorithm() {
        let ed = generate_keypair();

        assert!(matches!(
            export_key(&ed, ExportFormat::Pkcs1, ""),
            Err(CryptoError::AlgorithmMismatch { .. })
        ));
        assert!(matches!(
            export_key(&ed, ExportFormat::Jwk, ""),
            Err(CryptoError::AlgorithmMismatch { .. })
        ));
        assert!(matches!(
            export_key(&ed.to_public(), ExportFormat::Pkcs8, ""),
            Err(CryptoError::MissingKeyComponent(_))
        ));
    }

    #[test]
    fn test_export_encrypted_pkcs8() {
        let rsa = fixtures::rsa_2048();
        let text = export_encrypted(rsa, ExportFormat::Pkcs8, b"export pass").unwrap();

        assert!(format::is_encrypted(text.as_bytes()));
        assert_eq!(&format::decode_with_passphrase(text.as_bytes(), b"export pass").unwrap(), rsa);
        assert!(matches!(
            export_encrypted(rsa, ExportFormat::Pkcs1, b"export pass"),
            Err(CryptoError::Format(_))
        ));
        assert!(matches!(
            export_encrypted(&rsa.to_public(), ExportFormat::Pkcs8, b"export pass"),
            Err(CryptoError::MissingKeyComponent(_))
        ));
    }
}
