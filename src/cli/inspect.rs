//! Сведения о ключе

use std::path::Path;

use colored::Colorize;

use super::read_key;
use crate::error::Result;
use crate::keys::KeyMaterial;

/// Human-readable size: modulus bits, curve name or the Ed25519 field
pub fn describe_size(key: &KeyMaterial) -> String {
    match key {
        KeyMaterial::Rsa(rsa) => format!("{} бит", rsa.bits()),
        KeyMaterial::Ecdsa(ec) => ec.curve().to_string(),
        KeyMaterial::Ed25519(_) => "Curve25519".to_string(),
    }
}

pub fn run(path: &Path) -> Result<()> {
    let key = read_key(path)?;

    println!();
    println!("{}", path.display().to_string().cyan().bold());
    println!("{}", "─".repeat(60).dimmed());
    println!("  Алгоритм:        {}", key.kind());
    println!("  Размер:          {}", describe_size(&key));
    println!(
        "  Приватный ключ:  {}",
        if key.has_private() { "да".green() } else { "нет".yellow() }
    );
    println!("  Идентификатор:   {}", key.key_id()?);
    println!("{}", "─".repeat(60).dimmed());
    println!();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{fixtures, generate, generate_keypair, EcCurve, KeyAlgorithm};

    #[test]
    fn test_describe_size() {
        assert_eq!(describe_size(fixtures::rsa_2048()), "2048 бит");
        assert_eq!(
            describe_size(&generate(KeyAlgorithm::Ecdsa(EcCurve::P384)).unwrap()),
            "P-384"
        );
        assert_eq!(describe_size(&generate_keypair()), "Curve25519");
    }
}
