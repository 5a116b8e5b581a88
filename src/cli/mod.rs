//! Реализация CLI команд
//!
//! All file access and terminal prompts live here. The library itself only
//! sees bytes.

pub mod common;
pub mod crypt;
pub mod export;
pub mod generate;
pub mod inspect;

use std::env;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use clap::ValueEnum;
use colored::Colorize;
use zeroize::Zeroizing;

use crate::config::PASSPHRASE_ENV;
use crate::error::Result;
use crate::format;
use crate::keys::KeyMaterial;

/// Minimum passphrase length for new encrypted keys
pub const MIN_PASSPHRASE_LEN: usize = 8;

/// Key algorithm accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AlgorithmArg {
    Rsa,
    Ecdsa,
    Ed25519,
}

/// Output format for `export`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    /// PKIX SubjectPublicKeyInfo (`PUBLIC KEY`)
    Pkix,
    /// PKCS#1 (`RSA PRIVATE KEY` / `RSA PUBLIC KEY`)
    Pkcs1,
    /// PKCS#8 (`PRIVATE KEY`)
    Pkcs8,
    /// SEC1 (`EC PRIVATE KEY`), or PKIX under `EC PUBLIC KEY` for public keys
    Sec1,
    /// `openssh-key-v1` container, or the SSH blob for public keys
    Openssh,
    /// `authorized_keys` line
    Authorized,
    /// JSON Web Key
    Jwk,
}

fn passphrase_from_env() -> Option<Zeroizing<String>> {
    env::var(PASSPHRASE_ENV)
        .ok()
        .filter(|p| !p.is_empty())
        .map(Zeroizing::new)
}

/// Запросить новый пароль для шифрования ключа
pub fn prompt_new_passphrase() -> Result<Zeroizing<String>> {
    if let Some(passphrase) = passphrase_from_env() {
        return Ok(passphrase);
    }

    println!("{}", "Защита ключа паролем".cyan().bold());
    println!("Минимальная длина: {} символов\n", MIN_PASSPHRASE_LEN);

    loop {
        let passphrase = Zeroizing::new(rpassword::prompt_password("Введите пароль: ")?);

        if passphrase.chars().count() < MIN_PASSPHRASE_LEN {
            println!(
                "{} Пароль должен содержать минимум {} символов",
                "Ошибка:".red(),
                MIN_PASSPHRASE_LEN
            );
            continue;
        }

        let confirm = Zeroizing::new(rpassword::prompt_password("Подтвердите пароль: ")?);

        if *passphrase != *confirm {
            println!("{} Пароли не совпадают", "Ошибка:".red());
            continue;
        }

        return Ok(passphrase);
    }
}

/// Запросить пароль существующего ключа
pub fn prompt_passphrase(path: &Path) -> Result<Zeroizing<String>> {
    if let Some(passphrase) = passphrase_from_env() {
        return Ok(passphrase);
    }
    let prompt = format!("Пароль для {}: ", path.display());
    Ok(Zeroizing::new(rpassword::prompt_password(prompt)?))
}

/// Decode key file contents, decrypting with `passphrase` when the file is
/// an `ENCRYPTED PRIVATE KEY`
pub fn read_key_with(path: &Path, passphrase: Option<&[u8]>) -> Result<KeyMaterial> {
    let data = Zeroizing::new(fs::read(path)?);
    match passphrase {
        Some(passphrase) => format::decode_with_passphrase(data.as_slice(), passphrase),
        None => format::decode(data.as_slice()),
    }
}

/// Read and decode a key file, asking for the passphrase if it is encrypted
pub fn read_key(path: &Path) -> Result<KeyMaterial> {
    let data = Zeroizing::new(fs::read(path)?);
    if format::is_encrypted(data.as_slice()) {
        let passphrase = prompt_passphrase(path)?;
        return format::decode_with_passphrase(data.as_slice(), passphrase.as_bytes());
    }
    format::decode(data.as_slice())
}

/// Write a private key file, readable by the owner only
pub fn write_private(path: &Path, contents: &str) -> Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);

    // Created 0600 on Unix, never briefly world-readable
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;

    // `mode` only applies on creation; tighten files being overwritten
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }

    file.write_all(contents.as_bytes())?;
    file.sync_all()?;
    Ok(())
}
