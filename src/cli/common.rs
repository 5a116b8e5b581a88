//! Шифрование общим ключом (AES-OFB)
//!
//! The key file holds the key as one line of hex.

use std::fs;
use std::io;
use std::path::Path;

use colored::Colorize;
use tracing::info;
use zeroize::Zeroizing;

use super::write_private;
use crate::crypto::CommonKeyCipher;
use crate::error::{CryptoError, Result};

/// Load a hex key file
pub fn read_common_key(path: &Path) -> Result<CommonKeyCipher> {
    let text = Zeroizing::new(fs::read_to_string(path)?);
    let key = Zeroizing::new(
        hex::decode(text.trim()).map_err(|e| CryptoError::format("Key file is not valid hex", e))?,
    );
    CommonKeyCipher::new(&key)
}

/// Generate a random key of `bits` and write it to `out` as hex
pub fn keygen(out: &Path, bits: usize, force: bool) -> Result<()> {
    if !force && out.exists() {
        return Err(CryptoError::Io(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} уже существует (используйте --force)", out.display()),
        )));
    }

    let key = CommonKeyCipher::generate_key(bits / 8)?;
    let encoded = Zeroizing::new(format!("{}\n", hex::encode(key.as_slice())));
    write_private(out, &encoded)?;

    info!(bits, path = %out.display(), "common key written");
    println!("{} Общий ключ AES-{}: {}", "✓".green(), bits, out.display());
    Ok(())
}

pub fn encrypt(key_path: &Path, message: &str) -> Result<()> {
    let cipher = read_common_key(key_path)?;
    println!("{}", cipher.encrypt_base64(message.as_bytes())?);
    Ok(())
}

pub fn decrypt(key_path: &Path, ciphertext: &str) -> Result<()> {
    let cipher = read_common_key(key_path)?;
    let plaintext = cipher.decrypt_base64(ciphertext)?.into_string()?;
    println!("{}", plaintext.as_str());
    Ok(())
}
