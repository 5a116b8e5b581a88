//! Шифрование и расшифровка сообщений

use std::path::Path;

use super::read_key;
use crate::crypto::PublicKeyCipher;
use crate::error::Result;

/// Encrypt `message` to the key in `key_path` and print base64
pub fn encrypt(key_path: &Path, message: &str) -> Result<()> {
    let cipher = PublicKeyCipher::new(read_key(key_path)?);
    println!("{}", cipher.encrypt_base64(message.as_bytes())?);
    Ok(())
}

/// Decrypt base64 `ciphertext` with the private key in `key_path` and print it
pub fn decrypt(key_path: &Path, ciphertext: &str) -> Result<()> {
    let cipher = PublicKeyCipher::new(read_key(key_path)?);
    let plaintext = cipher.decrypt_base64(ciphertext)?.into_string()?;
    println!("{}", plaintext.as_str());
    Ok(())
}
