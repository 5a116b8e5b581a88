//! AES-128-CBC with PKCS#7 padding and HMAC-SHA1, the symmetric half of ECIES

use aes::Aes128;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use sha1::Sha1;

use super::SecureBytes;
use crate::error::{CryptoError, Result};

pub const AES_KEY_LEN: usize = 16;
pub const IV_LEN: usize = 16;
pub const BLOCK_LEN: usize = 16;
pub const MAC_KEY_LEN: usize = 16;
pub const TAG_LEN: usize = 20;

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;
type HmacSha1 = Hmac<Sha1>;

/// PKCS#7-pad and encrypt. Output length is the padded length.
pub fn aes_cbc_encrypt(key: &[u8; AES_KEY_LEN], iv: &[u8; IV_LEN], plaintext: &[u8]) -> Vec<u8> {
    Aes128CbcEnc::new(key.into(), iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext)
}

/// Decrypt and strip PKCS#7 padding
pub fn aes_cbc_decrypt(key: &[u8; AES_KEY_LEN], iv: &[u8; IV_LEN], ciphertext: &[u8]) -> Result<SecureBytes> {
    Aes128CbcDec::new(key.into(), iv.into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map(SecureBytes::new)
        .map_err(|_| CryptoError::CryptoFailure("Invalid CBC padding".into()))
}

fn hmac(key: &[u8; MAC_KEY_LEN], data: &[u8]) -> Result<HmacSha1> {
    let mut mac = <HmacSha1 as Mac>::new_from_slice(key)
        .map_err(|e| CryptoError::crypto("HMAC key rejected", e))?;
    mac.update(data);
    Ok(mac)
}

/// HMAC-SHA1 over `data`
pub fn hmac_sha1(key: &[u8; MAC_KEY_LEN], data: &[u8]) -> Result<[u8; TAG_LEN]> {
    let digest = hmac(key, data)?.finalize().into_bytes();
    let mut tag = [0u8; TAG_LEN];
    tag.copy_from_slice(&digest);
    Ok(tag)
}

/// Constant-time tag check
pub fn verify_hmac_sha1(key: &[u8; MAC_KEY_LEN], data: &[u8], tag: &[u8]) -> Result<()> {
    hmac(key, data)?
        .verify_slice(tag)
        .map_err(|_| CryptoError::MacMismatch)
}
