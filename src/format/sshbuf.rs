//! SSH wire-format primitives (RFC 4251 §5): `uint32`, `string`, `mpint`

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CryptoError, Result};

fn truncated() -> CryptoError {
    CryptoError::Format("Truncated SSH data".into())
}

/// Cursor over SSH-encoded bytes
pub struct SshReader<'a> {
    buf: &'a [u8],
}

impl<'a> SshReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.buf.len() < len {
            return Err(truncated());
        }
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        Ok(head)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Length-prefixed byte string
    pub fn read_string(&mut self) -> Result<&'a [u8]> {
        let len = self.read_u32()? as usize;
        self.read_bytes(len)
    }

    pub fn read_str(&mut self) -> Result<&'a str> {
        std::str::from_utf8(self.read_string()?)
            .map_err(|_| CryptoError::Format("SSH string is not valid UTF-8".into()))
    }

    /// Non-negative mpint, returned as minimal big-endian magnitude
    pub fn read_mpint(&mut self) -> Result<&'a [u8]> {
        let bytes = self.read_string()?;
        if bytes.first().is_some_and(|b| b & 0x80 != 0) {
            return Err(CryptoError::Format("Negative mpint".into()));
        }
        let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
        Ok(&bytes[start..])
    }

    pub fn remaining(&self) -> &'a [u8] {
        self.buf
    }

    /// Fail if any bytes are left unread
    pub fn finish(&self) -> Result<()> {
        if self.buf.is_empty() {
            Ok(())
        } else {
            Err(CryptoError::Format(format!(
                "{} trailing bytes after SSH data",
                self.buf.len()
            )))
        }
    }
}

/// Growable SSH-encoded buffer. Its contents may hold private key fields,
/// so the buffer is wiped on drop.
#[derive(Default, Zeroize, ZeroizeOnDrop)]
pub struct SshWriter {
    buf: Vec<u8>,
}

impl SshWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_string(&mut self, bytes: &[u8]) {
        self.write_u32(bytes.len() as u32);
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_str(&mut self, value: &str) {
        self.write_string(value.as_bytes());
    }

    /// Write a non-negative big-endian integer as an mpint
    pub fn write_mpint(&mut self, magnitude: &[u8]) {
        let start = magnitude.iter().position(|&b| b != 0).unwrap_or(magnitude.len());
        let magnitude = &magnitude[start..];
        let pad = magnitude.first().is_some_and(|b| b & 0x80 != 0);

        self.write_u32((magnitude.len() + pad as usize) as u32);
        if pad {
            self.buf.push(0);
        }
        self.buf.extend_from_slice(magnitude);
    }

    /// Take the encoded bytes. The writer is left empty and still wiped on drop.
    pub fn into_inner(mut self) -> Vec<u8> {
        std::mem::take(&mut self.buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_and_u32() {
        let mut w = SshWriter::new();
        w.write_str("ssh-ed25519");
        w.write_u32(7);
        let bytes = w.into_inner();

        assert_eq!(&bytes[..4], &[0, 0, 0, 11]);

        let mut r = SshReader::new(&bytes);
        assert_eq!(r.read_str().unwrap(), "ssh-ed25519");
        assert_eq!(r.read_u32().unwrap(), 7);
        assert!(r.finish().is_ok());
    }

    #[test]
    fn test_mpint_encoding() {
        let mut w = SshWriter::new();
        w.write_mpint(&[0x00, 0x00, 0x80, 0x01]);
        w.write_mpint(&[0x7f]);
        w.write_mpint(&[]);
        let bytes = w.into_inner();

        assert_eq!(&bytes[..7], &[0, 0, 0, 3, 0x00, 0x80, 0x01]);
        assert_eq!(&bytes[7..12], &[0, 0, 0, 1, 0x7f]);
        assert_eq!(&bytes[12..], &[0, 0, 0, 0]);

        let mut r = SshReader::new(&bytes);
        assert_eq!(r.read_mpint().unwrap(), &[0x80, 0x01]);
        assert_eq!(r.read_mpint().unwrap(), &[0x7f]);
        assert!(r.read_mpint().unwrap().is_empty());
    }

    #[test]
    fn test_truncated_input() {
        let mut r = SshReader::new(&[0, 0, 0, 5, b'a']);
        assert!(matches!(r.read_string(), Err(CryptoError::Format(_))));
    }

    #[test]
    fn test_negative_mpint_rejected() {
        let mut r = SshReader::new(&[0, 0, 0, 1, 0xff]);
        assert!(r.read_mpint().is_err());
    }
}
