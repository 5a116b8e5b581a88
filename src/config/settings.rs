//! Tool settings

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CryptoError, Result};
use crate::keys::{EcCurve, MIN_RSA_BITS};

/// Defaults applied when generating and exporting keys
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// RSA modulus size for new keys
    pub rsa_bits: usize,
    /// Curve for new ECDSA keys
    pub ecdsa_curve: EcCurve,
    /// Comment stored in OpenSSH containers and authorized key lines
    pub comment: String,
    /// `tracing` filter used when `KEYCRYPT_LOG` is unset
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rsa_bits: 2048,
            ecdsa_curve: EcCurve::P256,
            comment: String::new(),
            log_filter: "warn".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from a JSON file. No path means defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        debug!(path = %path.display(), "loading settings");
        let contents = fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&contents)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Write settings as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate()?;
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.rsa_bits < MIN_RSA_BITS || self.rsa_bits % 8 != 0 {
            return Err(CryptoError::Format(format!(
                "rsa_bits must be a multiple of 8 and at least {}, got {}",
                MIN_RSA_BITS, self.rsa_bits
            )));
        }
        Ok(())
    }
}
