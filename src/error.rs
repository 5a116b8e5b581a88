use std::fmt::Display;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CryptoError>;

#[derive(Debug, Error)]
pub enum CryptoError {
    /// Unrecognized label, malformed envelope or truncated binary container.
    #[error("Malformed key data: {0}")]
    Format(String),

    #[error("Algorithm mismatch: expected {expected}, found {found}")]
    AlgorithmMismatch { expected: String, found: String },

    #[error("Cryptographic operation failed: {0}")]
    CryptoFailure(String),

    /// Authentication tag did not verify. No plaintext is produced.
    #[error("Authentication tag mismatch")]
    MacMismatch,

    #[error("Input too large: {len} bytes exceeds the limit of {max} bytes")]
    InputTooLarge { len: usize, max: usize },

    #[error("Point is not on the curve")]
    InvalidCurvePoint,

    #[error("Missing {0} key component")]
    MissingKeyComponent(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CryptoError {
    /// Wrap an underlying parser error with the context it occurred in.
    pub(crate) fn format(context: &str, err: impl Display) -> Self {
        Self::Format(format!("{}: {}", context, err))
    }

    pub(crate) fn crypto(context: &str, err: impl Display) -> Self {
        Self::CryptoFailure(format!("{}: {}", context, err))
    }

    pub(crate) fn mismatch(expected: impl Display, found: impl Display) -> Self {
        Self::AlgorithmMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }
}
