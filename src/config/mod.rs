//! Configuration for the `keycrypt` tool
//!
//! Settings live in an optional JSON file passed with `--config`. Every
//! field has a default, so the file may name only what it changes.

mod settings;

pub use settings::Settings;

/// Environment variable holding the `tracing` filter
pub const LOG_ENV: &str = "KEYCRYPT_LOG";

/// Environment variable holding the passphrase for encrypted PKCS#8 keys.
/// When unset the passphrase is prompted for on the terminal.
pub const PASSPHRASE_ENV: &str = "KEYCRYPT_PASSPHRASE";
