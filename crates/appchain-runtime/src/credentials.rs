//! Signing key and password material.
//!
//! Both are read from files named in the configuration and held in buffers
//! that are zeroed on drop. Key decryption is left to the ledger adapter.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use appchain_client::EtherConfig;
use zeroize::Zeroizing;

use crate::loader::resolve;
use crate::RuntimeError;

/// Encrypted signing key and its password.
pub struct Credentials {
    key_path: PathBuf,
    key: Zeroizing<Vec<u8>>,
    password: Zeroizing<String>,
}

impl Credentials {
    /// Read `ether.key_path` and `ether.password`, relative to `config_dir`.
    ///
    /// Surrounding whitespace is stripped from the password.
    pub fn load(config_dir: &Path, ether: &EtherConfig) -> Result<Self, RuntimeError> {
        let key_path = resolve(config_dir, &ether.key_path);
        let key = Zeroizing::new(fs::read(&key_path).map_err(|source| RuntimeError::Io {
            path: key_path.clone(),
            source,
        })?);

        let password_path = resolve(config_dir, &ether.password);
        let raw = Zeroizing::new(fs::read_to_string(&password_path).map_err(|source| {
            RuntimeError::Io {
                path: password_path.clone(),
                source,
            }
        })?);
        let password = Zeroizing::new(raw.trim().to_string());

        Ok(Self {
            key_path,
            key,
            password,
        })
    }

    /// Resolved key file path.
    pub fn key_path(&self) -> &Path {
        &self.key_path
    }

    /// Encrypted key bytes.
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// Key password.
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("key_path", &self.key_path)
            .field("key", &format_args!("<{} bytes>", self.key.len()))
            .field("password", &"<redacted>")
            .finish()
    }
}
