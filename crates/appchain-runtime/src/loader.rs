//! Configuration file loading.

use std::fs;
use std::path::{Path, PathBuf};

use appchain_client::ClientConfig;
use tracing::info;

use crate::RuntimeError;

/// Configuration file name inside the configuration directory.
pub const CONFIG_FILE: &str = "appchain.toml";

/// Load and validate `<config_dir>/appchain.toml`.
///
/// A relative `ether.off_chain_path` is resolved against `config_dir`.
pub fn load_config(config_dir: &Path) -> Result<ClientConfig, RuntimeError> {
    let path = config_dir.join(CONFIG_FILE);
    let content = fs::read_to_string(&path).map_err(|source| RuntimeError::Io {
        path: path.clone(),
        source,
    })?;

    let mut config = parse_config(&content).map_err(|message| RuntimeError::Parse {
        path: path.clone(),
        message,
    })?;
    if config.ether.off_chain_path.is_relative() {
        config.ether.off_chain_path = config_dir.join(&config.ether.off_chain_path);
    }
    config.validate()?;

    info!(
        path = %path.display(),
        name = %config.ether.name,
        mode = config.ether.mode.as_str(),
        "Loaded configuration"
    );
    Ok(config)
}

/// Parse a TOML document. Missing sections and fields take their defaults.
pub fn parse_config(content: &str) -> Result<ClientConfig, String> {
    toml::from_str(content).map_err(|e| e.to_string())
}

/// Resolve a path from the configuration against the configuration directory.
pub(crate) fn resolve(config_dir: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        config_dir.join(path)
    }
}
