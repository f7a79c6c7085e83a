//! # Appchain Runtime
//!
//! Process shell around the appchain bridge client.
//!
//! ## Startup Sequence
//!
//! 1. Load `<config_dir>/appchain.toml` and validate it
//! 2. Read the signing key and password files into zeroizing buffers
//! 3. Build the client over the configured ledger backend: unlock the key
//!    and dial the node for `rpc`, or use the simulated ledger for `memory`
//! 4. Start the background loops
//! 5. Run until Ctrl+C or the client's fatal signal
//!
//! ## Configuration Directory
//!
//! ```text
//! <config_dir>/
//! ├── appchain.toml    # ClientConfig
//! ├── account.key      # ether.key_path
//! └── password         # ether.password
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod credentials;
pub mod loader;
pub mod runtime;

pub use credentials::Credentials;
pub use loader::{load_config, parse_config, CONFIG_FILE};
pub use runtime::{BridgeRuntime, ExitReason};

use std::path::PathBuf;

use appchain_client::ClientError;
use thiserror::Error;

/// Runtime setup errors.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// A configuration or credential file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File being read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for [`appchain_client::ClientConfig`].
    #[error("Failed to parse {path}: {message}")]
    Parse {
        /// File being parsed
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// Client construction or lifecycle failure.
    #[error("Client error: {0}")]
    Client(#[from] ClientError),
}

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    #[test]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
    }
}
