//! # Appchain Bridge Test Suite
//!
//! End-to-end flows through [`appchain_client::AppchainClient`] over the
//! simulated ledger.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── submission.rs   # relay-hub → ledger transactions
//!     ├── sync.rs         # headers, events and meta
//!     └── offchain.rs     # sharded file transfer
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p appchain-tests
//! cargo test -p appchain-tests integration::offchain::
//! ```

#![allow(dead_code)]

pub mod integration;
