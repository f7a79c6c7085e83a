//! # Domain Module
//!
//! Core domain types for the appchain bridge.

pub mod entities;
pub mod errors;
pub mod invariants;
pub mod offchain;
pub mod value_objects;

pub use entities::*;
pub use errors::*;
pub use invariants::*;
pub use offchain::*;
pub use value_objects::*;
