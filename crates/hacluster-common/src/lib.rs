//! # hacluster Common
//!
//! Shared types, errors, and constants used across hacluster components.
//!
//! ## Modules
//! - `types` - Core data structures (AddressFamily, Transport, NodeId, Membership)
//! - `error` - Common error types
//! - `constants` - Defaults, configuration keys, and relation keys

pub mod constants;
pub mod error;
pub mod types;

pub use error::HaclusterError;
pub use types::*;
