//! Core types and configuration for Keygate.
//!
//! This crate provides the pieces shared by the HTTP layer and the server
//! binary: environment-driven configuration, the top-level folder allowlists
//! that gate both routes, and the core error type.

mod allowlist;
mod config;
mod error;

pub use allowlist::{FolderAllowlist, top_level_folder};
pub use config::{DEFAULT_PRESIGN_EXPIRES, GatewayConfig, SigningConfig};
pub use error::{KeygateError, KeygateResult};
