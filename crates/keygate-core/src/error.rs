//! Error types for the Keygate core.

/// Core error type for Keygate infrastructure.
#[derive(Debug, thiserror::Error)]
pub enum KeygateError {
    /// Configuration is missing or inconsistent.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenience result type for Keygate operations.
pub type KeygateResult<T> = Result<T, KeygateError>;
