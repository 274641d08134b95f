//! Error types for gatehouse.
//!
//! Throttling and quota denial are ordinary outcomes and never show up here.
//! These variants cover misconfiguration and configuration loading only.

/// Errors raised while constructing policies or loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A rate limit policy failed validation
    #[error("Invalid rate limit policy: {0}")]
    InvalidPolicy(&'static str),

    /// Limiter configuration failed validation
    #[error("Invalid limiter configuration: {0}")]
    InvalidConfig(&'static str),

    /// Plan tier name not recognized
    #[error("Unknown plan tier: {0}")]
    UnknownTier(String),

    /// Action kind name not recognized
    #[error("Unknown action kind: {0}")]
    UnknownAction(String),

    /// A limit value in the plan table could not be interpreted
    #[error("Invalid limit value: {0}")]
    InvalidLimit(String),

    /// Failed to read a configuration file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Plan table is not valid JSON or has the wrong shape
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The background sweep thread could not be started
    #[error("Failed to spawn sweeper thread: {0}")]
    Sweeper(std::io::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
