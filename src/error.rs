//! Error types for the particle core.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    /// A configuration value outside its valid range. The call that carried
    /// it leaves the simulation unchanged.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Could not determine config directory")]
    NoConfigDir,
}

pub type Result<T> = std::result::Result<T, SimError>;

impl SimError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        SimError::InvalidConfig(msg.into())
    }
}
