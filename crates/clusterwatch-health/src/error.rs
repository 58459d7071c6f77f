//! Health engine error types.

use thiserror::Error;

/// Errors returned by alert operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AlertError {
    #[error("alert not found: {0}")]
    NotFound(u64),

    #[error("alert already acknowledged: {0}")]
    AlreadyAcknowledged(u64),
}

pub type AlertResult<T> = Result<T, AlertError>;

/// Errors raised while validating monitor configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid interval: {0:?}")]
    InvalidInterval(String),

    #[error("interval must be greater than zero")]
    ZeroInterval,

    #[error("threshold {check}: warning_max {warning} exceeds critical_max {critical}")]
    InvertedThreshold {
        check: String,
        warning: f64,
        critical: f64,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
