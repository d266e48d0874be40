//! Security specific errors for the sanitas sanitizer.

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SecurityError {
    #[error("Invalid security configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid URL protocol entry: {protocol:?}")]
    InvalidProtocol { protocol: String },

    #[error("Unable to read configuration from {path}: {reason}")]
    ConfigUnreadable { path: String, reason: String },
}

/// Result type for security operations
pub type SecurityResult<T> = Result<T, SecurityError>;
