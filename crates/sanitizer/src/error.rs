use sanitas_security::SecurityError;
use thiserror::Error;

/// Errors raised while setting up a sanitizer or moving tokens in and out of
/// JSON. Sanitizing itself never fails.
#[derive(Error, Debug)]
pub enum SanitizerError {
    #[error("Security configuration error: {0}")]
    Security(#[from] SecurityError),

    #[error("Token serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for sanitizer setup operations
pub type SanitizerResult<T> = Result<T, SanitizerError>;
