use thiserror::Error;

/// Error type for JWT operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JwtError {
    #[error("Token signing secret is not configured")]
    MissingSecret,

    /// Issue time plus TTL does not fit in a timestamp.
    #[error("Token expiry is out of range")]
    ExpiryOutOfRange,

    #[error("Failed to encode token: {0}")]
    EncodingFailed(String),

    /// Malformed, wrongly signed, expired or signed with another algorithm.
    #[error("Token is invalid: {0}")]
    InvalidToken(String),
}
