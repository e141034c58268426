use thiserror::Error;

/// Error type for password operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    HashingFailed(String),

    #[error("Password and hash must not be empty")]
    EmptyInput,

    #[error("Stored password hash is malformed: {0}")]
    InvalidHash(String),

    #[error("Password does not match")]
    Mismatch,
}
