use axum::http::StatusCode;
use serde_json::json;
use serde_json::Value;
use thiserror::Error;

/// Failure taxonomy returned by every core operation.
///
/// Each variant has a stable machine-readable code and an HTTP status. The
/// `Internal` and `Config` payloads are kept for logging only and never reach
/// the caller.
#[derive(Debug, Clone, Error)]
pub enum AppError {
    #[error("{message}")]
    Validation {
        message: String,
        details: Option<Value>,
    },

    #[error("Username or email already exists")]
    UserExists,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("User is disabled")]
    UserDisabled,

    #[error("Access denied")]
    Forbidden,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("User not found")]
    UserNotFound,

    #[error("Server misconfigured")]
    Config(String),

    #[error("Internal server error")]
    Internal(String),
}

impl AppError {
    /// Validation failure with a single message and no details.
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            details: None,
        }
    }

    /// Validation failure pinned to one request field.
    pub fn invalid_field(field: &str, reason: impl ToString) -> Self {
        let reason = reason.to_string();
        AppError::Validation {
            message: format!("Invalid {}: {}", field, reason),
            details: Some(json!([{ "field": field, "message": reason }])),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation { .. } => "VALIDATION_FAILED",
            AppError::UserExists => "USER_EXISTS",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::UserDisabled => "USER_DISABLED",
            AppError::Forbidden => "FORBIDDEN",
            AppError::Unauthenticated => "UNAUTHENTICATED",
            AppError::UserNotFound => "USER_NOT_FOUND",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::UserExists => StatusCode::CONFLICT,
            AppError::InvalidCredentials | AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::UserDisabled | AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::UserNotFound => StatusCode::NOT_FOUND,
            AppError::Config(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Structured details safe to show to the caller.
    pub fn details(&self) -> Option<&Value> {
        match self {
            AppError::Validation { details, .. } => details.as_ref(),
            _ => None,
        }
    }
}

impl From<auth::GuardError> for AppError {
    fn from(err: auth::GuardError) -> Self {
        match err {
            auth::GuardError::Unauthenticated => AppError::Unauthenticated,
            auth::GuardError::Forbidden => AppError::Forbidden,
        }
    }
}

impl From<auth::JwtError> for AppError {
    fn from(err: auth::JwtError) -> Self {
        match err {
            auth::JwtError::MissingSecret | auth::JwtError::ExpiryOutOfRange => {
                AppError::Config(err.to_string())
            }
            auth::JwtError::InvalidToken(_) => AppError::Unauthenticated,
            auth::JwtError::EncodingFailed(_) => AppError::Internal(err.to_string()),
        }
    }
}
