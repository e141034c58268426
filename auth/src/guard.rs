use std::collections::HashSet;

use thiserror::Error;

use crate::jwt::Claims;

/// Authorization failures.
///
/// The two kinds map to different HTTP semantics: `Unauthenticated` is a 401
/// (no verified identity), `Forbidden` a 403 (identity lacks the role).
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum GuardError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Access denied")]
    Forbidden,
}

/// Role-based authorization check applied before a protected operation.
///
/// Required role names are trimmed, blank entries dropped, and compared
/// case-insensitively against the role names in the claims.
#[derive(Debug, Clone, Default)]
pub struct RoleGuard {
    required: HashSet<String>,
}

impl RoleGuard {
    pub fn new<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let required = roles
            .into_iter()
            .map(|role| role.as_ref().trim().to_lowercase())
            .filter(|role| !role.is_empty())
            .collect();
        Self { required }
    }

    /// Decide whether `claims` may pass.
    ///
    /// # Errors
    /// * `Unauthenticated` - No verified claims and at least one role required
    /// * `Forbidden` - Claims hold none of the required roles
    pub fn authorize(&self, claims: Option<&Claims>) -> Result<(), GuardError> {
        if self.required.is_empty() {
            return Ok(());
        }

        let claims = claims.ok_or(GuardError::Unauthenticated)?;

        if self.required.iter().any(|role| claims.has_role(role)) {
            Ok(())
        } else {
            Err(GuardError::Forbidden)
        }
    }
}

/// One-off authorization check against `required`.
pub fn authorize<S: AsRef<str>>(claims: Option<&Claims>, required: &[S]) -> Result<(), GuardError> {
    RoleGuard::new(required).authorize(claims)
}
