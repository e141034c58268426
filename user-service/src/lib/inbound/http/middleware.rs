use std::sync::Arc;

use auth::Authenticator;
use auth::Claims;
use auth::RoleGuard;
use axum::extract::Request;
use axum::extract::State;
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;

use crate::domain::errors::AppError;

/// Middleware that validates the bearer token and adds its claims to request
/// extensions.
///
/// Install with `axum::middleware::from_fn_with_state(authenticator, authenticate)`.
pub async fn authenticate(
    State(authenticator): State<Arc<Authenticator>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_token_from_header(&req)?;

    let claims: Claims = authenticator.validate_token(token).map_err(|e| {
        tracing::warn!(error = %e, "JWT validation failed");
        AppError::Unauthenticated
    })?;

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Middleware that applies a [`RoleGuard`] to the claims left by [`authenticate`].
///
/// Requests without claims are rejected as unauthenticated.
pub async fn require_roles(
    State(guard): State<Arc<RoleGuard>>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    guard.authorize(req.extensions().get::<Claims>()).map_err(|e| {
        tracing::warn!(path = %req.uri().path(), error = %e, "Role check failed");
        AppError::from(e)
    })?;

    Ok(next.run(req).await)
}

fn extract_token_from_header(req: &Request) -> Result<&str, AppError> {
    let auth_header = req.headers().get(header::AUTHORIZATION).ok_or_else(|| {
        tracing::warn!("Missing Authorization header");
        AppError::Unauthenticated
    })?;

    let auth_str = auth_header.to_str().map_err(|_| {
        tracing::warn!("Invalid Authorization header");
        AppError::Unauthenticated
    })?;

    match auth_str.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
            Ok(token.trim())
        }
        _ => {
            tracing::warn!("Invalid Authorization header format. Expected: Bearer <token>");
            Err(AppError::Unauthenticated)
        }
    }
}
