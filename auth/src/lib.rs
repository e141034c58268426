//! Authentication utilities library
//!
//! Provides the authentication and authorization primitives of the user
//! management backend:
//! - Password hashing (Argon2id)
//! - Bearer token issuance and verification (HS256 JWT)
//! - Role-based access guard
//! - Authentication coordination (hashing + access/refresh tokens)
//!
//! Nothing here performs I/O; persistence lives in the service crates.
//!
//! # Examples
//!
//! ## Password Hashing
//! ```
//! use auth::PasswordHasher;
//!
//! let hasher = PasswordHasher::new(1);
//! let hash = hasher.hash("my_password").unwrap();
//! assert!(hasher.verify(&hash, "my_password").is_ok());
//! ```
//!
//! ## Tokens and Guards
//! ```
//! use auth::{issue_token, verify_token, RoleGuard};
//! use chrono::Duration;
//!
//! let secret = b"secret_key_at_least_32_bytes_long!";
//! let issued = issue_token("user123", vec!["Admin".into()], secret, Duration::hours(1)).unwrap();
//! let claims = verify_token(&issued.token, secret).unwrap();
//!
//! assert!(RoleGuard::new(["admin"]).authorize(Some(&claims)).is_ok());
//! ```

pub mod authenticator;
pub mod guard;
pub mod jwt;
pub mod password;

// Re-export commonly used items
pub use authenticator::AuthSettings;
pub use authenticator::Authenticator;
pub use authenticator::SessionTokens;
pub use guard::authorize;
pub use guard::GuardError;
pub use guard::RoleGuard;
pub use jwt::issue_token;
pub use jwt::verify_token;
pub use jwt::Claims;
pub use jwt::IssuedToken;
pub use jwt::JwtError;
pub use jwt::JwtHandler;
pub use password::PasswordError;
pub use password::PasswordHasher;
