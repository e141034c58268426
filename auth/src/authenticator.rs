use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;

use crate::jwt::Claims;
use crate::jwt::JwtError;
use crate::jwt::JwtHandler;
use crate::password::PasswordError;
use crate::password::PasswordHasher;

/// Tunables for [`Authenticator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthSettings {
    /// Argon2 iteration count (`0` = library default)
    pub password_cost: u32,
    /// Access token lifetime (zero or less = one hour)
    pub access_ttl: Duration,
    /// Refresh token lifetime; `None` or non-positive disables refresh tokens
    pub refresh_ttl: Option<Duration>,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            password_cost: 0,
            access_ttl: Duration::hours(1),
            refresh_ttl: None,
        }
    }
}

/// Tokens handed out on successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTokens {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
    pub refresh_token: Option<String>,
}

/// Authentication coordinator combining password hashing and token issuance.
///
/// Access and refresh tokens are signed with the same secret and differ only
/// in lifetime.
pub struct Authenticator {
    password_hasher: PasswordHasher,
    jwt_handler: JwtHandler,
    settings: AuthSettings,
}

impl Authenticator {
    /// Create a new authenticator.
    ///
    /// # Errors
    /// * `MissingSecret` - `jwt_secret` is empty
    pub fn new(jwt_secret: &[u8], settings: AuthSettings) -> Result<Self, JwtError> {
        Ok(Self {
            password_hasher: PasswordHasher::new(settings.password_cost),
            jwt_handler: JwtHandler::new(jwt_secret)?,
            settings,
        })
    }

    /// Hash a password for storage.
    pub fn hash_password(&self, password: &str) -> Result<String, PasswordError> {
        self.password_hasher.hash(password)
    }

    /// Check a plaintext password against a stored hash.
    pub fn verify_password(&self, stored_hash: &str, password: &str) -> Result<(), PasswordError> {
        self.password_hasher.verify(stored_hash, password)
    }

    /// Issue an access token and, when enabled, a refresh token.
    ///
    /// # Errors
    /// * `ExpiryOutOfRange` - A configured TTL reaches past the last representable instant
    /// * `EncodingFailed` - Token signing failed
    pub fn issue_session(
        &self,
        subject: impl ToString,
        roles: Vec<String>,
    ) -> Result<SessionTokens, JwtError> {
        let subject = subject.to_string();
        let access = self
            .jwt_handler
            .issue(&subject, roles.clone(), self.settings.access_ttl)?;

        let refresh_token = match self.settings.refresh_ttl {
            Some(ttl) if ttl > Duration::zero() => {
                Some(self.jwt_handler.issue(&subject, roles, ttl)?.token)
            }
            _ => None,
        };

        Ok(SessionTokens {
            access_token: access.token,
            expires_at: access.expires_at,
            refresh_token,
        })
    }

    /// Validate a bearer token and return its claims.
    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        self.jwt_handler.verify(token)
    }
}
