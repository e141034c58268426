use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use jsonwebtoken::decode;
use jsonwebtoken::encode;
use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use jsonwebtoken::Validation;

use super::claims::Claims;
use super::errors::JwtError;

/// Validity window used when a caller passes a zero or negative TTL.
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 60 * 60;

/// A signed token together with its expiration instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// JWT token handler for issuing and verifying bearer tokens.
///
/// Signs with HS256 (HMAC with SHA-256) and accepts nothing else on
/// verification, so a token whose header names another algorithm is
/// rejected even if it was signed with the same secret.
pub struct JwtHandler {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
}

impl JwtHandler {
    /// Create a new JWT handler with a secret key.
    ///
    /// # Arguments
    /// * `secret` - Shared signing secret (should be at least 32 bytes)
    ///
    /// # Errors
    /// * `MissingSecret` - Secret is empty
    pub fn new(secret: &[u8]) -> Result<Self, JwtError> {
        if secret.is_empty() {
            return Err(JwtError::MissingSecret);
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            algorithm: Algorithm::HS256,
        })
    }

    /// Issue a token for `subject` carrying `roles`, valid for `ttl` from now.
    ///
    /// A `ttl` of zero (or less) is replaced by one hour.
    ///
    /// # Errors
    /// * `ExpiryOutOfRange` - `ttl` reaches past the last representable instant
    /// * `EncodingFailed` - Token signing failed
    pub fn issue(
        &self,
        subject: impl ToString,
        roles: Vec<String>,
        ttl: Duration,
    ) -> Result<IssuedToken, JwtError> {
        self.issue_at(subject, roles, ttl, Utc::now())
    }

    /// Issue a token whose validity window starts at `issued_at`.
    pub fn issue_at(
        &self,
        subject: impl ToString,
        roles: Vec<String>,
        ttl: Duration,
        issued_at: DateTime<Utc>,
    ) -> Result<IssuedToken, JwtError> {
        let ttl = effective_ttl(ttl);
        let expires_at = issued_at
            .checked_add_signed(ttl)
            .ok_or(JwtError::ExpiryOutOfRange)?;
        let claims = Claims::new(subject, roles, issued_at, ttl)?;
        let header = Header::new(self.algorithm);

        let token = encode(&header, &claims, &self.encoding_key)
            .map_err(|e| JwtError::EncodingFailed(e.to_string()))?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Verify a token's signature, algorithm and expiry and return its claims.
    ///
    /// # Errors
    /// * `InvalidToken` - Malformed, bad signature, expired, missing `exp`
    ///   or signed with another algorithm
    pub fn verify(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        validation.validate_exp = true;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| JwtError::InvalidToken(e.to_string()))
    }
}

/// Issue a token with a one-off handler built from `secret`.
///
/// # Errors
/// * `MissingSecret` - Secret is empty
/// * `ExpiryOutOfRange` - `ttl` reaches past the last representable instant
/// * `EncodingFailed` - Token signing failed
pub fn issue_token(
    subject: impl ToString,
    roles: Vec<String>,
    secret: &[u8],
    ttl: Duration,
) -> Result<IssuedToken, JwtError> {
    JwtHandler::new(secret)?.issue(subject, roles, ttl)
}

/// Verify a token with a one-off handler built from `secret`.
///
/// An empty secret can never have signed anything, so it reports
/// `InvalidToken` rather than a configuration error.
pub fn verify_token(token: &str, secret: &[u8]) -> Result<Claims, JwtError> {
    let handler = JwtHandler::new(secret)
        .map_err(|_| JwtError::InvalidToken("empty verification secret".to_string()))?;
    handler.verify(token)
}

fn effective_ttl(ttl: Duration) -> Duration {
    if ttl <= Duration::zero() {
        Duration::seconds(DEFAULT_TOKEN_TTL_SECS)
    } else {
        ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"my_secret_key_at_least_32_bytes_long!";

    #[test]
    fn test_issue_and_verify() {
        let handler = JwtHandler::new(SECRET).unwrap();

        let issued = handler
            .issue("user123", vec!["admin".to_string()], Duration::minutes(5))
            .expect("Failed to issue token");
        assert!(!issued.token.is_empty());

        let claims = handler.verify(&issued.token).expect("Failed to verify token");
        assert_eq!(claims.sub, "user123");
        assert_eq!(claims.roles, vec!["admin".to_string()]);
        assert_eq!(claims.exp, issued.expires_at.timestamp());
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert!(matches!(JwtHandler::new(b""), Err(JwtError::MissingSecret)));
        assert_eq!(
            issue_token("user123", vec![], b"", Duration::hours(1)).unwrap_err(),
            JwtError::MissingSecret
        );
    }

    #[test]
    fn test_zero_ttl_defaults_to_one_hour() {
        let handler = JwtHandler::new(SECRET).unwrap();
        let now = Utc::now();

        let issued = handler
            .issue_at("user123", vec![], Duration::zero(), now)
            .unwrap();
        assert_eq!(
            issued.expires_at - now,
            Duration::seconds(DEFAULT_TOKEN_TTL_SECS)
        );
    }

    #[test]
    fn test_unbounded_ttl_is_an_error() {
        let handler = JwtHandler::new(SECRET).unwrap();

        let result = handler.issue("user123", vec![], Duration::max_value());
        assert_eq!(result, Err(JwtError::ExpiryOutOfRange));

        let result = issue_token("user123", vec![], SECRET, Duration::max_value());
        assert_eq!(result, Err(JwtError::ExpiryOutOfRange));
    }

    #[test]
    fn test_expired_token_rejected() {
        let handler = JwtHandler::new(SECRET).unwrap();
        let issued = handler
            .issue_at(
                "user123",
                vec![],
                Duration::hours(1),
                Utc::now() - Duration::hours(2),
            )
            .unwrap();

        let result = handler.verify(&issued.token);
        assert!(matches!(result, Err(JwtError::InvalidToken(_))));
    }

    #[test]
    fn test_token_valid_until_ttl_elapses() {
        let handler = JwtHandler::new(SECRET).unwrap();
        let issued = handler
            .issue_at(
                "user123",
                vec![],
                Duration::hours(1),
                Utc::now() - Duration::minutes(59),
            )
            .unwrap();

        assert!(handler.verify(&issued.token).is_ok());
    }

    #[test]
    fn test_verify_invalid_token() {
        let handler = JwtHandler::new(SECRET).unwrap();

        let result = handler.verify("invalid.token.here");
        assert!(matches!(result, Err(JwtError::InvalidToken(_))));
    }

    #[test]
    fn test_verify_with_wrong_secret() {
        let issued = issue_token(
            "user123",
            vec![],
            b"secret1_at_least_32_bytes_long_key!",
            Duration::hours(1),
        )
        .unwrap();

        let result = verify_token(&issued.token, b"secret2_at_least_32_bytes_long_key!");
        assert!(matches!(result, Err(JwtError::InvalidToken(_))));
    }

    #[test]
    fn test_other_algorithm_rejected() {
        let now = Utc::now();
        let claims =
            Claims::new("user123", vec!["admin".into()], now, Duration::hours(1)).unwrap();
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        let result = verify_token(&token, SECRET);
        assert!(matches!(result, Err(JwtError::InvalidToken(_))));
    }

    #[test]
    fn test_free_functions_round_trip() {
        let issued = issue_token("42", vec!["user".into()], SECRET, Duration::hours(1)).unwrap();
        let claims = verify_token(&issued.token, SECRET).unwrap();
        assert_eq!(claims.sub, "42");
        assert!(matches!(
            verify_token(&issued.token, b""),
            Err(JwtError::InvalidToken(_))
        ));
    }
}
