use std::fmt;
use std::str::FromStr;

use chrono::DateTime;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::errors::AppError;
use crate::user::errors::EmailError;
use crate::user::errors::FullNameError;
use crate::user::errors::PasswordPolicyError;
use crate::user::errors::UserIdError;
use crate::user::errors::UserStatusError;
use crate::user::errors::UsernameError;

/// User aggregate, hydrated with its roles.
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub username: Username,
    pub email: EmailAddress,
    pub password_hash: String,
    pub full_name: FullName,
    pub status: UserStatus,
    pub roles: Vec<Role>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Role names in storage order.
    pub fn role_names(&self) -> Vec<String> {
        self.roles.iter().map(|role| role.name.clone()).collect()
    }
}

/// User unique identifier type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Generate a new random user ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a user ID from string.
    ///
    /// # Errors
    /// * `InvalidFormat` - String is not a valid UUID
    pub fn from_string(s: &str) -> Result<Self, UserIdError> {
        Uuid::parse_str(s.trim())
            .map(UserId)
            .map_err(|e| UserIdError::InvalidFormat(e.to_string()))
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Username value type
///
/// Surrounding whitespace is trimmed; the remainder must be 3-50 characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Username(String);

impl Username {
    const MIN_LENGTH: usize = 3;
    const MAX_LENGTH: usize = 50;

    /// Create a new valid username.
    ///
    /// # Errors
    /// * `TooShort` - Fewer than 3 characters after trimming
    /// * `TooLong` - More than 50 characters after trimming
    pub fn new(username: impl AsRef<str>) -> Result<Self, UsernameError> {
        let username = username.as_ref().trim();
        let length = username.chars().count();
        if length < Self::MIN_LENGTH {
            Err(UsernameError::TooShort {
                min: Self::MIN_LENGTH,
                actual: length,
            })
        } else if length > Self::MAX_LENGTH {
            Err(UsernameError::TooLong {
                max: Self::MAX_LENGTH,
                actual: length,
            })
        } else {
            Ok(Self(username.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Email address type
///
/// Always stored trimmed and lowercased; validated with an RFC 5322 parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Create a new normalized, validated email address.
    ///
    /// # Errors
    /// * `InvalidFormat` - Email does not conform to RFC 5322
    pub fn new(email: impl AsRef<str>) -> Result<Self, EmailError> {
        let email = email.as_ref().trim().to_lowercase();
        email_address::EmailAddress::from_str(&email)
            .map(|_| EmailAddress(email))
            .map_err(|e| EmailError::InvalidFormat(e.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Display name, trimmed, 2-100 characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullName(String);

impl FullName {
    const MIN_LENGTH: usize = 2;
    const MAX_LENGTH: usize = 100;

    pub fn new(full_name: impl AsRef<str>) -> Result<Self, FullNameError> {
        let full_name = full_name.as_ref().trim();
        let length = full_name.chars().count();
        if length < Self::MIN_LENGTH {
            Err(FullNameError::TooShort {
                min: Self::MIN_LENGTH,
                actual: length,
            })
        } else if length > Self::MAX_LENGTH {
            Err(FullNameError::TooLong {
                max: Self::MAX_LENGTH,
                actual: length,
            })
        } else {
            Ok(Self(full_name.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Plaintext password accepted for storage (8-64 characters, not trimmed).
#[derive(Clone, PartialEq, Eq)]
pub struct NewPassword(String);

impl NewPassword {
    const MIN_LENGTH: usize = 8;
    const MAX_LENGTH: usize = 64;

    pub fn new(password: impl Into<String>) -> Result<Self, PasswordPolicyError> {
        let password = password.into();
        let length = password.chars().count();
        if length < Self::MIN_LENGTH {
            Err(PasswordPolicyError::TooShort {
                min: Self::MIN_LENGTH,
                actual: length,
            })
        } else if length > Self::MAX_LENGTH {
            Err(PasswordPolicyError::TooLong {
                max: Self::MAX_LENGTH,
                actual: length,
            })
        } else {
            Ok(Self(password))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for NewPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NewPassword(***)")
    }
}

/// Account state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserStatus {
    Enabled,
    Disabled,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Enabled => "enabled",
            UserStatus::Disabled => "disabled",
        }
    }
}

impl FromStr for UserStatus {
    type Err = UserStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "enabled" => Ok(UserStatus::Enabled),
            "disabled" => Ok(UserStatus::Disabled),
            _ => Err(UserStatusError::Unknown(s.to_string())),
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role unique identifier type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoleId(pub Uuid);

impl RoleId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RoleId {
    fn default() -> Self {
        Self::new()
    }
}

/// Named permission group. Seeded by the schema, never created by core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub description: String,
}

/// Command to register a new user with validated, normalized fields.
#[derive(Debug)]
pub struct RegisterCommand {
    pub username: Username,
    pub email: EmailAddress,
    pub password: NewPassword,
    pub full_name: FullName,
}

impl RegisterCommand {
    pub fn new(
        username: Username,
        email: EmailAddress,
        password: NewPassword,
        full_name: FullName,
    ) -> Self {
        Self {
            username,
            email,
            password,
            full_name,
        }
    }

    /// Validate and normalize raw registration input.
    ///
    /// # Errors
    /// * `Validation` - First field that fails its constraints
    pub fn parse(
        username: &str,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<Self, AppError> {
        Ok(Self::new(
            Username::new(username)?,
            EmailAddress::new(email)?,
            NewPassword::new(password)?,
            FullName::new(full_name)?,
        ))
    }
}

/// Command to update the caller's own profile.
#[derive(Debug)]
pub struct UpdateProfileCommand {
    pub email: EmailAddress,
    pub full_name: FullName,
}

impl UpdateProfileCommand {
    pub fn parse(email: &str, full_name: &str) -> Result<Self, AppError> {
        Ok(Self {
            email: EmailAddress::new(email)?,
            full_name: FullName::new(full_name)?,
        })
    }
}

/// Raw admin listing request; normalized by the service.
#[derive(Debug, Clone, Default)]
pub struct ListUsersQuery {
    pub page: i64,
    pub page_size: i64,
    pub keyword: Option<String>,
    pub status: Option<String>,
}

/// Store-level listing filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    /// Lowercased substring matched against username, email and full name
    pub keyword: Option<String>,
    pub status: Option<UserStatus>,
}

impl UserFilter {
    /// Build a filter from optional raw input; blank values are ignored.
    pub fn parse(keyword: Option<&str>, status: Option<&str>) -> Result<Self, AppError> {
        let keyword = keyword
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_lowercase);
        let status = status
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(UserStatus::from_str)
            .transpose()?;
        Ok(Self { keyword, status })
    }
}

/// Normalized page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    /// Clamp a raw page request.
    ///
    /// Page below 1 becomes 1; a page size of 0 or less becomes
    /// `default_size`, and anything above `max_size` is capped.
    pub fn normalize(page: i64, page_size: i64, default_size: u32, max_size: u32) -> Self {
        let page = page.clamp(1, i64::from(u32::MAX)) as u32;
        let default_size = default_size.max(1);
        let max_size = max_size.max(1);
        let page_size = if page_size <= 0 {
            default_size
        } else {
            page_size.min(i64::from(u32::MAX)) as u32
        };

        Self {
            page,
            page_size: page_size.min(max_size),
        }
    }

    pub fn offset(&self) -> i64 {
        (i64::from(self.page) - 1) * i64::from(self.page_size)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }

    /// `ceil(total / page_size)`
    pub fn total_pages(&self, total: i64) -> i64 {
        let size = i64::from(self.page_size);
        if total <= 0 {
            0
        } else {
            (total + size - 1) / size
        }
    }
}
